// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use lazy_static::lazy_static;

use resona_core::audio::{Format, Speakers, MODE_MONO, MODE_STEREO};
use resona_core::parser::{BsType, FrameInfo, FrameParser, SyncInfo, SyncTrie};

const HEADER_SIZE: usize = 4;
const MIN_FRAME_SIZE: usize = 24;
const MAX_FRAME_SIZE: usize = 2882;

/// Bit-rate lookup tables in bits/s, by version and layer.
const BIT_RATES_MPEG1_L1: [u32; 15] = [
    0, 32_000, 64_000, 96_000, 128_000, 160_000, 192_000, 224_000, 256_000, 288_000, 320_000,
    352_000, 384_000, 416_000, 448_000,
];
const BIT_RATES_MPEG1_L2: [u32; 15] = [
    0, 32_000, 48_000, 56_000, 64_000, 80_000, 96_000, 112_000, 128_000, 160_000, 192_000,
    224_000, 256_000, 320_000, 384_000,
];
const BIT_RATES_MPEG1_L3: [u32; 15] = [
    0, 32_000, 40_000, 48_000, 56_000, 64_000, 80_000, 96_000, 112_000, 128_000, 160_000,
    192_000, 224_000, 256_000, 320_000,
];
const BIT_RATES_MPEG2_L1: [u32; 15] = [
    0, 32_000, 48_000, 56_000, 64_000, 80_000, 96_000, 112_000, 128_000, 144_000, 160_000,
    176_000, 192_000, 224_000, 256_000,
];
const BIT_RATES_MPEG2_L23: [u32; 15] = [
    0, 8_000, 16_000, 24_000, 32_000, 40_000, 48_000, 56_000, 64_000, 80_000, 96_000, 112_000,
    128_000, 144_000, 160_000,
];

#[derive(Copy, Clone, PartialEq, Eq)]
enum Version {
    Mpeg1,
    Mpeg2,
    Mpeg2p5,
}

lazy_static! {
    static ref MPA_SYNC_TRIE: SyncTrie = {
        // Bit-rate 0xf is invalid; sample rate 0x3 is invalid.
        let mut bitrate = SyncTrie::empty();
        for value in 0..0xf {
            bitrate |= SyncTrie::value(value, 4);
        }
        let rate = SyncTrie::value(0, 2) | SyncTrie::value(1, 2) | SyncTrie::value(2, 2);

        // Big-endian: 11-bit sync, any version but the reserved one, any
        // layer but zero.
        let version =
            SyncTrie::value(0, 2) | SyncTrie::value(2, 2) | SyncTrie::value(3, 2);
        let layer = SyncTrie::value(1, 2) | SyncTrie::value(2, 2) | SyncTrie::value(3, 2);
        let big_endian = SyncTrie::value(0x7ff, 11)
            + version
            + layer.clone()
            + SyncTrie::any()
            + bitrate.clone()
            + rate.clone();

        // Byte-swapped 16-bit words: the second header byte comes first.
        // MPEG2.5 is not detectable here, so the version bit is fixed.
        let little_endian = SyncTrie::value(0xf, 4)
            + SyncTrie::any()
            + layer
            + SyncTrie::any()
            + SyncTrie::value(0xff, 8)
            + SyncTrie::pattern("xxxxxxxx")
            + bitrate
            + rate;

        let mut trie = big_endian | little_endian;
        trie.optimize();
        trie
    };
}

/// MPEG Audio (layers 1-3) frame parser.
///
/// Recognizes plain big-endian headers and streams stored as byte-swapped
/// 16-bit words.
#[derive(Default)]
pub struct MpaFrameParser;

impl MpaFrameParser {
    pub fn new() -> MpaFrameParser {
        MpaFrameParser
    }
}

fn parse_word(header: u32, bs_type: BsType) -> Option<FrameInfo> {
    if header & 0xffe0_0000 != 0xffe0_0000 {
        return None;
    }

    let version = match header >> 19 & 0x3 {
        0b00 => Version::Mpeg2p5,
        0b10 => Version::Mpeg2,
        0b11 => Version::Mpeg1,
        _ => return None,
    };

    // Layer codes run backwards: 0b01 is layer 3.
    let layer = match header >> 17 & 0x3 {
        0b00 => return None,
        code => 4 - code,
    };

    let bitrate_idx = (header >> 12 & 0xf) as usize;
    if bitrate_idx == 0 || bitrate_idx == 0xf {
        // Free format is not supported.
        return None;
    }
    let bitrate = match (version, layer) {
        (Version::Mpeg1, 1) => BIT_RATES_MPEG1_L1[bitrate_idx],
        (Version::Mpeg1, 2) => BIT_RATES_MPEG1_L2[bitrate_idx],
        (Version::Mpeg1, _) => BIT_RATES_MPEG1_L3[bitrate_idx],
        (_, 1) => BIT_RATES_MPEG2_L1[bitrate_idx],
        (_, _) => BIT_RATES_MPEG2_L23[bitrate_idx],
    };

    let sample_rate = match (header >> 10 & 0x3, version) {
        (0b00, Version::Mpeg1) => 44_100,
        (0b01, Version::Mpeg1) => 48_000,
        (0b10, Version::Mpeg1) => 32_000,
        (0b00, Version::Mpeg2) => 22_050,
        (0b01, Version::Mpeg2) => 24_000,
        (0b10, Version::Mpeg2) => 16_000,
        (0b00, Version::Mpeg2p5) => 11_025,
        (0b01, Version::Mpeg2p5) => 12_000,
        (0b10, Version::Mpeg2p5) => 8_000,
        _ => return None,
    };

    let has_padding = header & 0x200 != 0;

    let mask = if header >> 6 & 0x3 == 0b11 { MODE_MONO } else { MODE_STEREO };

    // Frame size per ISO 11172-3: layer 1 counts 4-byte slots.
    let (factor, slot_size) = match (layer, version) {
        (1, _) => (12, 4),
        (3, Version::Mpeg1) => (144, 1),
        (3, _) => (72, 1),
        (_, _) => (144, 1),
    };
    let slots = factor * bitrate / sample_rate + u32::from(has_padding);
    let frame_size = (slots * slot_size) as usize;
    if frame_size < MIN_FRAME_SIZE {
        return None;
    }

    let nsamples = match (layer, version) {
        (1, _) => 384,
        (3, Version::Mpeg1) => 1152,
        (3, _) => 576,
        (_, _) => 1152,
    };

    Some(FrameInfo {
        spk: Speakers::new(Format::Mpa, mask, sample_rate),
        frame_size,
        nsamples,
        bs_type,
        spdif_type: if layer == 1 { 4 } else { 5 },
    })
}

fn parse_any(hdr: &[u8]) -> Option<FrameInfo> {
    if hdr.len() < HEADER_SIZE {
        return None;
    }

    if hdr[0] == 0xff && hdr[1] & 0xe0 == 0xe0 {
        let header = u32::from_be_bytes([hdr[0], hdr[1], hdr[2], hdr[3]]);
        return parse_word(header, BsType::Byte);
    }

    // Byte-swapped 16-bit words.
    if hdr[1] == 0xff && hdr[0] & 0xe0 == 0xe0 {
        let header = u32::from_be_bytes([hdr[1], hdr[0], hdr[3], hdr[2]]);
        return parse_word(header, BsType::Le16);
    }

    None
}

impl FrameParser for MpaFrameParser {
    fn can_parse(&self, format: Format) -> bool {
        matches!(format, Format::Mpa | Format::RawData)
    }

    fn sync_info(&self) -> SyncInfo {
        SyncInfo::new(MPA_SYNC_TRIE.clone(), MIN_FRAME_SIZE, MAX_FRAME_SIZE)
    }

    fn header_size(&self) -> usize {
        HEADER_SIZE
    }

    fn parse_header(&self, hdr: &[u8]) -> Option<FrameInfo> {
        parse_any(hdr)
    }

    fn compare_headers(&self, hdr1: &[u8], hdr2: &[u8]) -> bool {
        match (parse_any(hdr1), parse_any(hdr2)) {
            (Some(fi1), Some(fi2)) => {
                // Padding varies frame to frame at 44.1 kHz; parameters are
                // equal when everything but the exact size matches.
                fi1.spk == fi2.spk && fi1.nsamples == fi2.nsamples && fi1.bs_type == fi2.bs_type
            }
            _ => false,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use resona_core::parser::StreamBuffer;

    /// Builds an MPEG1 layer 2 frame: 48 kHz, stereo, 192 kbps, 576 bytes.
    pub(crate) fn mpa_frame(mode_mono: bool) -> Vec<u8> {
        let mut frame = vec![0u8; 576];
        frame[0] = 0xff;
        frame[1] = 0xfd; // sync, MPEG1, layer 2, no CRC
        frame[2] = 0xa4; // bitrate index 10 (192k), 48 kHz, no padding
        frame[3] = if mode_mono { 0xc0 } else { 0x00 };
        frame
    }

    #[test]
    fn verify_parse_header() {
        let parser = MpaFrameParser::new();
        let frame = mpa_frame(false);

        let fi = parser.parse_header(&frame[..4]).unwrap();
        assert_eq!(fi.spk.format, Format::Mpa);
        assert_eq!(fi.spk.mask, MODE_STEREO);
        assert_eq!(fi.spk.sample_rate, 48000);
        assert_eq!(fi.frame_size, 576);
        assert_eq!(fi.nsamples, 1152);
        assert_eq!(fi.bs_type, BsType::Byte);
        assert_eq!(fi.spdif_type, 5);
    }

    #[test]
    fn verify_byte_swapped_header() {
        let parser = MpaFrameParser::new();
        let frame = mpa_frame(false);
        let swapped = [frame[1], frame[0], frame[3], frame[2]];

        let fi = parser.parse_header(&swapped).unwrap();
        assert_eq!(fi.bs_type, BsType::Le16);
        assert_eq!(fi.frame_size, 576);
    }

    #[test]
    fn verify_bad_headers() {
        let parser = MpaFrameParser::new();

        // Reserved version.
        assert!(parser.parse_header(&[0xff, 0xe9, 0xa4, 0x00]).is_none());
        // Layer 0.
        assert!(parser.parse_header(&[0xff, 0xf9, 0xa4, 0x00]).is_none());
        // Bit-rate 0xf.
        assert!(parser.parse_header(&[0xff, 0xfd, 0xf4, 0x00]).is_none());
        // Sample rate 0x3.
        assert!(parser.parse_header(&[0xff, 0xfd, 0xac, 0x00]).is_none());
    }

    #[test]
    fn verify_trie_rejects_what_the_header_rejects() {
        let trie = MpaFrameParser::new().sync_info().sync_trie;

        assert!(trie.matches(&[0xff, 0xfd, 0xa4, 0x00]));
        // Bit-rate 0xf.
        assert!(!trie.matches(&[0xff, 0xfd, 0xf4, 0x00]));
        // Sample rate 0x3.
        assert!(!trie.matches(&[0xff, 0xfd, 0xac, 0x00]));
        // Layer 0.
        assert!(!trie.matches(&[0xff, 0xf9, 0xa4, 0x00]));
    }

    #[test]
    fn verify_stream_loading_with_mode_change() {
        let mut data = Vec::new();
        for _ in 0..3 {
            data.extend(mpa_frame(false));
        }
        for _ in 0..2 {
            data.extend(mpa_frame(true));
        }

        let mut buf = StreamBuffer::new(Box::new(MpaFrameParser::new()));
        let mut window = &data[..];
        let mut frames = 0;
        let mut streams = 0;
        while let Some(frame) = buf.load_frame(&mut window) {
            assert_eq!(frame.data.len(), 576);
            frames += 1;
            if frame.new_stream {
                streams += 1;
            }
        }
        assert_eq!(frames, 5);
        assert_eq!(streams, 2);
    }
}
