// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use lazy_static::lazy_static;

use resona_core::audio::{
    ChannelMask, Format, Speakers, MODE_3_0, MODE_3_1, MODE_3_2, MODE_5_1, MODE_7_1, MODE_MONO,
    MODE_STEREO,
};
use resona_core::io::BitReader;
use resona_core::parser::{BsType, FrameInfo, FrameParser, SyncInfo, SyncTrie};

const HEADER_SIZE: usize = 7;
const MIN_FRAME_SIZE: usize = 7;
const MAX_FRAME_SIZE: usize = 8192;

/// Samples per AAC frame.
const AAC_FRAME_SAMPLES: usize = 1024;

const SAMPLE_RATES: [u32; 12] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000,
];

/// Channel configuration codes 1..=7.
const CHANNEL_MASKS: [ChannelMask; 7] =
    [MODE_MONO, MODE_STEREO, MODE_3_0, MODE_3_1, MODE_3_2, MODE_5_1, MODE_7_1];

lazy_static! {
    /// ADTS header prefix:
    ///
    /// ```text
    /// iiiiiiiiiiii  syncword
    /// x             id
    /// oo            layer (always 0)
    /// i             protection_absent (CRC frames are not handled)
    /// xx            object type
    /// ````
    ///
    /// followed by a sampling frequency index below 0xc, the private bit and
    /// a non-zero channel configuration.
    static ref ADTS_SYNC_TRIE: SyncTrie = {
        let mut rate = SyncTrie::empty();
        for value in 0..0xc {
            rate |= SyncTrie::value(value, 4);
        }
        let mut channels = SyncTrie::empty();
        for value in 1..8 {
            channels |= SyncTrie::value(value, 3);
        }

        let mut trie = SyncTrie::pattern("iiiiiiiiiiii x oo i xx")
            + rate
            + SyncTrie::any()
            + channels;
        trie.optimize();
        trie
    };
}

/// AAC ADTS frame parser.
#[derive(Default)]
pub struct AdtsFrameParser;

impl AdtsFrameParser {
    pub fn new() -> AdtsFrameParser {
        AdtsFrameParser
    }
}

fn parse_any(hdr: &[u8]) -> Option<FrameInfo> {
    if hdr.len() < HEADER_SIZE {
        return None;
    }

    let mut bs = BitReader::new(hdr);
    if bs.read_bits(12)? != 0xfff {
        return None;
    }

    bs.skip_bits(1)?; // id
    if bs.read_bits(2)? != 0 {
        return None; // layer
    }
    if !bs.read_bit()? {
        return None; // protection_absent: CRC frames are not handled
    }
    bs.skip_bits(2)?; // object type

    let rate_idx = bs.read_bits(4)? as usize;
    if rate_idx >= SAMPLE_RATES.len() {
        return None;
    }
    bs.skip_bits(1)?; // private bit

    let channel_config = bs.read_bits(3)? as usize;
    if channel_config == 0 {
        return None;
    }

    bs.skip_bits(4)?; // original, home, copyright id, copyright start

    let frame_size = bs.read_bits(13)? as usize;
    if frame_size < HEADER_SIZE {
        return None;
    }

    bs.skip_bits(11)?; // buffer fullness
    let num_frames = bs.read_bits(2)? as usize + 1;

    Some(FrameInfo {
        spk: Speakers::new(Format::Aac, CHANNEL_MASKS[channel_config - 1], SAMPLE_RATES[rate_idx]),
        frame_size,
        nsamples: AAC_FRAME_SAMPLES * num_frames,
        bs_type: BsType::Byte,
        spdif_type: 0,
    })
}

impl FrameParser for AdtsFrameParser {
    fn can_parse(&self, format: Format) -> bool {
        matches!(format, Format::Aac | Format::RawData)
    }

    fn sync_info(&self) -> SyncInfo {
        SyncInfo::new(ADTS_SYNC_TRIE.clone(), MIN_FRAME_SIZE, MAX_FRAME_SIZE)
    }

    fn header_size(&self) -> usize {
        HEADER_SIZE
    }

    fn parse_header(&self, hdr: &[u8]) -> Option<FrameInfo> {
        parse_any(hdr)
    }

    fn compare_headers(&self, hdr1: &[u8], hdr2: &[u8]) -> bool {
        match (parse_any(hdr1), parse_any(hdr2)) {
            (Some(fi1), Some(fi2)) => fi1.spk == fi2.spk,
            _ => false,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use resona_core::parser::StreamBuffer;

    /// Builds an ADTS frame: 48 kHz, stereo, LC profile, `size` bytes.
    pub(crate) fn adts_frame(size: usize) -> Vec<u8> {
        assert!(size >= 7 && size < 8192);
        let mut frame = vec![0u8; size];
        frame[0] = 0xff;
        frame[1] = 0xf1; // id 0, layer 0, no CRC
        frame[2] = 0x4c; // LC profile, rate index 3 (48 kHz), channels hi
        frame[3] = 0x80 | (size >> 11) as u8; // channels 2, frame length hi
        frame[4] = (size >> 3) as u8;
        frame[5] = (size << 5) as u8 | 0x1f; // fullness hi
        frame[6] = 0xfc; // fullness lo, one raw data block
        frame
    }

    #[test]
    fn verify_parse_header() {
        let parser = AdtsFrameParser::new();
        let frame = adts_frame(256);

        let fi = parser.parse_header(&frame[..7]).unwrap();
        assert_eq!(fi.spk.format, Format::Aac);
        assert_eq!(fi.spk.mask, MODE_STEREO);
        assert_eq!(fi.spk.sample_rate, 48000);
        assert_eq!(fi.frame_size, 256);
        assert_eq!(fi.nsamples, 1024);
    }

    #[test]
    fn verify_trie_decisions() {
        let trie = AdtsFrameParser::new().sync_info().sync_trie;

        // A valid prefix is accepted; a CRC-protected one is not.
        assert!(trie.matches(&[0xff, 0xf1, 0x50, 0x80, 0x00]));
        assert!(!trie.matches(&[0xff, 0xf0, 0x50, 0x80, 0x00]));

        // Reserved sampling frequency index.
        assert!(!trie.matches(&[0xff, 0xf1, 0x70, 0x80, 0x00]));
        // Channel configuration 0.
        assert!(!trie.matches(&[0xff, 0xf1, 0x50, 0x00, 0x00]));
    }

    #[test]
    fn verify_bad_headers() {
        let parser = AdtsFrameParser::new();

        // Layer must be zero.
        assert!(parser.parse_header(&[0xff, 0xf7, 0x4c, 0x80, 0x20, 0x1f, 0xfc]).is_none());
        // Frame length smaller than the header.
        assert!(parser.parse_header(&[0xff, 0xf1, 0x4c, 0x80, 0x00, 0x5f, 0xfc]).is_none());
    }

    #[test]
    fn verify_stream_loading() {
        let mut data = Vec::new();
        for size in [256usize, 256, 300, 300, 256] {
            data.extend(adts_frame(size));
        }

        let mut buf = StreamBuffer::new(Box::new(AdtsFrameParser::new()));
        let mut window = &data[..];
        let mut frames = Vec::new();
        while let Some(frame) = buf.load_frame(&mut window) {
            frames.push((frame.data.len(), frame.new_stream));
        }

        // Frame size changes are normal for AAC and do not split streams.
        assert_eq!(
            frames,
            vec![(256, true), (256, false), (300, false), (300, false), (256, false)]
        );
    }
}
