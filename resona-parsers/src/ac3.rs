// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use lazy_static::lazy_static;

use resona_core::audio::bitstream::conv_to_be16;
use resona_core::audio::{
    ChannelMask, Format, Relation, Speakers, MODE_2_1, MODE_3_0, MODE_3_1, MODE_3_2, MODE_MONO,
    MODE_QUADRO, MODE_STEREO,
};
use resona_core::io::BitReader;
use resona_core::parser::{BsType, FrameInfo, FrameParser, SyncInfo, SyncTrie};

/// Samples per AC-3 frame.
const AC3_FRAME_SAMPLES: usize = 1536;

const HEADER_SIZE: usize = 8;
const MIN_FRAME_SIZE: usize = 128;
const MAX_FRAME_SIZE: usize = 3840;

/// AC-3 sample rates by `fscod`.
const SAMPLE_RATES: [u32; 3] = [48000, 44100, 32000];

/// AC-3 frame sizes in 16-bit words by `frmsizecod`, one row per `fscod`.
/// At 44.1 kHz an odd `frmsizecod` adds one padding word.
const FRAME_SIZE_WORDS: [[u16; 3]; 19] = [
    // 48kHz, 44.1kHz, 32kHz
    [64, 69, 96],
    [80, 87, 120],
    [96, 104, 144],
    [112, 121, 168],
    [128, 139, 192],
    [160, 174, 240],
    [192, 208, 288],
    [224, 243, 336],
    [256, 278, 384],
    [320, 348, 480],
    [384, 417, 576],
    [448, 487, 672],
    [512, 557, 768],
    [640, 696, 960],
    [768, 835, 1152],
    [896, 975, 1344],
    [1024, 1114, 1536],
    [1152, 1253, 1728],
    [1280, 1393, 1920],
];

/// Channel configuration by `acmod`.
const ACMOD_MASKS: [ChannelMask; 8] = [
    MODE_STEREO, // dual mono
    MODE_MONO,
    MODE_STEREO,
    MODE_3_0,
    MODE_2_1,
    MODE_3_1,
    MODE_QUADRO,
    MODE_3_2,
];

lazy_static! {
    /// Big-endian and byte-swapped sync words.
    static ref AC3_SYNC_TRIE: SyncTrie = {
        let mut trie = SyncTrie::value(0x0b77, 16) | SyncTrie::value(0x770b, 16);
        trie.optimize();
        trie
    };
}

/// AC-3 and E-AC-3 frame parser.
///
/// Recognizes both byte orders of the sync word. The two bitstream
/// generations are told apart by `bsid`, which sits at the same bit position
/// in both; frames are reported as `Ac3` or `Eac3` accordingly.
#[derive(Default)]
pub struct Ac3FrameParser;

impl Ac3FrameParser {
    pub fn new() -> Ac3FrameParser {
        Ac3FrameParser
    }
}

fn parse_be_header(hdr: &[u8]) -> Option<FrameInfo> {
    if hdr[0] != 0x0b || hdr[1] != 0x77 {
        return None;
    }

    // bsid sits after the sync word, CRC and frame size fields in AC-3, and
    // after the stream type and frame size fields in E-AC-3: bit 40 either
    // way.
    let bsid = hdr[5] >> 3;
    match bsid {
        0..=8 => parse_ac3(hdr),
        11..=16 => parse_eac3(hdr),
        _ => None,
    }
}

fn parse_ac3(hdr: &[u8]) -> Option<FrameInfo> {
    let mut bs = BitReader::new(&hdr[4..]);

    let fscod = bs.read_bits(2)? as usize;
    let frmsizecod = bs.read_bits(6)? as usize;
    if fscod > 2 || frmsizecod > 37 {
        return None;
    }

    bs.skip_bits(5)?; // bsid
    bs.skip_bits(3)?; // bsmod
    let acmod = bs.read_bits(3)? as usize;

    // The mix level fields are present depending on the channel layout.
    if acmod & 1 != 0 && acmod != 1 {
        bs.skip_bits(2)?; // cmixlev
    }
    if acmod & 4 != 0 {
        bs.skip_bits(2)?; // surmixlev
    }
    let mut relation = Relation::None;
    if acmod == 2 && bs.read_bits(2)? == 2 {
        relation = Relation::Dolby;
    }
    let lfeon = bs.read_bit()?;

    let mut mask = ACMOD_MASKS[acmod];
    if lfeon {
        mask |= ChannelMask::LFE;
    }

    let words = FRAME_SIZE_WORDS[frmsizecod >> 1][fscod]
        + u16::from(fscod == 1 && frmsizecod & 1 != 0);

    Some(FrameInfo {
        spk: Speakers::new(Format::Ac3, mask, SAMPLE_RATES[fscod]).with_relation(relation),
        frame_size: usize::from(words) * 2,
        nsamples: AC3_FRAME_SAMPLES,
        bs_type: BsType::Be16,
        spdif_type: 1,
    })
}

fn parse_eac3(hdr: &[u8]) -> Option<FrameInfo> {
    let mut bs = BitReader::new(&hdr[2..]);

    let strmtyp = bs.read_bits(2)?;
    if strmtyp == 3 {
        return None;
    }
    bs.skip_bits(3)?; // substreamid
    let frmsiz = bs.read_bits(11)? as usize;

    let fscod = bs.read_bits(2)? as usize;
    let (sample_rate, numblks) = if fscod == 3 {
        // Reduced sample rates; six blocks per frame.
        let fscod2 = bs.read_bits(2)? as usize;
        if fscod2 > 2 {
            return None;
        }
        (SAMPLE_RATES[fscod2] / 2, 6)
    }
    else {
        let numblkscod = bs.read_bits(2)? as usize;
        (SAMPLE_RATES[fscod], [1, 2, 3, 6][numblkscod])
    };

    let acmod = bs.read_bits(3)? as usize;
    let lfeon = bs.read_bit()?;

    let mut mask = ACMOD_MASKS[acmod];
    if lfeon {
        mask |= ChannelMask::LFE;
    }

    Some(FrameInfo {
        spk: Speakers::new(Format::Eac3, mask, sample_rate),
        frame_size: (frmsiz + 1) * 2,
        nsamples: numblks * 256,
        bs_type: BsType::Be16,
        spdif_type: 21,
    })
}

/// Parses a header in either byte order, normalizing to big-endian first.
fn parse_any(hdr: &[u8]) -> Option<(FrameInfo, BsType)> {
    if hdr.len() < HEADER_SIZE {
        return None;
    }

    if hdr[0] == 0x0b && hdr[1] == 0x77 {
        return parse_be_header(hdr).map(|fi| (fi, BsType::Be16));
    }

    if hdr[0] == 0x77 && hdr[1] == 0x0b {
        let mut be = [0u8; HEADER_SIZE];
        conv_to_be16(BsType::Le16, hdr, &mut be);
        return parse_be_header(&be).map(|fi| (fi, BsType::Le16));
    }

    None
}

impl FrameParser for Ac3FrameParser {
    fn can_parse(&self, format: Format) -> bool {
        matches!(format, Format::Ac3 | Format::Eac3 | Format::Ac3Eac3 | Format::RawData)
    }

    fn sync_info(&self) -> SyncInfo {
        SyncInfo::new(AC3_SYNC_TRIE.clone(), MIN_FRAME_SIZE, MAX_FRAME_SIZE)
    }

    fn header_size(&self) -> usize {
        HEADER_SIZE
    }

    fn parse_header(&self, hdr: &[u8]) -> Option<FrameInfo> {
        parse_any(hdr).map(|(mut fi, bs_type)| {
            fi.bs_type = bs_type;
            fi
        })
    }

    fn compare_headers(&self, hdr1: &[u8], hdr2: &[u8]) -> bool {
        match (parse_any(hdr1), parse_any(hdr2)) {
            (Some(fi1), Some(fi2)) => fi1 == fi2,
            _ => false,
        }
    }

    fn build_syncinfo(&self, frame: &[u8], info: &FrameInfo) -> SyncInfo {
        // Lock onto the byte order of the running stream.
        let _ = info;
        let mut trie = match frame.first() {
            Some(0x77) => SyncTrie::value(0x770b, 16),
            _ => SyncTrie::value(0x0b77, 16),
        };
        trie.optimize();
        SyncInfo::new(trie, MIN_FRAME_SIZE, MAX_FRAME_SIZE)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use resona_core::parser::StreamBuffer;

    /// Builds a valid AC-3 frame: 48 kHz, stereo, `frmsizecod` 12 (96 kbps,
    /// 384 bytes), padded with zeros.
    pub(crate) fn ac3_frame(param: u8) -> Vec<u8> {
        let mut frame = vec![0u8; 384];
        frame[0] = 0x0b;
        frame[1] = 0x77;
        // crc1 left zero
        frame[4] = 0x0c; // fscod 0, frmsizecod 12
        frame[5] = 0x40; // bsid 8, bsmod 0
        frame[6] = 0x40 | (param & 1) << 2; // acmod 2, dsurmod 0, lfeon
        frame
    }

    #[test]
    fn verify_parse_header() {
        let parser = Ac3FrameParser::new();
        let frame = ac3_frame(0);

        let fi = parser.parse_header(&frame[..8]).unwrap();
        assert_eq!(fi.spk.format, Format::Ac3);
        assert_eq!(fi.spk.mask, MODE_STEREO);
        assert_eq!(fi.spk.sample_rate, 48000);
        assert_eq!(fi.frame_size, 384);
        assert_eq!(fi.nsamples, 1536);
        assert_eq!(fi.bs_type, BsType::Be16);
        assert_eq!(fi.spdif_type, 1);
    }

    #[test]
    fn verify_lfe_flag() {
        let parser = Ac3FrameParser::new();
        let fi = parser.parse_header(&ac3_frame(1)[..8]).unwrap();
        assert!(fi.spk.mask.contains(ChannelMask::LFE));
    }

    #[test]
    fn verify_byte_swapped_header() {
        let parser = Ac3FrameParser::new();
        let frame = ac3_frame(0);
        let swapped: Vec<u8> = frame
            .chunks(2)
            .flat_map(|pair| [pair[1], pair[0]])
            .collect();

        let fi = parser.parse_header(&swapped[..8]).unwrap();
        assert_eq!(fi.bs_type, BsType::Le16);
        assert_eq!(fi.frame_size, 384);
    }

    #[test]
    fn verify_bad_headers() {
        let parser = Ac3FrameParser::new();

        // Wrong sync.
        assert!(parser.parse_header(&[0x0b, 0x78, 0, 0, 0x0c, 0x40, 0x40, 0]).is_none());
        // Invalid fscod.
        assert!(parser.parse_header(&[0x0b, 0x77, 0, 0, 0xcc, 0x40, 0x40, 0]).is_none());
        // Invalid frmsizecod.
        assert!(parser.parse_header(&[0x0b, 0x77, 0, 0, 0x3f, 0x40, 0x40, 0]).is_none());
        // Reserved bsid.
        assert!(parser.parse_header(&[0x0b, 0x77, 0, 0, 0x0c, 0xd0, 0x40, 0]).is_none());
    }

    #[test]
    fn verify_stream_loading() {
        // Three frames of one stream, then two with the LFE flag flipped.
        let mut data = Vec::new();
        for _ in 0..3 {
            data.extend(ac3_frame(0));
        }
        for _ in 0..2 {
            data.extend(ac3_frame(1));
        }

        let mut buf = StreamBuffer::new(Box::new(Ac3FrameParser::new()));
        let mut window = &data[..];
        let mut frames = 0;
        let mut streams = 0;
        while let Some(frame) = buf.load_frame(&mut window) {
            assert_eq!(frame.data.len(), 384);
            frames += 1;
            if frame.new_stream {
                streams += 1;
            }
        }
        assert_eq!(frames, 5);
        assert_eq!(streams, 2);
        assert_eq!(buf.errors(), 0);
    }
}
