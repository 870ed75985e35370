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

const HEADER_SIZE: usize = 16;
const MIN_FRAME_SIZE: usize = 96;
const MAX_FRAME_SIZE: usize = 16384;

/// DTS core sample rates by `sfreq`.
const SAMPLE_RATES: [u32; 16] = [
    0, 8000, 16000, 32000, 0, 0, 11025, 22050, 44100, 0, 0, 12000, 24000, 48000, 0, 0,
];

/// The four sync patterns: one per bitstream word layout.
const SYNC_16BE: u32 = 0x7ffe_8001;
const SYNC_16LE: u32 = 0xfe7f_0180;
const SYNC_14BE: u32 = 0x1fff_e800;
const SYNC_14LE: u32 = 0xff1f_00e8;

lazy_static! {
    static ref DTS_SYNC_TRIE: SyncTrie = {
        let mut trie = SyncTrie::value(SYNC_16BE, 32)
            | SyncTrie::value(SYNC_16LE, 32)
            | SyncTrie::value(SYNC_14BE, 32)
            | SyncTrie::value(SYNC_14LE, 32);
        trie.optimize();
        trie
    };
}

/// DTS core frame parser.
///
/// Handles all four word layouts (16-bit and 14-bits-in-16, both byte
/// orders) by normalizing the header to 16-bit big-endian before parsing.
/// After the first frame the sync narrows to the one layout in use.
#[derive(Default)]
pub struct DtsFrameParser;

impl DtsFrameParser {
    pub fn new() -> DtsFrameParser {
        DtsFrameParser
    }
}

fn bs_type_of(hdr: &[u8]) -> Option<BsType> {
    let sync = u32::from_be_bytes([hdr[0], hdr[1], hdr[2], hdr[3]]);
    match sync {
        SYNC_16BE => Some(BsType::Be16),
        SYNC_16LE => Some(BsType::Le16),
        SYNC_14BE => Some(BsType::Be14),
        SYNC_14LE => Some(BsType::Le14),
        _ => None,
    }
}

/// Channel configuration by `amode`. Only the standard layouts are
/// recognized; user-defined layouts are rejected.
fn amode_mask(amode: u32) -> Option<(ChannelMask, Relation)> {
    match amode {
        0 => Some((MODE_MONO, Relation::None)),
        1 | 2 => Some((MODE_STEREO, Relation::None)),
        3 => Some((MODE_STEREO, Relation::SumDiff)),
        4 => Some((MODE_STEREO, Relation::Dolby)),
        5 => Some((MODE_3_0, Relation::None)),
        6 => Some((MODE_2_1, Relation::None)),
        7 => Some((MODE_3_1, Relation::None)),
        8 => Some((MODE_QUADRO, Relation::None)),
        9 => Some((MODE_3_2, Relation::None)),
        _ => None,
    }
}

fn parse_normalized(be: &[u8], bs_type: BsType) -> Option<FrameInfo> {
    let mut bs = BitReader::new(&be[4..]);

    bs.skip_bits(1)?; // ftype
    bs.skip_bits(5)?; // short
    bs.skip_bits(1)?; // cpf
    let nblks = bs.read_bits(7)? as usize;
    if nblks < 5 {
        return None;
    }
    let fsize = bs.read_bits(14)? as usize;
    if fsize < 95 {
        return None;
    }
    let amode = bs.read_bits(6)?;
    let sfreq = bs.read_bits(4)? as usize;
    bs.skip_bits(5)?; // rate

    let sample_rate = SAMPLE_RATES[sfreq];
    if sample_rate == 0 {
        return None;
    }
    let (mask, relation) = amode_mask(amode)?;

    // fsize counts bytes of the 16-bit form; the 14-bit layouts carry two
    // padding bits per word on the wire.
    let frame_size = match bs_type {
        BsType::Be14 | BsType::Le14 => ((fsize + 1) * 8 / 7) & !1,
        _ => fsize + 1,
    };

    Some(FrameInfo {
        spk: Speakers::new(Format::Dts, mask, sample_rate).with_relation(relation),
        frame_size,
        nsamples: (nblks + 1) * 32,
        bs_type,
        spdif_type: 0,
    })
}

fn parse_any(hdr: &[u8]) -> Option<FrameInfo> {
    if hdr.len() < HEADER_SIZE {
        return None;
    }
    let bs_type = bs_type_of(hdr)?;

    match bs_type {
        BsType::Be16 => parse_normalized(hdr, bs_type),
        _ => {
            let mut be = [0u8; HEADER_SIZE];
            conv_to_be16(bs_type, hdr, &mut be);
            parse_normalized(&be, bs_type)
        }
    }
}

impl FrameParser for DtsFrameParser {
    fn can_parse(&self, format: Format) -> bool {
        matches!(format, Format::Dts | Format::RawData)
    }

    fn sync_info(&self) -> SyncInfo {
        SyncInfo::new(DTS_SYNC_TRIE.clone(), MIN_FRAME_SIZE, MAX_FRAME_SIZE)
    }

    fn header_size(&self) -> usize {
        HEADER_SIZE
    }

    fn parse_header(&self, hdr: &[u8]) -> Option<FrameInfo> {
        parse_any(hdr)
    }

    fn compare_headers(&self, hdr1: &[u8], hdr2: &[u8]) -> bool {
        match (parse_any(hdr1), parse_any(hdr2)) {
            (Some(fi1), Some(fi2)) => fi1 == fi2,
            _ => false,
        }
    }

    fn build_syncinfo(&self, frame: &[u8], info: &FrameInfo) -> SyncInfo {
        // Lock onto the word layout of the running stream.
        let sync = match info.bs_type {
            BsType::Be16 => SYNC_16BE,
            BsType::Le16 => SYNC_16LE,
            BsType::Be14 => SYNC_14BE,
            BsType::Le14 => SYNC_14LE,
            BsType::Byte => return self.sync_info(),
        };
        let _ = frame;
        let mut trie = SyncTrie::value(sync, 32);
        trie.optimize();
        SyncInfo::new(trie, MIN_FRAME_SIZE, MAX_FRAME_SIZE)
    }
}
