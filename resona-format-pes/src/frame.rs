// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use lazy_static::lazy_static;

use resona_core::audio::{ChannelMask, Format, Speakers};
use resona_core::parser::{BsType, FrameInfo, FrameParser, SyncInfo, SyncTrie};

const HEADER_SIZE: usize = 6;
const MIN_FRAME_SIZE: usize = 6;
const MAX_FRAME_SIZE: usize = 65536 + 6;

lazy_static! {
    /// The 24-bit start code followed by a stream number of 0xb9 or above.
    static ref PES_SYNC_TRIE: SyncTrie = {
        let mut stream = SyncTrie::empty();
        for value in 0xb9..=0xffu32 {
            stream |= SyncTrie::value(value, 8);
        }
        let mut trie = SyncTrie::value(0x000001, 24) + stream;
        trie.optimize();
        trie
    };
}

/// PES packet-layer frame parser.
///
/// Frames whole packets using the start code and the packet length field
/// only. The frame parser checks just the stream number: locating a
/// substream needs more header bytes than the smallest legal packet has, so
/// substream classification belongs to the second stage ([`PesDemux`]).
///
/// [`PesDemux`]: crate::PesDemux
#[derive(Default)]
pub struct PesFrameParser;

impl PesFrameParser {
    pub fn new() -> PesFrameParser {
        PesFrameParser
    }
}

fn parse_any(hdr: &[u8]) -> Option<FrameInfo> {
    if hdr.len() < HEADER_SIZE {
        return None;
    }
    if hdr[0] != 0 || hdr[1] != 0 || hdr[2] != 1 || hdr[3] < 0xb9 {
        return None;
    }

    let packet_size = (usize::from(hdr[4]) << 8 | usize::from(hdr[5])) + 6;

    Some(FrameInfo {
        spk: Speakers::new(Format::Pes, ChannelMask::empty(), 0),
        frame_size: packet_size,
        nsamples: 0,
        bs_type: BsType::Byte,
        spdif_type: 0,
    })
}

impl FrameParser for PesFrameParser {
    fn can_parse(&self, format: Format) -> bool {
        matches!(format, Format::Pes | Format::RawData)
    }

    fn sync_info(&self) -> SyncInfo {
        SyncInfo::new(PES_SYNC_TRIE.clone(), MIN_FRAME_SIZE, MAX_FRAME_SIZE)
    }

    fn header_size(&self) -> usize {
        HEADER_SIZE
    }

    fn parse_header(&self, hdr: &[u8]) -> Option<FrameInfo> {
        parse_any(hdr)
    }

    fn compare_headers(&self, hdr1: &[u8], hdr2: &[u8]) -> bool {
        // Only the stream number: packet sizes vary packet to packet.
        match (parse_any(hdr1), parse_any(hdr2)) {
            (Some(_), Some(_)) => hdr1[3] == hdr2[3],
            _ => false,
        }
    }

    fn build_syncinfo(&self, frame: &[u8], info: &FrameInfo) -> SyncInfo {
        // Include the stream number into the sync word.
        let _ = info;
        let sync = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]);
        let mut trie = SyncTrie::value(sync, 32);
        trie.optimize();
        SyncInfo::new(trie, MIN_FRAME_SIZE, MAX_FRAME_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resona_core::parser::StreamBuffer;

    #[test]
    fn verify_parse_header() {
        let parser = PesFrameParser::new();

        // Private stream 1 with a one-byte packet body.
        let fi = parser.parse_header(&[0x00, 0x00, 0x01, 0xbd, 0x00, 0x01]).unwrap();
        assert_eq!(fi.spk.format, Format::Pes);
        assert_eq!(fi.frame_size, 7);
        assert_eq!(fi.nsamples, 0);
    }

    #[test]
    fn verify_stream_number_bounds() {
        let parser = PesFrameParser::new();

        assert!(parser.parse_header(&[0x00, 0x00, 0x01, 0xb9, 0x00, 0x01]).is_some());
        assert!(parser.parse_header(&[0x00, 0x00, 0x01, 0xff, 0x00, 0x01]).is_some());
        // Below the system range.
        assert!(parser.parse_header(&[0x00, 0x00, 0x01, 0xb8, 0x00, 0x01]).is_none());
        // Not a start code.
        assert!(parser.parse_header(&[0x00, 0x00, 0x02, 0xbd, 0x00, 0x01]).is_none());
    }

    #[test]
    fn verify_trie_matches_stream_range() {
        let trie = PesFrameParser::new().sync_info().sync_trie;
        assert!(trie.matches(&[0x00, 0x00, 0x01, 0xbd]));
        assert!(trie.matches(&[0x00, 0x00, 0x01, 0xc0]));
        assert!(!trie.matches(&[0x00, 0x00, 0x01, 0x05]));
        assert!(!trie.matches(&[0x00, 0x01, 0x01, 0xbd]));
    }

    #[test]
    fn verify_packet_loading() {
        // Three small packets of one audio stream.
        let mut data = Vec::new();
        for payload_len in [32u16, 48, 16] {
            data.extend_from_slice(&[0x00, 0x00, 0x01, 0xc0]);
            data.extend_from_slice(&payload_len.to_be_bytes());
            data.extend(std::iter::repeat(0x11).take(usize::from(payload_len)));
        }

        let mut buf = StreamBuffer::new(Box::new(PesFrameParser::new()));
        let mut window = &data[..];
        let mut sizes = Vec::new();
        while let Some(frame) = buf.load_frame(&mut window) {
            sizes.push(frame.data.len());
        }
        assert_eq!(sizes, vec![38, 54, 22]);
    }
}
