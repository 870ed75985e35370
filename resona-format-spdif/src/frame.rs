// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use lazy_static::lazy_static;

use resona_core::audio::bitstream::conv_to_be16;
use resona_core::audio::{Format, Speakers, MODE_STEREO};
use resona_core::parser::{BsType, FrameInfo, FrameParser, SyncInfo, SyncTrie};
use resona_parsers::{Ac3FrameParser, DtsFrameParser, MpaFrameParser};

use crate::{DATA_AC3, DATA_DTS1, DATA_DTS2, DATA_DTS3, DATA_MPA_L1, DATA_MPA_L23, SYNC_PA,
            SYNC_PB};

/// Enough for the burst header and the longest inner codec header.
const HEADER_SIZE: usize = 32;
/// The smallest window: an MPEG layer 1 frame of 384 samples.
const MIN_FRAME_SIZE: usize = 384 * 4;
/// The largest window: a DTS type III burst of 2048 samples.
const MAX_FRAME_SIZE: usize = 2048 * 4;

lazy_static! {
    /// The burst preamble in stream byte order.
    static ref SPDIF_SYNC_TRIE: SyncTrie = {
        let mut trie = SyncTrie::value(0x72f8_1f4e, 32);
        trie.optimize();
        trie
    };
}

/// IEC 61937 burst parser.
///
/// The derived format keeps `Spdif` as the outer format; the inner codec's
/// channel mask and sample rate are taken from the payload header, and the
/// payload identifier lands in `spdif_type`.
///
/// AC-3 and MPEG Audio windows have a size fixed by the data type, so their
/// bursts are framed by size. DTS windows are located by scanning for the
/// next burst, which is also why a truncated DTS tail burst cannot be
/// loaded.
#[derive(Default)]
pub struct SpdifFrameParser;

impl SpdifFrameParser {
    pub fn new() -> SpdifFrameParser {
        SpdifFrameParser
    }
}

/// Samples per window by data type.
fn window_samples(data_type: u16) -> Option<usize> {
    match data_type {
        DATA_AC3 => Some(1536),
        DATA_MPA_L1 => Some(384),
        DATA_MPA_L23 => Some(1152),
        DATA_DTS1 => Some(512),
        DATA_DTS2 => Some(1024),
        DATA_DTS3 => Some(2048),
        _ => None,
    }
}

pub(crate) fn parse_burst(hdr: &[u8]) -> Option<(u16, usize)> {
    if hdr.len() < 8 {
        return None;
    }
    if u16::from_le_bytes([hdr[0], hdr[1]]) != SYNC_PA
        || u16::from_le_bytes([hdr[2], hdr[3]]) != SYNC_PB
    {
        return None;
    }

    let pc = u16::from_le_bytes([hdr[4], hdr[5]]);
    let pd = u16::from_le_bytes([hdr[6], hdr[7]]);
    let data_type = pc & 0x1f;
    let payload_size = usize::from(pd) / 8;
    Some((data_type, payload_size))
}

fn parse_any(hdr: &[u8]) -> Option<FrameInfo> {
    let (data_type, payload_size) = parse_burst(hdr)?;
    let nsamples = window_samples(data_type)?;
    if payload_size == 0 || payload_size + 8 > nsamples * 4 {
        return None;
    }

    // The payload is byte-swapped; normalize its head and let the inner
    // codec parser derive mask and sample rate.
    let mut inner = [0u8; HEADER_SIZE - 8];
    conv_to_be16(BsType::Le16, &hdr[8..], &mut inner);

    let inner_info = match data_type {
        DATA_AC3 => Ac3FrameParser::new().parse_header(&inner),
        DATA_MPA_L1 | DATA_MPA_L23 => MpaFrameParser::new().parse_header(&inner),
        _ => DtsFrameParser::new().parse_header(&inner),
    }?;

    // DTS windows are not reliable; those bursts end at the next sync.
    let frame_size = match data_type {
        DATA_DTS1 | DATA_DTS2 | DATA_DTS3 => 0,
        _ => nsamples * 4,
    };

    let mut spk = Speakers::new(Format::Spdif, MODE_STEREO, inner_info.spk.sample_rate);
    spk.mask = inner_info.spk.mask;
    spk.relation = inner_info.spk.relation;

    Some(FrameInfo { spk, frame_size, nsamples, bs_type: BsType::Le16, spdif_type: data_type })
}

impl FrameParser for SpdifFrameParser {
    fn can_parse(&self, format: Format) -> bool {
        matches!(format, Format::Spdif | Format::RawData)
    }

    fn sync_info(&self) -> SyncInfo {
        SyncInfo::new(SPDIF_SYNC_TRIE.clone(), MIN_FRAME_SIZE, MAX_FRAME_SIZE)
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
                fi1.spk == fi2.spk && fi1.spdif_type == fi2.spdif_type
            }
            _ => false,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use resona_core::parser::StreamBuffer;

    /// Builds a valid AC-3 frame: 48 kHz, stereo, 384 bytes.
    pub(crate) fn ac3_frame() -> Vec<u8> {
        let mut frame = vec![0u8; 384];
        frame[0] = 0x0b;
        frame[1] = 0x77;
        frame[4] = 0x0c; // fscod 0, frmsizecod 12
        frame[5] = 0x40; // bsid 8, bsmod 0
        frame[6] = 0x40; // acmod 2
        frame
    }

    /// Wraps an elementary frame into a burst window by hand.
    pub(crate) fn burst(data_type: u16, payload_be: &[u8], window_bytes: usize) -> Vec<u8> {
        assert!(payload_be.len() + 8 <= window_bytes);
        let mut out = Vec::with_capacity(window_bytes);
        out.extend_from_slice(&SYNC_PA.to_le_bytes());
        out.extend_from_slice(&SYNC_PB.to_le_bytes());
        out.extend_from_slice(&data_type.to_le_bytes());
        out.extend_from_slice(&((payload_be.len() as u16) * 8).to_le_bytes());
        for pair in payload_be.chunks(2) {
            let word = if pair.len() == 2 { [pair[1], pair[0]] } else { [0, pair[0]] };
            out.extend_from_slice(&word);
        }
        out.resize(window_bytes, 0);
        out
    }

    #[test]
    fn verify_burst_parsing() {
        let frame = ac3_frame();
        let data = burst(DATA_AC3, &frame, 1536 * 4);

        let parser = SpdifFrameParser::new();
        let fi = parser.parse_header(&data[..HEADER_SIZE]).unwrap();
        assert_eq!(fi.spk.format, Format::Spdif);
        assert_eq!(fi.spk.sample_rate, 48000);
        assert_eq!(fi.spk.mask, MODE_STEREO);
        assert_eq!(fi.frame_size, 1536 * 4);
        assert_eq!(fi.nsamples, 1536);
        assert_eq!(fi.spdif_type, DATA_AC3);
    }

    #[test]
    fn verify_bad_bursts() {
        let parser = SpdifFrameParser::new();

        // Wrong preamble.
        let mut data = burst(DATA_AC3, &ac3_frame(), 1536 * 4);
        data[0] = 0x73;
        assert!(parser.parse_header(&data[..HEADER_SIZE]).is_none());

        // Unknown data type.
        let data = burst(20, &ac3_frame(), 1536 * 4);
        assert!(parser.parse_header(&data[..HEADER_SIZE]).is_none());
    }

    #[test]
    fn verify_stream_loading() {
        let frame = ac3_frame();
        let mut data = Vec::new();
        for _ in 0..4 {
            data.extend(burst(DATA_AC3, &frame, 1536 * 4));
        }

        let mut buf = StreamBuffer::new(Box::new(SpdifFrameParser::new()));
        let mut window = &data[..];
        let mut frames = 0;
        while let Some(frame) = buf.load_frame(&mut window) {
            assert_eq!(frame.data.len(), 1536 * 4);
            frames += 1;
        }
        assert_eq!(frames, 4);
    }
}
