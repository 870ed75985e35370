// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use resona_core::audio::{
    ChannelMask, Format, Speakers, MODE_3_1, MODE_3_2, MODE_5_1, MODE_MONO, MODE_QUADRO,
    MODE_STEREO,
};

pub(crate) const PRIVATE_STREAM_1: u8 = 0xbd;
const PRIVATE_STREAM_2: u8 = 0xbf;
const MPEG1_MAX_STUFFING: usize = 24;

/// LPCM channel codes; the value is the channel count minus one.
const LPCM_MASKS: [Option<ChannelMask>; 8] = [
    Some(MODE_MONO),
    Some(MODE_STEREO),
    Some(MODE_3_1),
    Some(MODE_QUADRO),
    Some(MODE_3_2),
    Some(MODE_5_1),
    None,
    None,
];

/// A fully parsed PES packet header: stream and substream numbers, the
/// classified payload format, and where the payload lives.
#[derive(Clone, Debug)]
pub struct PesHeader {
    pub packet_size: usize,
    pub stream: u8,
    pub substream: u8,
    pub spk: Speakers,
    pub payload_pos: usize,
    pub payload_size: usize,
}

impl PesHeader {
    /// True for stream numbers that may carry audio.
    pub fn is_audio_stream(stream: u8) -> bool {
        stream & 0xe0 == 0xc0 || stream == PRIVATE_STREAM_1
    }

    /// Parses a whole packet. Returns `None` for packets that do not carry a
    /// recognizable audio payload.
    pub fn parse(data: &[u8]) -> Option<PesHeader> {
        if data.len() < 7 {
            return None;
        }
        if data[0] != 0 || data[1] != 0 || data[2] != 1 || data[3] < 0xb9 {
            return None;
        }

        let stream = data[3];
        let packet_size = (usize::from(data[4]) << 8 | usize::from(data[5])) + 6;

        let mut pos = 6;
        if stream != PRIVATE_STREAM_2 {
            if data[pos] & 0xc0 == 0x80 {
                // MPEG-2: a fixed-layout extension carries its own length.
                if data.len() < 9 {
                    return None;
                }
                pos = usize::from(data[8]) + 9;
            }
            else {
                // MPEG-1: stuffing bytes, then the optional STD buffer size
                // and time stamp fields.
                while pos < data.len() && data[pos] == 0xff && pos < MPEG1_MAX_STUFFING {
                    pos += 1;
                }
                if pos >= MPEG1_MAX_STUFFING || pos >= data.len() {
                    return None;
                }

                if data[pos] & 0xc0 == 0x40 {
                    pos += 2;
                }
                if pos >= data.len() {
                    return None;
                }

                if data[pos] & 0xf0 == 0x20 {
                    pos += 5; // PTS
                }
                else if data[pos] & 0xf0 == 0x30 {
                    pos += 10; // PTS and DTS
                }
                else if data[pos] == 0x0f {
                    pos += 1;
                }
                else {
                    return None;
                }
            }
        }

        let mut substream = 0;
        let mut substream_header_pos = 0;
        if stream == PRIVATE_STREAM_1 {
            if pos >= data.len() {
                return None;
            }
            substream = data[pos];
            pos += 1;
            substream_header_pos = pos;
            pos += 3; // frame count and first access unit pointer
        }

        if pos > data.len() {
            return None;
        }
        let spk = classify(stream, substream, &data[substream_header_pos..])?;

        if matches!(spk.format, Format::Pcm16Be | Format::Lpcm20 | Format::Lpcm24) {
            pos += 3; // audio frame and sample attribute bytes
        }

        if pos > data.len() || pos >= packet_size {
            return None;
        }

        Some(PesHeader {
            packet_size,
            stream,
            substream,
            spk,
            payload_pos: pos,
            payload_size: packet_size - pos,
        })
    }
}

/// Derives the payload format from the stream and substream numbers, and for
/// LPCM from the sample attribute byte of the substream header.
fn classify(stream: u8, substream: u8, subheader: &[u8]) -> Option<Speakers> {
    if stream & 0xe0 == 0xc0 {
        return Some(Speakers::new(Format::Mpa, ChannelMask::empty(), 0));
    }

    match substream & 0xf8 {
        0x80 => Some(Speakers::new(Format::Ac3, ChannelMask::empty(), 0)),
        0x88 => Some(Speakers::new(Format::Dts, ChannelMask::empty(), 0)),
        0xa0 => {
            // MPEG LPCM is big-endian on disk.
            if subheader.len() < 5 {
                return None;
            }
            let attr = subheader[4];

            let format = match attr >> 6 {
                0 => Format::Pcm16Be,
                1 => Format::Lpcm20,
                2 => Format::Lpcm24,
                _ => return None,
            };
            let mask = LPCM_MASKS[usize::from(attr & 7)]?;
            let sample_rate = match attr >> 4 & 3 {
                0 => 48000,
                1 => 96000,
                _ => return None,
            };

            Some(Speakers::new(format, mask, sample_rate))
        }
        _ => None,
    }
}
