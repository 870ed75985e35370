// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use resona_core::audio::bitstream::conv_to_be16;
use resona_core::audio::{Bytes, Chunk, ChunkData, Format, Speakers, Time};
use resona_core::errors::{protocol_error, Result};
use resona_core::filter::Filter;
use resona_core::parser::{StreamBuffer, StreamEvent};

use crate::frame::{parse_burst, SpdifFrameParser};
use crate::{DATA_AC3, DATA_MPA_L1, DATA_MPA_L23};

/// Extracts the elementary stream out of an IEC 61937 stream.
///
/// Each burst's payload is byte-swapped back to its natural byte order and
/// emitted with the inner codec's format; the burst header and the zero
/// padding are stripped.
pub struct Despdifer {
    spk: Speakers,
    opened: bool,
    sbuf: StreamBuffer,
    out_spk: Speakers,
    is_new_stream: bool,
    pending_sync: Option<Time>,
    eos: bool,
}

impl Default for Despdifer {
    fn default() -> Despdifer {
        Despdifer {
            spk: Speakers::unknown(),
            opened: false,
            sbuf: StreamBuffer::new(Box::new(SpdifFrameParser::new())),
            out_spk: Speakers::unknown(),
            is_new_stream: false,
            pending_sync: None,
            eos: false,
        }
    }
}

impl Despdifer {
    pub fn new() -> Despdifer {
        Despdifer::default()
    }

    fn emit(&mut self, payload: Vec<u8>, spk: Speakers, output: &mut Chunk) -> bool {
        self.is_new_stream = spk != self.out_spk;
        if self.is_new_stream {
            self.out_spk = spk;
        }

        *output = Chunk::raw(Bytes::from_vec(payload));
        if let Some(time) = self.pending_sync.take() {
            *output = std::mem::take(output).with_sync(time);
        }
        true
    }
}

/// The payload of a burst, restored to its natural byte order, and its
/// format.
fn unwrap_burst(data: &[u8], spk: &Speakers, spdif_type: u16) -> Option<(Vec<u8>, Speakers)> {
    let (data_type, payload_size) = parse_burst(data)?;
    debug_assert_eq!(data_type, spdif_type);
    if 8 + payload_size > data.len() {
        return None;
    }

    let format = match data_type {
        DATA_AC3 => Format::Ac3,
        DATA_MPA_L1 | DATA_MPA_L23 => Format::Mpa,
        _ => Format::Dts,
    };

    // Restore the 16-bit little-endian payload to a plain byte stream.
    let mut payload = vec![0u8; payload_size + 1 & !1];
    let n = conv_to_be16(
        resona_core::parser::BsType::Le16,
        &data[8..8 + (payload_size + 1 & !1)],
        &mut payload,
    );
    payload.truncate(n.min(payload_size));

    let mut out_spk = spk.clone();
    out_spk.format = format;
    Some((payload, out_spk))
}

impl Filter for Despdifer {
    fn can_open(&self, spk: &Speakers) -> bool {
        matches!(spk.format, Format::Spdif | Format::RawData)
    }

    fn open(&mut self, spk: &Speakers) -> bool {
        if !self.can_open(spk) {
            return false;
        }
        self.spk = spk.clone();
        self.opened = true;
        self.reset();
        true
    }

    fn close(&mut self) {
        self.opened = false;
        self.spk = Speakers::unknown();
    }

    fn is_open(&self) -> bool {
        self.opened
    }

    fn get_input(&self) -> Speakers {
        self.spk.clone()
    }

    fn get_output(&self) -> Speakers {
        self.out_spk.clone()
    }

    fn reset(&mut self) {
        self.sbuf.reset();
        self.out_spk = Speakers::unknown();
        self.is_new_stream = false;
        self.pending_sync = None;
        self.eos = false;
    }

    fn process(&mut self, input: &mut Chunk, output: &mut Chunk) -> Result<bool> {
        if !self.opened {
            return protocol_error("despdifer processed before open");
        }

        if input.sync {
            self.pending_sync = Some(input.time);
        }

        if input.is_eos() {
            input.clear();
            self.eos = true;
        }

        if self.eos {
            if self.flush(output)? {
                return Ok(true);
            }
            self.eos = false;
            *output = Chunk::eos(self.pending_sync.take().unwrap_or(0.0));
            self.is_new_stream = false;
            return Ok(true);
        }

        let bytes = match &input.data {
            ChunkData::Raw(bytes) => bytes.clone(),
            _ => {
                input.clear();
                return Ok(false);
            }
        };

        let mut window: &[u8] = &bytes;
        loop {
            match self.sbuf.load_frame(&mut window) {
                Some(frame) => {
                    let unwrapped =
                        unwrap_burst(frame.data, &frame.info.spk, frame.info.spdif_type);
                    let consumed = bytes.len() - window.len();
                    if let Some((payload, spk)) = unwrapped {
                        input.advance(consumed);
                        return Ok(self.emit(payload, spk, output));
                    }
                }
                None => {
                    input.advance(bytes.len());
                    input.clear();
                    return Ok(false);
                }
            }
        }
    }

    fn flush(&mut self, output: &mut Chunk) -> Result<bool> {
        loop {
            match self.sbuf.flush() {
                Some(StreamEvent::Frame(frame)) => {
                    if let Some((payload, spk)) =
                        unwrap_burst(frame.data, &frame.info.spk, frame.info.spdif_type)
                    {
                        return Ok(self.emit(payload, spk, output));
                    }
                }
                Some(StreamEvent::Debris(_)) => (),
                None => return Ok(false),
            }
        }
    }

    fn new_stream(&self) -> bool {
        self.is_new_stream
    }
}
