// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use log::debug;

use resona_core::audio::{Bytes, Chunk, ChunkData, Format, Speakers, Time};
use resona_core::errors::{protocol_error, Result};
use resona_core::filter::Filter;
use resona_core::parser::{StreamBuffer, StreamEvent};

use crate::frame::PesFrameParser;
use crate::header::PesHeader;

/// Second-stage PES demuxer: consumes a PES byte stream and emits the audio
/// payload with the substream's format.
///
/// Non-audio packets are skipped and counted. The output format follows the
/// classified substream; a substream change is reported as a new stream.
pub struct PesDemux {
    spk: Speakers,
    opened: bool,
    sbuf: StreamBuffer,
    out_spk: Speakers,
    is_new_stream: bool,
    pending_sync: Option<Time>,
    eos: bool,
    skipped: u64,
}

impl Default for PesDemux {
    fn default() -> PesDemux {
        PesDemux {
            spk: Speakers::unknown(),
            opened: false,
            sbuf: StreamBuffer::new(Box::new(PesFrameParser::new())),
            out_spk: Speakers::unknown(),
            is_new_stream: false,
            pending_sync: None,
            eos: false,
            skipped: 0,
        }
    }
}

impl PesDemux {
    pub fn new() -> PesDemux {
        PesDemux::default()
    }

    /// Number of packets without a usable audio payload skipped so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Wraps a parsed payload into the output chunk and updates the stream
    /// bookkeeping. Returns `true` for the caller to forward.
    fn emit(&mut self, payload: Vec<u8>, spk: Speakers, output: &mut Chunk) -> bool {
        self.is_new_stream = spk != self.out_spk;
        if self.is_new_stream {
            debug!("pes: audio substream {}", spk);
            self.out_spk = spk;
        }

        *output = Chunk::raw(Bytes::from_vec(payload));
        if let Some(time) = self.pending_sync.take() {
            *output = std::mem::take(output).with_sync(time);
        }
        true
    }
}

impl Filter for PesDemux {
    fn can_open(&self, spk: &Speakers) -> bool {
        spk.format == Format::Pes
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
            return protocol_error("pes demuxer processed before open");
        }

        if input.sync {
            self.pending_sync = Some(input.time);
        }

        if input.is_eos() {
            // Drain buffered packets, then forward the end of stream.
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
            match self.sbuf.load(&mut window) {
                Some(StreamEvent::Frame(frame)) => {
                    let parsed = PesHeader::parse(frame.data);
                    let consumed = bytes.len() - window.len();
                    match parsed {
                        Some(header) => {
                            let payload =
                                frame.data[header.payload_pos..][..header.payload_size].to_vec();
                            let spk = header.spk;
                            input.advance(consumed);
                            return Ok(self.emit(payload, spk, output));
                        }
                        None => {
                            self.skipped += 1;
                            continue;
                        }
                    }
                }
                Some(StreamEvent::Debris(_)) => {
                    self.skipped += 1;
                    continue;
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
                    if let Some(header) = PesHeader::parse(frame.data) {
                        let payload =
                            frame.data[header.payload_pos..][..header.payload_size].to_vec();
                        let spk = header.spk;
                        return Ok(self.emit(payload, spk, output));
                    }
                    self.skipped += 1;
                }
                Some(StreamEvent::Debris(_)) => {
                    self.skipped += 1;
                }
                None => return Ok(false),
            }
        }
    }

    fn new_stream(&self) -> bool {
        self.is_new_stream
    }
}
