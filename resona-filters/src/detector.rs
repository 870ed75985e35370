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
use resona_core::parser::{MultiFrameParser, StreamBuffer, StreamEvent};
use resona_format_spdif::SpdifFrameParser;
use resona_parsers::{Ac3FrameParser, DtsFrameParser, MpaFrameParser};

/// Detects compressed streams hiding in raw data.
///
/// A declared PCM input implies "not a compressed stream": the detector
/// passes those bytes through untouched. Raw and unknown input runs through
/// a multi-codec parser (S/PDIF, AC-3, DTS, MPEG Audio): synchronized frames
/// come out with the detected format, everything else passes through with
/// the input format, so no byte is lost either way.
pub struct Detector {
    spk: Speakers,
    opened: bool,
    passthrough: bool,
    sbuf: StreamBuffer,
    out_spk: Speakers,
    is_new_stream: bool,
    pending_sync: Option<Time>,
    eos: bool,
}

impl Default for Detector {
    fn default() -> Detector {
        let parser = MultiFrameParser::new(vec![
            Box::new(SpdifFrameParser::new()),
            Box::new(Ac3FrameParser::new()),
            Box::new(DtsFrameParser::new()),
            Box::new(MpaFrameParser::new()),
        ]);
        Detector {
            spk: Speakers::unknown(),
            opened: false,
            passthrough: false,
            sbuf: StreamBuffer::new(Box::new(parser)),
            out_spk: Speakers::unknown(),
            is_new_stream: false,
            pending_sync: None,
            eos: false,
        }
    }
}

impl Detector {
    pub fn new() -> Detector {
        Detector::default()
    }

    fn emit(&mut self, data: Vec<u8>, spk: Speakers, output: &mut Chunk) -> bool {
        self.is_new_stream = spk != self.out_spk;
        if self.is_new_stream {
            debug!("detector: {}", spk);
            self.out_spk = spk;
        }

        *output = Chunk::raw(Bytes::from_vec(data));
        if let Some(time) = self.pending_sync.take() {
            *output = std::mem::take(output).with_sync(time);
        }
        true
    }
}

impl Filter for Detector {
    fn can_open(&self, spk: &Speakers) -> bool {
        spk.is_pcm() || matches!(spk.format, Format::RawData | Format::Unknown | Format::Spdif)
    }

    fn open(&mut self, spk: &Speakers) -> bool {
        if !self.can_open(spk) {
            return false;
        }
        self.spk = spk.clone();
        self.passthrough = spk.is_pcm();
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
        if self.passthrough {
            self.spk.clone()
        }
        else {
            self.out_spk.clone()
        }
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
            return protocol_error("detector processed before open");
        }

        if self.passthrough {
            *output = std::mem::take(input);
            return Ok(!output.is_dummy());
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
            match self.sbuf.load(&mut window) {
                Some(StreamEvent::Frame(frame)) => {
                    let data = frame.data.to_vec();
                    let spk = frame.info.spk.clone();
                    let consumed = bytes.len() - window.len();
                    input.advance(consumed);
                    return Ok(self.emit(data, spk, output));
                }
                Some(StreamEvent::Debris(junk)) => {
                    // Unsynchronized data passes through with the input
                    // format.
                    let data = junk.to_vec();
                    let spk = self.spk.clone();
                    let consumed = bytes.len() - window.len();
                    input.advance(consumed);
                    return Ok(self.emit(data, spk, output));
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
        if self.passthrough {
            return Ok(false);
        }

        match self.sbuf.flush() {
            Some(StreamEvent::Frame(frame)) => {
                let data = frame.data.to_vec();
                let spk = frame.info.spk.clone();
                Ok(self.emit(data, spk, output))
            }
            Some(StreamEvent::Debris(junk)) => {
                let data = junk.to_vec();
                let spk = self.spk.clone();
                Ok(self.emit(data, spk, output))
            }
            None => Ok(false),
        }
    }

    fn new_stream(&self) -> bool {
        self.is_new_stream
    }
}
