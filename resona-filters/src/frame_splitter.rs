// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use resona_core::audio::{Bytes, Chunk, ChunkData, Speakers, Time};
use resona_core::errors::{protocol_error, Result};
use resona_core::filter::Filter;
use resona_core::parser::{FrameParser, StreamBuffer, StreamEvent};

/// Filter adapter over a [`StreamBuffer`]: raw byte input in, frame-aligned
/// chunks out.
///
/// Output chunks carry the format derived from the frame headers; a header
/// parameter change is reported as a new stream. Debris is dropped and
/// counted. Time stamps are forwarded to the next frame boundary.
pub struct FrameSplitter {
    spk: Speakers,
    opened: bool,
    sbuf: StreamBuffer,
    out_spk: Speakers,
    is_new_stream: bool,
    pending_sync: Option<Time>,
    eos: bool,
    debris: u64,
}

impl FrameSplitter {
    pub fn new(parser: Box<dyn FrameParser>) -> FrameSplitter {
        FrameSplitter {
            spk: Speakers::unknown(),
            opened: false,
            sbuf: StreamBuffer::new(parser),
            out_spk: Speakers::unknown(),
            is_new_stream: false,
            pending_sync: None,
            eos: false,
            debris: 0,
        }
    }

    /// Bytes dropped as debris so far.
    pub fn debris(&self) -> u64 {
        self.debris
    }

    /// Sync candidate rejects seen by the stream buffer.
    pub fn errors(&self) -> u64 {
        self.sbuf.errors()
    }

    fn emit(&mut self, frame: Vec<u8>, spk: Speakers, new_stream: bool, output: &mut Chunk) {
        self.is_new_stream = new_stream || spk != self.out_spk;
        self.out_spk = spk;

        *output = Chunk::raw(Bytes::from_vec(frame));
        if let Some(time) = self.pending_sync.take() {
            *output = std::mem::take(output).with_sync(time);
        }
    }
}

impl Filter for FrameSplitter {
    fn can_open(&self, spk: &Speakers) -> bool {
        self.sbuf.parser().can_parse(spk.format)
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
            return protocol_error("frame splitter processed before open");
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
                    let new_stream = frame.new_stream;
                    let consumed = bytes.len() - window.len();
                    input.advance(consumed);
                    self.emit(data, spk, new_stream, output);
                    return Ok(true);
                }
                Some(StreamEvent::Debris(junk)) => {
                    self.debris += junk.len() as u64;
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
                    let data = frame.data.to_vec();
                    let spk = frame.info.spk.clone();
                    let new_stream = frame.new_stream;
                    self.emit(data, spk, new_stream, output);
                    return Ok(true);
                }
                Some(StreamEvent::Debris(junk)) => {
                    self.debris += junk.len() as u64;
                }
                None => return Ok(false),
            }
        }
    }

    fn new_stream(&self) -> bool {
        self.is_new_stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resona_core::audio::{Format, MODE_STEREO};
    use resona_parsers::MpaFrameParser;

    /// An MPEG1 layer 2 frame: 48 kHz, stereo, 192 kbps, 576 bytes.
    fn mpa_frame() -> Vec<u8> {
        let mut frame = vec![0u8; 576];
        frame[0] = 0xff;
        frame[1] = 0xfd;
        frame[2] = 0xa4;
        frame
    }

    #[test]
    fn verify_frames_out() {
        let mut data = vec![0x55u8; 100]; // junk prefix
        for _ in 0..3 {
            data.extend(mpa_frame());
        }

        let mut splitter = FrameSplitter::new(Box::new(MpaFrameParser::new()));
        assert!(splitter.open(&Speakers::new(Format::Mpa, MODE_STEREO, 48000)));

        let mut input = Chunk::raw(Bytes::from_vec(data)).with_sync(0.5);
        let mut output = Chunk::dummy();

        let mut frames = 0;
        while splitter.process(&mut input, &mut output).unwrap() {
            frames += 1;
            assert_eq!(output.size(), 576);
            if frames == 1 {
                // The first frame opens the stream and carries the stamp.
                assert!(splitter.new_stream());
                assert!(output.sync);
                assert_eq!(output.time, 0.5);
                assert_eq!(splitter.get_output().format, Format::Mpa);
                assert_eq!(splitter.get_output().sample_rate, 48000);
            }
            else {
                assert!(!splitter.new_stream());
            }
        }

        assert_eq!(frames, 3);
        assert_eq!(splitter.debris(), 100);
    }

    #[test]
    fn verify_rejects_unrelated_formats() {
        let splitter = FrameSplitter::new(Box::new(MpaFrameParser::new()));
        assert!(!splitter.can_open(&Speakers::new(Format::Linear, MODE_STEREO, 48000)));
        assert!(splitter.can_open(&Speakers::new(Format::RawData, MODE_STEREO, 48000)));
    }
}
