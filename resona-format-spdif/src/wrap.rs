// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use log::warn;

use resona_core::audio::{Bytes, Chunk, ChunkData, Format, Speakers, Time, MODE_STEREO};
use resona_core::errors::{protocol_error, Result};
use resona_core::filter::Filter;
use resona_core::parser::{BsType, FrameInfo, MultiFrameParser, StreamBuffer};
use resona_parsers::{Ac3FrameParser, DtsFrameParser, MpaFrameParser};

use crate::{DATA_DTS1, DATA_DTS2, DATA_DTS3, SYNC_PA, SYNC_PB};

/// Encapsulates AC-3, MPEG Audio and DTS elementary frames into IEC 61937
/// bursts.
///
/// Frames are located with the usual frame parsers, so the input may be cut
/// at arbitrary chunk boundaries. A frame that does not fit its burst window
/// (or has no window, like 14-bit DTS) is dropped and counted; a malformed
/// burst is never emitted.
pub struct Spdifer {
    spk: Speakers,
    opened: bool,
    sbuf: StreamBuffer,
    out_spk: Speakers,
    is_new_stream: bool,
    pending_sync: Option<Time>,
    eos: bool,
    dropped: u64,
}

impl Default for Spdifer {
    fn default() -> Spdifer {
        let parser = MultiFrameParser::new(vec![
            Box::new(Ac3FrameParser::new()),
            Box::new(DtsFrameParser::new()),
            Box::new(MpaFrameParser::new()),
        ]);
        Spdifer {
            spk: Speakers::unknown(),
            opened: false,
            sbuf: StreamBuffer::new(Box::new(parser)),
            out_spk: Speakers::unknown(),
            is_new_stream: false,
            pending_sync: None,
            eos: false,
            dropped: 0,
        }
    }
}

impl Spdifer {
    pub fn new() -> Spdifer {
        Spdifer::default()
    }

    /// Number of frames dropped because they cannot be represented as a
    /// burst.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn emit(&mut self, burst: Vec<u8>, spk: Speakers, output: &mut Chunk) -> bool {
        self.is_new_stream = spk != self.out_spk;
        if self.is_new_stream {
            self.out_spk = spk;
        }

        *output = Chunk::raw(Bytes::from_vec(burst));
        if let Some(time) = self.pending_sync.take() {
            *output = std::mem::take(output).with_sync(time);
        }
        true
    }
}

/// The burst data type for a frame, from the payload id and the window size.
fn data_type_of(info: &FrameInfo) -> Option<u16> {
    if info.spdif_type != 0 {
        return Some(info.spdif_type);
    }
    // DTS: the type is defined by the window size.
    match info.nsamples {
        512 => Some(DATA_DTS1),
        1024 => Some(DATA_DTS2),
        2048 => Some(DATA_DTS3),
        _ => None,
    }
}

/// Builds one burst around a frame. `None` when the frame cannot be
/// represented.
fn build_burst(frame: &[u8], info: &FrameInfo) -> Option<Vec<u8>> {
    let data_type = data_type_of(info)?;
    let window = info.nsamples * 4;
    if frame.len() + 8 > window {
        return None;
    }

    let mut out = Vec::with_capacity(window);
    out.extend_from_slice(&SYNC_PA.to_le_bytes());
    out.extend_from_slice(&SYNC_PB.to_le_bytes());
    out.extend_from_slice(&data_type.to_le_bytes());
    out.extend_from_slice(&((frame.len() * 8) as u16).to_le_bytes());

    match info.bs_type {
        BsType::Byte | BsType::Be16 => {
            for pair in frame.chunks(2) {
                let word = if pair.len() == 2 { [pair[1], pair[0]] } else { [0, pair[0]] };
                out.extend_from_slice(&word);
            }
        }
        BsType::Le16 => out.extend_from_slice(frame),
        // The 14-bit layouts would need a payload rewrite.
        BsType::Be14 | BsType::Le14 => return None,
    }

    out.resize(window, 0);
    Some(out)
}

impl Filter for Spdifer {
    fn can_open(&self, spk: &Speakers) -> bool {
        matches!(
            spk.format,
            Format::Ac3 | Format::Ac3Eac3 | Format::Dts | Format::Mpa | Format::RawData
        )
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
            return protocol_error("spdifer processed before open");
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
                    let built = build_burst(frame.data, &frame.info);
                    let consumed = bytes.len() - window.len();
                    match built {
                        Some(burst) => {
                            let mut spk = frame.info.spk.clone();
                            spk.format = Format::Spdif;
                            spk.mask = MODE_STEREO;
                            input.advance(consumed);
                            return Ok(self.emit(burst, spk, output));
                        }
                        None => {
                            warn!("spdifer: dropping a frame with no burst representation");
                            self.dropped += 1;
                            continue;
                        }
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
                Some(resona_core::parser::StreamEvent::Frame(frame)) => {
                    if let Some(burst) = build_burst(frame.data, &frame.info) {
                        let mut spk = frame.info.spk.clone();
                        spk.format = Format::Spdif;
                        spk.mask = MODE_STEREO;
                        return Ok(self.emit(burst, spk, output));
                    }
                    self.dropped += 1;
                }
                Some(resona_core::parser::StreamEvent::Debris(_)) => (),
                None => return Ok(false),
            }
        }
    }

    fn new_stream(&self) -> bool {
        self.is_new_stream
    }
}
