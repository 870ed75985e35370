// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::audio::{Chunk, Speakers};
use crate::errors::Result;
use crate::filter::Sink;

/// Accepts any format and discards everything, counting what went by.
#[derive(Default)]
pub struct NullSink {
    spk: Speakers,
    opened: bool,
    chunks: u64,
    size: u64,
}

impl NullSink {
    pub fn new() -> NullSink {
        NullSink::default()
    }

    /// Number of chunks processed since open.
    pub fn chunks(&self) -> u64 {
        self.chunks
    }

    /// Total element count processed since open.
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Sink for NullSink {
    fn can_open(&self, _spk: &Speakers) -> bool {
        true
    }

    fn open(&mut self, spk: &Speakers) -> bool {
        self.spk = spk.clone();
        self.opened = true;
        self.chunks = 0;
        self.size = 0;
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

    fn reset(&mut self) {
        self.chunks = 0;
        self.size = 0;
    }

    fn process(&mut self, chunk: &Chunk) -> Result<()> {
        self.chunks += 1;
        self.size += chunk.size() as u64;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
