// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::audio::{Chunk, ChunkData, Speakers};
use crate::errors::Result;
use crate::filter::Sink;

/// Writes raw data chunks to a file as-is.
pub struct RawSink {
    file: File,
    spk: Speakers,
    opened: bool,
}

impl RawSink {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<RawSink> {
        Ok(RawSink { file: File::create(path)?, spk: Speakers::unknown(), opened: false })
    }
}

impl Sink for RawSink {
    fn can_open(&self, spk: &Speakers) -> bool {
        // Anything but linear data has a byte representation.
        !spk.is_linear() && !spk.is_unknown()
    }

    fn open(&mut self, spk: &Speakers) -> bool {
        if !self.can_open(spk) {
            return false;
        }
        self.spk = spk.clone();
        self.opened = true;
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

    fn reset(&mut self) {}

    fn process(&mut self, chunk: &Chunk) -> Result<()> {
        if let ChunkData::Raw(data) = &chunk.data {
            self.file.write_all(data)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}
