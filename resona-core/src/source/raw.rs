// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::audio::{ByteBuf, Chunk, Speakers};
use crate::errors::Result;
use crate::filter::Source;

const DEF_CHUNK_SIZE: usize = 65536;

/// Reads a file as raw data chunks of a declared format.
pub struct RawSource {
    spk: Speakers,
    file: File,
    buf: ByteBuf,
    chunk_size: usize,
    first: bool,
    is_new_stream: bool,
}

impl RawSource {
    pub fn open<P: AsRef<Path>>(path: P, spk: Speakers) -> Result<RawSource> {
        RawSource::open_with_chunk_size(path, spk, DEF_CHUNK_SIZE)
    }

    pub fn open_with_chunk_size<P: AsRef<Path>>(
        path: P,
        spk: Speakers,
        chunk_size: usize,
    ) -> Result<RawSource> {
        let file = File::open(path)?;
        Ok(RawSource {
            spk,
            file,
            buf: ByteBuf::default(),
            chunk_size: chunk_size.max(1),
            first: true,
            is_new_stream: false,
        })
    }
}

impl Source for RawSource {
    fn reset(&mut self) {
        // A source that cannot seek back would report the failure on the
        // next read; a plain file always can.
        let _ = self.file.seek(SeekFrom::Start(0));
        self.first = true;
        self.is_new_stream = false;
    }

    fn get_chunk(&mut self, out: &mut Chunk) -> Result<bool> {
        let data = self.buf.fill(self.chunk_size);
        let n = self.file.read(data)?;
        if n == 0 {
            self.is_new_stream = false;
            return Ok(false);
        }

        self.is_new_stream = self.first;
        self.first = false;
        *out = Chunk::raw(self.buf.share(0, n));
        Ok(true)
    }

    fn new_stream(&self) -> bool {
        self.is_new_stream
    }

    fn get_output(&self) -> Speakers {
        self.spk.clone()
    }
}
