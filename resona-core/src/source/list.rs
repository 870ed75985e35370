// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::audio::{Chunk, Speakers};
use crate::errors::Result;
use crate::filter::Source;

/// Replays a prepared list of chunks, with format changes between them.
///
/// The simplest of all sources; also the test rig for everything that
/// consumes the source contract.
#[derive(Default)]
pub struct ListSource {
    entries: Vec<(Speakers, Chunk)>,
    pos: usize,
    spk: Speakers,
    is_new_stream: bool,
}

impl ListSource {
    pub fn new() -> ListSource {
        ListSource::default()
    }

    /// A list of chunks sharing one format.
    pub fn with_chunks(spk: Speakers, chunks: Vec<Chunk>) -> ListSource {
        let mut source = ListSource::new();
        for chunk in chunks {
            source.push(spk.clone(), chunk);
        }
        source
    }

    pub fn push(&mut self, spk: Speakers, chunk: Chunk) {
        self.entries.push((spk, chunk));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Source for ListSource {
    fn reset(&mut self) {
        self.pos = 0;
        self.spk = Speakers::unknown();
        self.is_new_stream = false;
    }

    fn get_chunk(&mut self, out: &mut Chunk) -> Result<bool> {
        if self.pos >= self.entries.len() {
            self.is_new_stream = false;
            return Ok(false);
        }

        let (spk, chunk) = &self.entries[self.pos];
        self.pos += 1;
        self.is_new_stream = *spk != self.spk;
        self.spk = spk.clone();
        *out = chunk.clone();
        Ok(true)
    }

    fn new_stream(&self) -> bool {
        self.is_new_stream
    }

    fn get_output(&self) -> Speakers {
        self.spk.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{Bytes, Format, MODE_STEREO};

    #[test]
    fn verify_replay_and_new_stream() {
        let spk_a = Speakers::new(Format::Pcm16, MODE_STEREO, 48000);
        let spk_b = Speakers::new(Format::Pcm16, MODE_STEREO, 44100);

        let mut source = ListSource::new();
        source.push(spk_a.clone(), Chunk::raw(Bytes::from_vec(vec![1])));
        source.push(spk_a.clone(), Chunk::raw(Bytes::from_vec(vec![2])));
        source.push(spk_b.clone(), Chunk::raw(Bytes::from_vec(vec![3])));

        let mut out = Chunk::dummy();

        assert!(source.get_chunk(&mut out).unwrap());
        assert!(source.new_stream());
        assert_eq!(source.get_output(), spk_a);

        assert!(source.get_chunk(&mut out).unwrap());
        assert!(!source.new_stream());

        assert!(source.get_chunk(&mut out).unwrap());
        assert!(source.new_stream());
        assert_eq!(source.get_output(), spk_b);
        assert_eq!(&out.raw_data()[..], &[3]);

        assert!(!source.get_chunk(&mut out).unwrap());
        assert!(!source.new_stream());

        // Reset replays from the start, including the first new stream.
        source.reset();
        assert!(source.get_chunk(&mut out).unwrap());
        assert!(source.new_stream());
    }
}
