// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Signal generator sources: silence, sine tone and seeded noise.

use std::f64::consts::PI;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::audio::{ByteBuf, Chunk, Planar, SampleBuf, Speakers};
use crate::errors::Result;
use crate::filter::Source;

const DEF_CHUNK_SIZE: usize = 4096;

/// State shared by all generators: the output format, how much is left to
/// generate and the chunk size.
struct GenBase {
    spk: Speakers,
    stream_len: usize,
    remaining: usize,
    chunk_size: usize,
    first: bool,
    is_new_stream: bool,
    sbuf: SampleBuf,
    rbuf: ByteBuf,
}

impl GenBase {
    fn new(spk: Speakers, stream_len: usize) -> GenBase {
        GenBase {
            spk,
            stream_len,
            remaining: stream_len,
            chunk_size: DEF_CHUNK_SIZE,
            first: true,
            is_new_stream: false,
            sbuf: SampleBuf::default(),
            rbuf: ByteBuf::default(),
        }
    }

    fn reset(&mut self) {
        self.remaining = self.stream_len;
        self.first = true;
        self.is_new_stream = false;
    }

    /// Takes the size of the next chunk, or `None` at stream end.
    fn next_size(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            self.is_new_stream = false;
            return None;
        }
        let size = self.remaining.min(self.chunk_size);
        self.remaining -= size;
        self.is_new_stream = self.first;
        self.first = false;
        Some(size)
    }
}

macro_rules! impl_source_common {
    () => {
        fn new_stream(&self) -> bool {
            self.base.is_new_stream
        }

        fn get_output(&self) -> Speakers {
            self.base.spk.clone()
        }
    };
}

/// Generates silence in linear format.
pub struct ZeroGen {
    base: GenBase,
}

impl ZeroGen {
    /// `stream_len` is in samples per channel.
    pub fn new(spk: Speakers, stream_len: usize) -> ZeroGen {
        ZeroGen { base: GenBase::new(spk, stream_len) }
    }
}

impl Source for ZeroGen {
    fn reset(&mut self) {
        self.base.reset();
    }

    fn get_chunk(&mut self, out: &mut Chunk) -> Result<bool> {
        let size = match self.base.next_size() {
            Some(size) => size,
            None => return Ok(false),
        };

        let nch = self.base.spk.nch();
        self.base.sbuf.reshape(nch, size);
        for ch in 0..nch {
            self.base.sbuf.plane(ch).fill(0.0);
        }
        *out = Chunk::linear(Planar(self.base.sbuf.share(0, size)));
        Ok(true)
    }

    impl_source_common!();
}

/// Generates a sine tone in linear format.
pub struct ToneGen {
    base: GenBase,
    freq: u32,
    phase: f64,
}

impl ToneGen {
    /// A `freq` Hz tone, `stream_len` samples per channel long.
    pub fn new(spk: Speakers, freq: u32, stream_len: usize) -> ToneGen {
        ToneGen { base: GenBase::new(spk, stream_len), freq, phase: 0.0 }
    }
}

impl Source for ToneGen {
    fn reset(&mut self) {
        self.base.reset();
        self.phase = 0.0;
    }

    fn get_chunk(&mut self, out: &mut Chunk) -> Result<bool> {
        let size = match self.base.next_size() {
            Some(size) => size,
            None => return Ok(false),
        };

        let nch = self.base.spk.nch();
        let step = 2.0 * PI * f64::from(self.freq) / f64::from(self.base.spk.sample_rate);

        self.base.sbuf.reshape(nch, size);
        for ch in 0..nch {
            let mut phase = self.phase;
            for sample in self.base.sbuf.plane(ch).iter_mut() {
                *sample = phase.sin();
                phase += step;
            }
        }
        self.phase += step * size as f64;

        *out = Chunk::linear(Planar(self.base.sbuf.share(0, size)));
        Ok(true)
    }

    impl_source_common!();
}

/// Generates uniform noise from a seeded generator, in linear format or as
/// raw bytes for any other format.
pub struct NoiseGen {
    base: GenBase,
    rng: SmallRng,
    seed: u64,
}

impl NoiseGen {
    /// `stream_len` is in samples per channel for linear output and in bytes
    /// otherwise.
    pub fn new(spk: Speakers, seed: u64, stream_len: usize) -> NoiseGen {
        NoiseGen { base: GenBase::new(spk, stream_len), rng: SmallRng::seed_from_u64(seed), seed }
    }
}

impl Source for NoiseGen {
    fn reset(&mut self) {
        self.base.reset();
        self.rng = SmallRng::seed_from_u64(self.seed);
    }

    fn get_chunk(&mut self, out: &mut Chunk) -> Result<bool> {
        let size = match self.base.next_size() {
            Some(size) => size,
            None => return Ok(false),
        };

        if self.base.spk.is_linear() {
            let nch = self.base.spk.nch();
            let level = self.base.spk.level;
            self.base.sbuf.reshape(nch, size);
            for ch in 0..nch {
                for sample in self.base.sbuf.plane(ch).iter_mut() {
                    *sample = self.rng.gen_range(-level..level);
                }
            }
            *out = Chunk::linear(Planar(self.base.sbuf.share(0, size)));
        }
        else {
            let data = self.base.rbuf.fill(size);
            self.rng.fill(data);
            *out = Chunk::raw(self.base.rbuf.share(0, size));
        }
        Ok(true)
    }

    impl_source_common!();
}
