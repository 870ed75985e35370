// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use resona_core::audio::sample::copy_samples;
use resona_core::audio::{Chunk, ChunkData, Planar, SampleBuf, Speakers};
use resona_core::errors::{protocol_error, Result};
use resona_core::filter::Filter;

/// Scales linear data by a constant gain. Immediate class; time stamps pass
/// through untouched.
pub struct GainFilter {
    spk: Speakers,
    opened: bool,
    gain: f64,
    buf: SampleBuf,
}

impl GainFilter {
    pub fn new(gain: f64) -> GainFilter {
        GainFilter { spk: Speakers::unknown(), opened: false, gain, buf: SampleBuf::default() }
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn set_gain(&mut self, gain: f64) {
        self.gain = gain;
    }
}

impl Default for GainFilter {
    fn default() -> GainFilter {
        GainFilter::new(1.0)
    }
}

impl Filter for GainFilter {
    fn can_open(&self, spk: &Speakers) -> bool {
        spk.is_linear() && spk.nch() > 0
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

    fn get_output(&self) -> Speakers {
        self.spk.clone()
    }

    fn reset(&mut self) {}

    fn process(&mut self, input: &mut Chunk, output: &mut Chunk) -> Result<bool> {
        if !self.opened {
            return protocol_error("gain processed before open");
        }

        // Unity gain passes chunks through without touching the samples.
        if self.gain == 1.0 {
            *output = std::mem::take(input);
            return Ok(!output.is_dummy());
        }

        let planar = match &input.data {
            ChunkData::Linear(planar) => planar.clone(),
            _ => {
                *output = std::mem::take(input);
                return Ok(!output.is_dummy());
            }
        };

        let nch = planar.nch();
        let len = planar.len();
        self.buf.reshape(nch, len);
        for ch in 0..nch {
            let plane = self.buf.plane(ch);
            copy_samples(plane, planar.plane(ch));
            for sample in plane.iter_mut() {
                *sample *= self.gain;
            }
        }

        *output = Chunk::linear(Planar(self.buf.share(0, len)));
        output.sync = input.sync;
        output.time = input.time;
        input.clear();
        Ok(true)
    }

    fn flush(&mut self, _output: &mut Chunk) -> Result<bool> {
        Ok(false)
    }

    fn new_stream(&self) -> bool {
        false
    }
}
