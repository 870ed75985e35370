// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::audio::{Chunk, Speakers};
use crate::errors::Result;
use crate::filter::Filter;

/// Accepts any format and passes chunks through untouched.
#[derive(Default)]
pub struct Passthrough {
    spk: Speakers,
    opened: bool,
}

impl Passthrough {
    pub fn new() -> Passthrough {
        Passthrough::default()
    }
}

impl Filter for Passthrough {
    fn can_open(&self, _spk: &Speakers) -> bool {
        true
    }

    fn open(&mut self, spk: &Speakers) -> bool {
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
        *output = std::mem::take(input);
        Ok(!output.is_dummy())
    }

    fn flush(&mut self, _output: &mut Chunk) -> Result<bool> {
        Ok(false)
    }

    fn new_stream(&self) -> bool {
        false
    }
}
