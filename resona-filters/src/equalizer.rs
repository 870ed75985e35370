// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Graphic equalizer filter: [`EqFir`] response generation glued to the
//! [`Convolver`] engine.

use resona_core::audio::{Chunk, Speakers};
use resona_core::errors::Result;
use resona_core::filter::Filter;
use resona_core::fir::{EqBand, EqFir};

use crate::Convolver;

/// Multichannel graphic equalizer.
///
/// Band and ripple changes re-version the underlying response generator, so
/// the convolver re-plans on the next chunk without dropping the stream.
pub struct Equalizer {
    conv: Convolver,
    fir: EqFir,
}

impl Equalizer {
    pub fn new(bands: &[EqBand]) -> Equalizer {
        let fir = EqFir::new(bands);
        Equalizer { conv: Convolver::new(Box::new(fir.clone())), fir }
    }

    pub fn bands(&self) -> &[EqBand] {
        self.fir.bands()
    }

    pub fn set_bands(&mut self, bands: &[EqBand]) {
        self.fir.set_bands(bands);
        self.conv.set_fir(Box::new(self.fir.clone()));
    }

    pub fn clear_bands(&mut self) {
        self.fir.clear_bands();
        self.conv.set_fir(Box::new(self.fir.clone()));
    }

    pub fn ripple(&self) -> f64 {
        self.fir.ripple()
    }

    pub fn set_ripple(&mut self, ripple_db: f64) {
        self.fir.set_ripple(ripple_db);
        self.conv.set_fir(Box::new(self.fir.clone()));
    }

    /// True when any band deviates from unity gain by more than the ripple.
    pub fn is_equalized(&self) -> bool {
        self.fir.is_equalized()
    }
}

impl Default for Equalizer {
    fn default() -> Equalizer {
        Equalizer::new(&[])
    }
}

impl Filter for Equalizer {
    fn can_open(&self, spk: &Speakers) -> bool {
        self.conv.can_open(spk)
    }

    fn open(&mut self, spk: &Speakers) -> bool {
        self.conv.open(spk)
    }

    fn close(&mut self) {
        self.conv.close();
    }

    fn is_open(&self) -> bool {
        self.conv.is_open()
    }

    fn get_input(&self) -> Speakers {
        self.conv.get_input()
    }

    fn get_output(&self) -> Speakers {
        self.conv.get_output()
    }

    fn reset(&mut self) {
        self.conv.reset();
    }

    fn process(&mut self, input: &mut Chunk, output: &mut Chunk) -> Result<bool> {
        self.conv.process(input, output)
    }

    fn flush(&mut self, output: &mut Chunk) -> Result<bool> {
        self.conv.flush(output)
    }

    fn new_stream(&self) -> bool {
        self.conv.new_stream()
    }
}
