// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::dsp::{db2value, value2db};
use crate::fir::param::{windowed_sinc, ParamFirType};
use crate::fir::{sum_aligned, FirGen, FirInstance};

/// One equalizer band: the gain the filter response must equal at the band's
/// center frequency.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EqBand {
    /// Center frequency in Hz.
    pub freq: u32,
    /// Linear gain at the center frequency.
    pub gain: f64,
}

/// Maximum band gain, in dB.
const MAX_GAIN_DB: f64 = 200.0;

/// Default passband ripple, in dB.
const DEF_RIPPLE_DB: f64 = 0.1;

/// Graphic equalizer: a linear phase filter built from a list of
/// `(frequency, gain)` bands.
///
/// The filter is a centered sum of step (low-pass) filters, one per gain
/// step between adjacent bands, on top of the last band's flat gain. The
/// region between two band centers is a transition band; the response at
/// each band's center frequency equals that band's gain within the
/// configured passband ripple. Steps smaller than the ripple are merged, so
/// the ripple also acts as the minimum step size.
///
/// Special cases: no bands is a passthrough filter, one band is a gain
/// filter, two bands is a single step filter.
///
/// The response below the first band equals the first band's gain, and above
/// the last band the last band's gain.
#[derive(Clone, Debug)]
pub struct EqFir {
    ver: u32,
    bands: Vec<EqBand>,
    ripple_db: f64,
}

impl Default for EqFir {
    fn default() -> EqFir {
        EqFir { ver: 0, bands: Vec::new(), ripple_db: DEF_RIPPLE_DB }
    }
}

impl EqFir {
    pub fn new(bands: &[EqBand]) -> EqFir {
        let mut fir = EqFir::default();
        fir.set_bands(bands);
        fir
    }

    pub fn nbands(&self) -> usize {
        self.bands.len()
    }

    /// Sets the equalizer bands. Bands are sorted by frequency, bands at
    /// zero frequency are dropped and gains are clamped to ±200 dB.
    pub fn set_bands(&mut self, bands: &[EqBand]) {
        let max_gain = db2value(MAX_GAIN_DB);
        self.bands = bands
            .iter()
            .filter(|band| band.freq > 0)
            .map(|band| EqBand { freq: band.freq, gain: band.gain.clamp(0.0, max_gain) })
            .collect();
        self.bands.sort_by_key(|band| band.freq);
        self.bands.dedup_by_key(|band| band.freq);
        self.ver = self.ver.wrapping_add(1);
    }

    pub fn bands(&self) -> &[EqBand] {
        &self.bands
    }

    pub fn clear_bands(&mut self) {
        self.bands.clear();
        self.ver = self.ver.wrapping_add(1);
    }

    pub fn ripple(&self) -> f64 {
        self.ripple_db
    }

    pub fn set_ripple(&mut self, ripple_db: f64) {
        self.ripple_db = ripple_db.max(1e-4);
        self.ver = self.ver.wrapping_add(1);
    }

    /// True when any band deviates from unity gain by more than the ripple.
    pub fn is_equalized(&self) -> bool {
        let threshold = db2value(self.ripple_db) - 1.0;
        self.bands.iter().any(|band| (band.gain - 1.0).abs() > threshold)
    }
}

impl FirGen for EqFir {
    fn version(&self) -> u32 {
        self.ver
    }

    fn make(&self, sample_rate: u32) -> Option<FirInstance> {
        if self.bands.is_empty() {
            return Some(FirInstance::identity(sample_rate));
        }
        if self.bands.len() == 1 {
            return Some(FirInstance::gain(sample_rate, self.bands[0].gain));
        }

        // Allowed relative deviation of the response at a band center.
        let ripple = db2value(self.ripple_db) - 1.0;

        // One step filter per gain step larger than the ripple. The response
        // is built top-down: the flat last-band gain plus, below each step
        // frequency, the step amplitude added back by a low-pass.
        struct Step {
            data: Vec<f64>,
            center: usize,
            amp: f64,
        }

        let mut steps: Vec<Step> = Vec::new();
        let mut total_step = 0.0f64;
        let mut prev = self.bands[0];
        for band in &self.bands[1..] {
            let amp = prev.gain - band.gain;
            if amp.abs() <= ripple * prev.gain.max(band.gain) {
                // Sub-ripple step, merge with the neighbour.
                prev = *band;
                continue;
            }
            total_step += amp.abs();
            prev = *band;
        }

        if total_step == 0.0 {
            // All bands flat within the ripple.
            return Some(FirInstance::gain(sample_rate, self.bands[self.bands.len() - 1].gain));
        }

        // Stopband attenuation for the step filters: the summed leakage of
        // all steps must stay below the ripple at the quietest band.
        let gmin =
            self.bands.iter().map(|band| band.gain).fold(f64::INFINITY, f64::min).max(1e-6);
        let att = value2db(total_step / (ripple * gmin)).clamp(40.0, 220.0);

        let nyquist = f64::from(sample_rate) / 2.0;
        let mut prev = self.bands[0];
        for band in &self.bands[1..] {
            let amp = prev.gain - band.gain;
            if amp.abs() <= ripple * prev.gain.max(band.gain) {
                prev = *band;
                continue;
            }

            let f1 = (f64::from(prev.freq)).min(nyquist - 1.0);
            let f2 = (f64::from(band.freq)).min(nyquist);
            let fc = (f1 + f2) / 2.0 / f64::from(sample_rate);
            let df = (f2 - f1) / f64::from(sample_rate);

            let (data, center) = windowed_sinc(ParamFirType::LowPass, fc, 0.0, df, att);
            steps.push(Step { data, center, amp });
            prev = *band;
        }

        let base = self.bands[self.bands.len() - 1].gain;
        let (mut data, center) = sum_aligned(
            steps.iter().map(|step| (step.data.as_slice(), step.center, step.amp)),
        );
        data[center] += base;

        Some(FirInstance::custom(sample_rate, center, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fir::FirType;
    use std::f64::consts::PI;

    const SAMPLE_RATE: u32 = 48000;

    fn response(data: &[f64], freq: f64) -> f64 {
        let f = freq / SAMPLE_RATE as f64;
        let mut re = 0.0;
        let mut im = 0.0;
        for (i, &tap) in data.iter().enumerate() {
            let phase = 2.0 * PI * f * i as f64;
            re += tap * phase.cos();
            im -= tap * phase.sin();
        }
        (re * re + im * im).sqrt()
    }

    #[test]
    fn verify_band_normalization() {
        let mut fir = EqFir::default();
        fir.set_bands(&[
            EqBand { freq: 2000, gain: 2.0 },
            EqBand { freq: 0, gain: 5.0 },
            EqBand { freq: 1000, gain: 1.0 },
        ]);

        // Zero-frequency band dropped, remaining sorted by frequency.
        assert_eq!(fir.nbands(), 2);
        assert_eq!(fir.bands()[0], EqBand { freq: 1000, gain: 1.0 });
        assert_eq!(fir.bands()[1], EqBand { freq: 2000, gain: 2.0 });
    }

    #[test]
    fn verify_version_bumps() {
        let mut fir = EqFir::default();

        let ver = fir.version();
        fir.set_bands(&[EqBand { freq: 1000, gain: 2.0 }]);
        assert_ne!(fir.version(), ver);

        let ver = fir.version();
        fir.set_ripple(0.05);
        assert_ne!(fir.version(), ver);

        let ver = fir.version();
        fir.clear_bands();
        assert_ne!(fir.version(), ver);
    }

    #[test]
    fn verify_no_bands_is_identity() {
        let fir = EqFir::default().make(SAMPLE_RATE).unwrap();
        assert_eq!(fir.fir_type(), FirType::Identity);
    }

    #[test]
    fn verify_one_band_is_gain() {
        let gain = 2.0;
        let gen = EqFir::new(&[EqBand { freq: 12000, gain }]);
        let fir = gen.make(SAMPLE_RATE).unwrap();
        assert_eq!(fir.fir_type(), FirType::Gain);
        assert_eq!(fir.data()[0], gain);
    }

    #[test]
    fn verify_is_equalized() {
        let mut fir = EqFir::new(&[EqBand { freq: 1000, gain: 1.0 }]);
        assert!(!fir.is_equalized());
        fir.set_bands(&[EqBand { freq: 1000, gain: 2.0 }]);
        assert!(fir.is_equalized());
    }

    #[test]
    fn verify_response_at_band_centers() {
        let bands = [
            EqBand { freq: 1000, gain: 1.0 },
            EqBand { freq: 2000, gain: 2.0 },
            EqBand { freq: 4000, gain: 0.5 },
            EqBand { freq: 8000, gain: 1.0 },
        ];
        let gen = EqFir::new(&bands);
        let fir = gen.make(SAMPLE_RATE).unwrap();
        assert_eq!(fir.fir_type(), FirType::Custom);

        let ripple = db2value(gen.ripple()) - 1.0;
        for band in &bands {
            let resp = response(fir.data(), f64::from(band.freq));
            assert!(
                (resp - band.gain).abs() <= ripple * band.gain * 2.0,
                "band {} Hz: response {} vs gain {}",
                band.freq,
                resp,
                band.gain
            );
        }

        // Below the first band the response follows the first band's gain,
        // above the last band the last band's gain.
        assert!((response(fir.data(), 100.0) - 1.0).abs() < 0.01);
        assert!((response(fir.data(), 20000.0) - 1.0).abs() < 0.01);
    }

    #[test]
    fn verify_sub_ripple_steps_merge() {
        // Two bands closer in gain than the ripple collapse to a plain gain.
        let gen = EqFir::new(&[
            EqBand { freq: 1000, gain: 1.0 },
            EqBand { freq: 2000, gain: 1.0 + 1e-6 },
        ]);
        let fir = gen.make(SAMPLE_RATE).unwrap();
        assert!(fir.len() == 1);
    }
}
