// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::f64::consts::PI;

use crate::dsp::kaiser::{kaiser_alpha, kaiser_n, kaiser_window};
use crate::dsp::sinc;
use crate::fir::{FirGen, FirInstance};

/// Parametric filter shape.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParamFirType {
    LowPass,
    HighPass,
    BandPass,
    BandStop,
}

/// Parametric windowed-sinc filter generator.
///
/// Produces a type-1 (odd length) linear phase kernel using the Kaiser
/// window. Parameters:
///
/// * `f1`, `f2` — cutoff frequencies. Low/high-pass use `f1` only; band
///   filters use both (swapped into order when needed).
/// * `df` — transition band width.
/// * `a` — stopband attenuation in dB (positive).
/// * `norm` — when set, frequencies are normalized to the sample rate
///   (`0..0.5`); otherwise they are in Hz.
///
/// Cutoffs at zero or beyond Nyquist collapse the kernel to the degenerate
/// zero/identity responses; `a == 0` collapses to identity.
#[derive(Clone, Debug)]
pub struct ParamFir {
    ver: u32,
    fir_type: ParamFirType,
    f1: f64,
    f2: f64,
    df: f64,
    a: f64,
    norm: bool,
}

impl ParamFir {
    /// A low-pass filter with cutoff `f1` Hz.
    pub fn low_pass(f1: f64, df: f64, a: f64) -> ParamFir {
        ParamFir::new(ParamFirType::LowPass, f1, 0.0, df, a, false)
    }

    /// A high-pass filter with cutoff `f1` Hz.
    pub fn high_pass(f1: f64, df: f64, a: f64) -> ParamFir {
        ParamFir::new(ParamFirType::HighPass, f1, 0.0, df, a, false)
    }

    /// A band-pass filter passing `f1..f2` Hz.
    pub fn band_pass(f1: f64, f2: f64, df: f64, a: f64) -> ParamFir {
        ParamFir::new(ParamFirType::BandPass, f1, f2, df, a, false)
    }

    /// A band-stop filter rejecting `f1..f2` Hz.
    pub fn band_stop(f1: f64, f2: f64, df: f64, a: f64) -> ParamFir {
        ParamFir::new(ParamFirType::BandStop, f1, f2, df, a, false)
    }

    pub fn new(fir_type: ParamFirType, f1: f64, f2: f64, df: f64, a: f64, norm: bool) -> ParamFir {
        let mut fir = ParamFir { ver: 0, fir_type, f1, f2, df, a, norm };
        fir.set(fir_type, f1, f2, df, a, norm);
        fir
    }

    pub fn set(&mut self, fir_type: ParamFirType, f1: f64, f2: f64, df: f64, a: f64, norm: bool) {
        self.fir_type = fir_type;
        self.f1 = f1;
        self.f2 = f2;
        self.df = df;
        self.a = a;
        self.norm = norm;

        if matches!(fir_type, ParamFirType::BandPass | ParamFirType::BandStop) && self.f1 > self.f2
        {
            std::mem::swap(&mut self.f1, &mut self.f2);
        }

        self.ver = self.ver.wrapping_add(1);
    }

    pub fn params(&self) -> (ParamFirType, f64, f64, f64, f64, bool) {
        (self.fir_type, self.f1, self.f2, self.df, self.a, self.norm)
    }
}

impl FirGen for ParamFir {
    fn version(&self) -> u32 {
        self.ver
    }

    fn make(&self, sample_rate: u32) -> Option<FirInstance> {
        // Work with normalized frequencies.
        let norm_factor = if self.norm { 1.0 } else { 1.0 / f64::from(sample_rate) };
        let f1 = self.f1 * norm_factor;
        let f2 = self.f2 * norm_factor;
        let df = self.df * norm_factor;

        if f1 < 0.0 || f2 < 0.0 || df <= 0.0 || self.a < 0.0 {
            return None;
        }
        if self.a == 0.0 {
            return Some(FirInstance::identity(sample_rate));
        }

        // Degenerate cutoffs.
        use ParamFirType::*;
        match self.fir_type {
            LowPass => {
                if f1 >= 0.5 {
                    return Some(FirInstance::identity(sample_rate));
                }
                if f1 == 0.0 {
                    return Some(FirInstance::zero(sample_rate));
                }
            }
            HighPass => {
                if f1 >= 0.5 {
                    return Some(FirInstance::zero(sample_rate));
                }
                if f1 == 0.0 {
                    return Some(FirInstance::identity(sample_rate));
                }
            }
            BandPass => {
                if f1 == 0.0 && f2 >= 0.5 {
                    return Some(FirInstance::identity(sample_rate));
                }
                if f2 == 0.0 || f1 >= 0.5 {
                    return Some(FirInstance::zero(sample_rate));
                }
            }
            BandStop => {
                if f1 == 0.0 && f2 >= 0.5 {
                    return Some(FirInstance::zero(sample_rate));
                }
                if f2 == 0.0 || f1 >= 0.5 {
                    return Some(FirInstance::identity(sample_rate));
                }
            }
        }

        let (data, center) = windowed_sinc(self.fir_type, f1, f2, df, self.a);
        Some(FirInstance::custom(sample_rate, center, data))
    }
}

/// Builds the windowed-sinc kernel for normalized frequencies. Returns
/// `(data, center)`.
pub(crate) fn windowed_sinc(
    fir_type: ParamFirType,
    f1: f64,
    f2: f64,
    df: f64,
    a: f64,
) -> (Vec<f64>, usize) {
    // Odd length for a type-1 linear phase filter.
    let n = kaiser_n(a, df) | 1;
    let c = n / 2;
    let alpha = kaiser_alpha(a);

    let mut data = vec![0.0; n];
    let lp = |f: f64, i: isize| 2.0 * f * sinc(i as f64 * 2.0 * PI * f);

    for (idx, tap) in data.iter_mut().enumerate() {
        let i = idx as isize - c as isize;
        let w = kaiser_window(i, n, alpha);
        *tap = match fir_type {
            ParamFirType::LowPass => lp(f1, i) * w,
            ParamFirType::HighPass => -lp(f1, i) * w,
            ParamFirType::BandPass => (lp(f2, i) - lp(f1, i)) * w,
            ParamFirType::BandStop => (lp(f1, i) - lp(f2, i)) * w,
        };
    }

    // The inverted responses take their passband from the center tap.
    match fir_type {
        ParamFirType::HighPass => data[c] = 1.0 - 2.0 * f1,
        ParamFirType::BandStop => data[c] = 2.0 * f1 + 1.0 - 2.0 * f2,
        _ => (),
    }

    (data, c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fir::FirType;

    const SAMPLE_RATE: u32 = 48000;

    /// Frequency response magnitude of a kernel at a normalized frequency.
    fn response(data: &[f64], f: f64) -> f64 {
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
    fn verify_invalid_params() {
        assert!(ParamFir::low_pass(-1.0, 500.0, 60.0).make(SAMPLE_RATE).is_none());
        assert!(ParamFir::low_pass(8000.0, 0.0, 60.0).make(SAMPLE_RATE).is_none());
        assert!(ParamFir::low_pass(8000.0, 500.0, -1.0).make(SAMPLE_RATE).is_none());
    }

    #[test]
    fn verify_degenerate_collapse() {
        // Zero attenuation: nothing to do.
        let fir = ParamFir::low_pass(8000.0, 500.0, 0.0).make(SAMPLE_RATE).unwrap();
        assert_eq!(fir.fir_type(), FirType::Identity);

        // Low-pass above Nyquist passes everything; at zero passes nothing.
        let fir = ParamFir::low_pass(30000.0, 500.0, 60.0).make(SAMPLE_RATE).unwrap();
        assert_eq!(fir.fir_type(), FirType::Identity);
        let fir = ParamFir::low_pass(0.0, 500.0, 60.0).make(SAMPLE_RATE).unwrap();
        assert_eq!(fir.fir_type(), FirType::Zero);

        // High-pass mirrors.
        let fir = ParamFir::high_pass(0.0, 500.0, 60.0).make(SAMPLE_RATE).unwrap();
        assert_eq!(fir.fir_type(), FirType::Identity);
        let fir = ParamFir::high_pass(30000.0, 500.0, 60.0).make(SAMPLE_RATE).unwrap();
        assert_eq!(fir.fir_type(), FirType::Zero);
    }

    #[test]
    fn verify_low_pass_response() {
        let fir = ParamFir::low_pass(8000.0, 500.0, 60.0).make(SAMPLE_RATE).unwrap();
        assert_eq!(fir.fir_type(), FirType::Custom);
        assert_eq!(fir.len() % 2, 1);
        assert_eq!(fir.center, fir.len() / 2);

        // Unity in the passband, attenuated in the stopband.
        let data = fir.data();
        assert!((response(data, 0.0) - 1.0).abs() < 1e-3);
        assert!((response(data, 4000.0 / 48000.0) - 1.0).abs() < 1e-3);
        assert!(response(data, 12000.0 / 48000.0) < 1e-2);
    }

    #[test]
    fn verify_high_pass_response() {
        let fir = ParamFir::high_pass(8000.0, 500.0, 60.0).make(SAMPLE_RATE).unwrap();
        let data = fir.data();
        assert!(response(data, 0.0) < 1e-2);
        assert!((response(data, 16000.0 / 48000.0) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn verify_band_pass_response() {
        let fir = ParamFir::band_pass(4000.0, 12000.0, 500.0, 60.0).make(SAMPLE_RATE).unwrap();
        let data = fir.data();
        assert!(response(data, 0.0) < 1e-2);
        assert!((response(data, 8000.0 / 48000.0) - 1.0).abs() < 1e-3);
        assert!(response(data, 20000.0 / 48000.0) < 1e-2);
    }

    #[test]
    fn verify_band_stop_response() {
        let fir = ParamFir::band_stop(4000.0, 12000.0, 500.0, 60.0).make(SAMPLE_RATE).unwrap();
        let data = fir.data();
        assert!((response(data, 0.0) - 1.0).abs() < 1e-3);
        assert!(response(data, 8000.0 / 48000.0) < 1e-2);
        assert!((response(data, 20000.0 / 48000.0) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn verify_band_order_swap() {
        // Swapped band edges are reordered at set time.
        let a = ParamFir::band_pass(12000.0, 4000.0, 500.0, 60.0).make(SAMPLE_RATE).unwrap();
        let b = ParamFir::band_pass(4000.0, 12000.0, 500.0, 60.0).make(SAMPLE_RATE).unwrap();
        assert_eq!(a.data(), b.data());
    }
}
