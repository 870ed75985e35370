// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `dsp` module provides the signal-processing primitives used by the
//! FIR generators: the Kaiser window family and direct convolution.

pub mod kaiser;

/// Converts a linear amplitude to decibels. Non-positive values map to 0 dB.
pub fn value2db(value: f64) -> f64 {
    if value > 0.0 {
        value.log10() * 20.0
    }
    else {
        0.0
    }
}

/// Converts decibels to a linear amplitude.
pub fn db2value(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Normalized sinc: `sin(x)/x` with `sinc(0) == 1`.
pub fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    }
    else {
        x.sin() / x
    }
}

/// Direct (time-domain) convolution of two kernels.
///
/// The result has length `a.len() + b.len() - 1`. Used by the FIR algebra to
/// collapse filter chains; block data goes through the FFT convolver instead.
pub fn convolve(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }

    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        if x == 0.0 {
            continue;
        }
        for (j, &y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}
