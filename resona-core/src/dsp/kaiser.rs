// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The Kaiser window, parameterized by stopband attenuation.
//!
//! All formulas are the classic Kaiser estimates; `a` is the attenuation in
//! dB (positive), `df` the normalized transition band width (0..0.5).

use std::f64::consts::PI;

/// Zeroth-order modified Bessel function of the first kind.
///
/// Series expansion, converges quickly for the argument range the window
/// uses.
pub fn bessel_i0(x: f64) -> f64 {
    let half = x / 2.0;
    let mut sum = 1.0;
    let mut term = 1.0;
    let mut k = 1.0;

    loop {
        term *= (half / k) * (half / k);
        sum += term;
        if term < sum * 1e-21 {
            break;
        }
        k += 1.0;
    }
    sum
}

/// The window shape parameter alpha for a given stopband attenuation.
pub fn kaiser_alpha(a: f64) -> f64 {
    if a <= 21.0 {
        0.0
    }
    else if a <= 50.0 {
        0.5842 * (a - 21.0).powf(0.4) + 0.07886 * (a - 21.0)
    }
    else {
        0.1102 * (a - 8.7)
    }
}

/// The minimum window length for attenuation `a` dB over a transition band of
/// normalized width `df`.
pub fn kaiser_n(a: f64, df: f64) -> usize {
    let n = (a - 7.95) / (2.0 * PI * 2.285 * df);
    (n.ceil().max(1.0)) as usize
}

/// Window value at position `i` counted from the window center, for a window
/// of `n` points and shape `alpha`.
pub fn kaiser_window(i: isize, n: usize, alpha: f64) -> f64 {
    let half = (n as f64 - 1.0) / 2.0;
    let t = i as f64 / half;
    if t.abs() > 1.0 {
        return 0.0;
    }
    bessel_i0(alpha * (1.0 - t * t).sqrt()) / bessel_i0(alpha)
}
