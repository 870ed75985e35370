// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The sample type and the bulk sample helpers the rest of the library uses
//! instead of open-coded loops.

/// One audio sample. All linear processing is done in `f64`.
pub type Sample = f64;

/// Two samples closer than this are considered equal in tests and collapse
/// decisions.
pub const SAMPLE_THRESHOLD: Sample = 1e-10;

/// Fills a slice with silence.
pub fn zero_samples(dst: &mut [Sample]) {
    dst.iter_mut().for_each(|s| *s = 0.0);
}

/// Copies samples. Slices must have equal length.
pub fn copy_samples(dst: &mut [Sample], src: &[Sample]) {
    dst.copy_from_slice(src);
}

/// Scales a slice in place.
pub fn gain_samples(dst: &mut [Sample], gain: Sample) {
    dst.iter_mut().for_each(|s| *s *= gain);
}

/// Adds `src` into `dst`. Slices must have equal length.
pub fn sum_samples(dst: &mut [Sample], src: &[Sample]) {
    dst.iter_mut().zip(src).for_each(|(d, s)| *d += s);
}

/// Multiplies `dst` by `src` element-wise. Slices must have equal length.
pub fn mul_samples(dst: &mut [Sample], src: &[Sample]) {
    dst.iter_mut().zip(src).for_each(|(d, s)| *d *= s);
}

/// The largest absolute sample value.
pub fn peak(src: &[Sample]) -> Sample {
    src.iter().fold(0.0, |max, s| max.max(s.abs()))
}

/// Root mean square of the slice, 0 for an empty slice.
pub fn rms(src: &[Sample]) -> Sample {
    if src.is_empty() {
        return 0.0;
    }
    (src.iter().map(|s| s * s).sum::<Sample>() / src.len() as Sample).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_bulk_ops() {
        let mut a = [1.0, -2.0, 3.0, -4.0];

        gain_samples(&mut a, 0.5);
        assert_eq!(a, [0.5, -1.0, 1.5, -2.0]);

        sum_samples(&mut a, &[0.5, 1.0, -1.5, 2.0]);
        assert_eq!(a, [1.0, 0.0, 0.0, 0.0]);

        mul_samples(&mut a, &[3.0, 3.0, 3.0, 3.0]);
        assert_eq!(a, [3.0, 0.0, 0.0, 0.0]);

        zero_samples(&mut a);
        assert_eq!(a, [0.0; 4]);
    }

    #[test]
    fn verify_peak_and_rms() {
        assert_eq!(peak(&[0.5, -2.0, 1.0]), 2.0);
        assert_eq!(peak(&[]), 0.0);

        assert!((rms(&[1.0, -1.0, 1.0, -1.0]) - 1.0).abs() < SAMPLE_THRESHOLD);
        assert_eq!(rms(&[]), 0.0);

        // RMS of a full-scale sine is 1/sqrt(2).
        let sine: Vec<Sample> =
            (0..4800).map(|i| (2.0 * std::f64::consts::PI * i as f64 / 48.0).sin()).collect();
        assert!((rms(&sine) - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }
}
