// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Finite impulse response generators and instances.
//!
//! A [`FirGen`] is a parameter container that materializes a concrete kernel
//! for a given sample rate. Parameter changes bump the generator's
//! [`version`]; consumers cache the last `(version, sample_rate)` result and
//! rebuild when either changes. Sample rate is an external parameter and does
//! not affect the version.
//!
//! A [`FirInstance`] is an immutable kernel. Kernels may degenerate into the
//! zero, identity or plain gain response, which consumers can execute much
//! cheaper than a real convolution; the classification is derived from the
//! data, not stored.
//!
//! [`version`]: FirGen::version

mod delay;
mod echo;
mod eq;
mod multi;
mod parallel;
mod param;

pub use delay::DelayFir;
pub use echo::EchoFir;
pub use eq::{EqBand, EqFir};
pub use multi::MultiFir;
pub use parallel::ParallelFir;
pub use param::{ParamFir, ParamFirType};

use std::borrow::Cow;
use std::sync::Arc;

/// Kernel classification derived from the kernel data.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FirType {
    /// Length-1 kernel `[0]`: eats the signal.
    Zero,
    /// Length-1 kernel `[1]`: passes the signal unchanged.
    Identity,
    /// Length-1 kernel `[g]`: plain gain.
    Gain,
    /// Anything longer.
    Custom,
}

static ZERO_KERNEL: [f64; 1] = [0.0];
static IDENTITY_KERNEL: [f64; 1] = [1.0];

/// An immutable impulse response built for one sample rate.
#[derive(Clone, Debug)]
pub struct FirInstance {
    pub sample_rate: u32,
    /// Position of the kernel center in `0..len()`. The convolution engine
    /// compensates this delay.
    pub center: usize,
    data: Cow<'static, [f64]>,
}

impl FirInstance {
    /// The zero response.
    pub fn zero(sample_rate: u32) -> FirInstance {
        FirInstance { sample_rate, center: 0, data: Cow::Borrowed(&ZERO_KERNEL) }
    }

    /// The identity response.
    pub fn identity(sample_rate: u32) -> FirInstance {
        FirInstance { sample_rate, center: 0, data: Cow::Borrowed(&IDENTITY_KERNEL) }
    }

    /// A plain gain response. Gains of exactly 0 and 1 collapse to the static
    /// zero and identity kernels.
    pub fn gain(sample_rate: u32, gain: f64) -> FirInstance {
        if gain == 0.0 {
            FirInstance::zero(sample_rate)
        }
        else if gain == 1.0 {
            FirInstance::identity(sample_rate)
        }
        else {
            FirInstance { sample_rate, center: 0, data: Cow::Owned(vec![gain]) }
        }
    }

    /// A kernel from generated data. Length-1 data collapses to the
    /// degenerate responses. Panics on empty data or a center out of range.
    pub fn custom(sample_rate: u32, center: usize, data: Vec<f64>) -> FirInstance {
        assert!(!data.is_empty());
        assert!(center < data.len());
        if data.len() == 1 {
            return FirInstance::gain(sample_rate, data[0]);
        }
        FirInstance { sample_rate, center, data: Cow::Owned(data) }
    }

    /// Kernel length; always at least 1.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Classification of this kernel, derived from the data.
    pub fn fir_type(&self) -> FirType {
        if self.data.len() > 1 {
            FirType::Custom
        }
        else if self.data[0] == 0.0 {
            FirType::Zero
        }
        else if self.data[0] == 1.0 {
            FirType::Identity
        }
        else {
            FirType::Gain
        }
    }
}

/// An impulse response generator.
pub trait FirGen {
    /// The response version. Changes whenever a parameter change would alter
    /// the generated kernel. Constant generators return a constant.
    fn version(&self) -> u32;

    /// Builds the response for the sample rate given. Returns `None` when the
    /// generator is unconfigured or its parameters are invalid.
    fn make(&self, sample_rate: u32) -> Option<FirInstance>;
}

/// Generator of the zero response. Stateless; see [`FIR_ZERO`].
#[derive(Copy, Clone, Debug, Default)]
pub struct ZeroFir;

impl FirGen for ZeroFir {
    fn version(&self) -> u32 {
        0
    }

    fn make(&self, sample_rate: u32) -> Option<FirInstance> {
        Some(FirInstance::zero(sample_rate))
    }
}

/// Generator of the identity response. Stateless; see [`FIR_IDENTITY`].
#[derive(Copy, Clone, Debug, Default)]
pub struct IdentityFir;

impl FirGen for IdentityFir {
    fn version(&self) -> u32 {
        0
    }

    fn make(&self, sample_rate: u32) -> Option<FirInstance> {
        Some(FirInstance::identity(sample_rate))
    }
}

/// The shared zero generator.
pub const FIR_ZERO: ZeroFir = ZeroFir;
/// The shared identity generator.
pub const FIR_IDENTITY: IdentityFir = IdentityFir;

/// Gain response generator.
#[derive(Clone, Debug)]
pub struct GainFir {
    ver: u32,
    gain: f64,
}

impl GainFir {
    pub fn new(gain: f64) -> GainFir {
        GainFir { ver: 0, gain }
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn set_gain(&mut self, gain: f64) {
        self.gain = gain;
        self.ver = self.ver.wrapping_add(1);
    }
}

impl Default for GainFir {
    fn default() -> GainFir {
        GainFir::new(1.0)
    }
}

impl FirGen for GainFir {
    fn version(&self) -> u32 {
        self.ver
    }

    fn make(&self, sample_rate: u32) -> Option<FirInstance> {
        Some(FirInstance::gain(sample_rate, self.gain))
    }
}

/// A versioned indirection to a shared generator.
///
/// Swapping the referenced generator is reported as a version change, so
/// consumers downstream handle a generator swap and a parameter change the
/// same way.
#[derive(Clone, Default)]
pub struct FirRef {
    fir: Option<Arc<dyn FirGen>>,
    epoch: u32,
}

impl FirRef {
    pub fn new(fir: Arc<dyn FirGen>) -> FirRef {
        FirRef { fir: Some(fir), epoch: 0 }
    }

    pub fn set(&mut self, fir: Arc<dyn FirGen>) {
        // Keep the version monotonic across the swap: fold the departing
        // generator's version into the epoch.
        self.epoch = self.epoch.wrapping_add(self.child_version()).wrapping_add(1);
        self.fir = Some(fir);
    }

    pub fn release(&mut self) {
        self.epoch = self.epoch.wrapping_add(self.child_version()).wrapping_add(1);
        self.fir = None;
    }

    pub fn get(&self) -> Option<&Arc<dyn FirGen>> {
        self.fir.as_ref()
    }

    fn child_version(&self) -> u32 {
        self.fir.as_ref().map_or(0, |fir| fir.version())
    }
}

impl FirGen for FirRef {
    fn version(&self) -> u32 {
        self.epoch.wrapping_add(self.child_version())
    }

    fn make(&self, sample_rate: u32) -> Option<FirInstance> {
        self.fir.as_ref().and_then(|fir| fir.make(sample_rate))
    }
}

/// Center-aligned sum of scaled kernels; the shape behind `ParallelFir` and
/// the equalizer. Returns `(data, center)`.
pub(crate) fn sum_aligned<'a, I>(items: I) -> (Vec<f64>, usize)
where
    I: Iterator<Item = (&'a [f64], usize, f64)> + Clone,
{
    let mut center = 0usize;
    let mut tail = 1usize;
    for (data, c, _) in items.clone() {
        center = center.max(c);
        tail = tail.max(data.len() - c);
    }

    let mut out = vec![0.0; center + tail];
    for (data, c, scale) in items {
        let offset = center - c;
        for (i, &v) in data.iter().enumerate() {
            out[offset + i] += v * scale;
        }
    }
    (out, center)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 48000;

    #[test]
    fn verify_zero_instance() {
        let fir = FirInstance::zero(SAMPLE_RATE);
        assert_eq!(fir.sample_rate, SAMPLE_RATE);
        assert_eq!(fir.len(), 1);
        assert_eq!(fir.center, 0);
        assert_eq!(fir.data()[0], 0.0);
        assert_eq!(fir.fir_type(), FirType::Zero);
    }

    #[test]
    fn verify_identity_instance() {
        let fir = FirInstance::identity(SAMPLE_RATE);
        assert_eq!(fir.len(), 1);
        assert_eq!(fir.data()[0], 1.0);
        assert_eq!(fir.fir_type(), FirType::Identity);
    }

    #[test]
    fn verify_gain_instance() {
        let gain = 1.0 / 3.0;
        let fir = FirInstance::gain(SAMPLE_RATE, gain);
        assert_eq!(fir.len(), 1);
        assert_eq!(fir.data()[0], gain);
        assert_eq!(fir.fir_type(), FirType::Gain);

        // Degenerate gains collapse.
        assert_eq!(FirInstance::gain(SAMPLE_RATE, 0.0).fir_type(), FirType::Zero);
        assert_eq!(FirInstance::gain(SAMPLE_RATE, 1.0).fir_type(), FirType::Identity);
    }

    #[test]
    fn verify_custom_collapse() {
        let fir = FirInstance::custom(SAMPLE_RATE, 0, vec![0.5]);
        assert_eq!(fir.fir_type(), FirType::Gain);

        let fir = FirInstance::custom(SAMPLE_RATE, 1, vec![0.0, 1.0, 0.0]);
        assert_eq!(fir.fir_type(), FirType::Custom);
    }

    #[test]
    fn verify_static_generators() {
        let fir = FIR_ZERO.make(SAMPLE_RATE).unwrap();
        assert_eq!(fir.fir_type(), FirType::Zero);
        assert_eq!(FIR_ZERO.version(), 0);

        let fir = FIR_IDENTITY.make(SAMPLE_RATE).unwrap();
        assert_eq!(fir.fir_type(), FirType::Identity);
        assert_eq!(FIR_IDENTITY.version(), 0);
    }

    #[test]
    fn verify_gain_generator() {
        let mut gen = GainFir::default();
        assert_eq!(gen.gain(), 1.0);

        let ver = gen.version();
        gen.set_gain(0.5);
        assert_ne!(gen.version(), ver);

        let fir = gen.make(SAMPLE_RATE).unwrap();
        assert_eq!(fir.fir_type(), FirType::Gain);
        assert_eq!(fir.data()[0], 0.5);
    }

    #[test]
    fn verify_fir_ref() {
        let gain = Arc::new(GainFir::new(0.5));
        let mut fref = FirRef::default();
        assert!(fref.make(SAMPLE_RATE).is_none());

        let ver = fref.version();
        fref.set(gain.clone());
        assert_ne!(fref.version(), ver);
        assert_eq!(fref.make(SAMPLE_RATE).unwrap().data()[0], 0.5);

        let ver = fref.version();
        fref.release();
        assert_ne!(fref.version(), ver);
        assert!(fref.make(SAMPLE_RATE).is_none());
    }
}
