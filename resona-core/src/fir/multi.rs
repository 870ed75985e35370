// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use crate::dsp::convolve;
use crate::fir::{FirGen, FirInstance, FirType};

/// Combines several filters applied in sequence into one equivalent kernel.
///
/// The equivalent kernel is the convolution of the child kernels and has
/// length `sum(len_i - 1) + 1`. Building it is worthwhile because one longer
/// convolution is cheaper than several shorter ones applied one by one.
///
/// Children whose `make` fails are skipped. A zero child short-circuits the
/// whole chain to the zero response. A chain of plain gains collapses to the
/// product gain. An empty list (or a list where every child failed) produces
/// no instance.
///
/// The version changes transparently with any child's version.
#[derive(Clone, Default)]
pub struct MultiFir {
    list: Vec<Arc<dyn FirGen>>,
    epoch: u32,
}

impl MultiFir {
    pub fn new(list: Vec<Arc<dyn FirGen>>) -> MultiFir {
        MultiFir { list, epoch: 0 }
    }

    pub fn set(&mut self, list: Vec<Arc<dyn FirGen>>) {
        // Fold the departing children's versions into the epoch so the
        // combined version stays monotonic across the swap.
        self.epoch = self.epoch.wrapping_add(self.children_version()).wrapping_add(1);
        self.list = list;
    }

    pub fn release(&mut self) {
        self.set(Vec::new());
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    fn children_version(&self) -> u32 {
        self.list.iter().fold(0u32, |acc, gen| acc.wrapping_add(gen.version()))
    }
}

impl FirGen for MultiFir {
    fn version(&self) -> u32 {
        self.epoch.wrapping_add(self.children_version())
    }

    fn make(&self, sample_rate: u32) -> Option<FirInstance> {
        let instances: Vec<FirInstance> =
            self.list.iter().filter_map(|gen| gen.make(sample_rate)).collect();

        if instances.is_empty() {
            return None;
        }

        if instances.iter().any(|fir| fir.fir_type() == FirType::Zero) {
            return Some(FirInstance::zero(sample_rate));
        }

        if instances.iter().all(|fir| fir.len() == 1) {
            let gain = instances.iter().map(|fir| fir.data()[0]).product();
            return Some(FirInstance::gain(sample_rate, gain));
        }

        let mut data: Vec<f64> = instances[0].data().to_vec();
        let mut center = instances[0].center;
        for fir in &instances[1..] {
            data = convolve(&data, fir.data());
            center += fir.center;
        }

        Some(FirInstance::custom(sample_rate, center, data))
    }
}
