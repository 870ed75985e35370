// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use crate::fir::{sum_aligned, FirGen, FirInstance};

/// Combines several filters applied to the same signal and summed into one
/// equivalent kernel.
///
/// Child kernels are aligned on their centers before summing, so the
/// equivalent kernel has length `max(center_i) + max(len_i - center_i)`. In
/// conjunction with [`MultiFir`] this lets complex responses be built from
/// pass/stop primitives: a low-pass plus a delayed high-pass is an
/// echo-shaped multiband, for example.
///
/// Children whose `make` fails are skipped. An empty list (or a list where
/// every child failed) produces no instance. The version changes
/// transparently with any child's version.
///
/// [`MultiFir`]: crate::fir::MultiFir
#[derive(Clone, Default)]
pub struct ParallelFir {
    list: Vec<Arc<dyn FirGen>>,
    epoch: u32,
}

impl ParallelFir {
    pub fn new(list: Vec<Arc<dyn FirGen>>) -> ParallelFir {
        ParallelFir { list, epoch: 0 }
    }

    pub fn set(&mut self, list: Vec<Arc<dyn FirGen>>) {
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

impl FirGen for ParallelFir {
    fn version(&self) -> u32 {
        self.epoch.wrapping_add(self.children_version())
    }

    fn make(&self, sample_rate: u32) -> Option<FirInstance> {
        let instances: Vec<FirInstance> =
            self.list.iter().filter_map(|gen| gen.make(sample_rate)).collect();

        if instances.is_empty() {
            return None;
        }

        let (data, center) =
            sum_aligned(instances.iter().map(|fir| (fir.data(), fir.center, 1.0)));

        Some(FirInstance::custom(sample_rate, center, data))
    }
}
