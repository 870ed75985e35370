// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Base sources: file readers, chunk lists and signal generators.

mod generator;
mod list;
mod raw;

pub use generator::{NoiseGen, ToneGen, ZeroGen};
pub use list::ListSource;
pub use raw::RawSource;
