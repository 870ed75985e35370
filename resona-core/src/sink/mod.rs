// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Base sinks: raw file writer and the bit bucket.

mod null;
mod raw;

pub use null::NullSink;
pub use raw::RawSink;
