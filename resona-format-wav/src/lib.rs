// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RIFF/RF64 WAVE reading and writing.
//!
//! [`WavSource`] walks the RIFF chunk list, honoring the RF64 `ds64` sizes
//! for files of 4 GiB and beyond, and produces the data chunk as raw chunks
//! of the mapped format. [`WavSink`] writes a standard RIFF file and
//! upgrades it to RF64 in place when the data grows past the 32-bit limit.
//!
//! The mapping between [`Speakers`] and `WAVEFORMAT(EX|EXTENSIBLE)` lives in
//! [`waveformat`]; the on-disk channel order differs from the library's
//! canonical order and is mapped explicitly, never implied.
//!
//! [`Speakers`]: resona_core::audio::Speakers

mod sink;
mod source;
pub mod waveformat;

pub use sink::WavSink;
pub use source::WavSource;
