// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Concrete processing filters: PCM conversion, gain, FFT fast convolution,
//! the graphic equalizer, stream type detection and frame splitting.
//!
//! Every filter here obeys the graph protocol of
//! [`resona_core::filter::Filter`]; they compose freely through
//! `SourceFilter`, `SinkFilter` and `FilterChain`.

mod converter;
mod convolver;
mod detector;
mod frame_splitter;
mod gain;

pub mod equalizer;

pub use converter::Converter;
pub use convolver::Convolver;
pub use detector::Detector;
pub use equalizer::Equalizer;
pub use frame_splitter::FrameSplitter;
pub use gain::GainFilter;
