// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core structs and traits shared by all Project Resona crates.
//!
//! The library is built around three pieces:
//!
//! * the audio value model ([`audio::Speakers`], [`audio::Chunk`]) that
//!   describes and carries a stream of audio data,
//! * the filter graph protocol ([`filter::Source`], [`filter::Filter`],
//!   [`filter::Sink`]) that processing nodes obey so pipelines compose
//!   safely across mid-stream format changes,
//! * the frame parser machinery ([`parser::StreamBuffer`]) and the FIR
//!   generator algebra ([`fir::FirGen`]).

pub mod audio;
pub mod dsp;
pub mod errors;
pub mod filter;
pub mod fir;
pub mod io;
pub mod parser;
pub mod sink;
pub mod source;
