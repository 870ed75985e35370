// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Frame parsers for elementary audio streams: AC-3/E-AC-3, DTS, MPEG Audio
//! and AAC ADTS.
//!
//! These parsers locate and describe frames; they do not decode them. Each
//! implements [`FrameParser`] and is driven by a
//! [`StreamBuffer`](resona_core::parser::StreamBuffer), alone or combined in
//! a [`MultiFrameParser`](resona_core::parser::MultiFrameParser).
//!
//! [`FrameParser`]: resona_core::parser::FrameParser

mod aac;
mod ac3;
mod dts;
mod mpa;

pub use aac::AdtsFrameParser;
pub use ac3::Ac3FrameParser;
pub use dts::DtsFrameParser;
pub use mpa::MpaFrameParser;
