// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IEC 61937 (S/PDIF) stream support.
//!
//! An IEC 61937 stream is shaped like 16-bit stereo PCM: each compressed
//! frame sits in a window of `nsamples * 4` bytes, opened by a four-word
//! burst preamble (`Pa Pb Pc Pd`), followed by the payload in 16-bit
//! little-endian words and zero padding up to the window end.
//!
//! [`SpdifFrameParser`] locates and describes bursts. [`Spdifer`]
//! encapsulates AC-3/MPEG Audio/DTS elementary frames into bursts;
//! [`Despdifer`] extracts them back.

mod frame;
mod unwrap;
mod wrap;

pub use frame::SpdifFrameParser;
pub use unwrap::Despdifer;
pub use wrap::Spdifer;

/// Burst preamble words.
pub(crate) const SYNC_PA: u16 = 0xf872;
pub(crate) const SYNC_PB: u16 = 0x4e1f;

/// IEC 61937 data type codes used here.
pub(crate) const DATA_AC3: u16 = 1;
pub(crate) const DATA_MPA_L1: u16 = 4;
pub(crate) const DATA_MPA_L23: u16 = 5;
pub(crate) const DATA_DTS1: u16 = 11;
pub(crate) const DATA_DTS2: u16 = 12;
pub(crate) const DATA_DTS3: u16 = 13;
