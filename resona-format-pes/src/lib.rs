// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MPEG-1/2 Packetized Elementary Stream support.
//!
//! Parsing happens in two stages. [`PesFrameParser`] is the packet layer: it
//! frames whole PES packets out of a byte stream using only the start code
//! and the packet length. [`PesDemux`] is the payload layer: it parses the
//! packet header proper (MPEG-1 stuffing or the MPEG-2 extension), classifies
//! the audio substream and emits the payload with the substream's format.
//!
//! Finding the substream number needs more header than the minimum packet
//! size, which is why the packet layer does not attempt it; small packets
//! would be lost otherwise.

mod demux;
mod frame;
mod header;

pub use demux::PesDemux;
pub use frame::PesFrameParser;
pub use header::PesHeader;
