// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `audio` module provides the value types describing and carrying audio
//! data: stream formats, channel masks, and the chunk envelope.

mod buf;
mod channels;
mod chunk;
mod format;
mod speakers;

pub mod bitstream;
pub mod sample;

pub use buf::{ByteBuf, Bytes, SampleBuf, Samples};
pub use channels::{
    Channel, ChannelMask, MAX_CHANNELS, MODE_2_1, MODE_3_0, MODE_3_1, MODE_3_2, MODE_5_1,
    MODE_7_1, MODE_MONO, MODE_QUADRO, MODE_STEREO,
};
pub use chunk::{Chunk, ChunkData, Planar, Time};
pub use format::Format;
pub use speakers::{Relation, Speakers};
