// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The filter graph protocol: the [`Source`], [`Filter`] and [`Sink`]
//! contracts every processing node obeys, and their compositions.
//!
//! # Lifecycle
//!
//! A filter or sink is opened with a concrete input format, processes any
//! number of chunks of that format, and is flushed, reset or closed. Chunks
//! flow pull-style out of sources ([`Source::get_chunk`]) or push-style into
//! sinks ([`Sink::process`]); filters convert one to the other.
//!
//! # Format changes and new streams
//!
//! A node signals the start of a new stream — its first chunk ever, or the
//! first chunk after an output format change — through `new_stream()`. The
//! downstream node must then drain what it buffered for the old stream and
//! reopen with the new format. The compositors in this module
//! ([`SourceFilter`], [`SinkFilter`], [`FilterChain`]) do exactly that, so a
//! pipeline built from them handles mid-stream format changes transparently
//! and reports each change downstream exactly once.
//!
//! # End of stream
//!
//! End of stream is an in-band signal: an empty chunk with `sync` set (see
//! [`Chunk::is_eos`]). It makes a buffering filter drain; after the drain the
//! filter is empty but still open.
//!
//! [`Chunk::is_eos`]: crate::audio::Chunk::is_eos

mod chain;
mod passthrough;
mod sink_filter;
mod source_filter;

pub use chain::FilterChain;
pub use passthrough::Passthrough;
pub use sink_filter::SinkFilter;
pub use source_filter::SourceFilter;

use crate::audio::{Chunk, Speakers};
use crate::errors::Result;

/// Abstract audio source.
pub trait Source {
    /// Returns to the initial position and drops internal buffering.
    fn reset(&mut self);

    /// Fills `out` with the next chunk. Returns `false` at end of stream.
    /// May block on I/O where the source's external contract says so.
    fn get_chunk(&mut self, out: &mut Chunk) -> Result<bool>;

    /// True exactly when the chunk just returned was the first of a new
    /// stream (the first chunk ever, or the first after a format change).
    fn new_stream(&self) -> bool;

    /// Current output format; `Unknown` if the source has not determined it
    /// yet.
    fn get_output(&self) -> Speakers;
}

/// Abstract audio filter: a stateful transducer from chunks to chunks.
pub trait Filter {
    /// Pure predicate: could the filter be opened with this format?
    fn can_open(&self, spk: &Speakers) -> bool;

    /// Allocates and enters the open state. After success `get_input()`
    /// equals `spk`. Returns `false` when the format is not supported or
    /// resources cannot be allocated.
    fn open(&mut self, spk: &Speakers) -> bool;

    /// Releases resources. Idempotent.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// The format passed to `open`. Meaningless when closed.
    fn get_input(&self) -> Speakers;

    /// The current output format. May be `Unknown` until the first output
    /// chunk; must be concrete no later than that chunk.
    fn get_output(&self) -> Speakers;

    /// Drops buffered data and prepares for a fresh stream at the same input
    /// format. Never reports a new stream by itself.
    fn reset(&mut self);

    /// Consumes a prefix of `input` (updating it to what remains) and, when
    /// an output chunk is ready, fills `output` and returns `true`.
    ///
    /// Call repeatedly with the *same* `input` until it returns `false`;
    /// only then may `input` be replaced.
    fn process(&mut self, input: &mut Chunk, output: &mut Chunk) -> Result<bool>;

    /// Drains internal buffers one chunk at a time after the upstream ended.
    /// Returns `false` when the filter is empty.
    fn flush(&mut self, output: &mut Chunk) -> Result<bool>;

    /// True exactly when the chunk just produced opened a new output stream.
    fn new_stream(&self) -> bool;
}

/// Abstract audio sink.
pub trait Sink {
    /// Pure predicate: could the sink be opened with this format?
    fn can_open(&self, spk: &Speakers) -> bool;

    /// Allocates and enters the open state. After success `get_input()`
    /// equals `spk`.
    fn open(&mut self, spk: &Speakers) -> bool;

    /// Releases resources. Idempotent. Must unblock a pending `process`.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    fn get_input(&self) -> Speakers;

    /// Drops internal state, as if freshly opened with the same format.
    fn reset(&mut self);

    /// Consumes one chunk. Unlike [`Filter::process`], one call consumes the
    /// whole chunk. May block during playback.
    fn process(&mut self, chunk: &Chunk) -> Result<()>;

    /// Writes out whatever is buffered. May block.
    fn flush(&mut self) -> Result<()>;
}
