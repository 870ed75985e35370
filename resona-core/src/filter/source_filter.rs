// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use log::debug;

use crate::audio::{Chunk, Speakers};
use crate::errors::{bad_format_error, Result};
use crate::filter::{Filter, Source};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    /// Waiting for a chunk from the source.
    Empty,
    /// Feeding the pending chunk to the filter.
    Process,
    /// The source started a new stream: drain the filter, then reopen it.
    NewStream,
    /// The source ended: drain the filter.
    Flush,
}

/// Presents a source and a filter as one source.
///
/// Pulls from the source, feeds the filter, and reopens the filter
/// transparently whenever the source starts a new stream, so downstream sees
/// each format change exactly once.
pub struct SourceFilter<S, F> {
    source: S,
    filter: F,
    chunk: Chunk,
    state: State,
    is_new_stream: bool,
    /// The filter was reopened; the next output chunk opens a new stream.
    format_change: bool,
    need_flushing: bool,
}

impl<S: Source, F: Filter> SourceFilter<S, F> {
    /// Combines `source` and `filter`, opening the filter with the source's
    /// output format when it is already known.
    pub fn new(source: S, mut filter: F) -> Result<SourceFilter<S, F>> {
        let source_spk = source.get_output();
        if !source_spk.is_unknown()
            && (!filter.is_open() || filter.get_input() != source_spk)
            && !filter.open(&source_spk)
        {
            return bad_format_error("filter does not accept the source format");
        }

        Ok(SourceFilter {
            source,
            filter,
            chunk: Chunk::dummy(),
            state: State::Empty,
            is_new_stream: false,
            format_change: false,
            need_flushing: false,
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut F {
        &mut self.filter
    }

    pub fn into_inner(self) -> (S, F) {
        (self.source, self.filter)
    }

    fn reopen(&mut self) -> Result<()> {
        let spk = self.source.get_output();
        debug!("source filter: reopening filter for {}", spk);
        if !self.filter.open(&spk) {
            return bad_format_error("filter does not accept the new stream format");
        }
        Ok(())
    }
}

impl<S: Source, F: Filter> Source for SourceFilter<S, F> {
    fn reset(&mut self) {
        self.source.reset();
        let source_spk = self.source.get_output();
        if !source_spk.is_unknown() {
            if self.filter.is_open() && self.filter.get_input() == source_spk {
                self.filter.reset();
            }
            else {
                self.filter.open(&source_spk);
            }
        }

        self.chunk.clear();
        self.state = State::Empty;
        self.is_new_stream = false;
        self.format_change = false;
        self.need_flushing = false;
    }

    fn get_chunk(&mut self, out: &mut Chunk) -> Result<bool> {
        loop {
            match self.state {
                State::Empty => {
                    if !self.source.get_chunk(&mut self.chunk)? {
                        if self.need_flushing {
                            self.state = State::Flush;
                            continue;
                        }
                        return Ok(false);
                    }

                    if self.source.new_stream() {
                        self.state = State::NewStream;
                        continue;
                    }

                    if !self.filter.is_open() {
                        // The source format was unknown at build time.
                        self.reopen()?;
                        self.format_change = true;
                    }
                    self.state = State::Process;
                }

                State::Process => {
                    self.need_flushing = true;
                    if self.filter.process(&mut self.chunk, out)? {
                        self.is_new_stream = self.filter.new_stream() || self.format_change;
                        self.format_change = false;
                        return Ok(true);
                    }
                    self.state = State::Empty;
                }

                State::NewStream => {
                    if self.need_flushing && self.filter.flush(out)? {
                        self.is_new_stream = self.filter.new_stream() || self.format_change;
                        self.format_change = false;
                        return Ok(true);
                    }
                    self.reopen()?;
                    self.format_change = true;
                    self.need_flushing = false;
                    self.state = State::Process;
                }

                State::Flush => {
                    if self.filter.flush(out)? {
                        self.is_new_stream = self.filter.new_stream() || self.format_change;
                        self.format_change = false;
                        return Ok(true);
                    }
                    self.need_flushing = false;
                    self.state = State::Empty;
                    return Ok(false);
                }
            }
        }
    }

    fn new_stream(&self) -> bool {
        self.is_new_stream
    }

    fn get_output(&self) -> Speakers {
        self.filter.get_output()
    }
}
