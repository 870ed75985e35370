// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use log::debug;

use crate::audio::{Chunk, Speakers};
use crate::errors::{bad_format_error, Result};
use crate::filter::{Filter, Sink};

/// Presents a sink and a filter as one sink.
///
/// Chunks run through the filter; the sink is flushed and reopened whenever
/// the filter's output format changes.
pub struct SinkFilter<K, F> {
    sink: K,
    filter: F,
}

impl<K: Sink, F: Filter> SinkFilter<K, F> {
    pub fn new(sink: K, filter: F) -> SinkFilter<K, F> {
        SinkFilter { sink, filter }
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut F {
        &mut self.filter
    }

    pub fn into_inner(self) -> (K, F) {
        (self.sink, self.filter)
    }

    /// Reopens the sink to follow the filter's output format.
    fn follow_output(&mut self) -> Result<()> {
        let spk = self.filter.get_output();
        debug!("sink filter: reopening sink for {}", spk);
        self.sink.flush()?;
        if !self.sink.open(&spk) {
            return bad_format_error("sink does not accept the filter output format");
        }
        Ok(())
    }
}

impl<K: Sink, F: Filter> Sink for SinkFilter<K, F> {
    fn can_open(&self, spk: &Speakers) -> bool {
        self.filter.can_open(spk)
    }

    fn open(&mut self, spk: &Speakers) -> bool {
        if !self.filter.open(spk) {
            return false;
        }

        let filter_spk = self.filter.get_output();
        if filter_spk.is_unknown() {
            // The sink is opened when the filter decides its output format.
            return true;
        }
        self.sink.open(&filter_spk)
    }

    fn close(&mut self) {
        self.sink.close();
        self.filter.close();
    }

    fn is_open(&self) -> bool {
        self.filter.is_open()
    }

    fn get_input(&self) -> Speakers {
        self.filter.get_input()
    }

    fn reset(&mut self) {
        self.sink.reset();
        self.filter.reset();
    }

    fn process(&mut self, chunk: &Chunk) -> Result<()> {
        let mut input = chunk.clone();
        let mut output = Chunk::dummy();
        while self.filter.process(&mut input, &mut output)? {
            if self.filter.new_stream() || !self.sink.is_open() {
                self.follow_output()?;
            }
            self.sink.process(&output)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let mut output = Chunk::dummy();
        while self.filter.flush(&mut output)? {
            if self.filter.new_stream() || !self.sink.is_open() {
                self.follow_output()?;
            }
            self.sink.process(&output)?;
        }
        self.sink.flush()
    }
}
