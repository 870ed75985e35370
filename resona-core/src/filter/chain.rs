// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use log::debug;

use crate::audio::{Chunk, Speakers};
use crate::errors::{bad_format_error, Result};
use crate::filter::Filter;

struct Node {
    filter: Box<dyn Filter>,
    /// Input waiting to be (further) consumed by this node.
    input: Chunk,
    /// Draining before a reopen or because the chain is flushing.
    flushing: bool,
    /// After the drain, reopen with this format and resume with this chunk.
    reopen: Option<(Speakers, Chunk)>,
    /// This node was flushed for the current chain-level drain.
    drained: bool,
    /// The next chunk this node emits opens a new stream.
    format_change: bool,
}

impl Node {
    fn new(filter: Box<dyn Filter>) -> Node {
        Node {
            filter,
            input: Chunk::dummy(),
            flushing: false,
            reopen: None,
            drained: false,
            format_change: false,
        }
    }
}

/// An ordered list of filters behaving as one.
///
/// The chain's input format is the first filter's input and its output the
/// last filter's output. Mid-chain format changes are handled by the
/// standard rule: the downstream filter drains what it buffered, reopens
/// with the new format, and its first chunk after that carries the new
/// stream flag.
///
/// An empty chain passes chunks through.
pub struct FilterChain {
    nodes: Vec<Node>,
    /// Chain-level flush in progress.
    draining: bool,
    is_new_stream: bool,
}

impl FilterChain {
    pub fn new() -> FilterChain {
        FilterChain { nodes: Vec::new(), draining: false, is_new_stream: false }
    }

    /// Appends a filter to the end of the chain. Only legal while closed.
    pub fn add_back(&mut self, filter: Box<dyn Filter>) {
        self.nodes.push(Node::new(filter));
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.draining = false;
        self.is_new_stream = false;
    }

    /// Pulls one chunk out of node `i`, recursively feeding it from the
    /// nodes before it. Returns the chunk and its new-stream flag.
    fn pull(&mut self, i: usize) -> Result<Option<(Chunk, bool)>> {
        loop {
            // Drain phase of a reopen or a chain flush.
            if self.nodes[i].flushing {
                let node = &mut self.nodes[i];
                let mut out = Chunk::dummy();
                if node.filter.flush(&mut out)? {
                    let new_stream = node.filter.new_stream() || node.format_change;
                    node.format_change = false;
                    return Ok(Some((out, new_stream)));
                }
                node.flushing = false;

                if let Some((spk, chunk)) = node.reopen.take() {
                    debug!("filter chain: reopening node {} for {}", i, spk);
                    if !node.filter.open(&spk) {
                        return bad_format_error("chain filter does not accept the new format");
                    }
                    node.format_change = true;
                    node.input = chunk;
                }
            }

            // Work on the pending input.
            if !self.nodes[i].input.is_dummy() {
                let node = &mut self.nodes[i];
                let mut out = Chunk::dummy();
                if node.filter.process(&mut node.input, &mut out)? {
                    let new_stream = node.filter.new_stream() || node.format_change;
                    node.format_change = false;
                    return Ok(Some((out, new_stream)));
                }
                node.input.clear();
            }

            // Out of input: feed from upstream.
            let upstream = if i == 0 { None } else { self.pull(i - 1)? };
            match upstream {
                Some((chunk, new_stream)) => {
                    let spk = if i == 0 {
                        Speakers::unknown()
                    }
                    else {
                        self.nodes[i - 1].filter.get_output()
                    };
                    let node = &mut self.nodes[i];
                    if new_stream && node.filter.is_open() {
                        // Drain for the old stream, then reopen.
                        node.flushing = true;
                        node.reopen = Some((spk, chunk));
                    }
                    else if !node.filter.is_open() {
                        debug!("filter chain: opening node {} for {}", i, spk);
                        if !node.filter.open(&spk) {
                            return bad_format_error("chain filter does not accept the format");
                        }
                        node.input = chunk;
                    }
                    else {
                        node.input = chunk;
                    }
                }
                None => {
                    if self.draining && !self.nodes[i].drained {
                        self.nodes[i].drained = true;
                        self.nodes[i].flushing = true;
                        continue;
                    }
                    return Ok(None);
                }
            }
        }
    }
}

impl Default for FilterChain {
    fn default() -> FilterChain {
        FilterChain::new()
    }
}

impl Filter for FilterChain {
    fn can_open(&self, spk: &Speakers) -> bool {
        match self.nodes.first() {
            Some(node) => node.filter.can_open(spk),
            None => true,
        }
    }

    fn open(&mut self, spk: &Speakers) -> bool {
        let mut spk = spk.clone();
        for node in &mut self.nodes {
            if !node.filter.open(&spk) {
                return false;
            }
            node.input = Chunk::dummy();
            node.flushing = false;
            node.reopen = None;
            node.drained = false;
            node.format_change = false;

            let out = node.filter.get_output();
            if out.is_unknown() {
                // Nodes after this one are opened when the format is known.
                break;
            }
            spk = out;
        }
        self.draining = false;
        self.is_new_stream = false;
        true
    }

    fn close(&mut self) {
        for node in &mut self.nodes {
            node.filter.close();
            node.input = Chunk::dummy();
        }
    }

    fn is_open(&self) -> bool {
        match self.nodes.first() {
            Some(node) => node.filter.is_open(),
            None => true,
        }
    }

    fn get_input(&self) -> Speakers {
        match self.nodes.first() {
            Some(node) => node.filter.get_input(),
            None => Speakers::unknown(),
        }
    }

    fn get_output(&self) -> Speakers {
        match self.nodes.last() {
            Some(node) => node.filter.get_output(),
            None => Speakers::unknown(),
        }
    }

    fn reset(&mut self) {
        for node in &mut self.nodes {
            node.filter.reset();
            node.input = Chunk::dummy();
            node.flushing = false;
            node.reopen = None;
            node.drained = false;
            node.format_change = false;
        }
        self.draining = false;
        self.is_new_stream = false;
    }

    fn process(&mut self, input: &mut Chunk, output: &mut Chunk) -> Result<bool> {
        if self.nodes.is_empty() {
            *output = std::mem::take(input);
            return Ok(!output.is_dummy());
        }

        self.draining = false;
        for node in &mut self.nodes {
            node.drained = false;
        }

        if self.nodes[0].input.is_dummy() && !input.is_dummy() {
            self.nodes[0].input = std::mem::take(input);
        }

        match self.pull(self.nodes.len() - 1)? {
            Some((chunk, new_stream)) => {
                *output = chunk;
                self.is_new_stream = new_stream;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn flush(&mut self, output: &mut Chunk) -> Result<bool> {
        if self.nodes.is_empty() {
            return Ok(false);
        }

        self.draining = true;
        match self.pull(self.nodes.len() - 1)? {
            Some((chunk, new_stream)) => {
                *output = chunk;
                self.is_new_stream = new_stream;
                Ok(true)
            }
            None => {
                // Fully drained; arm a fresh drain for the next stream.
                self.draining = false;
                for node in &mut self.nodes {
                    node.drained = false;
                }
                Ok(false)
            }
        }
    }

    fn new_stream(&self) -> bool {
        self.is_new_stream
    }
}
