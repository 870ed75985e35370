// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::audio::Format;
use crate::parser::{FrameInfo, FrameParser, SyncInfo, SyncTrie};

/// Dispatches across a set of codec parsers.
///
/// The combined sync trie is the union of the member tries, so all members
/// scan in parallel; the first member whose header validates wins a frame.
/// Once a frame is known, [`build_syncinfo`] delegates to the winning member,
/// narrowing the scan to that one codec until the stream changes.
///
/// [`build_syncinfo`]: FrameParser::build_syncinfo
pub struct MultiFrameParser {
    parsers: Vec<Box<dyn FrameParser>>,
}

impl MultiFrameParser {
    pub fn new(parsers: Vec<Box<dyn FrameParser>>) -> MultiFrameParser {
        assert!(!parsers.is_empty());
        MultiFrameParser { parsers }
    }

    pub fn parsers(&self) -> &[Box<dyn FrameParser>] {
        &self.parsers
    }

    /// Index of the member that accepts this header, if any.
    fn find(&self, hdr: &[u8]) -> Option<usize> {
        self.parsers.iter().position(|parser| {
            hdr.len() >= parser.header_size() && parser.parse_header(hdr).is_some()
        })
    }
}

impl FrameParser for MultiFrameParser {
    fn can_parse(&self, format: Format) -> bool {
        self.parsers.iter().any(|parser| parser.can_parse(format))
    }

    fn sync_info(&self) -> SyncInfo {
        let mut trie = SyncTrie::empty();
        let mut min_frame_size = usize::MAX;
        let mut max_frame_size = 0;
        for parser in &self.parsers {
            let sinfo = parser.sync_info();
            trie |= sinfo.sync_trie;
            min_frame_size = min_frame_size.min(sinfo.min_frame_size);
            max_frame_size = max_frame_size.max(sinfo.max_frame_size);
        }
        SyncInfo::new(trie, min_frame_size, max_frame_size)
    }

    fn header_size(&self) -> usize {
        self.parsers.iter().map(|parser| parser.header_size()).max().unwrap_or(0)
    }

    fn parse_header(&self, hdr: &[u8]) -> Option<FrameInfo> {
        self.find(hdr).and_then(|idx| self.parsers[idx].parse_header(hdr))
    }

    fn compare_headers(&self, hdr1: &[u8], hdr2: &[u8]) -> bool {
        // Headers of different codecs never compare equal.
        match (self.find(hdr1), self.find(hdr2)) {
            (Some(idx1), Some(idx2)) if idx1 == idx2 => {
                self.parsers[idx1].compare_headers(hdr1, hdr2)
            }
            _ => false,
        }
    }

    fn build_syncinfo(&self, frame: &[u8], info: &FrameInfo) -> SyncInfo {
        match self.find(frame) {
            Some(idx) => self.parsers[idx].build_syncinfo(frame, info),
            None => self.sync_info(),
        }
    }
}
