// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `parser` module implements frame synchronization for elementary audio
//! streams: the sync trie, the codec-parametric [`FrameParser`] interface and
//! the [`StreamBuffer`] that assembles whole frames out of arbitrary input
//! windows.

mod multi;
mod streambuf;
mod trie;

pub use multi::MultiFrameParser;
pub use streambuf::{Frame, StreamBuffer, StreamEvent};
pub use trie::{ScanResult, SyncScan, SyncTrie};

use crate::audio::{Format, Speakers};

/// Bitstream word layout of a compressed frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum BsType {
    /// Plain byte stream.
    #[default]
    Byte,
    /// 16-bit big-endian words.
    Be16,
    /// 16-bit little-endian words.
    Le16,
    /// 14 payload bits per 16-bit big-endian word.
    Be14,
    /// 14 payload bits per 16-bit little-endian word.
    Le14,
}

/// Per-frame descriptor produced by header parsing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameInfo {
    /// Stream format derived from the frame header.
    pub spk: Speakers,
    /// Frame size in bytes; 0 when the size is not carried by the header and
    /// the frame extends to the next sync point.
    pub frame_size: usize,
    /// Samples per channel the frame decodes to.
    pub nsamples: usize,
    /// Word layout of the frame body.
    pub bs_type: BsType,
    /// IEC 61937 payload identifier, 0 when not applicable.
    pub spdif_type: u16,
}

/// Synchronization parameters of a codec (or a set of codecs).
#[derive(Clone, Debug)]
pub struct SyncInfo {
    pub sync_trie: SyncTrie,
    pub min_frame_size: usize,
    pub max_frame_size: usize,
}

impl SyncInfo {
    pub fn new(sync_trie: SyncTrie, min_frame_size: usize, max_frame_size: usize) -> SyncInfo {
        SyncInfo { sync_trie, min_frame_size, max_frame_size }
    }
}

/// Codec-parametric frame parsing interface.
///
/// A frame parser is stateless: it declares the sync patterns of its codec
/// and knows how to validate and describe a frame header. All stream state
/// (current position, previous header, resynchronization) lives in
/// [`StreamBuffer`].
pub trait FrameParser {
    /// True when the parser can parse a stream of the given format.
    fn can_parse(&self, format: Format) -> bool;

    /// The sync trie and frame size bounds of the codec.
    fn sync_info(&self) -> SyncInfo;

    /// The number of bytes [`parse_header`] needs.
    ///
    /// [`parse_header`]: FrameParser::parse_header
    fn header_size(&self) -> usize;

    /// Validates a tentative frame header and derives the frame parameters.
    fn parse_header(&self, hdr: &[u8]) -> Option<FrameInfo>;

    /// True when two headers carry the same stream parameters. A change
    /// marks a new stream.
    fn compare_headers(&self, hdr1: &[u8], hdr2: &[u8]) -> bool;

    /// Narrows the sync parameters once a frame is known, e.g. to lock onto
    /// one bitstream endianness. The default keeps the generic parameters.
    fn build_syncinfo(&self, frame: &[u8], info: &FrameInfo) -> SyncInfo {
        let _ = (frame, info);
        self.sync_info()
    }
}
