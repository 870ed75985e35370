// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Project Resona is a streaming audio processing library: a filter graph
//! protocol for composable processing nodes, a frame parser that locates
//! codec frames in raw byte streams with a compiled sync trie, and a
//! composable FIR generator algebra.
//!
//! This crate ties the workspace together and provides sensible defaults;
//! the individual crates can also be used directly.

pub use resona_core as core;

pub use resona_filters as filters;
pub use resona_format_pes as pes;
pub use resona_format_spdif as spdif;
pub use resona_format_wav as wav;
pub use resona_parsers as parsers;

pub mod default {
    //! Default registries.

    use resona_core::parser::MultiFrameParser;
    use resona_format_pes::PesFrameParser;
    use resona_format_spdif::SpdifFrameParser;
    use resona_parsers::{Ac3FrameParser, AdtsFrameParser, DtsFrameParser, MpaFrameParser};

    /// A parser for anything the library can frame: S/PDIF bursts, AC-3,
    /// DTS, MPEG Audio, AAC ADTS and PES packets.
    pub fn frame_parsers() -> MultiFrameParser {
        MultiFrameParser::new(vec![
            Box::new(SpdifFrameParser::new()),
            Box::new(Ac3FrameParser::new()),
            Box::new(DtsFrameParser::new()),
            Box::new(MpaFrameParser::new()),
            Box::new(AdtsFrameParser::new()),
            Box::new(PesFrameParser::new()),
        ])
    }

    /// The elementary stream parsers only, without the container layers.
    pub fn elementary_parsers() -> MultiFrameParser {
        MultiFrameParser::new(vec![
            Box::new(Ac3FrameParser::new()),
            Box::new(DtsFrameParser::new()),
            Box::new(MpaFrameParser::new()),
            Box::new(AdtsFrameParser::new()),
        ])
    }
}
