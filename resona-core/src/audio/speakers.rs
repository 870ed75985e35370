// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;
use std::sync::Arc;

use super::channels::ChannelMask;
use super::format::Format;

/// Relation between the channels of a stream.
///
/// Format and mask do not always fully describe a stream: two channels may
/// carry matrix-encoded surround or a sum-difference pair. The relation is an
/// independent stream characteristic carried along with the format.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Relation {
    #[default]
    None,
    /// Dolby Surround / Pro Logic matrix encoded stereo.
    Dolby,
    /// Dolby Pro Logic II matrix encoded stereo.
    DolbyPl2,
    /// Sum-difference encoded pair.
    SumDiff,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Relation::None => f.write_str("none"),
            Relation::Dolby => f.write_str("Dolby Surround"),
            Relation::DolbyPl2 => f.write_str("Dolby ProLogic II"),
            Relation::SumDiff => f.write_str("Sum-difference"),
        }
    }
}

/// Stream format descriptor: the minimal set of audio parameters the library
/// absolutely has to know about a stream.
///
/// A `Speakers` accompanies every chunk of data indirectly: it is the output
/// format of the source or filter that produced the chunk.
///
/// For compressed formats that carry the channel configuration and sample
/// rate in the bitstream, `mask` and `sample_rate` may be left zero at a
/// parser's input; a parser must fill them in at its output.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Speakers {
    pub format: Format,
    pub mask: ChannelMask,
    pub sample_rate: u32,
    pub relation: Relation,
    /// Absolute amplitude of the 0 dBFS level. Linear data is scaled so full
    /// scale is `±level`, not `±1`.
    pub level: f64,
    /// Opaque side information for codecs that need it (e.g. Vorbis setup
    /// headers). Reference counted; compared by bytes.
    pub format_data: Option<Arc<[u8]>>,
}

impl Speakers {
    /// Creates a descriptor with the format's natural full-scale level and no
    /// relation.
    pub fn new(format: Format, mask: ChannelMask, sample_rate: u32) -> Speakers {
        Speakers {
            format,
            mask,
            sample_rate,
            relation: Relation::None,
            level: format.default_level(),
            format_data: None,
        }
    }

    /// The unknown stream format.
    pub fn unknown() -> Speakers {
        Speakers { level: 1.0, ..Default::default() }
    }

    pub fn with_relation(mut self, relation: Relation) -> Speakers {
        self.relation = relation;
        self
    }

    pub fn with_level(mut self, level: f64) -> Speakers {
        self.level = level;
        self
    }

    pub fn with_format_data(mut self, data: Arc<[u8]>) -> Speakers {
        self.format_data = Some(data);
        self
    }

    /// The number of channels described by the mask.
    pub fn nch(&self) -> usize {
        self.mask.count()
    }

    pub fn is_unknown(&self) -> bool {
        self.format == Format::Unknown
    }

    pub fn is_linear(&self) -> bool {
        self.format == Format::Linear
    }

    pub fn is_pcm(&self) -> bool {
        self.format.is_pcm()
    }

    pub fn is_spdif(&self) -> bool {
        self.format == Format::Spdif
    }

    pub fn lfe(&self) -> bool {
        self.mask.contains(ChannelMask::LFE)
    }

    /// The size in bytes of one multichannel sample for raw PCM formats.
    pub fn sample_size(&self) -> Option<usize> {
        self.format.sample_size().map(|size| size * self.nch())
    }
}

impl fmt::Display for Speakers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}Hz", self.format, self.mask, self.sample_rate)?;
        if self.relation != Relation::None {
            write!(f, " ({})", self.relation)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::channels::{MODE_5_1, MODE_STEREO};

    #[test]
    fn verify_equality() {
        let a = Speakers::new(Format::Pcm16, MODE_STEREO, 48000);
        let b = Speakers::new(Format::Pcm16, MODE_STEREO, 48000);
        assert_eq!(a, b);

        assert_ne!(a, Speakers::new(Format::Pcm16, MODE_STEREO, 44100));
        assert_ne!(a, Speakers::new(Format::Pcm16Be, MODE_STEREO, 48000));
        assert_ne!(a, a.clone().with_level(1.0));
        assert_ne!(a, a.clone().with_relation(Relation::Dolby));
    }

    #[test]
    fn verify_format_data_compared_by_bytes() {
        let a = Speakers::new(Format::Vorbis, MODE_STEREO, 44100)
            .with_format_data(Arc::from(&b"setup"[..]));
        let b = Speakers::new(Format::Vorbis, MODE_STEREO, 44100)
            .with_format_data(Arc::from(&b"setup"[..]));
        let c = Speakers::new(Format::Vorbis, MODE_STEREO, 44100)
            .with_format_data(Arc::from(&b"other"[..]));

        // Distinct allocations with the same bytes compare equal.
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn verify_levels() {
        assert_eq!(Speakers::new(Format::Pcm16, MODE_STEREO, 48000).level, 32767.5);
        assert_eq!(Speakers::new(Format::Pcm32, MODE_STEREO, 48000).level, 2147483647.5);
        assert_eq!(Speakers::new(Format::PcmFloat, MODE_STEREO, 48000).level, 1.0);
    }

    #[test]
    fn verify_sample_size() {
        let spk = Speakers::new(Format::Pcm16, MODE_5_1, 48000);
        assert_eq!(spk.sample_size(), Some(12));
        assert_eq!(Speakers::new(Format::Ac3, MODE_5_1, 48000).sample_size(), None);
    }
}
