// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;

/// Audio data format.
///
/// Formats are different only when the rest of the pipeline has to
/// distinguish them. A format describes the data inside a chunk, not the file
/// container it came from: 16-bit PCM from a WAV file and from a raw file is
/// the same `Pcm16`.
///
/// Two special formats exist. `Unknown` marks a stream whose format has not
/// been determined yet (or an error upstream). `Linear` is the planar
/// floating point representation almost all processing is done in.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Format {
    #[default]
    Unknown,
    /// Planar per-channel `f64` samples.
    Linear,

    // PCM little-endian (native) formats.
    Pcm16,
    Pcm24,
    Pcm32,
    // PCM big-endian formats.
    Pcm16Be,
    Pcm24Be,
    Pcm32Be,
    /// Interleaved 32-bit IEEE float.
    PcmFloat,
    /// Interleaved 64-bit IEEE float.
    PcmDouble,
    /// DVD-style byte-packed 20-bit LPCM.
    Lpcm20,
    /// DVD-style byte-packed 24-bit LPCM.
    Lpcm24,

    // Container formats.
    /// MPEG-1/2 Packetized Elementary Stream.
    Pes,
    /// IEC 61937 (S/PDIF) stream.
    Spdif,

    // Compressed formats.
    Ac3,
    Eac3,
    /// Either AC-3 or E-AC-3; used by parsers that accept both bitstreams.
    Ac3Eac3,
    Dts,
    Mpa,
    Aac,
    Flac,
    Vorbis,
    Mlp,
    TrueHd,

    /// General binary data with no known structure, e.g. input to the stream
    /// type detector.
    RawData,
}

impl Format {
    /// Returns true for raw PCM formats (not including `Linear`).
    pub fn is_pcm(&self) -> bool {
        use Format::*;
        matches!(
            *self,
            Pcm16 | Pcm24 | Pcm32 | Pcm16Be | Pcm24Be | Pcm32Be | PcmFloat | PcmDouble | Lpcm20
                | Lpcm24
        )
    }

    /// Returns true for compressed elementary stream formats.
    pub fn is_compressed(&self) -> bool {
        use Format::*;
        matches!(*self, Ac3 | Eac3 | Ac3Eac3 | Dts | Mpa | Aac | Flac | Vorbis | Mlp | TrueHd)
    }

    /// Returns true for formats that may be carried inside an IEC 61937
    /// stream.
    pub fn is_spdifable(&self) -> bool {
        use Format::*;
        matches!(*self, Ac3 | Eac3 | Ac3Eac3 | Dts | Mpa)
    }

    /// Returns true for container formats.
    pub fn is_container(&self) -> bool {
        matches!(*self, Format::Pes | Format::Spdif)
    }

    /// The size in bytes of one sample of one channel for raw PCM formats,
    /// `None` otherwise.
    ///
    /// The byte-packed LPCM formats have no per-sample size; they are handled
    /// in sample pairs by the converter.
    pub fn sample_size(&self) -> Option<usize> {
        match *self {
            Format::Pcm16 | Format::Pcm16Be => Some(2),
            Format::Pcm24 | Format::Pcm24Be => Some(3),
            Format::Pcm32 | Format::Pcm32Be => Some(4),
            Format::PcmFloat => Some(4),
            Format::PcmDouble => Some(8),
            _ => None,
        }
    }

    /// The natural full-scale amplitude of the format (the `level` a
    /// `Speakers` of this format defaults to).
    pub fn default_level(&self) -> f64 {
        match *self {
            Format::Pcm16 | Format::Pcm16Be => 32767.5,
            Format::Lpcm20 => 524287.5,
            Format::Pcm24 | Format::Pcm24Be | Format::Lpcm24 => 8388607.5,
            Format::Pcm32 | Format::Pcm32Be => 2147483647.5,
            _ => 1.0,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match *self {
            Format::Unknown => "Unknown",
            Format::Linear => "Linear PCM",
            Format::Pcm16 => "PCM16",
            Format::Pcm24 => "PCM24",
            Format::Pcm32 => "PCM32",
            Format::Pcm16Be => "PCM16 BE",
            Format::Pcm24Be => "PCM24 BE",
            Format::Pcm32Be => "PCM32 BE",
            Format::PcmFloat => "PCM Float",
            Format::PcmDouble => "PCM Double",
            Format::Lpcm20 => "LPCM 20bit",
            Format::Lpcm24 => "LPCM 24bit",
            Format::Pes => "MPEG Program Stream",
            Format::Spdif => "SPDIF",
            Format::Ac3 => "AC3",
            Format::Eac3 => "EAC3",
            Format::Ac3Eac3 => "AC3/EAC3",
            Format::Dts => "DTS",
            Format::Mpa => "MPEG Audio",
            Format::Aac => "AAC",
            Format::Flac => "FLAC",
            Format::Vorbis => "Vorbis",
            Format::Mlp => "MLP",
            Format::TrueHd => "TrueHD",
            Format::RawData => "Raw data",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_format_classes() {
        assert!(Format::Pcm16.is_pcm());
        assert!(Format::Lpcm20.is_pcm());
        assert!(!Format::Linear.is_pcm());
        assert!(!Format::Ac3.is_pcm());

        assert!(Format::Ac3.is_compressed());
        assert!(Format::Ac3.is_spdifable());
        assert!(Format::Aac.is_compressed());
        assert!(!Format::Aac.is_spdifable());

        assert!(Format::Pes.is_container());
        assert!(Format::Spdif.is_container());
        assert!(!Format::Ac3.is_container());
    }

    #[test]
    fn verify_sample_size() {
        assert_eq!(Format::Pcm16.sample_size(), Some(2));
        assert_eq!(Format::Pcm24Be.sample_size(), Some(3));
        assert_eq!(Format::PcmDouble.sample_size(), Some(8));
        assert_eq!(Format::Linear.sample_size(), None);
        assert_eq!(Format::Ac3.sample_size(), None);
    }
}
