// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The mapping between [`Speakers`] and the `WAVEFORMATEX` /
//! `WAVEFORMATEXTENSIBLE` structures of a `fmt ` chunk.

use resona_core::audio::{Channel, ChannelMask, Format, Speakers, MODE_MONO, MODE_STEREO};

pub const WAVE_FORMAT_PCM: u16 = 0x0001;
pub const WAVE_FORMAT_IEEE_FLOAT: u16 = 0x0003;
pub const WAVE_FORMAT_EXTENSIBLE: u16 = 0xfffe;

const GUID_PCM: [u8; 16] = [
    0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xaa, 0x00, 0x38, 0x9b,
    0x71,
];
const GUID_IEEE_FLOAT: [u8; 16] = [
    0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xaa, 0x00, 0x38, 0x9b,
    0x71,
];

/// Channels in WAVE mask order: this is also the on-disk channel order of an
/// extensible WAVE file, which differs from the library's canonical order.
const WAVE_ORDER: [(Channel, u32); 11] = [
    (Channel::L, 0x0001),
    (Channel::R, 0x0002),
    (Channel::C, 0x0004),
    (Channel::Lfe, 0x0008),
    (Channel::Bl, 0x0010),
    (Channel::Br, 0x0020),
    (Channel::Cl, 0x0040),
    (Channel::Cr, 0x0080),
    (Channel::Bc, 0x0100),
    (Channel::Sl, 0x0200),
    (Channel::Sr, 0x0400),
];

/// Converts the library channel mask into a WAVE `dwChannelMask`.
pub fn mask_to_wave(mask: ChannelMask) -> u32 {
    WAVE_ORDER
        .iter()
        .filter(|(ch, _)| mask.contains(ch.mask()))
        .fold(0, |acc, (_, bit)| acc | bit)
}

/// Converts a WAVE `dwChannelMask` into the library channel mask. Bits with
/// no counterpart are dropped.
pub fn mask_from_wave(wave: u32) -> ChannelMask {
    WAVE_ORDER
        .iter()
        .filter(|(_, bit)| wave & bit != 0)
        .fold(ChannelMask::empty(), |acc, (ch, _)| acc | ch.mask())
}

/// The channels of `mask` in WAVE on-disk order.
pub fn wave_order(mask: ChannelMask) -> Vec<Channel> {
    WAVE_ORDER.iter().filter(|(ch, _)| mask.contains(ch.mask())).map(|(ch, _)| *ch).collect()
}

/// A default channel mask for a plain (non-extensible) channel count.
fn default_mask(nch: u16) -> Option<ChannelMask> {
    match nch {
        1 => Some(MODE_MONO),
        2 => Some(MODE_STEREO),
        4 => Some(resona_core::audio::MODE_QUADRO),
        6 => Some(resona_core::audio::MODE_5_1),
        8 => Some(resona_core::audio::MODE_7_1),
        _ => None,
    }
}

/// Builds the `fmt ` chunk body for a format. Returns `None` for formats a
/// WAVE file cannot carry.
///
/// Mono and stereo integer PCM use the plain 18-byte `WAVEFORMATEX`; other
/// layouts use `WAVEFORMATEXTENSIBLE`. An IEC 61937 stream is written as the
/// 16-bit stereo PCM it is shaped like.
pub fn speakers_to_fmt(spk: &Speakers) -> Option<Vec<u8>> {
    let (tag, bits, guid, mask, nch, sample_rate) = match spk.format {
        Format::Pcm16 => (WAVE_FORMAT_PCM, 16u16, GUID_PCM, spk.mask, spk.nch(), spk.sample_rate),
        Format::Pcm24 => (WAVE_FORMAT_PCM, 24, GUID_PCM, spk.mask, spk.nch(), spk.sample_rate),
        Format::Pcm32 => (WAVE_FORMAT_PCM, 32, GUID_PCM, spk.mask, spk.nch(), spk.sample_rate),
        Format::PcmFloat => {
            (WAVE_FORMAT_IEEE_FLOAT, 32, GUID_IEEE_FLOAT, spk.mask, spk.nch(), spk.sample_rate)
        }
        Format::PcmDouble => {
            (WAVE_FORMAT_IEEE_FLOAT, 64, GUID_IEEE_FLOAT, spk.mask, spk.nch(), spk.sample_rate)
        }
        Format::Spdif => (WAVE_FORMAT_PCM, 16, GUID_PCM, MODE_STEREO, 2, spk.sample_rate),
        _ => return None,
    };

    if nch == 0 || sample_rate == 0 {
        return None;
    }

    let block_align = (u32::from(bits) / 8) * nch as u32;
    let avg_bytes = sample_rate * block_align;
    let extensible = mask != MODE_MONO && mask != MODE_STEREO;

    let mut fmt = Vec::with_capacity(40);
    let write_common = |fmt: &mut Vec<u8>, tag: u16, cb_size: u16| {
        fmt.extend_from_slice(&tag.to_le_bytes());
        fmt.extend_from_slice(&(nch as u16).to_le_bytes());
        fmt.extend_from_slice(&sample_rate.to_le_bytes());
        fmt.extend_from_slice(&avg_bytes.to_le_bytes());
        fmt.extend_from_slice(&(block_align as u16).to_le_bytes());
        fmt.extend_from_slice(&bits.to_le_bytes());
        fmt.extend_from_slice(&cb_size.to_le_bytes());
    };

    if extensible {
        write_common(&mut fmt, WAVE_FORMAT_EXTENSIBLE, 22);
        fmt.extend_from_slice(&bits.to_le_bytes()); // valid bits
        fmt.extend_from_slice(&mask_to_wave(mask).to_le_bytes());
        fmt.extend_from_slice(&guid);
    }
    else {
        write_common(&mut fmt, tag, 0);
    }
    Some(fmt)
}

/// Maps a `fmt ` chunk body back to a format. Unknown formats map to `None`;
/// the caller decides whether to surface them as raw data.
pub fn fmt_to_speakers(fmt: &[u8]) -> Option<Speakers> {
    if fmt.len() < 16 {
        return None;
    }

    let tag = u16::from_le_bytes([fmt[0], fmt[1]]);
    let nch = u16::from_le_bytes([fmt[2], fmt[3]]);
    let sample_rate = u32::from_le_bytes([fmt[4], fmt[5], fmt[6], fmt[7]]);
    let bits = u16::from_le_bytes([fmt[14], fmt[15]]);

    let (tag, mask) = if tag == WAVE_FORMAT_EXTENSIBLE {
        if fmt.len() < 40 {
            return None;
        }
        let wave_mask = u32::from_le_bytes([fmt[20], fmt[21], fmt[22], fmt[23]]);
        let guid = &fmt[24..40];
        let tag = if guid == GUID_PCM {
            WAVE_FORMAT_PCM
        }
        else if guid == GUID_IEEE_FLOAT {
            WAVE_FORMAT_IEEE_FLOAT
        }
        else {
            return None;
        };
        (tag, mask_from_wave(wave_mask))
    }
    else {
        (tag, default_mask(nch)?)
    };

    if mask.count() != usize::from(nch) {
        return None;
    }

    let format = match (tag, bits) {
        (WAVE_FORMAT_PCM, 16) => Format::Pcm16,
        (WAVE_FORMAT_PCM, 24) => Format::Pcm24,
        (WAVE_FORMAT_PCM, 32) => Format::Pcm32,
        (WAVE_FORMAT_IEEE_FLOAT, 32) => Format::PcmFloat,
        (WAVE_FORMAT_IEEE_FLOAT, 64) => Format::PcmDouble,
        _ => return None,
    };

    Some(Speakers::new(format, mask, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use resona_core::audio::MODE_5_1;

    #[test]
    fn verify_mask_mapping() {
        assert_eq!(mask_to_wave(MODE_STEREO), 0x0003);
        assert_eq!(mask_to_wave(MODE_5_1), 0x0001 | 0x0002 | 0x0004 | 0x0008 | 0x0200 | 0x0400);
        assert_eq!(mask_from_wave(0x0003), MODE_STEREO);
        assert_eq!(mask_from_wave(mask_to_wave(MODE_5_1)), MODE_5_1);
    }

    #[test]
    fn verify_wave_order_differs_from_canonical() {
        // Canonical: L C R SL SR LFE. On disk: L R C LFE SL SR.
        let canonical: Vec<Channel> = MODE_5_1.order().collect();
        let on_disk = wave_order(MODE_5_1);
        assert_eq!(
            canonical,
            [Channel::L, Channel::C, Channel::R, Channel::Sl, Channel::Sr, Channel::Lfe]
        );
        assert_eq!(
            on_disk,
            [Channel::L, Channel::R, Channel::C, Channel::Lfe, Channel::Sl, Channel::Sr]
        );
    }

    #[test]
    fn verify_stereo_pcm16_is_plain_waveformatex() {
        let spk = Speakers::new(Format::Pcm16, MODE_STEREO, 48000);
        let fmt = speakers_to_fmt(&spk).unwrap();

        assert_eq!(fmt.len(), 18);
        assert_eq!(
            fmt,
            [
                0x01, 0x00, // PCM
                0x02, 0x00, // 2 channels
                0x80, 0xbb, 0x00, 0x00, // 48000 Hz
                0x00, 0xee, 0x02, 0x00, // 192000 bytes/s
                0x04, 0x00, // block align
                0x10, 0x00, // 16 bits
                0x00, 0x00, // cbSize
            ]
        );
    }

    #[test]
    fn verify_multichannel_is_extensible() {
        let spk = Speakers::new(Format::Pcm16, MODE_5_1, 48000);
        let fmt = speakers_to_fmt(&spk).unwrap();
        assert_eq!(fmt.len(), 40);
        assert_eq!(u16::from_le_bytes([fmt[0], fmt[1]]), WAVE_FORMAT_EXTENSIBLE);
    }

    #[test]
    fn verify_round_trip() {
        for spk in [
            Speakers::new(Format::Pcm16, MODE_STEREO, 48000),
            Speakers::new(Format::Pcm24, MODE_5_1, 44100),
            Speakers::new(Format::PcmFloat, MODE_5_1, 96000),
            Speakers::new(Format::PcmDouble, MODE_STEREO, 192000),
        ] {
            let fmt = speakers_to_fmt(&spk).unwrap();
            assert_eq!(fmt_to_speakers(&fmt).unwrap(), spk);
        }
    }

    #[test]
    fn verify_unrepresentable_formats() {
        assert!(speakers_to_fmt(&Speakers::new(Format::Linear, MODE_STEREO, 48000)).is_none());
        assert!(speakers_to_fmt(&Speakers::new(Format::Pcm16Be, MODE_STEREO, 48000)).is_none());
        assert!(speakers_to_fmt(&Speakers::new(Format::Ac3, MODE_STEREO, 48000)).is_none());
    }

    #[test]
    fn verify_spdif_is_shaped_like_stereo_pcm() {
        let spk = Speakers::new(Format::Spdif, MODE_5_1, 48000);
        let fmt = speakers_to_fmt(&spk).unwrap();
        assert_eq!(fmt.len(), 18);
        assert_eq!(u16::from_le_bytes([fmt[2], fmt[3]]), 2);
        assert_eq!(u16::from_le_bytes([fmt[14], fmt[15]]), 16);
    }
}
