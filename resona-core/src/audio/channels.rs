// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;

use bitflags::bitflags;

/// The maximum number of channels a linear chunk may carry.
pub const MAX_CHANNELS: usize = 11;

bitflags! {
    /// A bitmask representing positional audio channels.
    ///
    /// The bit index of a channel is also its canonical order: channels with
    /// a smaller bit index are placed before channels with a larger one in a
    /// linear chunk. This order is the library's own; it is *not* the WAVE
    /// on-disk order, which is mapped explicitly at the RIFF boundary.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ChannelMask: u32 {
        /// Front left channel.
        const L   = 1 << 0;
        /// Front center channel, also the mono channel.
        const C   = 1 << 1;
        /// Front right channel.
        const R   = 1 << 2;
        /// Surround (side) left channel.
        const SL  = 1 << 3;
        /// Surround (side) right channel.
        const SR  = 1 << 4;
        /// Low-frequency effects channel.
        const LFE = 1 << 5;
        /// Front left-of-center channel.
        const CL  = 1 << 6;
        /// Front right-of-center channel.
        const CR  = 1 << 7;
        /// Back left channel.
        const BL  = 1 << 8;
        /// Back right channel.
        const BR  = 1 << 9;
        /// Back center channel.
        const BC  = 1 << 10;
    }
}

/// Common channel configurations.
pub const MODE_MONO: ChannelMask = ChannelMask::C;
pub const MODE_STEREO: ChannelMask = ChannelMask::L.union(ChannelMask::R);
pub const MODE_3_0: ChannelMask = MODE_STEREO.union(ChannelMask::C);
pub const MODE_2_1: ChannelMask = MODE_STEREO.union(ChannelMask::SL);
pub const MODE_3_1: ChannelMask = MODE_3_0.union(ChannelMask::SL);
pub const MODE_QUADRO: ChannelMask =
    MODE_STEREO.union(ChannelMask::SL).union(ChannelMask::SR);
pub const MODE_3_2: ChannelMask = MODE_3_0.union(ChannelMask::SL).union(ChannelMask::SR);
pub const MODE_5_1: ChannelMask = MODE_3_2.union(ChannelMask::LFE);
pub const MODE_7_1: ChannelMask = MODE_5_1.union(ChannelMask::BL).union(ChannelMask::BR);

/// A single channel name. The discriminant is the channel's bit index and
/// therefore its canonical order position.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Channel {
    L = 0,
    C = 1,
    R = 2,
    Sl = 3,
    Sr = 4,
    Lfe = 5,
    Cl = 6,
    Cr = 7,
    Bl = 8,
    Br = 9,
    Bc = 10,
}

impl Channel {
    /// All channels in canonical order.
    pub const ALL: [Channel; MAX_CHANNELS] = [
        Channel::L,
        Channel::C,
        Channel::R,
        Channel::Sl,
        Channel::Sr,
        Channel::Lfe,
        Channel::Cl,
        Channel::Cr,
        Channel::Bl,
        Channel::Br,
        Channel::Bc,
    ];

    /// The mask bit of this channel.
    pub fn mask(&self) -> ChannelMask {
        ChannelMask::from_bits_truncate(1 << (*self as u32))
    }
}

impl ChannelMask {
    /// The number of channels in the mask.
    pub fn count(&self) -> usize {
        self.bits().count_ones() as usize
    }

    /// Iterates the channels of the mask in canonical order.
    pub fn order(&self) -> impl Iterator<Item = Channel> + '_ {
        Channel::ALL.iter().copied().filter(|ch| self.contains(ch.mask()))
    }

    /// The canonical-order index of `ch` within this mask, or `None` when the
    /// mask does not contain the channel.
    pub fn index_of(&self, ch: Channel) -> Option<usize> {
        if !self.contains(ch.mask()) {
            return None;
        }
        Some((self.bits() & (ch.mask().bits() - 1)).count_ones() as usize)
    }
}

impl fmt::Display for ChannelMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == MODE_MONO {
            return f.write_str("Mono");
        }
        if *self == MODE_STEREO {
            return f.write_str("Stereo");
        }
        if *self == MODE_QUADRO {
            return f.write_str("Quadro");
        }
        if *self == MODE_5_1 {
            return f.write_str("5.1");
        }
        if *self == MODE_7_1 {
            return f.write_str("7.1");
        }

        let mut first = true;
        for ch in self.order() {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{:?}", ch)?;
            first = false;
        }
        if first {
            f.write_str("-")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_mask_bits() {
        // Bit values are load-bearing: they appear in streams and tests.
        assert_eq!(ChannelMask::L.bits(), 1);
        assert_eq!(ChannelMask::C.bits(), 2);
        assert_eq!(ChannelMask::R.bits(), 4);
        assert_eq!(ChannelMask::SL.bits(), 8);
        assert_eq!(ChannelMask::SR.bits(), 16);
        assert_eq!(ChannelMask::LFE.bits(), 32);
    }

    #[test]
    fn verify_count() {
        assert_eq!(MODE_MONO.count(), 1);
        assert_eq!(MODE_STEREO.count(), 2);
        assert_eq!(MODE_5_1.count(), 6);
        assert_eq!(MODE_7_1.count(), 8);
        assert_eq!(ChannelMask::empty().count(), 0);
    }

    #[test]
    fn verify_order() {
        let order: Vec<Channel> = MODE_5_1.order().collect();
        assert_eq!(
            order,
            [Channel::L, Channel::C, Channel::R, Channel::Sl, Channel::Sr, Channel::Lfe]
        );
    }

    #[test]
    fn verify_index_of() {
        assert_eq!(MODE_5_1.index_of(Channel::L), Some(0));
        assert_eq!(MODE_5_1.index_of(Channel::Lfe), Some(5));
        assert_eq!(MODE_STEREO.index_of(Channel::R), Some(1));
        assert_eq!(MODE_STEREO.index_of(Channel::C), None);
    }
}
