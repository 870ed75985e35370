// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::audio::buf::{Bytes, Samples};
use crate::audio::channels::Channel;
use crate::audio::sample::Sample;

/// Stream time in seconds.
pub type Time = f64;

/// Planar multichannel sample windows, one per channel in canonical order.
///
/// Channel reordering permutes the window handles; no sample data is copied.
#[derive(Clone, Debug, Default)]
pub struct Planar(pub Vec<Samples>);

impl Planar {
    pub fn nch(&self) -> usize {
        self.0.len()
    }

    /// Samples per channel. All planes have equal length.
    pub fn len(&self) -> usize {
        self.0.first().map_or(0, |plane| plane.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn plane(&self, ch: usize) -> &[Sample] {
        &self.0[ch]
    }

    /// Drops `n` samples from the beginning of every plane.
    pub fn advance(&mut self, n: usize) {
        for plane in &mut self.0 {
            plane.advance(n);
        }
    }

    /// Permutes the channel windows from one channel order to another.
    ///
    /// `from` and `to` name the same set of channels; the plane that was at
    /// the position of a channel in `from` ends up at its position in `to`.
    /// This is a handle shuffle, not a sample copy.
    pub fn reorder(&mut self, from: &[Channel], to: &[Channel]) {
        assert_eq!(from.len(), self.0.len());
        assert_eq!(to.len(), self.0.len());

        let mut reordered: Vec<Samples> = Vec::with_capacity(self.0.len());
        for ch in to {
            let src = from.iter().position(|c| c == ch).expect("channel sets must match");
            reordered.push(self.0[src].clone());
        }
        self.0 = reordered;
    }
}

/// The payload of a chunk: nothing, raw bytes, or planar samples.
#[derive(Clone, Debug, Default)]
pub enum ChunkData {
    #[default]
    Empty,
    Raw(Bytes),
    Linear(Planar),
}

/// A part of an audio stream.
///
/// Chunks transfer data and time stamps between sources, filters and sinks.
/// The format of the data is determined by the output format of the node
/// that produced the chunk; the chunk itself carries only the payload.
///
/// When `sync` is set, `time` applies to the first sample or byte of the
/// chunk. For compressed data the first sync point of the chunk is meant:
/// when a chunk contains the tail of one frame and the head of the next, the
/// time belongs to the first sample of the new frame.
///
/// A chunk with no data and no time stamp is a *dummy* chunk and carries no
/// information at all. An *empty* chunk with `sync` set marks the end of the
/// stream.
#[derive(Clone, Debug, Default)]
pub struct Chunk {
    pub data: ChunkData,
    pub sync: bool,
    pub time: Time,
}

impl Chunk {
    /// A dummy chunk: no data, no time stamp.
    pub fn dummy() -> Chunk {
        Chunk::default()
    }

    /// An empty chunk with a time stamp (the end-of-stream marker).
    pub fn eos(time: Time) -> Chunk {
        Chunk { data: ChunkData::Empty, sync: true, time }
    }

    pub fn raw(data: Bytes) -> Chunk {
        Chunk { data: ChunkData::Raw(data), sync: false, time: 0.0 }
    }

    pub fn linear(data: Planar) -> Chunk {
        Chunk { data: ChunkData::Linear(data), sync: false, time: 0.0 }
    }

    pub fn with_sync(mut self, time: Time) -> Chunk {
        self.sync = true;
        self.time = time;
        self
    }

    /// Element count: bytes for raw data, samples per channel for linear.
    pub fn size(&self) -> usize {
        match &self.data {
            ChunkData::Empty => 0,
            ChunkData::Raw(bytes) => bytes.len(),
            ChunkData::Linear(planar) => planar.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Dummy chunk: no data and no time stamp.
    pub fn is_dummy(&self) -> bool {
        self.is_empty() && !self.sync
    }

    /// End-of-stream marker: no data but a time stamp.
    pub fn is_eos(&self) -> bool {
        self.is_empty() && self.sync
    }

    /// Drops data and time stamp; the chunk becomes dummy.
    pub fn clear(&mut self) {
        *self = Chunk::default();
    }

    /// Raw payload accessor; panics when the chunk is not raw.
    pub fn raw_data(&self) -> &Bytes {
        match &self.data {
            ChunkData::Raw(bytes) => bytes,
            _ => panic!("chunk does not carry raw data"),
        }
    }

    /// Linear payload accessor; panics when the chunk is not linear.
    pub fn planar(&self) -> &Planar {
        match &self.data {
            ChunkData::Linear(planar) => planar,
            _ => panic!("chunk does not carry linear data"),
        }
    }

    /// Drops `n` elements from the beginning of the chunk. The time stamp is
    /// dropped: it applied to data that is no longer there.
    pub fn advance(&mut self, n: usize) {
        match &mut self.data {
            ChunkData::Empty => (),
            ChunkData::Raw(bytes) => bytes.advance(n),
            ChunkData::Linear(planar) => planar.advance(n),
        }
        self.sync = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buf::{Bytes, SampleBuf};

    #[test]
    fn verify_chunk_classes() {
        assert!(Chunk::dummy().is_dummy());
        assert!(!Chunk::dummy().is_eos());

        let eos = Chunk::eos(1.5);
        assert!(eos.is_eos());
        assert!(!eos.is_dummy());
        assert_eq!(eos.time, 1.5);

        let raw = Chunk::raw(Bytes::from_vec(vec![0; 16]));
        assert!(!raw.is_dummy());
        assert!(!raw.is_eos());
        assert_eq!(raw.size(), 16);
    }

    #[test]
    fn verify_advance_drops_sync() {
        let mut chunk = Chunk::raw(Bytes::from_vec(vec![0, 1, 2, 3])).with_sync(0.5);
        chunk.advance(2);
        assert_eq!(chunk.size(), 2);
        assert!(!chunk.sync);
        assert_eq!(&chunk.raw_data()[..], &[2, 3]);
    }

    #[test]
    fn verify_reorder() {
        let mut buf = SampleBuf::new(3, 2);
        buf.plane(0).copy_from_slice(&[1.0, 1.0]);
        buf.plane(1).copy_from_slice(&[2.0, 2.0]);
        buf.plane(2).copy_from_slice(&[3.0, 3.0]);

        // Planes are L, C, R; permute to the interleaved-wav-like L, R, C.
        let mut planar = Planar(buf.share(0, 2));
        planar.reorder(
            &[Channel::L, Channel::C, Channel::R],
            &[Channel::L, Channel::R, Channel::C],
        );
        assert_eq!(planar.plane(0)[0], 1.0);
        assert_eq!(planar.plane(1)[0], 3.0);
        assert_eq!(planar.plane(2)[0], 2.0);
    }
}
