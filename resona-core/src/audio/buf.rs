// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared data windows and producer-side write buffers.
//!
//! A [`Bytes`] or [`Samples`] is a cheaply clonable window into a reference
//! counted block. Passing one downstream hands the data over without copying
//! a byte; trimming a consumed prefix is plain window arithmetic.
//!
//! A [`ByteBuf`] or [`SampleBuf`] is the matching producer side: a node that
//! generates data writes into the buffer and shares windows of it. Writing is
//! only possible while no window of the current block is alive downstream;
//! when one is, the buffer quietly starts a fresh block instead, so a
//! producer never invalidates data it already handed out.

use std::ops::Deref;
use std::sync::Arc;

use crate::audio::sample::Sample;

/// A shared window into a reference counted byte block.
#[derive(Clone, Debug, Default)]
pub struct Bytes {
    buf: Arc<[u8]>,
    start: usize,
    end: usize,
}

impl Bytes {
    /// Wraps a whole block.
    pub fn from_vec(data: Vec<u8>) -> Bytes {
        let end = data.len();
        Bytes { buf: Arc::from(data), start: 0, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// A sub-window of this window. Panics when the range is out of bounds.
    pub fn window(&self, start: usize, len: usize) -> Bytes {
        assert!(start + len <= self.len());
        Bytes { buf: self.buf.clone(), start: self.start + start, end: self.start + start + len }
    }

    /// Drops `n` bytes from the beginning of the window.
    pub fn advance(&mut self, n: usize) {
        self.start += n.min(self.len());
    }
}

impl Deref for Bytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf[self.start..self.end]
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(data: Vec<u8>) -> Bytes {
        Bytes::from_vec(data)
    }
}

impl From<&[u8]> for Bytes {
    fn from(data: &[u8]) -> Bytes {
        Bytes::from_vec(data.to_vec())
    }
}

/// A byte block a producer writes into and shares windows of.
#[derive(Default)]
pub struct ByteBuf {
    buf: Arc<[u8]>,
}

impl ByteBuf {
    pub fn new(len: usize) -> ByteBuf {
        ByteBuf { buf: Arc::from(vec![0u8; len]) }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Mutable access to the whole block for the next write.
    ///
    /// When a window of the current block is still alive downstream, a fresh
    /// block of the same size is allocated and returned instead. Previous
    /// contents are not preserved either way.
    pub fn fill(&mut self, len: usize) -> &mut [u8] {
        if self.buf.len() != len || Arc::get_mut(&mut self.buf).is_none() {
            self.buf = Arc::from(vec![0u8; len]);
        }
        // The block is uniquely owned at this point.
        Arc::get_mut(&mut self.buf).unwrap()
    }

    /// Shares a window of the block most recently written with [`fill`].
    ///
    /// [`fill`]: ByteBuf::fill
    pub fn share(&self, start: usize, len: usize) -> Bytes {
        assert!(start + len <= self.buf.len());
        Bytes { buf: self.buf.clone(), start, end: start + len }
    }
}

/// A shared window into one channel of reference counted samples.
#[derive(Clone, Debug, Default)]
pub struct Samples {
    buf: Arc<[Sample]>,
    start: usize,
    end: usize,
}

impl Samples {
    pub fn from_vec(data: Vec<Sample>) -> Samples {
        let end = data.len();
        Samples { buf: Arc::from(data), start: 0, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn window(&self, start: usize, len: usize) -> Samples {
        assert!(start + len <= self.len());
        Samples { buf: self.buf.clone(), start: self.start + start, end: self.start + start + len }
    }

    pub fn advance(&mut self, n: usize) {
        self.start += n.min(self.len());
    }
}

impl Deref for Samples {
    type Target = [Sample];

    fn deref(&self) -> &[Sample] {
        &self.buf[self.start..self.end]
    }
}

impl From<Vec<Sample>> for Samples {
    fn from(data: Vec<Sample>) -> Samples {
        Samples::from_vec(data)
    }
}

/// A planar multichannel sample block a producer writes into and shares
/// windows of.
#[derive(Default)]
pub struct SampleBuf {
    planes: Vec<Arc<[Sample]>>,
    len: usize,
}

impl SampleBuf {
    pub fn new(nch: usize, len: usize) -> SampleBuf {
        SampleBuf { planes: (0..nch).map(|_| Arc::from(vec![0.0; len])).collect(), len }
    }

    pub fn nch(&self) -> usize {
        self.planes.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reshapes the buffer for the next write. Previous contents are not
    /// preserved.
    pub fn reshape(&mut self, nch: usize, len: usize) {
        if self.planes.len() != nch || self.len != len {
            *self = SampleBuf::new(nch, len);
        }
    }

    /// Mutable access to one channel plane for the next write.
    ///
    /// Like [`ByteBuf::fill`], allocates a fresh plane when the current one
    /// is still shared downstream.
    pub fn plane(&mut self, ch: usize) -> &mut [Sample] {
        if Arc::get_mut(&mut self.planes[ch]).is_none() {
            self.planes[ch] = Arc::from(vec![0.0; self.len]);
        }
        Arc::get_mut(&mut self.planes[ch]).unwrap()
    }

    /// Shares a window of every channel plane.
    pub fn share(&self, start: usize, len: usize) -> Vec<Samples> {
        assert!(start + len <= self.len);
        self.planes
            .iter()
            .map(|plane| Samples { buf: plane.clone(), start, end: start + len })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_bytes_window() {
        let bytes = Bytes::from_vec(vec![0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[..], &[0, 1, 2, 3, 4, 5, 6, 7]);

        let win = bytes.window(2, 4);
        assert_eq!(&win[..], &[2, 3, 4, 5]);

        let sub = win.window(1, 2);
        assert_eq!(&sub[..], &[3, 4]);

        let mut tail = bytes.clone();
        tail.advance(6);
        assert_eq!(&tail[..], &[6, 7]);
        tail.advance(10);
        assert!(tail.is_empty());
    }

    #[test]
    fn verify_bytebuf_write_isolation() {
        let mut buf = ByteBuf::new(4);
        buf.fill(4).copy_from_slice(&[1, 2, 3, 4]);
        let shared = buf.share(0, 4);

        // The shared window pins the block; the next write goes to a fresh
        // one and the window keeps its bytes.
        buf.fill(4).copy_from_slice(&[5, 6, 7, 8]);
        assert_eq!(&shared[..], &[1, 2, 3, 4]);
        assert_eq!(&buf.share(0, 4)[..], &[5, 6, 7, 8]);
    }

    #[test]
    fn verify_samplebuf() {
        let mut buf = SampleBuf::new(2, 4);
        buf.plane(0).copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        buf.plane(1).copy_from_slice(&[5.0, 6.0, 7.0, 8.0]);

        let planes = buf.share(1, 2);
        assert_eq!(planes.len(), 2);
        assert_eq!(&planes[0][..], &[2.0, 3.0]);
        assert_eq!(&planes[1][..], &[6.0, 7.0]);

        buf.plane(0)[0] = -1.0;
        assert_eq!(planes[0][0], 2.0);
    }
}
