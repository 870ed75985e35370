// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Frame assembly over arbitrary input windows.
//!
//! [`StreamBuffer`] drives a [`FrameParser`] over a byte stream delivered in
//! pieces: it scans for sync with the compiled trie, validates candidate
//! headers, assembles whole frames across window boundaries and reports the
//! bytes it scanned past as debris, so no data is dropped silently.
//!
//! Frames are returned as contiguous slices. When a whole frame lies inside
//! the current input window it is returned straight out of that window (zero
//! copy); a frame broken across windows is bridged through a private buffer.

use log::debug;

use crate::parser::{FrameInfo, FrameParser, ScanResult, SyncInfo, SyncScan};

/// A parsed frame: the frame bytes, the derived parameters, and whether this
/// frame opens a new stream.
#[derive(Debug)]
pub struct Frame<'a> {
    pub data: &'a [u8],
    pub info: FrameInfo,
    pub new_stream: bool,
}

/// One result of loading: either bytes that belong to no frame, or a frame.
#[derive(Debug)]
pub enum StreamEvent<'a> {
    /// Bytes scanned past while looking for sync. Passed through so the
    /// caller decides whether to forward or drop them.
    Debris(&'a [u8]),
    Frame(Frame<'a>),
}

/// Where an event's bytes live.
#[derive(Copy, Clone)]
enum Src {
    /// In the private bridging buffer.
    Buf,
    /// In the input window as it was on call entry.
    Entry,
}

#[derive(Copy, Clone)]
enum Step {
    None,
    Debris { src: Src, start: usize, len: usize },
    Frame { src: Src, start: usize, len: usize, new_stream: bool },
}

/// Byte-oriented sync acquisition and frame boundary detection.
///
/// The state machine: while out of sync, scan for a trie match, validate the
/// candidate header, and confirm it against the following frame start; on a
/// reject, back up one byte and retry. In sync, frames are emitted as soon as
/// they are complete; a header that stops validating drops back to scanning.
/// At end of stream [`flush`] drains the tail: a complete frame of known size
/// is emitted, anything else is debris (for formats that find the frame end
/// at the next sync point the tail cannot be confirmed and is lost).
///
/// [`flush`]: StreamBuffer::flush
pub struct StreamBuffer {
    parser: Box<dyn FrameParser>,
    sinfo: SyncInfo,
    scan: SyncScan,
    header_size: usize,

    buf: Vec<u8>,
    /// Prefix of `buf` emitted by the previous call, dropped on entry.
    pending_drop: usize,
    in_sync: bool,
    /// Header of the previously emitted frame; empty means the next frame
    /// opens a new stream.
    prev_header: Vec<u8>,
    last_info: Option<FrameInfo>,
    errors: u64,
}

impl StreamBuffer {
    pub fn new(parser: Box<dyn FrameParser>) -> StreamBuffer {
        let sinfo = parser.sync_info();
        let scan = sinfo.sync_trie.compile();
        let header_size = parser.header_size();
        StreamBuffer {
            parser,
            sinfo,
            scan,
            header_size,
            buf: Vec::new(),
            pending_drop: 0,
            in_sync: false,
            prev_header: Vec::new(),
            last_info: None,
            errors: 0,
        }
    }

    pub fn set_parser(&mut self, parser: Box<dyn FrameParser>) {
        *self = StreamBuffer::new(parser);
    }

    pub fn parser(&self) -> &dyn FrameParser {
        self.parser.as_ref()
    }

    /// Drops all buffered data and returns to the scanning state.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.pending_drop = 0;
        self.in_sync = false;
        self.prev_header.clear();
        self.last_info = None;
        self.restore_syncinfo();
    }

    pub fn is_in_sync(&self) -> bool {
        self.in_sync
    }

    /// Count of rejected sync candidates and sync losses so far.
    pub fn errors(&self) -> u64 {
        self.errors
    }

    /// Parameters of the most recently loaded frame.
    pub fn frame_info(&self) -> Option<&FrameInfo> {
        self.last_info.as_ref()
    }

    /// Loads the next event out of `input`, consuming the bytes used.
    ///
    /// Returns `None` when all input was consumed without completing an
    /// event; feed the next window (or [`flush`] at end of stream).
    ///
    /// [`flush`]: StreamBuffer::flush
    pub fn load<'s, 'i: 's>(&'s mut self, input: &mut &'i [u8]) -> Option<StreamEvent<'s>> {
        let entry: &'i [u8] = *input;
        match self.step(input) {
            Step::None => None,
            Step::Debris { src, start, len } => {
                Some(StreamEvent::Debris(self.slice(entry, src, start, len)))
            }
            Step::Frame { src, start, len, new_stream } => Some(StreamEvent::Frame(Frame {
                data: self.slice(entry, src, start, len),
                info: self.last_info.clone().expect("frame event without info"),
                new_stream,
            })),
        }
    }

    /// Like [`load`], but skips debris and returns only frames.
    ///
    /// [`load`]: StreamBuffer::load
    pub fn load_frame<'s, 'i: 's>(&'s mut self, input: &mut &'i [u8]) -> Option<Frame<'s>> {
        loop {
            let entry: &'i [u8] = *input;
            match self.step(input) {
                Step::None => return None,
                Step::Debris { .. } => continue,
                Step::Frame { src, start, len, new_stream } => {
                    return Some(Frame {
                        data: self.slice(entry, src, start, len),
                        info: self.last_info.clone().expect("frame event without info"),
                        new_stream,
                    });
                }
            }
        }
    }

    /// Drains the tail at end of stream, one event per call.
    pub fn flush(&mut self) -> Option<StreamEvent<'_>> {
        self.drop_pending();
        if self.buf.is_empty() {
            return None;
        }

        if self.in_sync && self.buf.len() >= self.header_size {
            if let Some(fi) = self.parser.parse_header(&self.buf[..self.header_size]) {
                if fi.frame_size > 0 && fi.frame_size <= self.buf.len() {
                    let hdr = self.buf[..self.header_size].to_vec();
                    let new_stream = self.prev_header.is_empty()
                        || !self.parser.compare_headers(&self.prev_header, &hdr);
                    self.prev_header = hdr;
                    self.pending_drop = fi.frame_size;
                    self.last_info = Some(fi.clone());
                    return Some(StreamEvent::Frame(Frame {
                        data: &self.buf[..fi.frame_size],
                        info: fi,
                        new_stream,
                    }));
                }
            }
        }

        // A tail that cannot be confirmed as a frame.
        let len = self.buf.len();
        self.pending_drop = len;
        Some(StreamEvent::Debris(&self.buf[..len]))
    }

    fn slice<'s>(&'s self, entry: &'s [u8], src: Src, start: usize, len: usize) -> &'s [u8] {
        match src {
            Src::Buf => &self.buf[start..start + len],
            Src::Entry => &entry[start..start + len],
        }
    }

    fn drop_pending(&mut self) {
        if self.pending_drop > 0 {
            self.buf.drain(..self.pending_drop);
            self.pending_drop = 0;
        }
    }

    fn set_syncinfo(&mut self, sinfo: SyncInfo) {
        self.scan = sinfo.sync_trie.compile();
        self.sinfo = sinfo;
    }

    fn restore_syncinfo(&mut self) {
        self.set_syncinfo(self.parser.sync_info());
    }

    fn lose_sync(&mut self) {
        debug!("streambuf: lost sync after {} errors", self.errors);
        self.errors += 1;
        self.in_sync = false;
        self.prev_header.clear();
        self.restore_syncinfo();
    }

    fn step(&mut self, input: &mut &[u8]) -> Step {
        self.drop_pending();

        // Fast path: in sync, nothing bridged, and the whole frame lies
        // inside the input window. The frame is emitted without copying.
        if self.in_sync && self.buf.is_empty() && input.len() >= self.header_size {
            if let Some(fi) = self.parser.parse_header(&input[..self.header_size]) {
                if fi.frame_size > 0 && fi.frame_size <= input.len() {
                    let frame_size = fi.frame_size;
                    let new_stream = self.prev_header.is_empty()
                        || !self
                            .parser
                            .compare_headers(&self.prev_header, &input[..self.header_size]);
                    if new_stream {
                        let sinfo = self.parser.build_syncinfo(&input[..frame_size], &fi);
                        self.set_syncinfo(sinfo);
                    }
                    self.prev_header = input[..self.header_size].to_vec();
                    self.last_info = Some(fi);
                    *input = &input[frame_size..];
                    return Step::Frame { src: Src::Entry, start: 0, len: frame_size, new_stream };
                }
            }
        }

        // General path: bridge through the private buffer.
        if !input.is_empty() {
            self.buf.extend_from_slice(input);
            *input = &[];
        }

        self.advance_buffered()
    }

    fn advance_buffered(&mut self) -> Step {
        'outer: loop {
            if self.in_sync {
                if self.buf.len() < self.header_size {
                    return Step::None;
                }

                let fi = match self.parser.parse_header(&self.buf[..self.header_size]) {
                    Some(fi) => fi,
                    None => {
                        // The expected frame start stopped validating.
                        self.lose_sync();
                        continue 'outer;
                    }
                };

                let frame_size = match self.frame_end(&fi, 0) {
                    FrameEnd::At(size) => size,
                    FrameEnd::NeedMore => return Step::None,
                    FrameEnd::Lost => {
                        self.lose_sync();
                        continue 'outer;
                    }
                };

                if self.buf.len() < frame_size {
                    return Step::None;
                }

                let hdr = self.buf[..self.header_size].to_vec();
                let new_stream = self.prev_header.is_empty()
                    || !self.parser.compare_headers(&self.prev_header, &hdr);

                let mut fi = fi;
                fi.frame_size = frame_size;
                if new_stream {
                    let sinfo = self.parser.build_syncinfo(&self.buf[..frame_size], &fi);
                    self.set_syncinfo(sinfo);
                }
                self.prev_header = hdr;
                self.last_info = Some(fi);
                self.pending_drop = frame_size;
                return Step::Frame { src: Src::Buf, start: 0, len: frame_size, new_stream };
            }

            // Out of sync: scan for a candidate and confirm it.
            let mut pos = 0usize;
            loop {
                match self.scan.scan(&self.buf[pos..]) {
                    ScanResult::NoSync => {
                        let len = self.buf.len();
                        if len == 0 {
                            return Step::None;
                        }
                        self.pending_drop = len;
                        return Step::Debris { src: Src::Buf, start: 0, len };
                    }
                    ScanResult::NeedMore(rel) => {
                        return self.hold_candidate(pos + rel);
                    }
                    ScanResult::Sync(rel) => {
                        let cand = pos + rel;

                        if self.buf.len() - cand < self.header_size {
                            return self.hold_candidate(cand);
                        }

                        let fi = match self
                            .parser
                            .parse_header(&self.buf[cand..cand + self.header_size])
                        {
                            Some(fi) => fi,
                            None => {
                                self.errors += 1;
                                pos = cand + 1;
                                continue;
                            }
                        };

                        let frame_size = match self.frame_end(&fi, cand) {
                            FrameEnd::At(size) => size,
                            FrameEnd::NeedMore => return self.hold_candidate(cand),
                            FrameEnd::Lost => {
                                self.errors += 1;
                                pos = cand + 1;
                                continue;
                            }
                        };

                        // For known-size formats, confirm the candidate with
                        // the header of the following frame.
                        if fi.frame_size > 0 {
                            let next = cand + frame_size;
                            if self.buf.len() < next + self.header_size {
                                return self.hold_candidate(cand);
                            }
                            if self
                                .parser
                                .parse_header(&self.buf[next..next + self.header_size])
                                .is_none()
                            {
                                self.errors += 1;
                                pos = cand + 1;
                                continue;
                            }
                        }

                        // Sync acquired. The frame itself is emitted by the
                        // in-sync branch; junk before it goes out first.
                        debug!("streambuf: sync at {} for {}", cand, fi.spk);
                        self.in_sync = true;
                        self.prev_header.clear();
                        if cand > 0 {
                            self.pending_drop = cand;
                            return Step::Debris { src: Src::Buf, start: 0, len: cand };
                        }
                        continue 'outer;
                    }
                }
            }
        }
    }

    /// Emits the junk before an undecided candidate, or waits for more data
    /// when the candidate starts the buffer.
    fn hold_candidate(&mut self, cand: usize) -> Step {
        if cand > 0 {
            self.pending_drop = cand;
            Step::Debris { src: Src::Buf, start: 0, len: cand }
        }
        else {
            Step::None
        }
    }

    /// Locates the end of the frame starting at `start`.
    fn frame_end(&self, fi: &FrameInfo, start: usize) -> FrameEnd {
        if fi.frame_size > 0 {
            return FrameEnd::At(fi.frame_size);
        }

        // Unknown size: the frame extends to the next sync point.
        let from = start + self.sinfo.min_frame_size;
        if from < self.buf.len() {
            if let ScanResult::Sync(rel) = self.scan.scan(&self.buf[from..]) {
                return FrameEnd::At(self.sinfo.min_frame_size + rel);
            }
        }
        if self.buf.len() - start > self.sinfo.max_frame_size + self.header_size {
            FrameEnd::Lost
        }
        else {
            FrameEnd::NeedMore
        }
    }
}

enum FrameEnd {
    At(usize),
    NeedMore,
    Lost,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{Format, Speakers, MODE_STEREO};
    use crate::parser::SyncTrie;

    /// A toy codec for exercising the state machine: frames open with 0xaa,
    /// carry a 16-bit frame size and a one-byte stream parameter.
    ///
    /// Header: aa size_hi size_lo param.
    struct TestParser {
        /// When set, headers report an unknown frame size and frames end at
        /// the next sync point.
        unknown_size: bool,
    }

    impl FrameParser for TestParser {
        fn can_parse(&self, format: Format) -> bool {
            format == Format::RawData
        }

        fn sync_info(&self) -> SyncInfo {
            SyncInfo::new(SyncTrie::value(0xaa, 8), 8, 1024)
        }

        fn header_size(&self) -> usize {
            4
        }

        fn parse_header(&self, hdr: &[u8]) -> Option<FrameInfo> {
            if hdr.len() < 4 || hdr[0] != 0xaa {
                return None;
            }
            let size = usize::from(hdr[1]) << 8 | usize::from(hdr[2]);
            if size < 8 || size > 1024 {
                return None;
            }
            Some(FrameInfo {
                spk: Speakers::new(Format::RawData, MODE_STEREO, 48000),
                frame_size: if self.unknown_size { 0 } else { size },
                nsamples: 256,
                ..Default::default()
            })
        }

        fn compare_headers(&self, hdr1: &[u8], hdr2: &[u8]) -> bool {
            hdr1[3] == hdr2[3]
        }
    }

    /// Builds one frame: a header and a filler body free of sync bytes.
    fn frame(size: usize, param: u8) -> Vec<u8> {
        let mut data = vec![0x11u8; size];
        data[0] = 0xaa;
        data[1] = (size >> 8) as u8;
        data[2] = size as u8;
        data[3] = param;
        data
    }

    fn stream(frames: &[(usize, u8)]) -> Vec<u8> {
        frames.iter().flat_map(|&(size, param)| frame(size, param)).collect()
    }

    fn collect_frames(buf: &mut StreamBuffer, data: &[u8], window: usize) -> Vec<(usize, bool)> {
        let mut out = Vec::new();
        for chunk in data.chunks(window.max(1)) {
            let mut window = chunk;
            while let Some(frame) = buf.load_frame(&mut window) {
                out.push((frame.data.len(), frame.new_stream));
            }
            assert!(window.is_empty());
        }
        out
    }

    #[test]
    fn verify_single_stream() {
        let data = stream(&[(32, 1), (32, 1), (32, 1), (32, 1)]);
        let mut buf = StreamBuffer::new(Box::new(TestParser { unknown_size: false }));

        let frames = collect_frames(&mut buf, &data, data.len());
        // Once in sync a frame is emitted as soon as it is complete, so the
        // tail frame does not wait for a follower.
        assert_eq!(frames, vec![(32, true), (32, false), (32, false), (32, false)]);
        assert!(buf.is_in_sync());
        assert!(buf.flush().is_none());
    }

    #[test]
    fn verify_byte_at_a_time() {
        let data = stream(&[(24, 1), (24, 1), (24, 1)]);
        let mut buf = StreamBuffer::new(Box::new(TestParser { unknown_size: false }));

        // Feeding one byte per window must produce the same frames.
        let frames = collect_frames(&mut buf, &data, 1);
        assert_eq!(frames, vec![(24, true), (24, false), (24, false)]);
    }

    #[test]
    fn verify_garbage_prefix_is_debris() {
        let mut data = vec![0x42u8; 64];
        data.extend(stream(&[(32, 1), (32, 1), (32, 1)]));

        let mut buf = StreamBuffer::new(Box::new(TestParser { unknown_size: false }));
        let mut window = &data[..];

        let mut debris = 0usize;
        let mut frames = 0usize;
        while let Some(event) = buf.load(&mut window) {
            match event {
                StreamEvent::Debris(data) => debris += data.len(),
                StreamEvent::Frame(_) => frames += 1,
            }
        }
        assert_eq!(debris, 64);
        assert_eq!(frames, 3);
    }

    #[test]
    fn verify_false_sync_is_rejected() {
        // A sync byte with an invalid size field must not acquire sync.
        let mut data = vec![0xaa, 0xff, 0xff, 0x07];
        data.extend(stream(&[(32, 1), (32, 1), (32, 1)]));

        let mut buf = StreamBuffer::new(Box::new(TestParser { unknown_size: false }));
        let frames = collect_frames(&mut buf, &data, data.len());
        assert_eq!(frames.len(), 3);
        assert!(buf.errors() > 0);
    }

    #[test]
    fn verify_parameter_change_marks_new_stream() {
        let data = stream(&[(32, 1), (32, 1), (32, 2), (32, 2), (32, 2)]);
        let mut buf = StreamBuffer::new(Box::new(TestParser { unknown_size: false }));

        let frames = collect_frames(&mut buf, &data, 16);
        assert_eq!(
            frames,
            vec![(32, true), (32, false), (32, true), (32, false), (32, false)]
        );
    }

    #[test]
    fn verify_truncated_tail_is_debris() {
        let mut data = stream(&[(32, 1), (32, 1), (32, 1)]);
        data.truncate(data.len() - 10);

        let mut buf = StreamBuffer::new(Box::new(TestParser { unknown_size: false }));
        let frames = collect_frames(&mut buf, &data, data.len());
        assert_eq!(frames.len(), 2);

        match buf.flush() {
            Some(StreamEvent::Debris(tail)) => assert_eq!(tail.len(), 22),
            other => panic!("expected debris, got {:?}", other.is_some()),
        }
        assert!(buf.flush().is_none());
    }

    #[test]
    fn verify_unknown_size_frames_end_at_next_sync() {
        let data = stream(&[(32, 1), (48, 1), (24, 1)]);
        let mut buf = StreamBuffer::new(Box::new(TestParser { unknown_size: true }));

        let frames = collect_frames(&mut buf, &data, 7);
        assert_eq!(frames, vec![(32, true), (48, false)]);

        // The tail frame's end cannot be located: it is lost, as debris.
        match buf.flush() {
            Some(StreamEvent::Debris(tail)) => assert_eq!(tail.len(), 24),
            other => panic!("expected debris, got {:?}", other.is_some()),
        }
    }

    #[test]
    fn verify_reset() {
        let data = stream(&[(32, 1), (32, 1), (32, 1)]);
        let mut buf = StreamBuffer::new(Box::new(TestParser { unknown_size: false }));

        let _ = collect_frames(&mut buf, &data, data.len());
        assert!(buf.is_in_sync());

        buf.reset();
        assert!(!buf.is_in_sync());
        assert!(buf.flush().is_none());

        // The buffer accepts a fresh stream after reset.
        let frames = collect_frames(&mut buf, &data, data.len());
        assert_eq!(frames, vec![(32, true), (32, false), (32, false)]);
    }
}
