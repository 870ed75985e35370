// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use log::debug;

use resona_core::audio::{ByteBuf, ChannelMask, Chunk, Format, Speakers};
use resona_core::errors::{bad_format_error, Result};
use resona_core::filter::Source;
use resona_core::io::ReadBytes;

use crate::waveformat::fmt_to_speakers;

const DEF_CHUNK_SIZE: usize = 65536;

/// Reads the data chunk of a RIFF/RF64 WAVE file as raw chunks.
///
/// The RF64 `ds64` chunk is honored for data sizes of 4 GiB and beyond.
/// Files whose format has no library counterpart are surfaced as `RawData`
/// rather than rejected, so the caller may still route the bytes somewhere
/// useful.
pub struct WavSource {
    file: File,
    spk: Speakers,
    data_start: u64,
    data_size: u64,
    data_remains: u64,
    buf: ByteBuf,
    chunk_size: usize,
    first: bool,
    is_new_stream: bool,
}

impl WavSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<WavSource> {
        WavSource::open_with_chunk_size(path, DEF_CHUNK_SIZE)
    }

    pub fn open_with_chunk_size<P: AsRef<Path>>(path: P, chunk_size: usize) -> Result<WavSource> {
        let mut file = File::open(path)?;
        let (spk, data_start, data_size) = open_riff(&mut file)?;
        debug!("wav: {} data bytes of {}", data_size, spk);

        file.seek(SeekFrom::Start(data_start))?;
        Ok(WavSource {
            file,
            spk,
            data_start,
            data_size,
            data_remains: data_size,
            buf: ByteBuf::default(),
            chunk_size: chunk_size.max(1),
            first: true,
            is_new_stream: false,
        })
    }

    /// The size of the data chunk in bytes.
    pub fn data_size(&self) -> u64 {
        self.data_size
    }
}

/// Walks the RIFF chunk list. Returns the mapped format and the data chunk
/// position and size.
fn open_riff(file: &mut File) -> Result<(Speakers, u64, u64)> {
    file.seek(SeekFrom::Start(0))?;

    let mut fcc = [0u8; 4];
    file.read_buf_exact(&mut fcc)?;
    let rf64 = match &fcc {
        b"RIFF" => false,
        b"RF64" => true,
        _ => return bad_format_error("wav: no RIFF header"),
    };
    let _riff_size = file.read_u32le()?;
    file.read_buf_exact(&mut fcc)?;
    if &fcc != b"WAVE" {
        return bad_format_error("wav: not a WAVE file");
    }

    let mut spk = None;
    let mut data_size64 = None;

    loop {
        let mut fcc = [0u8; 4];
        if file.read(&mut fcc)? < 4 {
            return bad_format_error("wav: no data chunk");
        }
        let size = u64::from(file.read_u32le()?);
        let next = file.stream_position()? + size + (size & 1);

        match &fcc {
            b"fmt " => {
                let mut fmt = vec![0u8; size.min(1024) as usize];
                file.read_buf_exact(&mut fmt)?;
                spk = Some(fmt_to_speakers(&fmt).unwrap_or_else(|| {
                    Speakers::new(Format::RawData, ChannelMask::empty(), 0)
                }));
            }
            b"ds64" => {
                if size < 28 {
                    return bad_format_error("wav: short ds64 chunk");
                }
                let _riff_size = file.read_u64le()?;
                data_size64 = Some(file.read_u64le()?);
            }
            b"data" => {
                let spk = match spk {
                    Some(spk) => spk,
                    None => return bad_format_error("wav: data chunk before fmt chunk"),
                };
                let data_start = file.stream_position()?;
                let data_size = match data_size64 {
                    // An RF64 data chunk stores a marker size on the chunk.
                    Some(size64) if rf64 && size >= 0xffff_ff00 => size64,
                    _ => size,
                };
                return Ok((spk, data_start, data_size));
            }
            _ => (),
        }

        file.seek(SeekFrom::Start(next))?;
    }
}

impl Source for WavSource {
    fn reset(&mut self) {
        let _ = self.file.seek(SeekFrom::Start(self.data_start));
        self.data_remains = self.data_size;
        self.first = true;
        self.is_new_stream = false;
    }

    fn get_chunk(&mut self, out: &mut Chunk) -> Result<bool> {
        if self.data_remains == 0 {
            self.is_new_stream = false;
            return Ok(false);
        }

        let want = self.chunk_size.min(self.data_remains.min(usize::MAX as u64) as usize);
        let data = self.buf.fill(want);
        let n = self.file.read(data)?;
        if n == 0 {
            self.data_remains = 0;
            self.is_new_stream = false;
            return Ok(false);
        }

        self.data_remains -= n as u64;
        self.is_new_stream = self.first;
        self.first = false;
        *out = Chunk::raw(self.buf.share(0, n));
        Ok(true)
    }

    fn new_stream(&self) -> bool {
        self.is_new_stream
    }

    fn get_output(&self) -> Speakers {
        self.spk.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WavSink;
    use resona_core::audio::{Bytes, MODE_STEREO};
    use resona_core::filter::Sink;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("resona-wavsrc-{}-{}", std::process::id(), name));
        path
    }

    #[test]
    fn verify_round_trip() {
        let path = temp_path("roundtrip.wav");
        let spk = Speakers::new(Format::Pcm16, MODE_STEREO, 48000);
        let payload: Vec<u8> = (0u16..512).flat_map(|v| v.to_le_bytes()).collect();

        let mut sink = WavSink::create(&path).unwrap();
        assert!(sink.open(&spk));
        sink.process(&Chunk::raw(Bytes::from_vec(payload.clone()))).unwrap();
        sink.close();
        drop(sink);

        let mut source = WavSource::open_with_chunk_size(&path, 100).unwrap();
        assert_eq!(source.get_output(), spk);
        assert_eq!(source.data_size(), payload.len() as u64);

        let mut out = Chunk::dummy();
        let mut read_back = Vec::new();
        let mut first = true;
        while source.get_chunk(&mut out).unwrap() {
            assert_eq!(source.new_stream(), first);
            first = false;
            read_back.extend_from_slice(&out.raw_data()[..]);
        }
        assert_eq!(read_back, payload);

        // Reset rewinds to the start of the data chunk.
        source.reset();
        assert!(source.get_chunk(&mut out).unwrap());
        assert_eq!(&out.raw_data()[..2], &payload[..2]);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn verify_bad_files_rejected() {
        let path = temp_path("bad.wav");
        std::fs::write(&path, b"not a wave file at all").unwrap();
        assert!(WavSource::open(&path).is_err());
        std::fs::remove_file(&path).unwrap();
    }
}
