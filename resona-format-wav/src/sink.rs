// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use log::debug;

use resona_core::audio::{Chunk, ChunkData, Speakers};
use resona_core::errors::Result;
use resona_core::filter::Sink;
use resona_core::io::WriteBytes;

use crate::waveformat::speakers_to_fmt;

/// The `data` chunk size that marks an RF64 file.
const SIZE64_MARKER: u32 = 0xffff_ffff;
/// Sizes at or past this limit need the `ds64` chunk.
const SIZE32_LIMIT: u64 = 0xffff_ff00;

/// Writes incoming raw data to a RIFF/RF64 WAVE file.
///
/// A 28-byte `JUNK` placeholder is reserved directly after the RIFF header;
/// when the data size crosses the 32-bit limit the placeholder is rewritten
/// in place as the `ds64` chunk and the file becomes RF64. The file is valid
/// only after [`finalize`] (called by `close` and on drop).
///
/// [`finalize`]: WavSink::finalize
pub struct WavSink {
    file: Option<File>,
    spk: Speakers,
    opened: bool,
    /// Offset of the first data byte; the data chunk header sits just
    /// before.
    header_size: u64,
    data_size: u64,
    /// The `fmt ` body of the open file, to skip a rewrite when the format
    /// is compatible.
    file_format: Vec<u8>,
    finalized: bool,
}

impl WavSink {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<WavSink> {
        Ok(WavSink {
            file: Some(File::create(path)?),
            spk: Speakers::unknown(),
            opened: false,
            header_size: 0,
            data_size: 0,
            file_format: Vec::new(),
            finalized: false,
        })
    }

    /// Writes the RIFF header for the given `fmt ` body.
    fn write_header(&mut self, fmt: &[u8]) -> Result<()> {
        let file = self.file.as_mut().expect("file is open");

        file.seek(SeekFrom::Start(0))?;
        file.write_bytes(b"RIFF")?;
        file.write_u32le(0)?;
        file.write_bytes(b"WAVE")?;

        // Placeholder for a ds64 chunk, in case the file grows past 4 GiB.
        file.write_bytes(b"JUNK")?;
        file.write_u32le(28)?;
        file.write_bytes(&[0u8; 28])?;

        file.write_bytes(b"fmt ")?;
        file.write_u32le(fmt.len() as u32)?;
        file.write_bytes(fmt)?;

        file.write_bytes(b"data")?;
        file.write_u32le(0)?;

        self.header_size = file.stream_position()?;
        self.data_size = 0;
        self.file_format = fmt.to_vec();
        Ok(())
    }

    /// Patches the sizes (or upgrades to RF64) so the file becomes valid.
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized || self.header_size == 0 {
            return Ok(());
        }
        let file = self.file.as_mut().expect("file is open");

        let riff_size = self.header_size + self.data_size - 8;
        if riff_size < SIZE32_LIMIT {
            file.seek(SeekFrom::Start(4))?;
            file.write_u32le(riff_size as u32)?;
            file.seek(SeekFrom::Start(self.header_size - 4))?;
            file.write_u32le(self.data_size as u32)?;
        }
        else {
            debug!("wav: upgrading to rf64, data size {}", self.data_size);
            file.seek(SeekFrom::Start(0))?;
            file.write_bytes(b"RF64")?;
            file.write_u32le(SIZE64_MARKER)?;

            // The JUNK placeholder becomes the ds64 chunk.
            file.seek(SeekFrom::Start(12))?;
            file.write_bytes(b"ds64")?;
            file.write_u32le(28)?;
            file.write_u64le(riff_size)?;
            file.write_u64le(self.data_size)?;
            file.write_u64le(0)?; // sample count, unknown
            file.write_u32le(0)?; // chunk size table length

            file.seek(SeekFrom::Start(self.header_size - 4))?;
            file.write_u32le(SIZE64_MARKER)?;
        }

        file.seek(SeekFrom::End(0))?;
        file.flush()?;
        self.finalized = true;
        Ok(())
    }
}

impl Drop for WavSink {
    fn drop(&mut self) {
        let _ = self.finalize();
    }
}

impl Sink for WavSink {
    fn can_open(&self, spk: &Speakers) -> bool {
        self.file.is_some() && speakers_to_fmt(spk).is_some()
    }

    fn open(&mut self, spk: &Speakers) -> bool {
        let fmt = match speakers_to_fmt(spk) {
            Some(fmt) => fmt,
            None => return false,
        };

        // Rewrite the header only when the file format actually changes.
        if fmt != self.file_format {
            if self.write_header(&fmt).is_err() {
                return false;
            }
        }

        self.spk = spk.clone();
        self.opened = true;
        self.finalized = false;
        true
    }

    fn close(&mut self) {
        let _ = self.finalize();
        self.opened = false;
        self.spk = Speakers::unknown();
    }

    fn is_open(&self) -> bool {
        self.opened
    }

    fn get_input(&self) -> Speakers {
        self.spk.clone()
    }

    fn reset(&mut self) {}

    fn process(&mut self, chunk: &Chunk) -> Result<()> {
        if let ChunkData::Raw(data) = &chunk.data {
            let file = self.file.as_mut().expect("file is open");
            file.write_all(data)?;
            self.data_size += data.len() as u64;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resona_core::audio::{Bytes, Format, MODE_STEREO};

    fn temp_path(name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("resona-wav-{}-{}", std::process::id(), name));
        path
    }

    #[test]
    fn verify_pcm16_fixture() {
        let path = temp_path("fixture.wav");
        let spk = Speakers::new(Format::Pcm16, MODE_STEREO, 48000);

        let mut sink = WavSink::create(&path).unwrap();
        assert!(sink.open(&spk));

        // Two stereo samples: 1 2 3 4 as 16-bit LE.
        let chunk = Chunk::raw(Bytes::from_vec(vec![1, 0, 2, 0, 3, 0, 4, 0]));
        sink.process(&chunk).unwrap();
        sink.flush().unwrap();
        sink.close();
        drop(sink);

        let data = std::fs::read(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let mut expected = Vec::new();
        expected.extend_from_slice(b"RIFF");
        expected.extend_from_slice(&82u32.to_le_bytes());
        expected.extend_from_slice(b"WAVE");
        expected.extend_from_slice(b"JUNK");
        expected.extend_from_slice(&28u32.to_le_bytes());
        expected.extend_from_slice(&[0u8; 28]);
        expected.extend_from_slice(b"fmt ");
        expected.extend_from_slice(&18u32.to_le_bytes());
        expected.extend_from_slice(&[
            0x01, 0x00, 0x02, 0x00, 0x80, 0xbb, 0x00, 0x00, 0x00, 0xee, 0x02, 0x00, 0x04, 0x00,
            0x10, 0x00, 0x00, 0x00,
        ]);
        expected.extend_from_slice(b"data");
        expected.extend_from_slice(&8u32.to_le_bytes());
        expected.extend_from_slice(&[1, 0, 2, 0, 3, 0, 4, 0]);

        assert_eq!(data, expected);
    }

    #[test]
    fn verify_reopen_same_format_keeps_header() {
        let path = temp_path("reopen.wav");
        let spk = Speakers::new(Format::Pcm16, MODE_STEREO, 48000);

        let mut sink = WavSink::create(&path).unwrap();
        assert!(sink.open(&spk));
        sink.process(&Chunk::raw(Bytes::from_vec(vec![1, 0]))).unwrap();

        // Reopening with a compatible format appends instead of restarting.
        assert!(sink.open(&spk));
        sink.process(&Chunk::raw(Bytes::from_vec(vec![2, 0]))).unwrap();
        sink.close();
        drop(sink);

        let data = std::fs::read(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(&data[data.len() - 4..], &[1, 0, 2, 0]);
    }

    #[test]
    fn verify_linear_is_rejected() {
        let path = temp_path("reject.wav");
        let sink = WavSink::create(&path).unwrap();
        assert!(!sink.can_open(&Speakers::new(Format::Linear, MODE_STEREO, 48000)));
        drop(sink);
        let _ = std::fs::remove_file(&path);
    }
}
