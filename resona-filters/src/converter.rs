// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use log::debug;

use resona_core::audio::sample::Sample;
use resona_core::audio::{
    ByteBuf, Chunk, ChunkData, Format, Planar, SampleBuf, Speakers, Time,
};
use resona_core::errors::{protocol_error, Result};
use resona_core::filter::Filter;

const DEF_BLOCK_SIZE: usize = 4096;

/// Converts raw interleaved PCM to planar linear data and back.
///
/// One converter instance converts in one direction, decided by the target
/// format: `Linear` decodes any raw PCM input (including the DVD byte-packed
/// LPCM layouts), a raw PCM target encodes linear input. The interleaved
/// slot order is preserved as the plane order; reordering channels is an
/// explicit separate step, never an implicit one.
///
/// Raw input that splits a multichannel sample across chunks is buffered, so
/// any chunking is accepted. Immediate buffering class: no data is held
/// between output chunks beyond that partial sample.
pub struct Converter {
    spk: Speakers,
    out_spk: Speakers,
    opened: bool,
    out_format: Format,
    block: usize,

    /// Undecoded raw bytes (decode direction).
    pending: Vec<u8>,
    pending_sync: Option<Time>,
    eos: bool,

    sbuf: SampleBuf,
    rbuf: ByteBuf,
}

impl Converter {
    /// A converter producing `out_format` (either `Linear` or a raw PCM
    /// format).
    pub fn new(out_format: Format) -> Converter {
        Converter::with_block_size(out_format, DEF_BLOCK_SIZE)
    }

    pub fn with_block_size(out_format: Format, block: usize) -> Converter {
        assert!(out_format == Format::Linear || is_encodable(out_format));
        Converter {
            spk: Speakers::unknown(),
            out_spk: Speakers::unknown(),
            opened: false,
            out_format,
            block: block.max(1),
            pending: Vec::new(),
            pending_sync: None,
            eos: false,
            sbuf: SampleBuf::default(),
            rbuf: ByteBuf::default(),
        }
    }

    /// Bytes of one full multichannel sample group of the input format.
    fn group_size(&self) -> usize {
        group_size(self.spk.format, self.spk.nch())
    }

    /// Samples per group of the input format.
    fn group_samples(&self) -> usize {
        match self.spk.format {
            // The LPCM layouts pack two samples per group.
            Format::Lpcm20 | Format::Lpcm24 => 2,
            _ => 1,
        }
    }

    /// Decodes complete groups out of `pending` into one linear chunk.
    fn decode_pending(&mut self, output: &mut Chunk) -> bool {
        let group = self.group_size();
        let per_group = self.group_samples();
        let groups = (self.pending.len() / group).min((self.block / per_group).max(1));
        if groups == 0 {
            return false;
        }

        let nch = self.spk.nch();
        let nsamples = groups * per_group;
        let format = self.spk.format;
        self.sbuf.reshape(nch, nsamples);

        for ch in 0..nch {
            let plane = self.sbuf.plane(ch);
            decode_channel(format, &self.pending[..groups * group], nch, ch, plane);
        }

        self.pending.drain(..groups * group);

        *output = Chunk::linear(Planar(self.sbuf.share(0, nsamples)));
        if let Some(time) = self.pending_sync.take() {
            *output = std::mem::take(output).with_sync(time);
        }
        true
    }

    /// Encodes one linear input chunk into raw bytes.
    fn encode(&mut self, input: &mut Chunk, output: &mut Chunk) -> bool {
        let planar = match &input.data {
            ChunkData::Linear(planar) => planar.clone(),
            _ => return false,
        };

        let nsamples = planar.len().min(self.block);
        if nsamples == 0 {
            return false;
        }

        let nch = self.spk.nch();
        let sample_size = self.out_format.sample_size().expect("encodable format");
        let scale = self.out_spk.level / self.spk.level;

        let data = self.rbuf.fill(nsamples * sample_size * nch);
        for ch in 0..nch {
            encode_channel(
                self.out_format,
                &planar.plane(ch)[..nsamples],
                nch,
                ch,
                scale,
                data,
            );
        }

        let sync = input.sync;
        let time = input.time;
        input.advance(nsamples);

        *output = Chunk::raw(self.rbuf.share(0, nsamples * sample_size * nch));
        if sync {
            *output = std::mem::take(output).with_sync(time);
        }
        true
    }
}

/// True for formats the encoder can produce.
fn is_encodable(format: Format) -> bool {
    format.sample_size().is_some()
}

/// Bytes of one sample group for `nch` channels.
fn group_size(format: Format, nch: usize) -> usize {
    match format {
        // Two 16-bit sample rows plus one low-bits row.
        Format::Lpcm20 => nch * 5,
        Format::Lpcm24 => nch * 6,
        _ => format.sample_size().map_or(1, |size| size * nch),
    }
}

/// Decodes channel `ch` of interleaved `data` into `out`.
fn decode_channel(format: Format, data: &[u8], nch: usize, ch: usize, out: &mut [Sample]) {
    match format {
        Format::Lpcm20 | Format::Lpcm24 => decode_lpcm(format, data, nch, ch, out),
        _ => {
            let size = format.sample_size().expect("raw pcm format");
            let stride = size * nch;
            for (i, sample) in out.iter_mut().enumerate() {
                let at = i * stride + ch * size;
                *sample = decode_sample(format, &data[at..at + size]);
            }
        }
    }
}

fn decode_sample(format: Format, bytes: &[u8]) -> Sample {
    match format {
        Format::Pcm16 => f64::from(i16::from_le_bytes([bytes[0], bytes[1]])),
        Format::Pcm16Be => f64::from(i16::from_be_bytes([bytes[0], bytes[1]])),
        Format::Pcm24 => {
            f64::from(i32::from_le_bytes([0, bytes[0], bytes[1], bytes[2]]) >> 8)
        }
        Format::Pcm24Be => {
            f64::from(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], 0]) >> 8)
        }
        Format::Pcm32 => f64::from(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        Format::Pcm32Be => {
            f64::from(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
        Format::PcmFloat => {
            f64::from(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
        Format::PcmDouble => f64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]),
        _ => unreachable!("not a raw pcm format"),
    }
}

/// Decodes the DVD byte-packed layouts: per group, two interleaved rows of
/// 16-bit big-endian sample tops, then the packed low bits of both samples.
fn decode_lpcm(format: Format, data: &[u8], nch: usize, ch: usize, out: &mut [Sample]) {
    let group = group_size(format, nch);
    let tops = nch * 4;

    for (i, pair) in out.chunks_mut(2).enumerate() {
        let base = i * group;
        for (k, sample) in pair.iter_mut().enumerate() {
            let at = base + (k * nch + ch) * 2;
            let top = i32::from(i16::from_be_bytes([data[at], data[at + 1]]));
            *sample = match format {
                Format::Lpcm20 => {
                    let nibbles = data[base + tops + ch];
                    let low = if k == 0 { nibbles >> 4 } else { nibbles & 0xf };
                    f64::from(top * 16 + i32::from(low))
                }
                _ => {
                    let low = data[base + tops + k * nch + ch];
                    f64::from(top * 256 + i32::from(low))
                }
            };
        }
    }
}

/// Encodes `samples` into channel slot `ch` of interleaved `data`.
fn encode_channel(
    format: Format,
    samples: &[Sample],
    nch: usize,
    ch: usize,
    scale: f64,
    data: &mut [u8],
) {
    let size = format.sample_size().expect("encodable format");
    let stride = size * nch;
    for (i, &sample) in samples.iter().enumerate() {
        let at = i * stride + ch * size;
        encode_sample(format, sample * scale, &mut data[at..at + size]);
    }
}

fn encode_sample(format: Format, value: Sample, bytes: &mut [u8]) {
    match format {
        Format::Pcm16 => {
            let v = value.round().clamp(-32768.0, 32767.0) as i16;
            bytes.copy_from_slice(&v.to_le_bytes());
        }
        Format::Pcm16Be => {
            let v = value.round().clamp(-32768.0, 32767.0) as i16;
            bytes.copy_from_slice(&v.to_be_bytes());
        }
        Format::Pcm24 => {
            let v = value.round().clamp(-8388608.0, 8388607.0) as i32;
            bytes.copy_from_slice(&v.to_le_bytes()[..3]);
        }
        Format::Pcm24Be => {
            let v = value.round().clamp(-8388608.0, 8388607.0) as i32;
            bytes.copy_from_slice(&v.to_be_bytes()[1..]);
        }
        Format::Pcm32 => {
            let v = value.round().clamp(-2147483648.0, 2147483647.0) as i32;
            bytes.copy_from_slice(&v.to_le_bytes());
        }
        Format::Pcm32Be => {
            let v = value.round().clamp(-2147483648.0, 2147483647.0) as i32;
            bytes.copy_from_slice(&v.to_be_bytes());
        }
        Format::PcmFloat => bytes.copy_from_slice(&(value as f32).to_le_bytes()),
        Format::PcmDouble => bytes.copy_from_slice(&value.to_le_bytes()),
        _ => unreachable!("not an encodable format"),
    }
}

impl Filter for Converter {
    fn can_open(&self, spk: &Speakers) -> bool {
        if spk.nch() == 0 || spk.sample_rate == 0 {
            return false;
        }
        if self.out_format == Format::Linear {
            spk.is_pcm()
        }
        else {
            spk.is_linear()
        }
    }

    fn open(&mut self, spk: &Speakers) -> bool {
        if !self.can_open(spk) {
            return false;
        }

        self.spk = spk.clone();
        self.out_spk = Speakers::new(self.out_format, spk.mask, spk.sample_rate);
        if self.out_format == Format::Linear {
            // Linear data keeps the source scale.
            self.out_spk.level = spk.level;
        }
        debug!("converter: {} -> {}", self.spk, self.out_spk);

        self.opened = true;
        self.reset();
        true
    }

    fn close(&mut self) {
        self.opened = false;
        self.spk = Speakers::unknown();
        self.out_spk = Speakers::unknown();
    }

    fn is_open(&self) -> bool {
        self.opened
    }

    fn get_input(&self) -> Speakers {
        self.spk.clone()
    }

    fn get_output(&self) -> Speakers {
        self.out_spk.clone()
    }

    fn reset(&mut self) {
        self.pending.clear();
        self.pending_sync = None;
        self.eos = false;
    }

    fn process(&mut self, input: &mut Chunk, output: &mut Chunk) -> Result<bool> {
        if !self.opened {
            return protocol_error("converter processed before open");
        }

        if self.out_format != Format::Linear {
            // Encode direction holds no state between chunks.
            if input.is_eos() {
                *output = std::mem::take(input);
                return Ok(true);
            }
            if self.encode(input, output) {
                return Ok(true);
            }
            input.clear();
            return Ok(false);
        }

        if input.sync {
            self.pending_sync = Some(input.time);
        }
        if input.is_eos() {
            input.clear();
            self.eos = true;
        }
        else if let ChunkData::Raw(bytes) = &input.data {
            self.pending.extend_from_slice(bytes);
            input.clear();
        }
        else {
            input.clear();
        }

        if self.decode_pending(output) {
            return Ok(true);
        }

        if self.eos {
            self.eos = false;
            if !self.pending.is_empty() {
                // A trailing partial sample cannot be decoded.
                debug!("converter: dropping {} trailing bytes", self.pending.len());
                self.pending.clear();
            }
            *output = Chunk::eos(self.pending_sync.take().unwrap_or(0.0));
            return Ok(true);
        }
        Ok(false)
    }

    fn flush(&mut self, output: &mut Chunk) -> Result<bool> {
        if !self.opened {
            return protocol_error("converter flushed before open");
        }
        Ok(self.decode_pending(output))
    }

    fn new_stream(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resona_core::audio::{Bytes, MODE_MONO, MODE_STEREO};

    fn decode_all(spk: &Speakers, data: Vec<u8>) -> Vec<Vec<Sample>> {
        let mut conv = Converter::new(Format::Linear);
        assert!(conv.open(spk));

        let mut input = Chunk::raw(Bytes::from_vec(data));
        let mut output = Chunk::dummy();
        let mut planes: Vec<Vec<Sample>> = vec![Vec::new(); spk.nch()];
        while conv.process(&mut input, &mut output).unwrap() {
            for (ch, plane) in planes.iter_mut().enumerate() {
                plane.extend_from_slice(output.planar().plane(ch));
            }
        }
        while conv.flush(&mut output).unwrap() {
            for (ch, plane) in planes.iter_mut().enumerate() {
                plane.extend_from_slice(output.planar().plane(ch));
            }
        }
        planes
    }

    #[test]
    fn verify_pcm16_decode() {
        let spk = Speakers::new(Format::Pcm16, MODE_STEREO, 48000);
        // Interleaved L R L R: 1 2 3 -4.
        let data: Vec<u8> =
            [1i16, 2, 3, -4].iter().flat_map(|v| v.to_le_bytes()).collect();

        let planes = decode_all(&spk, data);
        assert_eq!(planes[0], vec![1.0, 3.0]);
        assert_eq!(planes[1], vec![2.0, -4.0]);
    }

    #[test]
    fn verify_pcm24_decode() {
        let spk = Speakers::new(Format::Pcm24, MODE_STEREO, 48000);
        let mut data = Vec::new();
        for v in [100000i32, -100000, 8388607, -8388608] {
            data.extend_from_slice(&v.to_le_bytes()[..3]);
        }

        let planes = decode_all(&spk, data);
        assert_eq!(planes[0], vec![100000.0, 8388607.0]);
        assert_eq!(planes[1], vec![-100000.0, -8388608.0]);
    }

    #[test]
    fn verify_partial_samples_bridged() {
        let spk = Speakers::new(Format::Pcm16, MODE_STEREO, 48000);
        let data: Vec<u8> = [1i16, 2, 3, 4].iter().flat_map(|v| v.to_le_bytes()).collect();

        let mut conv = Converter::new(Format::Linear);
        assert!(conv.open(&spk));

        // Feed one byte at a time; decoded output must be identical.
        let mut planes: Vec<Vec<Sample>> = vec![Vec::new(); 2];
        let mut output = Chunk::dummy();
        for &byte in &data {
            let mut input = Chunk::raw(Bytes::from_vec(vec![byte]));
            while conv.process(&mut input, &mut output).unwrap() {
                for (ch, plane) in planes.iter_mut().enumerate() {
                    plane.extend_from_slice(output.planar().plane(ch));
                }
            }
        }
        assert_eq!(planes[0], vec![1.0, 3.0]);
        assert_eq!(planes[1], vec![2.0, 4.0]);
    }

    #[test]
    fn verify_encode_round_trip() {
        let spk = Speakers::new(Format::Pcm16, MODE_STEREO, 48000);
        let data: Vec<u8> =
            [1i16, 2, -3, 4, 32767, -32768].iter().flat_map(|v| v.to_le_bytes()).collect();

        // Decode, then encode back to the same format.
        let mut decode = Converter::new(Format::Linear);
        let mut encode = Converter::new(Format::Pcm16);
        assert!(decode.open(&spk));

        let mut input = Chunk::raw(Bytes::from_vec(data.clone()));
        let mut linear = Chunk::dummy();
        assert!(decode.process(&mut input, &mut linear).unwrap());

        assert!(encode.open(&decode.get_output()));
        let mut output = Chunk::dummy();
        assert!(encode.process(&mut linear, &mut output).unwrap());
        assert_eq!(&output.raw_data()[..], &data[..]);
        assert_eq!(encode.get_output().format, Format::Pcm16);
    }

    #[test]
    fn verify_lpcm24_decode() {
        let spk = Speakers::new(Format::Lpcm24, MODE_MONO, 48000);
        // One group of two mono samples: tops 0x0102 and 0x0304, lows 0x05
        // and 0x06 -> 0x010205 and 0x030406.
        let data = vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06];

        let planes = decode_all(&spk, data);
        assert_eq!(planes[0], vec![f64::from(0x010205), f64::from(0x030406)]);
    }

    #[test]
    fn verify_lpcm20_decode() {
        let spk = Speakers::new(Format::Lpcm20, MODE_MONO, 48000);
        // Tops 0x0102 and 0x0304, nibbles 0xab -> 0x0102a and 0x0304b.
        let data = vec![0x01, 0x02, 0x03, 0x04, 0xab];

        let planes = decode_all(&spk, data);
        assert_eq!(planes[0], vec![f64::from(0x0102a), f64::from(0x0304b)]);
    }

    #[test]
    fn verify_eos_passes_after_drain() {
        let spk = Speakers::new(Format::Pcm16, MODE_STEREO, 48000);
        let mut conv = Converter::new(Format::Linear);
        assert!(conv.open(&spk));

        let mut input = Chunk::raw(Bytes::from_vec(vec![1, 0, 2, 0, 3])).with_sync(0.5);
        let mut output = Chunk::dummy();

        // One whole sample decodes; the dangling byte stays pending.
        assert!(conv.process(&mut input, &mut output).unwrap());
        assert_eq!(output.size(), 1);
        assert!(output.sync);
        assert!(!conv.process(&mut input, &mut output).unwrap());

        let mut eos = Chunk::eos(2.0);
        assert!(conv.process(&mut eos, &mut output).unwrap());
        assert!(output.is_eos());
        assert!(!conv.process(&mut eos, &mut output).unwrap());
    }
}
