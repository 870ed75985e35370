// Resona
// Copyright (c) 2025 The Project Resona Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use log::debug;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use resona_core::audio::sample::Sample;
use resona_core::audio::{Chunk, ChunkData, Planar, SampleBuf, Speakers, Time};
use resona_core::errors::{protocol_error, Result};
use resona_core::filter::Filter;
use resona_core::fir::{FirGen, FirInstance, FirType};

/// Block FFT fast convolution of linear data with a generated kernel.
///
/// The kernel comes from a [`FirGen`]; the convolver re-plans whenever the
/// generator's version or the sample rate changes. Degenerate kernels
/// short-circuit: identity (and an unconfigured generator) passes chunks
/// through, a gain kernel scales, the zero kernel silences.
///
/// For real kernels this is a block-buffered filter: output appears one
/// block at a time and the kernel center delay is compensated, so output
/// sample positions line up with input positions. Time stamps surface on the
/// output chunk containing the stamped input sample.
pub struct Convolver {
    spk: Speakers,
    opened: bool,
    gen: Box<dyn FirGen>,
    ver: Option<u32>,
    mode: Mode,
    buf: SampleBuf,
}

enum Mode {
    /// No kernel was built; pass through.
    Null,
    Zero,
    Identity,
    Gain(f64),
    Custom(Box<ConvState>),
}

struct ConvState {
    fft: Arc<dyn Fft<Sample>>,
    ifft: Arc<dyn Fft<Sample>>,
    fft_size: usize,
    /// Input samples consumed per convolution block.
    block: usize,
    klen: usize,
    center: usize,
    kernel_fft: Vec<Complex<Sample>>,

    inbuf: Vec<Vec<Sample>>,
    filled: usize,
    overlap: Vec<Vec<Sample>>,
    scratch: Vec<Complex<Sample>>,

    samples_in: u64,
    samples_out: u64,
    /// Leading samples still to drop for center compensation.
    pre_drop: usize,
    /// A pending time stamp and the input position it applies to.
    mark: Option<(Time, u64)>,
}

impl ConvState {
    fn new(fir: &FirInstance, nch: usize) -> ConvState {
        let klen = fir.len();
        let fft_size = (4 * klen.max(64)).next_power_of_two();
        let block = fft_size - (klen - 1);

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let ifft = planner.plan_fft_inverse(fft_size);

        let mut kernel_fft: Vec<Complex<Sample>> =
            fir.data().iter().map(|&tap| Complex::new(tap, 0.0)).collect();
        kernel_fft.resize(fft_size, Complex::new(0.0, 0.0));
        fft.process(&mut kernel_fft);

        ConvState {
            fft,
            ifft,
            fft_size,
            block,
            klen,
            center: fir.center,
            kernel_fft,
            inbuf: vec![vec![0.0; block]; nch],
            filled: 0,
            overlap: vec![vec![0.0; klen - 1]; nch],
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
            samples_in: 0,
            samples_out: 0,
            pre_drop: fir.center,
            mark: None,
        }
    }

    /// Convolves the filled part of the input buffer (zero-padded) and
    /// writes one output block into `buf`. Returns the emitted range.
    fn convolve_block(&mut self, buf: &mut SampleBuf) -> (usize, usize) {
        let nch = self.inbuf.len();
        buf.reshape(nch, self.block);

        for ch in 0..nch {
            let scratch = &mut self.scratch;
            for (i, value) in scratch.iter_mut().enumerate() {
                let sample = if i < self.filled { self.inbuf[ch][i] } else { 0.0 };
                *value = Complex::new(sample, 0.0);
            }

            self.fft.process(scratch);
            for (value, k) in scratch.iter_mut().zip(&self.kernel_fft) {
                *value *= *k;
            }
            self.ifft.process(scratch);

            let scale = 1.0 / self.fft_size as Sample;
            let out = buf.plane(ch);
            for (i, slot) in out.iter_mut().enumerate() {
                let mut sample = scratch[i].re * scale;
                if i < self.klen - 1 {
                    sample += self.overlap[ch][i];
                }
                *slot = sample;
            }
            for (i, slot) in self.overlap[ch].iter_mut().enumerate() {
                *slot = scratch[self.block + i].re * scale;
            }
        }
        self.filled = 0;

        // Center compensation eats the first `center` output samples.
        let drop = self.pre_drop.min(self.block);
        self.pre_drop -= drop;
        let n = self.block - drop;
        self.samples_out += n as u64;
        (drop, n)
    }

    /// Applies a pending mark to a chunk covering output positions
    /// `[start, start + len)`.
    fn apply_mark(&mut self, chunk: &mut Chunk, start: u64, len: usize, sample_rate: u32) {
        if let Some((time, pos)) = self.mark {
            if pos < start + len as u64 {
                chunk.sync = true;
                chunk.time = time - (pos.saturating_sub(start)) as f64 / f64::from(sample_rate);
                self.mark = None;
            }
        }
    }
}

impl Convolver {
    pub fn new(gen: Box<dyn FirGen>) -> Convolver {
        Convolver {
            spk: Speakers::unknown(),
            opened: false,
            gen,
            ver: None,
            mode: Mode::Null,
            buf: SampleBuf::default(),
        }
    }

    pub fn set_fir(&mut self, gen: Box<dyn FirGen>) {
        self.gen = gen;
        self.ver = None;
    }

    pub fn fir(&self) -> &dyn FirGen {
        self.gen.as_ref()
    }

    /// Rebuilds the execution mode when the kernel is out of date.
    fn update_kernel(&mut self) {
        let ver = self.gen.version();
        if self.ver == Some(ver) {
            return;
        }
        self.ver = Some(ver);

        self.mode = match self.gen.make(self.spk.sample_rate) {
            None => Mode::Null,
            Some(fir) => match fir.fir_type() {
                FirType::Zero => Mode::Zero,
                FirType::Identity => Mode::Identity,
                FirType::Gain => Mode::Gain(fir.data()[0]),
                FirType::Custom => {
                    debug!(
                        "convolver: kernel length {} center {} at {}Hz",
                        fir.len(),
                        fir.center,
                        self.spk.sample_rate
                    );
                    Mode::Custom(Box::new(ConvState::new(&fir, self.spk.nch())))
                }
            },
        };
    }

    /// Scaled or zeroed copy for the degenerate modes.
    fn copy_scaled(&mut self, input: &mut Chunk, output: &mut Chunk, gain: f64) -> bool {
        let planar = match &input.data {
            ChunkData::Linear(planar) => planar.clone(),
            _ => {
                *output = std::mem::take(input);
                return !output.is_dummy();
            }
        };

        let nch = planar.nch();
        let len = planar.len();
        self.buf.reshape(nch, len);
        for ch in 0..nch {
            let plane = self.buf.plane(ch);
            for (slot, &sample) in plane.iter_mut().zip(planar.plane(ch)) {
                *slot = sample * gain;
            }
        }

        *output = Chunk::linear(Planar(self.buf.share(0, len)));
        output.sync = input.sync;
        output.time = input.time;
        input.clear();
        true
    }
}

impl Filter for Convolver {
    fn can_open(&self, spk: &Speakers) -> bool {
        spk.is_linear() && spk.nch() > 0 && spk.sample_rate > 0
    }

    fn open(&mut self, spk: &Speakers) -> bool {
        if !self.can_open(spk) {
            return false;
        }
        self.spk = spk.clone();
        self.opened = true;
        self.ver = None;
        self.update_kernel();
        true
    }

    fn close(&mut self) {
        self.opened = false;
        self.spk = Speakers::unknown();
        self.mode = Mode::Null;
        self.ver = None;
    }

    fn is_open(&self) -> bool {
        self.opened
    }

    fn get_input(&self) -> Speakers {
        self.spk.clone()
    }

    fn get_output(&self) -> Speakers {
        self.spk.clone()
    }

    fn reset(&mut self) {
        if !self.opened {
            return;
        }
        // Force a state rebuild; buffered data belongs to the old stream.
        self.ver = None;
        self.update_kernel();
    }

    fn process(&mut self, input: &mut Chunk, output: &mut Chunk) -> Result<bool> {
        if !self.opened {
            return protocol_error("convolver processed before open");
        }

        self.update_kernel();
        let state = match &mut self.mode {
            Mode::Null | Mode::Identity => {
                *output = std::mem::take(input);
                return Ok(!output.is_dummy());
            }
            Mode::Gain(gain) => {
                let gain = *gain;
                return Ok(self.copy_scaled(input, output, gain));
            }
            Mode::Zero => {
                return Ok(self.copy_scaled(input, output, 0.0));
            }
            Mode::Custom(state) => state,
        };

        if input.is_eos() {
            // Drain, then forward the marker.
            if state.samples_out < state.samples_in {
                return self.flush(output);
            }
            *output = std::mem::take(input);
            return Ok(true);
        }

        if input.sync {
            state.mark = Some((input.time, state.samples_in));
        }

        let planar = match &input.data {
            ChunkData::Linear(planar) => planar.clone(),
            _ => {
                input.clear();
                return Ok(false);
            }
        };

        // Take what fits into the current block.
        let take = (state.block - state.filled).min(planar.len());
        for (ch, inbuf) in state.inbuf.iter_mut().enumerate() {
            inbuf[state.filled..state.filled + take].copy_from_slice(&planar.plane(ch)[..take]);
        }
        state.filled += take;
        state.samples_in += take as u64;
        input.advance(take);
        if input.is_empty() {
            input.clear();
        }

        if state.filled < state.block {
            return Ok(false);
        }

        let start = state.samples_out;
        let (drop, n) = state.convolve_block(&mut self.buf);
        if n == 0 {
            return Ok(false);
        }
        *output = Chunk::linear(Planar(self.buf.share(drop, n)));
        state.apply_mark(output, start, n, self.spk.sample_rate);
        Ok(true)
    }

    fn flush(&mut self, output: &mut Chunk) -> Result<bool> {
        if !self.opened {
            return protocol_error("convolver flushed before open");
        }

        let sample_rate = self.spk.sample_rate;
        let state = match &mut self.mode {
            Mode::Custom(state) => state,
            _ => return Ok(false),
        };

        while state.samples_out < state.samples_in {
            let remaining = (state.samples_in - state.samples_out) as usize;
            let start = state.samples_out;
            let (drop, n) = state.convolve_block(&mut self.buf);
            let n = n.min(remaining);
            if n == 0 {
                continue;
            }
            state.samples_out = start + n as u64;
            *output = Chunk::linear(Planar(self.buf.share(drop, n)));
            state.apply_mark(output, start, n, sample_rate);
            return Ok(true);
        }

        // Fully drained: rearm for the next stream.
        for overlap in &mut state.overlap {
            overlap.iter_mut().for_each(|s| *s = 0.0);
        }
        state.filled = 0;
        state.samples_in = 0;
        state.samples_out = 0;
        state.pre_drop = state.center;
        state.mark = None;
        Ok(false)
    }

    fn new_stream(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resona_core::audio::{Format, MODE_MONO};
    use resona_core::fir::{DelayFir, GainFir, ParamFir, FIR_IDENTITY, FIR_ZERO};

    const SAMPLE_RATE: u32 = 48000;

    fn spk() -> Speakers {
        Speakers::new(Format::Linear, MODE_MONO, SAMPLE_RATE)
    }

    fn chunk_of(samples: &[Sample]) -> Chunk {
        let mut buf = SampleBuf::new(1, samples.len());
        buf.plane(0).copy_from_slice(samples);
        Chunk::linear(Planar(buf.share(0, samples.len())))
    }

    /// Runs samples through a convolver, flushing at the end.
    fn run(conv: &mut Convolver, samples: &[Sample]) -> Vec<Sample> {
        let mut input = chunk_of(samples);
        let mut output = Chunk::dummy();
        let mut out = Vec::new();
        while conv.process(&mut input, &mut output).unwrap() {
            out.extend_from_slice(output.planar().plane(0));
        }
        while conv.flush(&mut output).unwrap() {
            out.extend_from_slice(output.planar().plane(0));
        }
        out
    }

    #[test]
    fn verify_identity_passthrough() {
        let mut conv = Convolver::new(Box::new(FIR_IDENTITY));
        assert!(conv.open(&spk()));

        let out = run(&mut conv, &[1.0, 2.0, 3.0]);
        assert_eq!(out, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn verify_gain_and_zero() {
        let mut conv = Convolver::new(Box::new(GainFir::new(0.5)));
        assert!(conv.open(&spk()));
        assert_eq!(run(&mut conv, &[2.0, 4.0]), vec![1.0, 2.0]);

        let mut conv = Convolver::new(Box::new(FIR_ZERO));
        assert!(conv.open(&spk()));
        assert_eq!(run(&mut conv, &[2.0, 4.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn verify_delay_kernel() {
        // A pure delay kernel shifts the signal; output length equals input
        // length and the center compensation keeps positions aligned for
        // centered kernels (a delay kernel has center 0, so the shift is
        // the delay itself).
        let delay = 16usize;
        let mut conv =
            Convolver::new(Box::new(DelayFir::new(delay as f64 / SAMPLE_RATE as f64)));
        assert!(conv.open(&spk()));

        let mut impulse = vec![0.0; 256];
        impulse[0] = 1.0;
        let out = run(&mut conv, &impulse);

        assert_eq!(out.len(), 256);
        for (i, &sample) in out.iter().enumerate() {
            let expected = if i == delay { 1.0 } else { 0.0 };
            assert!((sample - expected).abs() < 1e-9, "sample {}: {}", i, sample);
        }
    }

    #[test]
    fn verify_low_pass_attenuates() {
        use resona_core::audio::sample::rms;

        let lp = ParamFir::low_pass(4000.0, 1000.0, 60.0);
        let mut conv = Convolver::new(Box::new(lp));
        assert!(conv.open(&spk()));

        // A 12 kHz tone lands in the stopband.
        let tone: Vec<Sample> = (0..8192)
            .map(|i| (2.0 * std::f64::consts::PI * 12000.0 * i as f64 / SAMPLE_RATE as f64).sin())
            .collect();
        let out = run(&mut conv, &tone);
        assert_eq!(out.len(), tone.len());

        // Skip the transient at both edges.
        let settled = &out[1024..out.len() - 1024];
        assert!(rms(settled) < 0.01);
    }

    #[test]
    fn verify_pass_band_preserves() {
        use resona_core::audio::sample::rms;

        let lp = ParamFir::low_pass(4000.0, 1000.0, 60.0);
        let mut conv = Convolver::new(Box::new(lp));
        assert!(conv.open(&spk()));

        let tone: Vec<Sample> = (0..8192)
            .map(|i| (2.0 * std::f64::consts::PI * 1000.0 * i as f64 / SAMPLE_RATE as f64).sin())
            .collect();
        let out = run(&mut conv, &tone);

        let settled = &out[1024..out.len() - 1024];
        let reference = &tone[1024..tone.len() - 1024];
        assert!((rms(settled) - rms(reference)).abs() < 0.01);
    }

    #[test]
    fn verify_timestamp_surfaces_on_marked_position() {
        let delay = 4usize;
        let mut conv =
            Convolver::new(Box::new(DelayFir::new(delay as f64 / SAMPLE_RATE as f64)));
        assert!(conv.open(&spk()));

        let samples = vec![0.0; 300];
        let mut input = chunk_of(&samples).with_sync(1.5);
        let mut output = Chunk::dummy();

        let mut first = None;
        while conv.process(&mut input, &mut output).unwrap() {
            if first.is_none() {
                first = Some((output.sync, output.time));
            }
        }
        while conv.flush(&mut output).unwrap() {
            if first.is_none() {
                first = Some((output.sync, output.time));
            }
        }

        // The mark was at input position 0, which is the first output
        // sample.
        assert_eq!(first, Some((true, 1.5)));
    }
}
