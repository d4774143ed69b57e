//! Block sources feeding the analysis pipeline.

use crate::dsp::SampleBlock;
use crate::dsp::spatial::SURROUND_CHANNELS;

/// Supplies one block of interleaved samples per processing cycle.
pub trait BlockSource {
    fn next_block(&mut self) -> SampleBlock;
    fn sample_rate(&self) -> f32;
    fn block_size(&self) -> usize;
}

const BASE_FREQUENCY_HZ: f32 = 110.0;
const CHANNEL_DETUNE: f32 = 0.15;
const TREMOLO_RATE: f32 = 0.35;

/// Deterministic 7.1 test signal: each channel is a detuned sine under a slow shared
/// amplitude swell, so loudness and direction drift over time.
#[derive(Debug, Clone)]
pub struct SyntheticSurround {
    sample_rate: f32,
    block_size: usize,
    position: u64,
}

impl SyntheticSurround {
    pub fn new(sample_rate: f32, block_size: usize) -> Self {
        Self {
            sample_rate: if sample_rate > 0.0 {
                sample_rate
            } else {
                crate::util::audio::DEFAULT_SAMPLE_RATE
            },
            block_size,
            position: 0,
        }
    }

    /// Stream position in frames.
    pub fn position(&self) -> u64 {
        self.position
    }
}

impl BlockSource for SyntheticSurround {
    fn next_block(&mut self) -> SampleBlock {
        let rate = self.sample_rate as f64;
        let mut samples = Vec::with_capacity(self.block_size * SURROUND_CHANNELS);

        for index in 0..self.block_size as u64 {
            let t = ((self.position + index) as f64 / rate) as f32;
            let amplitude = 0.5 + 0.5 * (t * TREMOLO_RATE).sin();
            samples.extend((0..SURROUND_CHANNELS).map(|channel| {
                let frequency = BASE_FREQUENCY_HZ * (1.0 + channel as f32 * CHANNEL_DETUNE);
                amplitude * (core::f32::consts::TAU * frequency * t).sin()
            }));
        }

        let block = SampleBlock {
            samples,
            channels: SURROUND_CHANNELS,
            sample_rate: self.sample_rate,
            timestamp: self.position as f64 / rate,
        };
        self.position += self.block_size as u64;
        block
    }

    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn block_size(&self) -> usize {
        self.block_size
    }
}
