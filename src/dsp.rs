pub mod differential;
pub mod spatial;
pub mod spectrum;
pub mod waterfall;

/// Borrowed view of one block of interleaved multi-channel samples.
#[derive(Debug, Clone, Copy)]
pub struct AudioBlock<'a> {
    pub samples: &'a [f32],
    pub channels: usize,
    pub sample_rate: f32,
    /// Stream time of the first frame, in seconds.
    pub timestamp: f64,
}

impl<'a> AudioBlock<'a> {
    pub fn new(samples: &'a [f32], channels: usize, sample_rate: f32, timestamp: f64) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
            timestamp,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels.max(1)
    }

    /// Complete frames only; a trailing partial frame is ignored.
    pub fn frames(&self) -> std::slice::ChunksExact<'a, f32> {
        self.samples.chunks_exact(self.channels.max(1))
    }

    pub fn is_empty(&self) -> bool {
        self.channels == 0 || self.frame_count() == 0
    }
}

/// Owned sample block as produced by a block source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleBlock {
    pub samples: Vec<f32>,
    pub channels: usize,
    pub sample_rate: f32,
    pub timestamp: f64,
}

impl SampleBlock {
    pub fn from_frames<const C: usize>(
        frames: &[[f32; C]],
        sample_rate: f32,
        timestamp: f64,
    ) -> Self {
        Self {
            samples: frames.iter().flatten().copied().collect(),
            channels: C,
            sample_rate,
            timestamp,
        }
    }

    pub fn as_block(&self) -> AudioBlock<'_> {
        AudioBlock::new(&self.samples, self.channels, self.sample_rate, self.timestamp)
    }
}

/// Processors whose settings can change between blocks.
pub trait Reconfigurable<Cfg> {
    fn update_config(&mut self, config: Cfg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_skip_trailing_partial_frame() {
        let samples = [1.0, 2.0, 3.0, 4.0, 5.0];
        let block = AudioBlock::new(&samples, 2, 48_000.0, 0.0);
        assert_eq!(block.frame_count(), 2);
        assert_eq!(block.frames().count(), 2);
    }

    #[test]
    fn sample_block_from_frames_interleaves() {
        let block = SampleBlock::from_frames(&[[1.0, 2.0], [3.0, 4.0]], 44_100.0, 1.5);
        assert_eq!(block.samples, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(block.channels, 2);
        assert_eq!(block.as_block().frame_count(), 2);
        assert!(!block.as_block().is_empty());
        assert!(SampleBlock::default().as_block().is_empty());
    }
}
