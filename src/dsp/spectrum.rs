//! Magnitude spectrum of a mono downmix with optional band aggregation.
//!
//! The reference path evaluates every bin directly, which is O(n²) but trivially
//! splittable across workers since each bin depends only on its own index. The fast path
//! runs a real-input FFT over the same windowed buffer and normalisation.

use super::{AudioBlock, Reconfigurable};
use crate::util::audio::{DEFAULT_SAMPLE_RATE, apply_window, mixdown_into, raised_cosine_window};
use crate::util::task_pool::{TaskError, TaskPool};
use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex32;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpectrumMethod {
    /// Per-bin evaluation; the numeric reference.
    #[default]
    Direct,
    /// Real-input FFT, equivalent within floating-point tolerance.
    Fast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    pub transform_size: usize,
    /// `N + 1` increasing boundaries for `N` bands; fewer than two disables banding.
    pub band_edges_hz: Vec<f32>,
    /// Used when a block reports no sample rate.
    pub default_sample_rate: f32,
    pub method: SpectrumMethod,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            transform_size: 512,
            band_edges_hz: Vec::new(),
            default_sample_rate: DEFAULT_SAMPLE_RATE,
            method: SpectrumMethod::Direct,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectrumFrame {
    pub magnitudes: Vec<f32>,
    pub frequencies_hz: Vec<f32>,
    pub band_centers_hz: Vec<f32>,
    pub band_energies: Vec<f32>,
}

impl SpectrumFrame {
    pub fn bin_count(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn band_count(&self) -> usize {
        self.band_energies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }

    /// Index of the largest magnitude; the first wins on ties.
    pub fn peak_bin(&self) -> Option<usize> {
        let mut peak: Option<(usize, f32)> = None;
        for (index, &value) in self.magnitudes.iter().enumerate() {
            if peak.is_none_or(|(_, best)| value > best) {
                peak = Some((index, value));
            }
        }
        peak.map(|(index, _)| index)
    }
}

#[derive(Clone)]
struct FastTransform {
    fft: Arc<dyn RealToComplex<f32>>,
    size: usize,
    buf: Vec<f32>,
    out: Vec<Complex32>,
    scratch: Vec<Complex32>,
}

impl std::fmt::Debug for FastTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastTransform")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl FastTransform {
    fn new(planner: &mut RealFftPlanner<f32>, size: usize) -> Self {
        let fft = planner.plan_fft_forward(size);
        Self {
            scratch: vec![Complex32::default(); fft.get_scratch_len()],
            buf: vec![0.0; size],
            out: vec![Complex32::default(); size / 2 + 1],
            size,
            fft,
        }
    }

    fn magnitudes(&mut self, windowed: &[f32], bins: usize) -> Option<Vec<f32>> {
        debug_assert_eq!(windowed.len(), self.size);
        self.buf.copy_from_slice(windowed);
        self.fft
            .process_with_scratch(&mut self.buf, &mut self.out, &mut self.scratch)
            .ok()?;
        let inv_size = 1.0 / self.size as f32;
        Some(
            self.out
                .iter()
                .take(bins)
                .map(|c| c.norm() * inv_size)
                .collect(),
        )
    }
}

pub struct SpectrumProcessor {
    config: SpectrumConfig,
    planner: RealFftPlanner<f32>,
    fast: Option<FastTransform>,
    window: Vec<f32>,
    mono: Vec<f32>,
}

impl std::fmt::Debug for SpectrumProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrumProcessor")
            .field("config", &self.config)
            .field("fast", &self.fast)
            .finish_non_exhaustive()
    }
}

impl SpectrumProcessor {
    pub fn new(config: SpectrumConfig) -> Self {
        Self {
            config,
            planner: RealFftPlanner::new(),
            fast: None,
            window: Vec::new(),
            mono: Vec::new(),
        }
    }

    pub fn config(&self) -> &SpectrumConfig {
        &self.config
    }

    /// Analyse one block. Only worker failure inside `runner` is an error; degenerate
    /// input produces an empty frame.
    pub fn analyze(
        &mut self,
        block: &AudioBlock<'_>,
        runner: Option<&TaskPool>,
    ) -> Result<SpectrumFrame, TaskError> {
        let frames = block.frame_count();
        if block.is_empty() || self.config.transform_size == 0 {
            return Ok(SpectrumFrame::default());
        }

        let size = self.config.transform_size.min(frames);
        let bins = size / 2;
        self.prepare(size);

        let written = mixdown_into(&mut self.mono, block.samples, block.channels);
        debug_assert_eq!(written, size);
        apply_window(&mut self.mono, &self.window);

        let magnitudes = match (self.config.method, runner) {
            (SpectrumMethod::Fast, _) => self.fast_magnitudes(size, bins),
            (SpectrumMethod::Direct, Some(pool)) if pool.worker_count() > 1 && bins > 1 => {
                parallel_magnitudes(pool, Arc::from(self.mono.as_slice()), bins)?
            }
            (SpectrumMethod::Direct, _) => {
                let mut magnitudes = vec![0.0; bins];
                direct_bins(&self.mono, 0..bins, &mut magnitudes);
                magnitudes
            }
        };

        let sample_rate = if block.sample_rate > 0.0 {
            block.sample_rate
        } else {
            self.config.default_sample_rate
        };
        let frequencies_hz = (0..bins)
            .map(|k| sample_rate * k as f32 / size as f32)
            .collect::<Vec<_>>();

        let (band_centers_hz, band_energies) =
            aggregate_bands(&magnitudes, &frequencies_hz, &self.config.band_edges_hz);

        Ok(SpectrumFrame {
            magnitudes,
            frequencies_hz,
            band_centers_hz,
            band_energies,
        })
    }

    fn prepare(&mut self, size: usize) {
        if self.window.len() != size {
            self.window = raised_cosine_window(size);
        }
        self.mono.clear();
        self.mono.resize(size, 0.0);
    }

    fn fast_magnitudes(&mut self, size: usize, bins: usize) -> Vec<f32> {
        if self.fast.as_ref().is_none_or(|fast| fast.size != size) {
            self.fast = Some(FastTransform::new(&mut self.planner, size));
        }

        let computed = self
            .fast
            .as_mut()
            .and_then(|fast| fast.magnitudes(&self.mono, bins));
        computed.unwrap_or_else(|| {
            debug!("[spectrum] fast transform rejected buffers; using direct evaluation");
            let mut magnitudes = vec![0.0; bins];
            direct_bins(&self.mono, 0..bins, &mut magnitudes);
            magnitudes
        })
    }
}

impl Reconfigurable<SpectrumConfig> for SpectrumProcessor {
    fn update_config(&mut self, config: SpectrumConfig) {
        self.config = config;
        self.fast = None;
        self.window.clear();
    }
}

/// Evaluate `bins` of the DFT of `windowed` into `out` (one slot per bin in the range).
pub fn direct_bins(windowed: &[f32], bins: Range<usize>, out: &mut [f32]) {
    let size = windowed.len();
    if size == 0 {
        out.fill(0.0);
        return;
    }

    let inv_size = 1.0 / size as f32;
    let step = core::f32::consts::TAU * inv_size;
    for (k, slot) in bins.zip(out.iter_mut()) {
        let mut real = 0.0f32;
        let mut imag = 0.0f32;
        for (n, &sample) in windowed.iter().enumerate() {
            // Reduce k*n mod size so the angle stays within one turn.
            let angle = step * ((k * n) % size) as f32;
            let (sin, cos) = angle.sin_cos();
            real += sample * cos;
            imag -= sample * sin;
        }
        *slot = (real * real + imag * imag).sqrt() * inv_size;
    }
}

/// Contiguous bin ranges, one per worker; the last absorbs the remainder.
pub fn partition_bins(bins: usize, workers: usize) -> Vec<Range<usize>> {
    if bins == 0 {
        return Vec::new();
    }

    let workers = workers.clamp(1, bins);
    let chunk = bins / workers;
    (0..workers)
        .map(|i| {
            let start = i * chunk;
            let end = if i + 1 == workers { bins } else { start + chunk };
            start..end
        })
        .collect()
}

fn parallel_magnitudes(
    pool: &TaskPool,
    windowed: Arc<[f32]>,
    bins: usize,
) -> Result<Vec<f32>, TaskError> {
    let ranges = partition_bins(bins, pool.worker_count());
    let handles = ranges
        .iter()
        .cloned()
        .map(|range| {
            let input = Arc::clone(&windowed);
            pool.submit(move || {
                let mut chunk = vec![0.0; range.len()];
                direct_bins(&input, range, &mut chunk);
                Ok(chunk)
            })
        })
        .collect::<Vec<_>>();

    let chunks = TaskPool::wait_all(handles)?;
    let mut magnitudes = vec![0.0; bins];
    for (range, chunk) in ranges.into_iter().zip(chunks) {
        magnitudes[range].copy_from_slice(&chunk);
    }
    Ok(magnitudes)
}

/// Sum magnitudes into half-open `[edges[i], edges[i + 1])` bands.
pub fn aggregate_bands(
    magnitudes: &[f32],
    frequencies_hz: &[f32],
    edges: &[f32],
) -> (Vec<f32>, Vec<f32>) {
    if edges.len() < 2 {
        return (Vec::new(), Vec::new());
    }

    edges
        .windows(2)
        .map(|pair| {
            let (low, high) = (pair[0], pair[1]);
            let energy = magnitudes
                .iter()
                .zip(frequencies_hz)
                .filter(|&(_, &freq)| freq >= low && freq < high)
                .map(|(&magnitude, _)| magnitude)
                .sum::<f32>();
            (0.5 * (low + high), energy)
        })
        .unzip()
}
