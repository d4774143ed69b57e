//! Block-synchronous driver: spatial summary, spectrum, waterfall and bounds per cycle.

use crate::config::PipelineConfig;
use crate::dsp::{AudioBlock, Reconfigurable};
use crate::dsp::differential::{DifferentialBounds, analyze_waterfall};
use crate::dsp::spatial::{CHANNEL_GEOMETRY, SURROUND_CHANNELS, SpatialAnalyzer};
use crate::dsp::spectrum::SpectrumProcessor;
use crate::dsp::waterfall::WaterfallHistory;
use crate::source::BlockSource;
use crate::util::task_pool::{TaskError, TaskPool};
use bytemuck::{Pod, Zeroable};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Display-facing state refreshed by every successful cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualizerState {
    /// Per-channel RMS clamped to 1.0.
    pub meter_levels: [f32; SURROUND_CHANNELS],
    pub energy: f32,
    pub azimuth_degrees: f32,
    pub elevation_degrees: f32,
    pub dominant_channel: &'static str,
    pub band_centers_hz: Vec<f32>,
    pub band_energies: Vec<f32>,
    pub bounds: DifferentialBounds,
}

impl Default for VisualizerState {
    fn default() -> Self {
        Self {
            meter_levels: [0.0; SURROUND_CHANNELS],
            energy: 0.0,
            azimuth_degrees: 0.0,
            elevation_degrees: 0.0,
            dominant_channel: CHANNEL_GEOMETRY[0].label,
            band_centers_hz: Vec::new(),
            band_energies: Vec::new(),
            bounds: DifferentialBounds::default(),
        }
    }
}

/// Scalar metrics laid out for a GPU uniform/storage upload.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct AnalysisMetrics {
    pub energy: f32,
    pub azimuth_degrees: f32,
    pub elevation_degrees: f32,
    _padding: f32,
}

impl AnalysisMetrics {
    pub fn from_state(state: &VisualizerState) -> Self {
        Self {
            energy: state.energy,
            azimuth_degrees: state.azimuth_degrees,
            elevation_degrees: state.elevation_degrees,
            _padding: 0.0,
        }
    }
}

/// Everything a renderer needs for one displayed frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderFrame<'a> {
    pub state: &'a VisualizerState,
    pub metrics: AnalysisMetrics,
    pub waterfall: &'a [f32],
    pub bin_count: usize,
    pub history_length: usize,
}

pub trait Renderer {
    fn present(&mut self, frame: &RenderFrame<'_>);
}

/// Renderer that reports the frame summary through `tracing`.
#[derive(Debug, Clone)]
pub struct LogRenderer {
    every: u64,
    presented: u64,
}

impl LogRenderer {
    /// Log one line every `every` frames.
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            presented: 0,
        }
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl Default for LogRenderer {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Renderer for LogRenderer {
    fn present(&mut self, frame: &RenderFrame<'_>) {
        if self.presented % self.every == 0 {
            let state = frame.state;
            info!(
                "[render] energy={:.3} azimuth={:.1} elevation={:.1} dominant={} bounds_y=[{:.4}, {:.4}]",
                state.energy,
                state.azimuth_degrees,
                state.elevation_degrees,
                state.dominant_channel,
                state.bounds.bounds.min[1],
                state.bounds.bounds.max[1],
            );
        }
        self.presented += 1;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub dropped: u64,
}

#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    spatial: SpatialAnalyzer,
    spectrum: SpectrumProcessor,
    pool: TaskPool,
    waterfall: WaterfallHistory,
    state: VisualizerState,
}

impl Pipeline {
    pub fn new(mut config: PipelineConfig) -> Self {
        config.sanitize();
        let pool = build_pool(config.worker_count);

        let mut waterfall = WaterfallHistory::new();
        waterfall.initialize(config.bin_count(), config.history_length);
        log_layout(&config, &pool);

        Self {
            spectrum: SpectrumProcessor::new(config.spectrum_config()),
            spatial: SpatialAnalyzer::new(),
            pool,
            waterfall,
            state: VisualizerState::default(),
            config,
        }
    }

    /// Switch to `config` between cycles. History and state start over at the new size.
    pub fn reconfigure(&mut self, mut config: PipelineConfig) {
        config.sanitize();
        if config.worker_count != self.config.worker_count {
            self.pool = build_pool(config.worker_count);
        }
        self.spectrum.update_config(config.spectrum_config());
        self.waterfall.initialize(config.bin_count(), config.history_length);
        self.state = VisualizerState::default();
        log_layout(&config, &self.pool);
        self.config = config;
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> &VisualizerState {
        &self.state
    }

    pub fn waterfall(&self) -> &WaterfallHistory {
        &self.waterfall
    }

    pub fn waterfall_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.waterfall.as_slice())
    }

    pub fn metrics(&self) -> AnalysisMetrics {
        AnalysisMetrics::from_state(&self.state)
    }

    pub fn render_frame(&self) -> RenderFrame<'_> {
        RenderFrame {
            state: &self.state,
            metrics: self.metrics(),
            waterfall: self.waterfall.as_slice(),
            bin_count: self.waterfall.bin_count(),
            history_length: self.waterfall.history_length(),
        }
    }

    /// Run one cycle. On worker failure nothing is updated and the error is returned.
    pub fn run_cycle(&mut self, block: &AudioBlock<'_>) -> Result<&VisualizerState, TaskError> {
        let spatial = self.spatial.analyze(block);
        let spectrum = self.spectrum.analyze(block, Some(&self.pool))?;

        self.waterfall.update(&spectrum);
        let bounds = analyze_waterfall(
            self.waterfall.as_slice(),
            self.waterfall.bin_count(),
            self.waterfall.history_length(),
            true,
        );

        let state = &mut self.state;
        for (level, rms) in state.meter_levels.iter_mut().zip(spatial.rms) {
            *level = rms.min(1.0);
        }
        state.energy = spatial.energy;
        state.azimuth_degrees = spatial.azimuth_degrees;
        state.elevation_degrees = spatial.elevation_degrees;
        state.dominant_channel = spatial.dominant_channel;
        state.band_centers_hz = spectrum.band_centers_hz;
        state.band_energies = spectrum.band_energies;
        state.bounds = bounds;

        Ok(&self.state)
    }

    /// Pull blocks from `source` at the configured rate until `cycle_count` is reached.
    /// Failed cycles are dropped and the previous state is presented again.
    pub fn run<S, R>(&mut self, source: &mut S, renderer: &mut R) -> RunSummary
    where
        S: BlockSource + ?Sized,
        R: Renderer + ?Sized,
    {
        let interval = Duration::from_millis(self.config.cycle_interval_ms);
        let mut summary = RunSummary::default();
        let mut next_tick = Instant::now();

        while self.config.cycle_count.is_none_or(|limit| summary.cycles < limit) {
            let block = source.next_block();
            if let Err(err) = self.run_cycle(&block.as_block()) {
                summary.dropped += 1;
                warn!(
                    "[pipeline] dropped cycle at t={:.3}s: {err}",
                    block.timestamp
                );
            }
            renderer.present(&self.render_frame());
            summary.cycles += 1;

            if !interval.is_zero() {
                next_tick += interval;
                let now = Instant::now();
                if next_tick > now {
                    thread::sleep(next_tick - now);
                } else {
                    next_tick = now;
                }
            }
        }

        debug!(
            "[pipeline] finished {} cycle(s), {} dropped",
            summary.cycles, summary.dropped
        );
        summary
    }
}

fn build_pool(worker_count: Option<usize>) -> TaskPool {
    match worker_count {
        Some(workers) => TaskPool::new(workers),
        None => TaskPool::with_default_workers(),
    }
}

fn log_layout(config: &PipelineConfig, pool: &TaskPool) {
    info!(
        "[pipeline] preset={} transform={} bins={} history={} workers={} method={:?}",
        config.preset().name,
        config.transform_size(),
        config.bin_count(),
        config.history_length,
        pool.worker_count(),
        config.spectrum_method,
    );
}
