//! Spectrum presets and the JSON-backed pipeline configuration.

use crate::dsp::spectrum::{SpectrumConfig, SpectrumMethod};
use crate::util::audio::DEFAULT_SAMPLE_RATE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CONFIG_FILE_NAME: &str = "pipeline.json";
const MIN_TRANSFORM_SIZE: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumPreset {
    pub name: &'static str,
    pub transform_size: usize,
    pub band_edges_hz: &'static [f32],
}

pub const WIDEBAND: SpectrumPreset = SpectrumPreset {
    name: "Wideband",
    transform_size: 512,
    band_edges_hz: &[20.0, 60.0, 250.0, 1_000.0, 4_000.0, 12_000.0, 20_000.0],
};

pub const SUBWOOFER: SpectrumPreset = SpectrumPreset {
    name: "Subwoofer",
    transform_size: 256,
    band_edges_hz: &[20.0, 40.0, 80.0, 120.0, 200.0],
};

pub const PRESENCE: SpectrumPreset = SpectrumPreset {
    name: "Presence",
    transform_size: 512,
    band_edges_hz: &[200.0, 500.0, 1_000.0, 2_500.0, 5_000.0, 8_000.0],
};

pub static PRESETS: [SpectrumPreset; 3] = [WIDEBAND, SUBWOOFER, PRESENCE];

pub fn available_preset_names() -> impl Iterator<Item = &'static str> {
    PRESETS.iter().map(|preset| preset.name)
}

pub fn preset_by_name(name: &str) -> Option<&'static SpectrumPreset> {
    PRESETS.iter().find(|preset| preset.name == name)
}

/// Like [`preset_by_name`], falling back to the wideband preset.
pub fn preset_or_default(name: &str) -> &'static SpectrumPreset {
    preset_by_name(name).unwrap_or_else(|| {
        warn!("[config] unknown preset '{name}'; using '{}'", WIDEBAND.name);
        &PRESETS[0]
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sample_rate: f32,
    pub block_size: usize,
    pub preset: String,
    /// Overrides the preset's transform size.
    pub transform_size: Option<usize>,
    pub history_length: usize,
    /// Defaults to the available hardware concurrency.
    pub worker_count: Option<usize>,
    pub cycle_interval_ms: u64,
    /// Run forever when unset.
    pub cycle_count: Option<u64>,
    pub spectrum_method: SpectrumMethod,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: 1_024,
            preset: WIDEBAND.name.to_owned(),
            transform_size: None,
            history_length: 120,
            worker_count: None,
            cycle_interval_ms: 16,
            cycle_count: None,
            spectrum_method: SpectrumMethod::Direct,
        }
    }
}

impl PipelineConfig {
    /// Load from the per-user config directory; missing or malformed files yield defaults.
    pub fn load_or_default() -> Self {
        Self::load_or_default_in(&config_dir())
    }

    /// Load `pipeline.json` from `dir`; missing, unreadable or malformed files yield defaults.
    pub fn load_or_default_in(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE_NAME);
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str::<Self>(&contents)
                .map_err(|e| warn!("[config] parse error {path:?}: {e}"))
                .unwrap_or_default(),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("[config] no config at {path:?}; using defaults");
                Self::default()
            }
            Err(err) => {
                warn!("[config] failed to read {path:?}: {err}");
                Self::default()
            }
        };
        config.sanitize();
        config
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.sanitize();
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialise config")?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, json)
            .and_then(|()| fs::rename(&temp_path, path))
            .with_context(|| format!("failed to write config {}", path.display()))
    }

    /// Clamp degenerate values and resolve an unknown preset name to the fallback.
    pub fn sanitize(&mut self) {
        if preset_by_name(&self.preset).is_none() {
            self.preset = preset_or_default(&self.preset).name.to_owned();
        }
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            self.sample_rate = DEFAULT_SAMPLE_RATE;
        }
        self.block_size = self.block_size.max(1);
        self.history_length = self.history_length.max(1);
        self.cycle_interval_ms = self.cycle_interval_ms.min(1_000);
        if let Some(size) = self.transform_size.as_mut() {
            *size = (*size).max(MIN_TRANSFORM_SIZE);
        }
        if let Some(workers) = self.worker_count.as_mut() {
            *workers = (*workers).max(1);
        }
    }

    /// Unknown names fall back to the wideband preset; `sanitize` reports them.
    pub fn preset(&self) -> &'static SpectrumPreset {
        preset_by_name(&self.preset).unwrap_or(&PRESETS[0])
    }

    pub fn transform_size(&self) -> usize {
        self.transform_size
            .unwrap_or(self.preset().transform_size)
            .max(MIN_TRANSFORM_SIZE)
    }

    pub fn bin_count(&self) -> usize {
        self.transform_size() / 2
    }

    pub fn spectrum_config(&self) -> SpectrumConfig {
        SpectrumConfig {
            transform_size: self.transform_size(),
            band_edges_hz: sanitize_band_edges(self.preset().band_edges_hz),
            default_sample_rate: self.sample_rate,
            method: self.spectrum_method,
        }
    }
}

/// Keep finite edges that strictly increase.
pub fn sanitize_band_edges(edges: &[f32]) -> Vec<f32> {
    let mut cleaned: Vec<f32> = Vec::with_capacity(edges.len());
    for &edge in edges.iter().filter(|edge| edge.is_finite()) {
        if cleaned.last().is_none_or(|&last| edge > last) {
            cleaned.push(edge);
        }
    }
    cleaned
}

fn config_dir() -> PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("surroundscope")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn presets_resolve_by_name() {
        assert_eq!(
            available_preset_names().collect::<Vec<_>>(),
            vec!["Wideband", "Subwoofer", "Presence"]
        );
        assert_eq!(preset_by_name("Subwoofer").map(|p| p.transform_size), Some(256));
        assert!(preset_by_name("subwoofer").is_none());
        assert_eq!(preset_or_default("Nope").name, "Wideband");
    }

    #[test]
    fn spectrum_config_follows_preset_and_override() {
        let mut config = PipelineConfig {
            preset: "Presence".into(),
            ..PipelineConfig::default()
        };
        let spectrum = config.spectrum_config();
        assert_eq!(spectrum.transform_size, 512);
        assert_eq!(spectrum.band_edges_hz.len(), 6);

        config.transform_size = Some(128);
        assert_eq!(config.spectrum_config().transform_size, 128);
        assert_eq!(config.bin_count(), 64);
    }

    #[test]
    fn sanitize_clamps_degenerate_values() {
        let mut config = PipelineConfig {
            sample_rate: -1.0,
            block_size: 0,
            history_length: 0,
            transform_size: Some(0),
            worker_count: Some(0),
            ..PipelineConfig::default()
        };
        config.sanitize();
        assert_eq!(config.sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(config.block_size, 1);
        assert_eq!(config.history_length, 1);
        assert_eq!(config.transform_size, Some(2));
        assert_eq!(config.worker_count, Some(1));
    }

    #[test]
    fn band_edges_are_filtered() {
        let edges = sanitize_band_edges(&[20.0, f32::NAN, 10.0, 60.0, 60.0, f32::INFINITY, 100.0]);
        assert_eq!(edges, vec![20.0, 60.0, 100.0]);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        fs::write(&path, r#"{ "preset": "Subwoofer", "history_length": 0 }"#).unwrap();

        let config = PipelineConfig::load_from(&path).unwrap();
        assert_eq!(config.preset, "Subwoofer");
        assert_eq!(config.history_length, 1);
        assert_eq!(config.block_size, 1_024);
        assert_eq!(config.transform_size(), 256);
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("pipeline.json");
        let config = PipelineConfig {
            worker_count: Some(3),
            cycle_count: Some(10),
            spectrum_method: SpectrumMethod::Fast,
            ..PipelineConfig::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(PipelineConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        fs::write(&path, "{ not json").unwrap();
        let err = PipelineConfig::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse config"));
        assert!(PipelineConfig::load_from(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn load_or_default_in_tolerates_bad_files() {
        let dir = tempdir().unwrap();
        assert_eq!(PipelineConfig::load_or_default_in(dir.path()), PipelineConfig::default());

        fs::write(dir.path().join("pipeline.json"), "{ not json").unwrap();
        assert_eq!(PipelineConfig::load_or_default_in(dir.path()), PipelineConfig::default());

        fs::write(dir.path().join("pipeline.json"), r#"{ "cycle_count": 4 }"#).unwrap();
        let config = PipelineConfig::load_or_default_in(dir.path());
        assert_eq!(config.cycle_count, Some(4));
        assert_eq!(config.preset, "Wideband");
    }

    #[test]
    fn load_or_default_in_falls_back_when_path_is_a_directory() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("pipeline.json")).unwrap();
        assert_eq!(PipelineConfig::load_or_default_in(dir.path()), PipelineConfig::default());
    }

    #[test]
    fn sanitize_resolves_unknown_preset_once() {
        let mut config = PipelineConfig {
            preset: "Nope".into(),
            transform_size: None,
            ..PipelineConfig::default()
        };
        assert_eq!(config.preset().name, "Wideband");

        config.sanitize();
        assert_eq!(config.preset, "Wideband");
        assert!(preset_by_name(&config.preset).is_some());
        assert_eq!(config.transform_size(), WIDEBAND.transform_size);
    }
}
