//! Per-channel loudness and dominant sound direction for surround blocks.

use super::AudioBlock;

pub const SURROUND_CHANNELS: usize = 8;

const RAD_TO_DEG: f32 = 180.0 / core::f32::consts::PI;

/// Speaker placement for one channel of the 7.1 layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelGeometry {
    pub label: &'static str,
    /// x = right, y = up, z = front.
    pub direction: [f32; 3],
}

pub const CHANNEL_GEOMETRY: [ChannelGeometry; SURROUND_CHANNELS] = [
    ChannelGeometry {
        label: "Front Left",
        direction: [-0.7, 0.0, 1.0],
    },
    ChannelGeometry {
        label: "Front Right",
        direction: [0.7, 0.0, 1.0],
    },
    ChannelGeometry {
        label: "Center",
        direction: [0.0, 0.0, 1.0],
    },
    ChannelGeometry {
        label: "LFE",
        direction: [0.0, -0.4, 0.6],
    },
    ChannelGeometry {
        label: "Surround Left",
        direction: [-1.0, 0.0, 0.0],
    },
    ChannelGeometry {
        label: "Surround Right",
        direction: [1.0, 0.0, 0.0],
    },
    ChannelGeometry {
        label: "Rear Left",
        direction: [-0.8, 0.0, -1.0],
    },
    ChannelGeometry {
        label: "Rear Right",
        direction: [0.8, 0.0, -1.0],
    },
];

#[derive(Debug, Clone, PartialEq)]
pub struct SpatialSnapshot {
    pub rms: [f32; SURROUND_CHANNELS],
    /// Sum of per-channel RMS.
    pub energy: f32,
    pub azimuth_degrees: f32,
    pub elevation_degrees: f32,
    pub dominant_index: usize,
    pub dominant_channel: &'static str,
}

impl Default for SpatialSnapshot {
    fn default() -> Self {
        Self {
            rms: [0.0; SURROUND_CHANNELS],
            energy: 0.0,
            azimuth_degrees: 0.0,
            elevation_degrees: 0.0,
            dominant_index: 0,
            dominant_channel: CHANNEL_GEOMETRY[0].label,
        }
    }
}

/// Stateless analyzer; every block is summarised on its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpatialAnalyzer;

impl SpatialAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, block: &AudioBlock<'_>) -> SpatialSnapshot {
        let mut snapshot = SpatialSnapshot::default();
        if block.is_empty() {
            return snapshot;
        }

        // Channels beyond the surround layout carry no geometry and are ignored.
        let mut sum_squares = [0.0f32; SURROUND_CHANNELS];
        let mut frames = 0usize;
        for frame in block.frames() {
            for (acc, &sample) in sum_squares.iter_mut().zip(frame) {
                *acc += sample * sample;
            }
            frames += 1;
        }

        let inv_count = 1.0 / frames as f32;
        for (rms, sum) in snapshot.rms.iter_mut().zip(sum_squares) {
            *rms = (sum * inv_count).sqrt();
        }
        snapshot.energy = snapshot.rms.iter().sum();

        let [x, y, z] = snapshot.rms.iter().zip(CHANNEL_GEOMETRY.iter()).fold(
            [0.0f32; 3],
            |[x, y, z], (&weight, geometry)| {
                let [dx, dy, dz] = geometry.direction;
                [x + weight * dx, y + weight * dy, z + weight * dz]
            },
        );

        let horizontal = (x * x + z * z).sqrt();
        snapshot.azimuth_degrees = x.atan2(z) * RAD_TO_DEG;
        snapshot.elevation_degrees = y.atan2(horizontal) * RAD_TO_DEG;

        let mut dominant = 0;
        for (index, &rms) in snapshot.rms.iter().enumerate().skip(1) {
            if rms > snapshot.rms[dominant] {
                dominant = index;
            }
        }
        snapshot.dominant_index = dominant;
        snapshot.dominant_channel = CHANNEL_GEOMETRY[dominant].label;

        snapshot
    }
}
