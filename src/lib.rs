//! Real-time surround audio analytics: spatial loudness, spectrum with band aggregation,
//! and a rolling waterfall with differential statistics for display.

pub mod config;
pub mod dsp;
pub mod pipeline;
pub mod source;
pub mod util;
