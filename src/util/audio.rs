// Default sample rate (Hz) used throughout the audio pipeline.
// blocks carry their own rate, this exists mainly as a default
// during init and a fallback for blocks that report none.
pub const DEFAULT_SAMPLE_RATE: f32 = 48_000.0;

/// Average each complete frame of `samples` into `dst`, stopping at whichever runs out first.
/// Returns the number of mono samples written.
pub fn mixdown_into(dst: &mut [f32], samples: &[f32], channels: usize) -> usize {
    if channels == 0 || samples.is_empty() {
        return 0;
    }

    if channels == 1 {
        let len = dst.len().min(samples.len());
        dst[..len].copy_from_slice(&samples[..len]);
        return len;
    }

    let inv = 1.0 / channels as f32;
    let mut written = 0;
    for (out, frame) in dst.iter_mut().zip(samples.chunks_exact(channels)) {
        let sum: f32 = frame.iter().sum();
        *out = sum * inv;
        written += 1;
    }
    written
}

#[inline]
pub fn apply_window(buffer: &mut [f32], window: &[f32]) {
    debug_assert_eq!(buffer.len(), window.len());
    for (sample, coeff) in buffer.iter_mut().zip(window.iter()) {
        *sample *= *coeff;
    }
}

/// Raised-cosine window `0.5 - 0.5 * cos(2π n / (len - 1))`, zero at both ends.
pub fn raised_cosine_window(len: usize) -> Vec<f32> {
    const ALPHA: f32 = 0.5;
    let denom = len.saturating_sub(1).max(1) as f32;
    (0..len)
        .map(|n| {
            let phase = n as f32 / denom;
            ALPHA - (1.0 - ALPHA) * (core::f32::consts::TAU * phase).cos()
        })
        .collect()
}
