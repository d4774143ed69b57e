//! Bounds and forward-difference gradient over a waterfall buffer, used for display
//! scaling and shading.

/// Axis-aligned box over (bin index, magnitude, history index).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisBounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DifferentialBounds {
    pub bounds: AxisBounds,
    /// x: bin-direction difference, y: mean absolute magnitude, z: history-direction difference.
    pub gradient: [f32; 3],
}

pub fn analyze_waterfall(
    waterfall: &[f32],
    bin_count: usize,
    history_length: usize,
    include_gradient: bool,
) -> DifferentialBounds {
    let mut result = DifferentialBounds::default();
    if waterfall.is_empty() || bin_count == 0 || history_length == 0 {
        return result;
    }

    let size = (bin_count * history_length).min(waterfall.len());
    let region = &waterfall[..size];
    let (min_value, max_value) = region
        .iter()
        .fold((region[0], region[0]), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    result.bounds = AxisBounds {
        min: [0.0, min_value, 0.0],
        max: [
            (bin_count - 1) as f32,
            max_value,
            (history_length - 1) as f32,
        ],
    };

    if include_gradient {
        let (mut dx, mut dy, mut dz) = (0.0f32, 0.0f32, 0.0f32);
        for row in 1..history_length {
            for col in 1..bin_count {
                let index = row * bin_count + col;
                if index >= size {
                    continue;
                }
                let current = region[index];
                dx += current - region[index - 1];
                dz += current - region[index - bin_count];
                dy += current.abs();
            }
        }

        // Normalised over the full interior even when the buffer is short. A single row
        // or column has no interior at all and keeps a zero gradient.
        let interior = (history_length - 1) * (bin_count - 1);
        if interior > 0 {
            let denom = interior as f32;
            result.gradient = [dx / denom, dy / denom, dz / denom];
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_zeroed_bounds() {
        assert_eq!(
            analyze_waterfall(&[], 4, 4, true),
            DifferentialBounds::default()
        );
        assert_eq!(
            analyze_waterfall(&[1.0; 4], 0, 4, true),
            DifferentialBounds::default()
        );
        assert_eq!(
            analyze_waterfall(&[1.0; 4], 4, 0, true),
            DifferentialBounds::default()
        );
    }

    #[test]
    fn constant_buffer_has_flat_gradient() {
        let value = -0.75;
        let result = analyze_waterfall(&[value; 20], 5, 4, true);
        assert_eq!(result.bounds.min, [0.0, value, 0.0]);
        assert_eq!(result.bounds.max, [4.0, value, 3.0]);
        assert_eq!(result.gradient, [0.0, value.abs(), 0.0]);
    }

    #[test]
    fn gradient_is_skipped_unless_requested() {
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let result = analyze_waterfall(&data, 4, 3, false);
        assert_eq!(result.gradient, [0.0; 3]);
        assert_eq!(result.bounds.min[1], 0.0);
        assert_eq!(result.bounds.max[1], 11.0);
    }

    #[test]
    fn ramps_produce_expected_differences() {
        // value = col + 10 * row, so every interior cell has dx = 1 and dz = 10.
        let (bins, rows) = (4, 3);
        let data: Vec<f32> = (0..rows)
            .flat_map(|row| (0..bins).map(move |col| (col + 10 * row) as f32))
            .collect();
        let result = analyze_waterfall(&data, bins, rows, true);
        assert!((result.gradient[0] - 1.0).abs() < 1e-6);
        assert!((result.gradient[2] - 10.0).abs() < 1e-6);

        let interior: f32 = [11.0, 12.0, 13.0, 21.0, 22.0, 23.0].iter().sum();
        assert!((result.gradient[1] - interior / 6.0).abs() < 1e-5);
    }

    #[test]
    fn single_row_has_no_gradient() {
        let result = analyze_waterfall(&[1.0, -2.0, 3.0], 3, 1, true);
        assert_eq!(result.gradient, [0.0; 3]);
        assert_eq!(result.bounds.min, [0.0, -2.0, 0.0]);
        assert_eq!(result.bounds.max, [2.0, 3.0, 0.0]);
    }

    #[test]
    fn short_buffer_keeps_full_normalisation() {
        // Only the first interior row is present, but the denominator still spans two rows.
        let data = [0.0, 0.0, 0.0, 1.0, 2.0, 3.0];
        let result = analyze_waterfall(&data, 3, 3, true);
        assert_eq!(result.bounds.max, [2.0, 3.0, 2.0]);
        assert!((result.gradient[0] - 2.0 / 4.0).abs() < 1e-6);
        assert!((result.gradient[1] - 5.0 / 4.0).abs() < 1e-6);
        assert!((result.gradient[2] - 5.0 / 4.0).abs() < 1e-6);
    }
}
