//! Rolling newest-first history of spectra stored as one flat row-major buffer.

use super::spectrum::SpectrumFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaterfallState {
    Uninitialized,
    Ready,
}

/// Row 0 holds the most recent spectrum, row `history_length - 1` the oldest retained.
#[derive(Debug, Clone)]
pub struct WaterfallHistory {
    state: WaterfallState,
    bin_count: usize,
    history_length: usize,
    data: Vec<f32>,
}

impl Default for WaterfallHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl WaterfallHistory {
    pub fn new() -> Self {
        Self {
            state: WaterfallState::Uninitialized,
            bin_count: 0,
            history_length: 0,
            data: Vec::new(),
        }
    }

    /// Allocate a zeroed `bin_count * history_length` buffer, discarding any prior state.
    pub fn initialize(&mut self, bin_count: usize, history_length: usize) {
        if self.state == WaterfallState::Ready {
            self.shutdown();
        }

        self.bin_count = bin_count;
        self.history_length = history_length;
        self.data = vec![0.0; bin_count * history_length];
        self.state = WaterfallState::Ready;
    }

    pub fn shutdown(&mut self) {
        self.data = Vec::new();
        self.bin_count = 0;
        self.history_length = 0;
        self.state = WaterfallState::Uninitialized;
    }

    pub fn update(&mut self, spectrum: &SpectrumFrame) {
        self.push_row(&spectrum.magnitudes);
    }

    /// Shift every row down by one, dropping the oldest, then write `magnitudes` into
    /// row 0 truncated or zero-padded to `bin_count`.
    pub fn push_row(&mut self, magnitudes: &[f32]) {
        if self.state != WaterfallState::Ready || self.bin_count == 0 || self.history_length == 0
        {
            return;
        }

        let row = self.bin_count;
        let total = row * self.history_length;
        if self.data.len() != total {
            self.data.clear();
            self.data.resize(total, 0.0);
        }

        self.data.copy_within(..total - row, row);

        let head = &mut self.data[..row];
        let copied = magnitudes.len().min(row);
        head[..copied].copy_from_slice(&magnitudes[..copied]);
        head[copied..].fill(0.0);
    }

    pub fn state(&self) -> WaterfallState {
        self.state
    }

    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    pub fn history_length(&self) -> usize {
        self.history_length
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn row(&self, index: usize) -> Option<&[f32]> {
        if index >= self.history_length || self.bin_count == 0 {
            return None;
        }
        let start = index * self.bin_count;
        self.data.get(start..start + self.bin_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_of(value: f32, bins: usize) -> Vec<f32> {
        vec![value; bins]
    }

    #[test]
    fn initialize_allocates_zeroed_buffer() {
        let mut history = WaterfallHistory::new();
        assert_eq!(history.state(), WaterfallState::Uninitialized);
        history.initialize(4, 3);
        assert_eq!(history.state(), WaterfallState::Ready);
        assert_eq!(history.as_slice(), &[0.0; 12]);
    }

    #[test]
    fn update_before_initialize_is_noop() {
        let mut history = WaterfallHistory::new();
        history.push_row(&[1.0, 2.0]);
        assert!(history.as_slice().is_empty());

        history.initialize(0, 8);
        history.push_row(&[1.0, 2.0]);
        assert!(history.as_slice().is_empty());
    }

    #[test]
    fn behaves_as_fifo_and_evicts_oldest() {
        let bins = 3;
        let length = 4;
        let mut history = WaterfallHistory::new();
        history.initialize(bins, length);

        for value in 1..=length {
            history.push_row(&row_of(value as f32, bins));
        }
        assert_eq!(history.row(0).unwrap(), row_of(4.0, bins).as_slice());
        assert_eq!(history.row(length - 1).unwrap(), row_of(1.0, bins).as_slice());

        history.push_row(&row_of(5.0, bins));
        assert!(!history.as_slice().contains(&1.0));
        assert_eq!(history.row(0).unwrap(), row_of(5.0, bins).as_slice());
        assert_eq!(history.row(length - 1).unwrap(), row_of(2.0, bins).as_slice());
    }

    #[test]
    fn mismatched_rows_are_padded_or_truncated() {
        let mut history = WaterfallHistory::new();
        history.initialize(4, 2);

        history.push_row(&[1.0, 2.0]);
        assert_eq!(history.row(0).unwrap(), &[1.0, 2.0, 0.0, 0.0]);

        history.push_row(&[5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        assert_eq!(history.row(0).unwrap(), &[5.0, 6.0, 7.0, 8.0]);
        assert_eq!(history.row(1).unwrap(), &[1.0, 2.0, 0.0, 0.0]);
        assert_eq!(history.as_slice().len(), 8);
    }

    #[test]
    fn reinitialize_with_smaller_dimensions_clears_state() {
        let mut history = WaterfallHistory::new();
        history.initialize(8, 4);
        for _ in 0..4 {
            history.push_row(&row_of(3.0, 8));
        }

        history.initialize(2, 3);
        assert_eq!(history.bin_count(), 2);
        assert_eq!(history.history_length(), 3);
        assert_eq!(history.as_slice(), &[0.0; 6]);
    }

    #[test]
    fn shutdown_releases_buffer() {
        let mut history = WaterfallHistory::new();
        history.initialize(2, 2);
        history.update(&SpectrumFrame {
            magnitudes: vec![1.0, 1.0],
            ..SpectrumFrame::default()
        });
        history.shutdown();
        assert_eq!(history.state(), WaterfallState::Uninitialized);
        assert!(history.as_slice().is_empty());
        assert!(history.row(0).is_none());

        history.push_row(&[1.0, 1.0]);
        assert!(history.as_slice().is_empty());
    }

    #[test]
    fn single_row_history_only_keeps_latest() {
        let mut history = WaterfallHistory::new();
        history.initialize(2, 1);
        history.push_row(&[1.0, 2.0]);
        history.push_row(&[3.0, 4.0]);
        assert_eq!(history.as_slice(), &[3.0, 4.0]);
    }
}
