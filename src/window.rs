//! Windowed aggregation of toggle counts.

use crate::toggle::ToggleAccumulator;

/// Sparse activity of one signal: `(window_index, toggle_count)`
/// pairs with strictly increasing indices and nonzero counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseActivity {
    pub entries: Vec<(u64, u32)>,
}

impl SparseActivity {
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all recorded toggles.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|&(_, c)| c as u64).sum()
    }
}

/// Buckets toggle counters into windows of effective cycles.
#[derive(Debug, Clone)]
pub struct WindowAggregator {
    window: u64,
    /// Effective cycle count at the last window close.
    last_closed: u64,
    rows: Vec<SparseActivity>,
}

impl WindowAggregator {
    /// # Panics
    ///
    /// If `window` is 0.
    pub fn new(window: u64) -> WindowAggregator {
        assert!(window >= 1, "window size must be positive");
        WindowAggregator { window, last_closed: 0, rows: Vec::new() }
    }

    #[inline]
    pub fn window(&self) -> u64 {
        self.window
    }

    fn flush(&mut self, index: u64, toggles: &mut ToggleAccumulator) {
        if self.rows.len() < toggles.len() {
            self.rows.resize_with(toggles.len(), Default::default);
        }
        for (i, count) in toggles.drain_nonzero() {
            self.rows[i].entries.push((index, count));
        }
    }

    /// Called after every finished cycle. Closes a window when the
    /// design is out of reset and `effective` reached a new
    /// multiple of the window size.
    pub fn on_cycle(
        &mut self, effective: u64, in_reset: bool,
        toggles: &mut ToggleAccumulator
    ) -> bool {
        if in_reset || effective == 0 || effective % self.window != 0 ||
            effective <= self.last_closed
        {
            return false
        }
        self.last_closed = effective;
        self.flush(effective / self.window - 1, toggles);
        true
    }

    /// Record the trailing partial window after the last trace.
    pub fn finish(
        mut self, effective: u64, toggles: &mut ToggleAccumulator
    ) -> Vec<SparseActivity> {
        if effective % self.window != 0 {
            self.flush(effective / self.window, toggles);
        }
        self.rows.resize_with(toggles.len(), Default::default);
        self.rows
    }
}
