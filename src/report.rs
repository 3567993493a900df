//! The conversion result shared by both output encodings.

use compact_str::CompactString;
use std::fs::File;
use std::io::{ BufReader, BufWriter, Write };
use std::path::Path;
use crate::encode::{ self, OutputFormat };
use crate::error::ToggleError;
use crate::window::SparseActivity;

/// Windowed toggle activity of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityReport {
    /// Cycles per window.
    pub window: u64,
    /// Cycles of each trace, in argument order.
    pub cycles: Vec<u64>,
    /// Reset cycles of each trace.
    pub reset_cycles: Vec<u64>,
    /// Catalog names.
    pub signals: Vec<CompactString>,
    /// Catalog widths.
    pub widths: Vec<u64>,
    /// Sparse activity, one row per catalog entry.
    pub activity: Vec<SparseActivity>,
}

impl ActivityReport {
    /// Row offsets into the concatenated sparse entries,
    /// `signals.len() + 1` long and starting at 0.
    pub fn pointers(&self) -> Vec<u64> {
        let mut ptr = Vec::with_capacity(self.activity.len() + 1);
        let mut acc = 0u64;
        ptr.push(acc);
        for row in &self.activity {
            acc += row.len() as u64;
            ptr.push(acc);
        }
        ptr
    }

    /// All sparse entries, signal after signal.
    pub fn entries(&self) -> impl Iterator<Item = (u64, u32)> + '_ {
        self.activity.iter().flat_map(|row| row.entries.iter().copied())
    }

    pub fn effective_cycles(&self) -> u64 {
        let total: u64 = self.cycles.iter().sum();
        let reset: u64 = self.reset_cycles.iter().sum();
        total.saturating_sub(reset)
    }

    /// Number of windows, counting a trailing partial one.
    pub fn num_windows(&self) -> u64 {
        match self.effective_cycles() {
            0 => 0,
            e => (e - 1) / self.window + 1
        }
    }

    /// Toggles of a signal per bit and cycle, for each recorded
    /// window.
    pub fn density(&self, signal: usize) -> Vec<(u64, f64)> {
        let denom = (self.window * self.widths[signal]) as f64;
        self.activity[signal].entries.iter()
            .map(|&(w, c)| (w, c as f64 / denom))
            .collect()
    }

    /// Write to `path` in the encoding its suffix selects.
    pub fn save(&self, path: &Path) -> Result<(), ToggleError> {
        let f = File::create(path)
            .map_err(|e| ToggleError::access(path, e))?;
        let mut w = BufWriter::with_capacity(65536, f);
        let written = match OutputFormat::from_path(path) {
            OutputFormat::Csv => encode::write_csv(self, &mut w),
            OutputFormat::Binary => encode::write_bin(self, &mut w),
        };
        written.and_then(|()| w.flush())
            .map_err(|e| ToggleError::access(path, e))
    }

    /// Read a report written by [`ActivityReport::save`].
    pub fn load(path: &Path) -> Result<ActivityReport, ToggleError> {
        let f = File::open(path)
            .map_err(|e| ToggleError::access(path, e))?;
        let mut r = BufReader::with_capacity(65536, f);
        let report = match OutputFormat::from_path(path) {
            OutputFormat::Csv => encode::read_csv(&mut r),
            OutputFormat::Binary => encode::read_bin(&mut r),
        };
        report.map_err(|e| ToggleError::Format {
            file: path.to_path_buf(), message: e.to_string()
        })
    }
}
