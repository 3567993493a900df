//! Run configuration.

use compact_str::CompactString;
use std::collections::HashSet;
use std::fs::File;
use std::io::{ BufRead, BufReader };
use std::path::{ Path, PathBuf };
use crate::encode::OutputFormat;
use crate::error::ToggleError;
use crate::header::SignalFilter;

/// Everything a conversion run needs to know.
#[derive(Debug, Clone)]
pub struct Config {
    /// Traces, consumed in this order.
    pub traces: Vec<PathBuf>,
    /// Report path. Its suffix selects the encoding.
    pub output: PathBuf,
    /// Effective cycles per window.
    pub window: u64,
    /// Exact signal names to keep. `None` keeps everything.
    pub allow_list: Option<HashSet<CompactString>>,
    /// Name prefix of the clock signal.
    pub clock: CompactString,
    /// Name prefix of the reset signal.
    pub reset: CompactString,
    /// Required clock period in trace time units.
    pub clock_period: Option<u64>,
}

impl Config {
    /// A configuration with default window, clock and reset names.
    pub fn new(traces: Vec<PathBuf>, output: PathBuf) -> Config {
        Config {
            traces,
            output,
            window: 1,
            allow_list: None,
            clock: "clock".into(),
            reset: "reset".into(),
            clock_period: None,
        }
    }

    /// Check option ranges and that every trace exists.
    pub fn validate(&self) -> Result<(), ToggleError> {
        if self.traces.is_empty() {
            return Err(ToggleError::Config("no trace given".into()))
        }
        if self.window == 0 {
            return Err(ToggleError::Config(
                "window size must be at least 1".into()))
        }
        if self.clock_period == Some(0) {
            return Err(ToggleError::Config(
                "clock period must be positive".into()))
        }
        for t in &self.traces {
            std::fs::metadata(t).map_err(|e| ToggleError::access(t, e))?;
        }
        Ok(())
    }

    #[inline]
    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::from_path(&self.output)
    }

    pub fn signal_filter(&self) -> SignalFilter {
        SignalFilter::new(&self.clock, &self.reset, self.allow_list.clone())
    }
}

/// Read an allow-list: the text before the first comma of every
/// non-empty line is one signal name.
pub fn read_allow_list(path: &Path) -> Result<HashSet<CompactString>, ToggleError> {
    let f = File::open(path).map_err(|e| ToggleError::access(path, e))?;
    let mut names = HashSet::new();
    for line in BufReader::new(f).lines() {
        let line = line.map_err(|e| ToggleError::access(path, e))?;
        if line.trim().is_empty() {
            continue
        }
        let name = line.split(',').next().unwrap_or_default();
        names.insert(name.trim().into());
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempdir::TempDir;

    #[test]
    fn allow_list_takes_first_fields() {
        let dir = TempDir::new("simtoggle").unwrap();
        let path = dir.path().join("signals.csv");
        let mut f = File::create(&path).unwrap();
        write!(f, "dut.a,12,x\n\ndut.b\n  \ndut.c,\n").unwrap();
        drop(f);
        let names = read_allow_list(&path).unwrap();
        let mut names = names.iter().map(|n| n.as_str()).collect::<Vec<_>>();
        names.sort();
        assert_eq!(names, vec!["dut.a", "dut.b", "dut.c"]);
    }

    #[test]
    fn validation() {
        let dir = TempDir::new("simtoggle").unwrap();
        let trace = dir.path().join("a.vcd");
        File::create(&trace).unwrap();
        let mut cfg = Config::new(vec![trace], dir.path().join("o.csv"));
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.output_format(), OutputFormat::Csv);
        cfg.window = 0;
        assert!(matches!(cfg.validate(), Err(ToggleError::Config(_))));
        cfg.window = 4;
        cfg.traces.push(dir.path().join("missing.vcd"));
        assert!(matches!(cfg.validate(), Err(ToggleError::Access { .. })));
        assert!(read_allow_list(&dir.path().join("nope")).is_err());
    }
}
