//! ## `simtoggle`: windowed switching activity from simulation traces
//!
//! This crate turns one or more VCD traces of a single-clock design
//! into a sparse signal × window matrix of toggle counts, skipping
//! cycles spent in reset. The result feeds switching-activity based
//! power models.
//!
//! See the binaries for example usage.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use vcd_ng::{ Parser, FastFlow };

pub mod catalog;
pub mod config;
pub mod cycle;
pub mod encode;
pub mod error;
pub mod header;
pub mod hier;
pub mod report;
pub mod toggle;
pub mod window;

pub use catalog::SignalCatalog;
pub use config::{ Config, read_allow_list };
pub use error::{ ToggleError, TraceFault };
pub use report::ActivityReport;

use cycle::{ Advance, ClockCycleTracker };
use header::{ SignalFilter, Symbol, SymbolTable };
use toggle::ToggleAccumulator;
use window::WindowAggregator;

/// Streams traces one after another into a single activity report.
///
/// The catalog, value buffers, cycle totals and window numbering
/// carry over from trace to trace. Identifier codes do not.
#[derive(Debug)]
pub struct ActivityRecorder {
    filter: SignalFilter,
    catalog: SignalCatalog,
    toggles: ToggleAccumulator,
    tracker: ClockCycleTracker,
    windows: WindowAggregator,
    cycles: Vec<u64>,
    reset_cycles: Vec<u64>,
}

impl ActivityRecorder {
    /// Create an empty recorder for `config`'s options.
    ///
    /// Trace paths are not checked here; see [`Config::validate`].
    pub fn new(config: &Config) -> Result<ActivityRecorder, ToggleError> {
        if config.window == 0 {
            return Err(ToggleError::Config(
                "window size must be at least 1".into()))
        }
        Ok(ActivityRecorder {
            filter: config.signal_filter(),
            catalog: SignalCatalog::new(),
            toggles: ToggleAccumulator::default(),
            tracker: ClockCycleTracker::new(config.clock_period),
            windows: WindowAggregator::new(config.window),
            cycles: Vec::new(),
            reset_cycles: Vec::new(),
        })
    }

    #[inline]
    pub fn catalog(&self) -> &SignalCatalog {
        &self.catalog
    }

    /// Internal helper function:
    /// read the header of a trace, building or checking the catalog,
    /// and return its identifier code table.
    fn read_header(&mut self, vcd_file: &Path) -> Result<SymbolTable, ToggleError> {
        let f = File::open(vcd_file)
            .map_err(|e| ToggleError::access(vcd_file, e))?;
        let mut f = BufReader::with_capacity(65536, f);
        let mut parser = Parser::new(&mut f);
        let header = parser.parse_header().map_err(
            |e| TraceFault::Format(e.to_string()).in_file(vcd_file))?;
        let first = self.cycles.is_empty();
        let symbols = header::parse_header(
            &header, &self.filter, &mut self.catalog, first
        ).map_err(|e| e.in_file(vcd_file))?;
        if first {
            clilog::info!(
                TOGGLE_INIT,
                "catalog initialized with {} signals ({} bits)",
                self.catalog.len(),
                self.catalog.iter().map(|e| e.width).sum::<usize>()
            );
            self.toggles = ToggleAccumulator::new(self.catalog.widths());
        }
        if !symbols.has_reset() {
            clilog::warn!(TOGGLE_NO_RESET,
                          "{}: no reset signal, every cycle counts",
                          vcd_file.display());
        }
        clilog::debug!("{}: {} identifier codes bound",
                       vcd_file.display(), symbols.num_bound());
        self.toggles.clear_dirty();
        Ok(symbols)
    }

    /// Feed one trace and update all counters accordingly.
    pub fn feed_vcd(&mut self, vcd_file: &Path) -> Result<(), ToggleError> {
        let symbols = self.read_header(vcd_file)?;
        // stream read value changes
        let f = File::open(vcd_file)
            .map_err(|e| ToggleError::access(vcd_file, e))?;
        let mut parser = FastFlow::new(f, 65536);
        use vcd_ng::{ FastFlowToken, FFValueChange };
        self.tracker.begin_file();
        while let Some(tok) = parser.next_token().map_err(
            |e| TraceFault::Format(e.to_string()).in_file(vcd_file)
        )? {
            let handled = match tok {
                FastFlowToken::Timestamp(t) => self.on_timestamp(t),
                FastFlowToken::Value(FFValueChange { id, bits }) =>
                    self.on_value(&symbols, id.0 as u64, bits),
            };
            handled.map_err(|e| e.in_file(vcd_file))?;
        }
        let last = self.tracker.end_file();
        self.on_advance(last);
        clilog::info!(
            "{}: {} cycles, {} in reset (total {}, effective {}), \
             clock period {:?}",
            vcd_file.display(),
            self.tracker.file_cycles(), self.tracker.file_reset_cycles(),
            self.tracker.total_cycles(), self.tracker.effective_cycles(),
            self.tracker.period()
        );
        self.cycles.push(self.tracker.file_cycles());
        self.reset_cycles.push(self.tracker.file_reset_cycles());
        Ok(())
    }

    fn on_timestamp(&mut self, t: u64) -> Result<(), TraceFault> {
        let advance = self.tracker.advance(t)?;
        self.on_advance(advance);
        Ok(())
    }

    fn on_advance(&mut self, advance: Advance) {
        if advance == Advance::Cycle {
            self.toggles.finalize_cycle();
            self.windows.on_cycle(
                self.tracker.effective_cycles(),
                self.tracker.in_reset(),
                &mut self.toggles);
        }
    }

    fn on_value(
        &mut self, symbols: &SymbolTable, code: u64, bits: &[u8]
    ) -> Result<(), TraceFault> {
        // values before the first timestamp are ignored
        if !self.tracker.started() {
            return Ok(())
        }
        match symbols.resolve(code) {
            Symbol::Clock => self.tracker.clock_change(bits)?,
            Symbol::Reset => self.tracker.reset_change(bits),
            // sampled only while the clock is high
            Symbol::Signals(bindings) if self.tracker.clock_high() => {
                for &b in bindings {
                    self.toggles.apply(b, bits)?;
                }
            }
            Symbol::Signals(_) | Symbol::Untracked => {}
            Symbol::Undeclared => return Err(TraceFault::Consistency(
                format!("identifier code {} used before declaration", code)))
        }
        Ok(())
    }

    /// Flush the trailing partial window and build the report.
    pub fn finish(mut self) -> ActivityReport {
        let effective = self.tracker.effective_cycles();
        let window = self.windows.window();
        let activity = self.windows.finish(effective, &mut self.toggles);
        ActivityReport {
            window,
            cycles: self.cycles,
            reset_cycles: self.reset_cycles,
            signals: self.catalog.names(),
            widths: self.catalog.widths().into_iter()
                .map(|w| w as u64).collect(),
            activity,
        }
    }
}

/// Convert every trace of `config`, in order, into a report.
///
/// The report is not written; see [`ActivityReport::save`].
pub fn convert(config: &Config) -> Result<ActivityReport, ToggleError> {
    config.validate()?;
    let mut recorder = ActivityRecorder::new(config)?;
    for trace in &config.traces {
        recorder.feed_vcd(trace)?;
    }
    Ok(recorder.finish())
}
