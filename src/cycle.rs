//! Clock cycle and reset accounting.

use crate::error::TraceFault;

/// What a timestamp advance completed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Advance {
    Idle,
    /// A high phase ended: one clock cycle, maybe in reset.
    Cycle,
    /// Only a reset cycle was counted, for a high phase that began
    /// before the first edge.
    ResetCycle,
}

/// Turns clock and reset value changes plus timestamp advances
/// into cycle counters.
///
/// A cycle completes when its high phase ends: at the first
/// timestamp advance after the falling edge, or at the end of the
/// file. A falling edge closed while reset is asserted also counts
/// as a reset cycle. A rising edge at time 0 is the initial value
/// and does not count.
///
/// The clock period is derived from the spacing of the first two
/// rising edges of each file, and the high phase from the first
/// rise-to-fall interval. Later edges must keep both.
#[derive(Debug, Clone, Default)]
pub struct ClockCycleTracker {
    expected_period: Option<u64>,
    time: Option<u64>,
    clock_high: bool,
    reset: bool,
    rose: bool,
    fell: bool,
    last_rise: Option<u64>,
    period: Option<u64>,
    high_time: Option<u64>,
    file_cycles: u64,
    file_reset_cycles: u64,
    total_cycles: u64,
    total_reset_cycles: u64,
}

impl ClockCycleTracker {
    /// `expected_period`, when given, is the only accepted period.
    pub fn new(expected_period: Option<u64>) -> ClockCycleTracker {
        ClockCycleTracker { expected_period, ..Default::default() }
    }

    /// Reset the per-file state. Totals are kept.
    pub fn begin_file(&mut self) {
        *self = ClockCycleTracker {
            expected_period: self.expected_period,
            total_cycles: self.total_cycles,
            total_reset_cycles: self.total_reset_cycles,
            ..Default::default()
        };
    }

    #[inline]
    fn timing(&self, message: String) -> TraceFault {
        TraceFault::Timing { time: self.time.unwrap_or(0), message }
    }

    /// A new value of the clock signal.
    pub fn clock_change(&mut self, bits: &[u8]) -> Result<(), TraceFault> {
        let high = bits.last() == Some(&b'1');
        let now = self.time.unwrap_or(0);
        if high && !self.clock_high && now > 0 {
            if let Some(last) = self.last_rise {
                let delta = now - last;
                match self.period.or(self.expected_period) {
                    Some(p) if p != delta => return Err(self.timing(format!(
                        "rising edges {} apart, period is {}", delta, p))),
                    _ => self.period = Some(delta)
                }
            }
            self.last_rise = Some(now);
            self.rose = true;
        }
        if !high && self.clock_high {
            if let Some(rise) = self.last_rise {
                let h = now - rise;
                match self.high_time {
                    Some(p) if p != h => return Err(self.timing(format!(
                        "clock high for {}, expected {}", h, p))),
                    _ => self.high_time = Some(h)
                }
            }
            self.fell = true;
        }
        self.clock_high = high;
        Ok(())
    }

    /// A new value of the reset signal.
    #[inline]
    pub fn reset_change(&mut self, bits: &[u8]) {
        self.reset = bits.last() == Some(&b'1');
    }

    /// Move to timestamp `t`, closing the interval that ends here.
    pub fn advance(&mut self, t: u64) -> Result<Advance, TraceFault> {
        let Some(prev) = self.time else {
            self.time = Some(t);
            return Ok(Advance::Idle)
        };
        if t < prev {
            return Err(self.timing(format!(
                "timestamp {} goes backwards", t)))
        }
        let ret = match self.clock_high {
            true => Advance::Idle,
            false => self.close_phase()
        };
        self.time = Some(t);
        Ok(ret)
    }

    /// End the current file, closing a high phase still open.
    pub fn end_file(&mut self) -> Advance {
        if self.clock_high && self.rose {
            self.fell = true;
        }
        self.close_phase()
    }

    fn close_phase(&mut self) -> Advance {
        if !self.fell {
            return Advance::Idle
        }
        self.fell = false;
        let mut ret = Advance::Idle;
        if self.rose {
            self.rose = false;
            self.file_cycles += 1;
            self.total_cycles += 1;
            ret = Advance::Cycle;
        }
        if self.reset {
            self.file_reset_cycles += 1;
            self.total_reset_cycles += 1;
            if ret == Advance::Idle {
                ret = Advance::ResetCycle;
            }
        }
        ret
    }

    /// Whether a timestamp has been seen in the current file.
    #[inline]
    pub fn started(&self) -> bool {
        self.time.is_some()
    }

    #[inline]
    pub fn clock_high(&self) -> bool {
        self.clock_high
    }

    #[inline]
    pub fn in_reset(&self) -> bool {
        self.reset
    }

    /// The derived clock period of the current file.
    #[inline]
    pub fn period(&self) -> Option<u64> {
        self.period
    }

    #[inline]
    pub fn file_cycles(&self) -> u64 {
        self.file_cycles
    }

    #[inline]
    pub fn file_reset_cycles(&self) -> u64 {
        self.file_reset_cycles
    }

    #[inline]
    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    #[inline]
    pub fn total_reset_cycles(&self) -> u64 {
        self.total_reset_cycles
    }

    /// Cycles spent outside reset, over all files so far.
    #[inline]
    pub fn effective_cycles(&self) -> u64 {
        self.total_cycles.saturating_sub(self.total_reset_cycles)
    }
}
