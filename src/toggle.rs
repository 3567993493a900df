//! Per-signal value buffers and toggle counters.

use crate::error::TraceFault;
use crate::header::Binding;

/// Sampled state of one signal.
///
/// Values are kept as the raw trace characters, most significant
/// bit first.
#[derive(Debug, Clone)]
struct ToggleState {
    prev: Vec<u8>,
    cur: Vec<u8>,
    dirty: bool,
    toggles: u32,
}

/// Number of differing positions of two equally long values.
#[inline]
pub fn hamming(a: &[u8], b: &[u8]) -> u32 {
    a.iter().zip(b.iter()).filter(|(x, y)| x != y).count() as u32
}

/// Toggle accounting for every catalog entry, indexed like the
/// catalog. Buffers live for the whole run.
#[derive(Debug, Clone, Default)]
pub struct ToggleAccumulator {
    states: Vec<ToggleState>,
}

impl ToggleAccumulator {
    /// Allocate zero-filled buffers for the given widths.
    pub fn new(widths: impl IntoIterator<Item = usize>) -> ToggleAccumulator {
        ToggleAccumulator {
            states: widths.into_iter().map(|w| ToggleState {
                prev: vec![b'0'; w],
                cur: vec![b'0'; w],
                dirty: false,
                toggles: 0,
            }).collect()
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Forget pending samples at the start of a new trace.
    pub fn clear_dirty(&mut self) {
        for s in self.states.iter_mut().filter(|s| s.dirty) {
            s.cur.copy_from_slice(&s.prev);
            s.dirty = false;
        }
    }

    /// Store a sampled value.
    ///
    /// Whole values shorter than the width are extended on the
    /// left: with `0` after a leading `0` or `1`, otherwise with
    /// the leading character.
    pub fn apply(
        &mut self, binding: Binding, bits: &[u8]
    ) -> Result<(), TraceFault> {
        let state = self.states.get_mut(binding.index).ok_or_else(
            || TraceFault::Consistency(format!(
                "no buffer for signal index {}", binding.index)))?;
        let width = state.cur.len();
        match binding.bit {
            Some(bit) => {
                if bit >= width {
                    return Err(TraceFault::Format(format!(
                        "bit {} outside a {}-bit signal", bit, width)))
                }
                state.cur[width - 1 - bit] = bits.last().copied()
                    .unwrap_or(b'x');
            }
            None => {
                if bits.len() > width {
                    return Err(TraceFault::Format(format!(
                        "{}-bit value for a {}-bit signal",
                        bits.len(), width)))
                }
                let pad = width - bits.len();
                let fill = match bits.first() {
                    Some(b'0') | Some(b'1') | None => b'0',
                    Some(&c) => c
                };
                state.cur[..pad].fill(fill);
                state.cur[pad..].copy_from_slice(bits);
            }
        }
        state.dirty = true;
        Ok(())
    }

    /// Close a cycle: fold every dirty signal's change into its
    /// counter and make the sample the new reference.
    pub fn finalize_cycle(&mut self) {
        for s in self.states.iter_mut().filter(|s| s.dirty) {
            s.toggles = s.toggles.saturating_add(hamming(&s.prev, &s.cur));
            s.prev.copy_from_slice(&s.cur);
            s.dirty = false;
        }
    }

    /// Running count of a signal since its last flush.
    #[inline]
    pub fn toggles(&self, index: usize) -> u32 {
        self.states[index].toggles
    }

    /// Take every nonzero counter, leaving zeros behind.
    pub fn drain_nonzero(&mut self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.states.iter_mut().enumerate().filter_map(|(i, s)| {
            match std::mem::take(&mut s.toggles) {
                0 => None,
                c => Some((i, c))
            }
        })
    }
}
