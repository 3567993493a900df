//! The cross-file signal catalog.

use compact_str::CompactString;
use indexmap::IndexMap;
use crate::error::TraceFault;

/// One tracked signal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CatalogEntry<'c> {
    /// Stable position, assigned in discovery order.
    pub index: usize,
    /// Dotted hierarchical name with the leading prefix stripped.
    pub name: &'c str,
    /// Bit width.
    pub width: usize,
}

/// Ordered, append-once registry of tracked signals.
///
/// The first trace defines the catalog. Later traces only look
/// their declarations up in it.
#[derive(Debug, Default, Clone)]
pub struct SignalCatalog {
    /// Signal name to bit width, in index order.
    entries: IndexMap<CompactString, usize>,
}

impl SignalCatalog {
    #[inline]
    pub fn new() -> SignalCatalog {
        SignalCatalog { entries: IndexMap::new() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a new signal and return its index.
    pub fn register(
        &mut self, name: &str, width: usize
    ) -> Result<usize, TraceFault> {
        if width == 0 {
            return Err(TraceFault::Format(format!(
                "signal {} has zero width", name)))
        }
        let (index, old) = self.entries.insert_full(name.into(), width);
        if old.is_some() {
            return Err(TraceFault::Consistency(format!(
                "signal {} registered twice", name)))
        }
        Ok(index)
    }

    /// Find the index of a signal declared by a later trace,
    /// checking that its width did not change.
    pub fn validate(
        &self, name: &str, width: usize
    ) -> Result<usize, TraceFault> {
        match self.entries.get_full(name) {
            Some((index, _, &w)) if w == width => Ok(index),
            Some((index, _, &w)) => Err(TraceFault::Consistency(format!(
                "signal {} (index {}) has width {}, catalog says {}",
                name, index, width, w))),
            None => Err(TraceFault::Consistency(format!(
                "signal {} is not in the catalog", name))),
        }
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<CatalogEntry<'_>> {
        self.entries.get_index(index).map(|(name, &width)| CatalogEntry {
            index, name: name.as_str(), width
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = CatalogEntry<'_>> + '_ {
        self.entries.iter().enumerate().map(|(index, (name, &width))| {
            CatalogEntry { index, name: name.as_str(), width }
        })
    }

    /// Signal names in index order.
    pub fn names(&self) -> Vec<CompactString> {
        self.entries.keys().cloned().collect()
    }

    /// Bit widths in index order.
    pub fn widths(&self) -> Vec<usize> {
        self.entries.values().copied().collect()
    }
}
