//! Hierarchical scope path with a stripped leading prefix.

use compact_str::CompactString;
use std::fmt;
use itertools::Itertools;
use crate::error::TraceFault;

/// The current scope stack while walking a trace header.
///
/// The scopes open at the first variable declaration form the
/// prefix, which is then removed from every signal name below it.
/// The prefix is fixed once per header and never changes afterwards.
#[derive(Debug, Clone, Default)]
pub struct ScopePath {
    segments: Vec<CompactString>,
    prefix: Option<Vec<CompactString>>,
}

impl fmt::Display for ScopePath {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.iter().format("."))
    }
}

impl ScopePath {
    #[inline]
    pub fn new() -> ScopePath {
        ScopePath::default()
    }

    /// Push a scope.
    pub fn enter(&mut self, name: &str) {
        self.segments.push(name.into());
    }

    /// Pop a scope.
    pub fn leave(&mut self) -> Result<(), TraceFault> {
        match self.segments.pop() {
            Some(_) => Ok(()),
            None => Err(TraceFault::Consistency(
                "upscope without a matching scope".into()))
        }
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The stripped prefix, once a variable has been named.
    #[inline]
    pub fn prefix(&self) -> Option<&[CompactString]> {
        self.prefix.as_deref()
    }

    /// Dotted name of a variable declared in the current scope.
    ///
    /// The first call fixes the prefix. Scopes outside the prefix
    /// keep their full path.
    pub fn signal_name(&mut self, var: &str) -> CompactString {
        if self.prefix.is_none() {
            self.prefix = Some(self.segments.clone());
        }
        let skip = match &self.prefix {
            Some(p) if self.segments.starts_with(p) => p.len(),
            _ => 0
        };
        let mut name = CompactString::default();
        for seg in &self.segments[skip..] {
            name.push_str(seg);
            name.push('.');
        }
        name.push_str(var);
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn harness_scope_is_stripped() {
        let mut p = ScopePath::new();
        p.enter("TestHarness");
        assert_eq!(p.signal_name("clock").as_str(), "clock");
        p.enter("dut");
        p.enter("core");
        assert_eq!(p.signal_name("pc").as_str(), "dut.core.pc");
        assert_eq!(p.to_string(), "TestHarness.dut.core");
        p.leave().unwrap();
        p.leave().unwrap();
        p.leave().unwrap();
        assert_eq!(p.depth(), 0);
        assert_eq!(p.prefix().map(|p| p.len()), Some(1));
    }

    #[test]
    fn prefix_covers_every_scope_open_at_the_first_var() {
        let mut p = ScopePath::new();
        p.enter("TOP");
        p.enter("TestHarness");
        assert!(p.prefix().is_none());
        assert_eq!(p.signal_name("clock").as_str(), "clock");
        p.enter("dut");
        assert_eq!(p.signal_name("flag").as_str(), "dut.flag");
        p.leave().unwrap();
        p.leave().unwrap();
        assert_eq!(p.signal_name("x").as_str(), "TOP.x");
        assert_eq!(p.prefix().map(|p| p.len()), Some(2));
    }

    #[test]
    fn sibling_roots_keep_their_path() {
        let mut p = ScopePath::new();
        p.enter("top");
        assert_eq!(p.signal_name("a").as_str(), "a");
        p.leave().unwrap();
        p.enter("other");
        assert_eq!(p.signal_name("x").as_str(), "other.x");
    }

    #[test]
    fn underflow_is_an_error() {
        let mut p = ScopePath::new();
        assert!(matches!(p.leave(), Err(TraceFault::Consistency(_))));
    }
}
