//! Trace header walking.
//!
//! The `vcd-ng` header tree is flattened into a stream of
//! [`HeaderEvent`]s, which drive a [`HeaderParser`]. The parser
//! classifies every declaration, registers or validates tracked
//! signals against the [`SignalCatalog`], and produces the
//! per-file [`SymbolTable`].

use compact_str::CompactString;
use indexmap::IndexMap;
use std::collections::{ HashMap, HashSet };
use vcd_ng::{ Header, ScopeItem, Var };
use crate::catalog::SignalCatalog;
use crate::error::TraceFault;
use crate::hier::ScopePath;

/// Name fragments of signals that never carry design activity:
/// clocks and resets below the top, loop variables, and
/// randomization temporaries emitted by the generator.
const NOISE_PATTERNS: &[&str] = &[
    "clock", "reset", "_clk", "_rst", "initvar", "_RAND", "_GEN_"
];

/// The declared kind of a variable.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VarKind {
    Wire,
    Reg,
    Integer,
    Other,
}

/// The optional `[..]` part of a declaration.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeclRange {
    Bit(i64),
    Range(i64, i64),
}

/// One `var` declaration.
#[derive(Debug, Copy, Clone)]
pub struct VarDecl<'h> {
    pub kind: VarKind,
    pub width: u32,
    pub code: u64,
    pub name: &'h str,
    pub range: Option<DeclRange>,
}

impl<'h> From<&'h Var> for VarDecl<'h> {
    fn from(var: &'h Var) -> VarDecl<'h> {
        use vcd_ng::VarType;
        use vcd_ng::ReferenceIndex::*;
        let kind = match var.var_type {
            VarType::Wire => VarKind::Wire,
            VarType::Reg => VarKind::Reg,
            VarType::Integer => VarKind::Integer,
            _ => VarKind::Other
        };
        let range = match var.index {
            None => None,
            Some(BitSelect(i)) => Some(DeclRange::Bit(i as i64)),
            Some(Range(a, b)) => Some(DeclRange::Range(a as i64, b as i64)),
        };
        VarDecl {
            kind,
            width: var.size as u32,
            code: var.code.0 as u64,
            name: var.reference.as_str(),
            range,
        }
    }
}

/// A header token, in file order.
#[derive(Debug, Copy, Clone)]
pub enum HeaderEvent<'h> {
    EnterScope(&'h str),
    Var(VarDecl<'h>),
    LeaveScope,
    EndDefinitions,
}

/// Flatten a parsed header into its event stream.
pub fn header_events(header: &Header) -> Vec<HeaderEvent<'_>> {
    fn walk<'h>(items: &'h [ScopeItem], events: &mut Vec<HeaderEvent<'h>>) {
        for item in items {
            match item {
                ScopeItem::Scope(scope) => {
                    events.push(HeaderEvent::EnterScope(
                        scope.identifier.as_str()));
                    walk(&scope.children[..], events);
                    events.push(HeaderEvent::LeaveScope);
                }
                ScopeItem::Var(var) => events.push(
                    HeaderEvent::Var(VarDecl::from(var))),
                _ => {}
            }
        }
    }
    let mut events = Vec::new();
    walk(&header.items[..], &mut events);
    events.push(HeaderEvent::EndDefinitions);
    events
}

/// What a signal name is used for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SignalClass {
    Clock,
    Reset,
    /// Absent from the configured allow-list.
    NotAllowed,
    /// Matches a built-in noise pattern.
    Noise,
    Tracked,
}

/// Decides which declared names are tracked.
#[derive(Debug, Clone)]
pub struct SignalFilter {
    clock: CompactString,
    reset: CompactString,
    allow: Option<HashSet<CompactString>>,
}

impl Default for SignalFilter {
    fn default() -> SignalFilter {
        SignalFilter::new("clock", "reset", None)
    }
}

impl SignalFilter {
    pub fn new(
        clock: &str, reset: &str,
        allow: Option<HashSet<CompactString>>
    ) -> SignalFilter {
        SignalFilter { clock: clock.into(), reset: reset.into(), allow }
    }

    /// Classify a stripped signal name. The checks apply in order.
    pub fn classify(&self, name: &str) -> SignalClass {
        if name.starts_with(self.clock.as_str()) {
            return SignalClass::Clock
        }
        if name.starts_with(self.reset.as_str()) {
            return SignalClass::Reset
        }
        if let Some(allow) = &self.allow {
            if !allow.contains(name) {
                return SignalClass::NotAllowed
            }
        }
        let noise = name.contains(self.clock.as_str()) ||
            name.contains(self.reset.as_str()) ||
            NOISE_PATTERNS.iter().any(|p| name.contains(*p)) ||
            (name.contains("_ext") && name.contains("_reg"));
        match noise {
            true => SignalClass::Noise,
            false => SignalClass::Tracked
        }
    }
}

/// Where the value of an identifier code lands.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Catalog index.
    pub index: usize,
    /// Bit position inside the entry for per-bit declarations
    /// (0 is the least significant bit), `None` for whole values.
    pub bit: Option<usize>,
}

/// Result of looking an identifier code up.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Symbol<'t> {
    Clock,
    Reset,
    Signals(&'t [Binding]),
    /// Declared but not tracked.
    Untracked,
    Undeclared,
}

/// Per-file map from identifier codes to catalog entries.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    bindings: HashMap<u64, Vec<Binding>>,
    declared: HashSet<u64>,
    clock: u64,
    reset: Option<u64>,
}

impl SymbolTable {
    pub fn resolve(&self, code: u64) -> Symbol<'_> {
        if code == self.clock {
            return Symbol::Clock
        }
        if Some(code) == self.reset {
            return Symbol::Reset
        }
        match self.bindings.get(&code) {
            Some(b) => Symbol::Signals(&b[..]),
            None if self.declared.contains(&code) => Symbol::Untracked,
            None => Symbol::Undeclared
        }
    }

    #[inline]
    pub fn has_reset(&self) -> bool {
        self.reset.is_some()
    }

    /// Number of identifier codes bound to tracked signals.
    #[inline]
    pub fn num_bound(&self) -> usize {
        self.bindings.len()
    }
}

#[derive(Debug, Copy, Clone)]
struct Discovered {
    width: usize,
    per_bit: bool,
}

/// Explicit state of one header walk.
#[derive(Debug)]
pub struct HeaderParser<'f> {
    filter: &'f SignalFilter,
    scopes: ScopePath,
    /// Tracked names in discovery order.
    discovered: IndexMap<CompactString, Discovered>,
    /// Identifier code, signal name, bit offset.
    bindings: Vec<(u64, CompactString, Option<usize>)>,
    declared: HashSet<u64>,
    clock: Option<u64>,
    reset: Option<u64>,
}

impl<'f> HeaderParser<'f> {
    pub fn new(filter: &'f SignalFilter) -> HeaderParser<'f> {
        HeaderParser {
            filter,
            scopes: ScopePath::new(),
            discovered: IndexMap::new(),
            bindings: Vec::new(),
            declared: HashSet::new(),
            clock: None,
            reset: None,
        }
    }

    /// Consume one event before `EndDefinitions`.
    pub fn feed(&mut self, event: HeaderEvent<'_>) -> Result<(), TraceFault> {
        match event {
            HeaderEvent::EnterScope(name) => {
                self.scopes.enter(name);
                Ok(())
            }
            HeaderEvent::LeaveScope => self.scopes.leave(),
            HeaderEvent::Var(decl) => self.declare(decl),
            HeaderEvent::EndDefinitions => Err(TraceFault::Format(
                "enddefinitions must be handled by finish".into()))
        }
    }

    fn declare(&mut self, decl: VarDecl<'_>) -> Result<(), TraceFault> {
        self.declared.insert(decl.code);
        // the first declaration of any kind fixes the prefix
        let name = self.scopes.signal_name(decl.name);
        match decl.kind {
            VarKind::Wire | VarKind::Reg => {}
            VarKind::Integer => return Ok(()),
            VarKind::Other => return Err(TraceFault::Format(format!(
                "variable {} has an unsupported type", decl.name)))
        }
        let width = decl.width as usize;
        if width == 0 {
            return Err(TraceFault::Format(format!(
                "variable {} has zero width", decl.name)))
        }
        let bit = match decl.range {
            None => None,
            Some(DeclRange::Bit(i)) if width == 1 && i >= 0 =>
                Some(i as usize),
            Some(DeclRange::Range(0, 0)) if width == 1 => None,
            Some(DeclRange::Range(hi, 0)) if width > 1 &&
                hi == width as i64 - 1 => None,
            Some(r) => return Err(TraceFault::Format(format!(
                "variable {} of width {} has invalid range {:?}",
                decl.name, width, r)))
        };
        match self.filter.classify(&name) {
            SignalClass::Clock => match self.clock {
                None => self.clock = Some(decl.code),
                Some(c) if c == decl.code => {}
                Some(_) => {
                    clilog::warn!(TOGGLE_CLOCK_DUP,
                                  "ignoring second clock candidate {}", name);
                }
            },
            SignalClass::Reset => match self.reset {
                None => self.reset = Some(decl.code),
                Some(c) if c == decl.code => {}
                Some(_) => {
                    clilog::warn!(TOGGLE_RESET_DUP,
                                  "ignoring second reset candidate {}", name);
                }
            },
            SignalClass::NotAllowed | SignalClass::Noise => {
                clilog::debug!("skipping {}", name);
            }
            SignalClass::Tracked => {
                let per_bit = bit.is_some();
                match self.discovered.get(&name) {
                    Some(d) if d.per_bit != per_bit ||
                        (!per_bit && d.width != width) =>
                        return Err(TraceFault::Format(format!(
                            "signal {} redeclared with another shape",
                            name))),
                    Some(_) => {}
                    // a bus is placed by its bit 0
                    None if per_bit && bit != Some(0) => {}
                    None => {
                        self.discovered.insert(name.clone(), Discovered {
                            width: if per_bit { 0 } else { width },
                            per_bit
                        });
                    }
                }
                self.bindings.push((decl.code, name, bit));
            }
        }
        Ok(())
    }

    /// Handle `enddefinitions`: resolve bus widths, register the
    /// discovered signals (`first`) or validate them against the
    /// catalog, and build the symbol table.
    pub fn finish(
        mut self, catalog: &mut SignalCatalog, first: bool
    ) -> Result<SymbolTable, TraceFault> {
        if self.scopes.depth() != 0 {
            return Err(TraceFault::Format(format!(
                "scope {} is never closed", self.scopes)))
        }
        let clock = self.clock.ok_or_else(|| TraceFault::Format(
            format!("no clock signal named {}*", self.filter.clock)))?;
        for (_, name, bit) in &self.bindings {
            let Some(bit) = *bit else { continue };
            match self.discovered.get_mut(name) {
                Some(d) => d.width = d.width.max(bit + 1),
                None => return Err(TraceFault::Format(format!(
                    "bus {} has no bit 0 declaration", name)))
            }
        }

        let mut slot2index = Vec::with_capacity(self.discovered.len());
        for (name, d) in &self.discovered {
            slot2index.push(match first {
                true => catalog.register(name, d.width)?,
                false => catalog.validate(name, d.width)?
            });
        }
        if !first && self.discovered.len() != catalog.len() {
            let missing = catalog.iter()
                .filter(|e| !self.discovered.contains_key(e.name))
                .map(|e| e.name)
                .collect::<Vec<_>>();
            return Err(TraceFault::Consistency(format!(
                "signals missing from this trace: {}", missing.join(", "))))
        }

        let mut bindings = HashMap::<u64, Vec<Binding>>::new();
        for (code, name, bit) in self.bindings.drain(..) {
            let slot = self.discovered.get_index_of(&name)
                .ok_or_else(|| TraceFault::Format(format!(
                    "signal {} is bound but never placed", name)))?;
            let binding = Binding { index: slot2index[slot], bit };
            let list = bindings.entry(code).or_default();
            if !list.contains(&binding) {
                list.push(binding);
            }
        }
        Ok(SymbolTable {
            bindings,
            declared: self.declared,
            clock,
            reset: self.reset,
        })
    }
}

/// Walk a parsed header and build its symbol table.
pub fn parse_header(
    header: &Header, filter: &SignalFilter,
    catalog: &mut SignalCatalog, first: bool
) -> Result<SymbolTable, TraceFault> {
    walk_events(header_events(header), filter, catalog, first)
}

/// Run the header state machine over an event stream.
pub fn walk_events<'h>(
    events: impl IntoIterator<Item = HeaderEvent<'h>>,
    filter: &SignalFilter,
    catalog: &mut SignalCatalog, first: bool
) -> Result<SymbolTable, TraceFault> {
    let mut parser = HeaderParser::new(filter);
    for event in events {
        if let HeaderEvent::EndDefinitions = event {
            return parser.finish(catalog, first)
        }
        parser.feed(event)?;
    }
    Err(TraceFault::Format("header has no enddefinitions".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use HeaderEvent::*;

    fn var(code: u64, name: &str, width: u32,
           range: Option<DeclRange>) -> HeaderEvent<'_> {
        Var(VarDecl { kind: VarKind::Wire, width, code, name, range })
    }

    fn harness<'a>(inner: Vec<HeaderEvent<'a>>) -> Vec<HeaderEvent<'a>> {
        let mut events = vec![
            EnterScope("TestHarness"),
            var(1, "clock", 1, None),
            var(2, "reset", 1, None),
            EnterScope("dut"),
        ];
        events.extend(inner);
        events.extend([LeaveScope, LeaveScope, EndDefinitions]);
        events
    }

    #[test]
    fn filter_order() {
        let f = SignalFilter::default();
        assert_eq!(f.classify("clock"), SignalClass::Clock);
        assert_eq!(f.classify("reset_n"), SignalClass::Reset);
        assert_eq!(f.classify("dut.clock"), SignalClass::Noise);
        assert_eq!(f.classify("dut._GEN_12"), SignalClass::Noise);
        assert_eq!(f.classify("dut.mem_ext.ram_reg"), SignalClass::Noise);
        assert_eq!(f.classify("dut.mem_ext.ram"), SignalClass::Tracked);
        let allow = ["dut.a"].iter().map(|&s| s.into()).collect();
        let f = SignalFilter::new("clock", "reset", Some(allow));
        assert_eq!(f.classify("dut.a"), SignalClass::Tracked);
        assert_eq!(f.classify("dut.b"), SignalClass::NotAllowed);
        assert_eq!(f.classify("clock"), SignalClass::Clock);
    }

    #[test]
    fn first_file_defines_the_catalog() {
        let filter = SignalFilter::default();
        let mut cat = SignalCatalog::new();
        let table = walk_events(harness(vec![
            var(3, "pc", 32, Some(DeclRange::Range(31, 0))),
            var(4, "valid", 1, None),
            var(5, "_RAND_0", 32, None),
        ]), &filter, &mut cat, true).unwrap();
        assert_eq!(cat.iter().map(|e| (e.name, e.width))
                   .collect::<Vec<_>>(),
                   vec![("dut.pc", 32), ("dut.valid", 1)]);
        assert_eq!(table.resolve(1), Symbol::Clock);
        assert_eq!(table.resolve(2), Symbol::Reset);
        assert_eq!(table.resolve(4), Symbol::Signals(&[
            Binding { index: 1, bit: None }]));
        assert_eq!(table.resolve(5), Symbol::Untracked);
        assert_eq!(table.resolve(99), Symbol::Undeclared);
    }

    #[test]
    fn per_bit_bus_is_placed_by_bit_zero() {
        let filter = SignalFilter::default();
        let mut cat = SignalCatalog::new();
        let table = walk_events(harness(vec![
            var(3, "first", 1, None),
            var(10, "bus", 1, Some(DeclRange::Bit(2))),
            var(11, "bus", 1, Some(DeclRange::Bit(1))),
            var(4, "second", 1, None),
            var(12, "bus", 1, Some(DeclRange::Bit(0))),
        ]), &filter, &mut cat, true).unwrap();
        assert_eq!(cat.iter().map(|e| (e.name, e.width))
                   .collect::<Vec<_>>(),
                   vec![("dut.first", 1), ("dut.second", 1),
                        ("dut.bus", 3)]);
        assert_eq!(table.resolve(10), Symbol::Signals(&[
            Binding { index: 2, bit: Some(2) }]));
        assert_eq!(table.resolve(12), Symbol::Signals(&[
            Binding { index: 2, bit: Some(0) }]));
    }

    #[test]
    fn bus_without_bit_zero_fails() {
        let filter = SignalFilter::default();
        let mut cat = SignalCatalog::new();
        let r = walk_events(harness(vec![
            var(10, "bus", 1, Some(DeclRange::Bit(1))),
        ]), &filter, &mut cat, true);
        assert!(matches!(r, Err(TraceFault::Format(_))));
    }

    #[test]
    fn malformed_ranges_fail() {
        let filter = SignalFilter::default();
        for (width, range) in [
            (4, DeclRange::Range(3, 1)),
            (4, DeclRange::Range(2, 0)),
            (4, DeclRange::Bit(0)),
            (1, DeclRange::Bit(-1)),
            (1, DeclRange::Range(1, 0)),
        ] {
            let mut cat = SignalCatalog::new();
            let r = walk_events(harness(vec![
                var(3, "x", width, Some(range)),
            ]), &filter, &mut cat, true);
            assert!(matches!(r, Err(TraceFault::Format(_))),
                    "{:?} accepted", range);
        }
        let mut cat = SignalCatalog::new();
        let r = walk_events(harness(vec![var(3, "x", 0, None)]),
                            &filter, &mut cat, true);
        assert!(matches!(r, Err(TraceFault::Format(_))));
    }

    #[test]
    fn integers_are_ignored_but_declared() {
        let filter = SignalFilter::default();
        let mut cat = SignalCatalog::new();
        let table = walk_events(harness(vec![
            Var(VarDecl {
                kind: VarKind::Integer, width: 32, code: 7,
                name: "i", range: None
            }),
        ]), &filter, &mut cat, true).unwrap();
        assert!(cat.is_empty());
        assert_eq!(table.resolve(7), Symbol::Untracked);
    }

    #[test]
    fn later_files_validate_by_name() {
        let filter = SignalFilter::default();
        let mut cat = SignalCatalog::new();
        walk_events(harness(vec![
            var(3, "a", 2, Some(DeclRange::Range(1, 0))),
            var(4, "b", 1, None),
        ]), &filter, &mut cat, true).unwrap();
        // reordered declarations and fresh codes are fine
        let table = walk_events(harness(vec![
            var(40, "b", 1, None),
            var(30, "a", 2, Some(DeclRange::Range(1, 0))),
        ]), &filter, &mut cat, false).unwrap();
        assert_eq!(table.resolve(30), Symbol::Signals(&[
            Binding { index: 0, bit: None }]));
        let wider = walk_events(harness(vec![
            var(3, "a", 3, Some(DeclRange::Range(2, 0))),
            var(4, "b", 1, None),
        ]), &filter, &mut cat, false);
        assert!(matches!(wider, Err(TraceFault::Consistency(_))));
        let missing = walk_events(harness(vec![
            var(3, "a", 2, Some(DeclRange::Range(1, 0))),
        ]), &filter, &mut cat, false);
        assert!(matches!(missing, Err(TraceFault::Consistency(_))));
        assert_eq!(cat.len(), 2);
    }

    #[test]
    fn scope_underflow_and_missing_clock() {
        let filter = SignalFilter::default();
        let mut cat = SignalCatalog::new();
        let r = walk_events(vec![LeaveScope, EndDefinitions],
                            &filter, &mut cat, true);
        assert!(matches!(r, Err(TraceFault::Consistency(_))));
        let r = walk_events(vec![
            EnterScope("top"), var(3, "x", 1, None),
            LeaveScope, EndDefinitions
        ], &filter, &mut cat, true);
        assert!(matches!(r, Err(TraceFault::Format(_))));
    }

    #[test]
    fn wrapped_top_scopes_form_the_prefix() {
        let filter = SignalFilter::default();
        let mut cat = SignalCatalog::new();
        let table = walk_events(vec![
            EnterScope("TOP"), EnterScope("TestHarness"),
            var(1, "clock", 1, None), var(2, "reset", 1, None),
            EnterScope("dut"), var(3, "flag", 1, None),
            LeaveScope, LeaveScope, LeaveScope, EndDefinitions
        ], &filter, &mut cat, true).unwrap();
        assert_eq!(table.resolve(1), Symbol::Clock);
        assert_eq!(table.resolve(2), Symbol::Reset);
        assert_eq!(cat.iter().map(|e| e.name).collect::<Vec<_>>(),
                   vec!["dut.flag"]);
    }

    #[test]
    fn shared_codes_feed_every_alias() {
        let filter = SignalFilter::default();
        let mut cat = SignalCatalog::new();
        let table = walk_events(harness(vec![
            var(3, "out", 1, None),
            var(3, "sink", 1, None),
        ]), &filter, &mut cat, true).unwrap();
        assert_eq!(table.resolve(3), Symbol::Signals(&[
            Binding { index: 0, bit: None },
            Binding { index: 1, bit: None }]));
        assert_eq!(table.num_bound(), 1);
    }
}
