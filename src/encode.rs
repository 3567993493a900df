//! Text and binary encodings of an [`ActivityReport`].
//!
//! Both encodings carry, in order: the window size, per-trace
//! cycle counts, per-trace reset cycle counts, signal names,
//! widths, the row pointer array, and the concatenated
//! `(window_index, toggle_count)` entries.
//!
//! The text form has one item per line, with lists
//! comma-separated and one entry pair per line after the pointers.
//! The binary form uses little-endian 8-byte integers, every list
//! prefixed with its length, and 8 + 4 byte entry records.

use compact_str::CompactString;
use itertools::Itertools;
use std::io::{ self, BufRead, Read, Write };
use std::path::Path;
use std::str::FromStr;
use crate::report::ActivityReport;
use crate::window::SparseActivity;

/// Output encoding, chosen by the output path.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Binary,
}

impl OutputFormat {
    /// Text when the path ends with `csv`, binary otherwise.
    pub fn from_path(path: &Path) -> OutputFormat {
        match path.to_string_lossy().ends_with("csv") {
            true => OutputFormat::Csv,
            false => OutputFormat::Binary
        }
    }
}

#[inline]
fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

/// Split the flat entries back into rows.
fn split_rows(
    ptr: &[u64], entries: Vec<(u64, u32)>, num_signals: usize
) -> io::Result<Vec<SparseActivity>> {
    if ptr.len() != num_signals + 1 || ptr[0] != 0 ||
        ptr.windows(2).any(|w| w[0] > w[1]) ||
        ptr[num_signals] as usize != entries.len()
    {
        return Err(invalid("row pointers do not match the entries"))
    }
    Ok(ptr.windows(2).map(|w| SparseActivity {
        entries: entries[w[0] as usize..w[1] as usize].to_vec()
    }).collect())
}

pub fn write_csv(report: &ActivityReport, w: &mut impl Write) -> io::Result<()> {
    writeln!(w, "{}", report.window)?;
    writeln!(w, "{}", report.cycles.iter().format(","))?;
    writeln!(w, "{}", report.reset_cycles.iter().format(","))?;
    writeln!(w, "{}", report.signals.iter().format(","))?;
    writeln!(w, "{}", report.widths.iter().format(","))?;
    writeln!(w, "{}", report.pointers().iter().format(","))?;
    for (index, toggles) in report.entries() {
        writeln!(w, "{},{}", index, toggles)?;
    }
    Ok(())
}

fn parse_list<T: FromStr>(line: &str) -> io::Result<Vec<T>> {
    if line.is_empty() {
        return Ok(Vec::new())
    }
    line.split(',').map(|s| s.trim().parse::<T>()
                        .map_err(|_| invalid(format!("bad number {:?}", s))))
        .collect()
}

pub fn read_csv(r: &mut impl BufRead) -> io::Result<ActivityReport> {
    let mut lines = r.lines();
    let mut next = |what: &str| -> io::Result<String> {
        lines.next().unwrap_or_else(
            || Err(invalid(format!("missing {} line", what))))
    };
    let window = next("window")?.trim().parse::<u64>()
        .map_err(|_| invalid("bad window size"))?;
    let cycles = parse_list(&next("cycles")?)?;
    let reset_cycles = parse_list(&next("reset cycles")?)?;
    let signals = match next("signals")? {
        s if s.is_empty() => Vec::new(),
        s => s.split(',').map(CompactString::from).collect::<Vec<_>>()
    };
    let widths = parse_list(&next("widths")?)?;
    let ptr = parse_list::<u64>(&next("pointers")?)?;
    let mut entries = Vec::new();
    for line in lines {
        let line = line?;
        if line.is_empty() {
            continue
        }
        let (index, toggles) = line.split_once(',')
            .ok_or_else(|| invalid(format!("bad entry {:?}", line)))?;
        entries.push((
            index.parse().map_err(|_| invalid("bad window index"))?,
            toggles.parse().map_err(|_| invalid("bad toggle count"))?
        ));
    }
    let activity = split_rows(&ptr, entries, signals.len())?;
    Ok(ActivityReport {
        window, cycles, reset_cycles, signals, widths, activity
    })
}

#[inline]
fn put_u64(w: &mut impl Write, v: u64) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

fn put_list(w: &mut impl Write, list: &[u64]) -> io::Result<()> {
    put_u64(w, list.len() as u64)?;
    for &v in list {
        put_u64(w, v)?;
    }
    Ok(())
}

pub fn write_bin(report: &ActivityReport, w: &mut impl Write) -> io::Result<()> {
    put_u64(w, report.window)?;
    put_list(w, &report.cycles)?;
    put_list(w, &report.reset_cycles)?;
    put_u64(w, report.signals.len() as u64)?;
    for name in &report.signals {
        put_u64(w, name.len() as u64)?;
        w.write_all(name.as_bytes())?;
    }
    put_list(w, &report.widths)?;
    put_list(w, &report.pointers())?;
    for (index, toggles) in report.entries() {
        put_u64(w, index)?;
        w.write_all(&toggles.to_le_bytes())?;
    }
    Ok(())
}

#[inline]
fn get_u64(r: &mut impl Read) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

#[inline]
fn get_u32(r: &mut impl Read) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn get_list(r: &mut impl Read) -> io::Result<Vec<u64>> {
    let len = get_u64(r)?;
    (0..len).map(|_| get_u64(r)).collect()
}

pub fn read_bin(r: &mut impl Read) -> io::Result<ActivityReport> {
    let window = get_u64(r)?;
    let cycles = get_list(r)?;
    let reset_cycles = get_list(r)?;
    let num_signals = get_u64(r)?;
    let mut signals = Vec::new();
    for _ in 0..num_signals {
        let len = get_u64(r)?;
        // bounded by the bytes actually present
        let mut name = Vec::new();
        if r.by_ref().take(len).read_to_end(&mut name)? as u64 != len {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof,
                                      "truncated signal name"))
        }
        let name = String::from_utf8(name)
            .map_err(|_| invalid("signal name is not utf-8"))?;
        signals.push(CompactString::from(name));
    }
    let widths = get_list(r)?;
    let ptr = get_list(r)?;
    let total = ptr.last().copied().unwrap_or(0);
    let mut entries = Vec::new();
    for _ in 0..total {
        let index = get_u64(r)?;
        entries.push((index, get_u32(r)?));
    }
    let activity = split_rows(&ptr, entries, signals.len())?;
    Ok(ActivityReport {
        window, cycles, reset_cycles, signals, widths, activity
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ActivityReport {
        ActivityReport {
            window: 2,
            cycles: vec![3],
            reset_cycles: vec![0],
            signals: vec!["dut.a".into(), "dut.b".into()],
            widths: vec![2, 1],
            activity: vec![
                SparseActivity { entries: vec![(0, 2), (1, 1)] },
                SparseActivity { entries: vec![(1, 1)] },
            ],
        }
    }

    #[test]
    fn csv_layout() {
        let mut out = Vec::new();
        write_csv(&report(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(),
                   "2\n3\n0\ndut.a,dut.b\n2,1\n0,2,3\n0,2\n1,1\n1,1\n");
    }

    #[test]
    fn binary_layout() {
        let mut out = Vec::new();
        write_bin(&report(), &mut out).unwrap();
        let mut expect = Vec::new();
        for v in [2u64, 1, 3, 1, 0, 2, 5] {
            expect.extend_from_slice(&v.to_le_bytes());
        }
        expect.extend_from_slice(b"dut.a");
        expect.extend_from_slice(&5u64.to_le_bytes());
        expect.extend_from_slice(b"dut.b");
        for v in [2u64, 2, 1, 3, 0, 2, 3] {
            expect.extend_from_slice(&v.to_le_bytes());
        }
        for (i, c) in [(0u64, 2u32), (1, 1), (1, 1)] {
            expect.extend_from_slice(&i.to_le_bytes());
            expect.extend_from_slice(&c.to_le_bytes());
        }
        assert_eq!(out, expect);
    }

    #[test]
    fn both_encodings_decode_to_the_same_report() {
        let mut csv = Vec::new();
        write_csv(&report(), &mut csv).unwrap();
        let mut bin = Vec::new();
        write_bin(&report(), &mut bin).unwrap();
        let from_csv = read_csv(&mut &csv[..]).unwrap();
        let from_bin = read_bin(&mut &bin[..]).unwrap();
        assert_eq!(from_csv, report());
        assert_eq!(from_bin, from_csv);
    }

    #[test]
    fn empty_catalog_still_has_a_pointer() {
        let r = ActivityReport {
            window: 1, cycles: vec![4], reset_cycles: vec![1],
            signals: vec![], widths: vec![], activity: vec![],
        };
        let mut csv = Vec::new();
        write_csv(&r, &mut csv).unwrap();
        assert_eq!(String::from_utf8(csv.clone()).unwrap(),
                   "1\n4\n1\n\n\n0\n");
        assert_eq!(read_csv(&mut &csv[..]).unwrap(), r);
    }

    #[test]
    fn oversized_name_length_is_an_error() {
        let mut bin = Vec::new();
        for v in [1u64, 0, 0, 1, u64::MAX] {
            bin.extend_from_slice(&v.to_le_bytes());
        }
        bin.extend_from_slice(b"dut.a");
        let err = read_bin(&mut &bin[..]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn bad_pointers_are_rejected() {
        let csv = b"1\n4\n0\na\n1\n0,2\n0,1\n";
        assert!(read_csv(&mut &csv[..]).is_err());
        assert_eq!(OutputFormat::from_path(Path::new("out.csv")),
                   OutputFormat::Csv);
        assert_eq!(OutputFormat::from_path(Path::new("out.bin")),
                   OutputFormat::Binary);
    }
}
