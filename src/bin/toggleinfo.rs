//! Toggle activity inspection.
//!
//! This program reads an activity file written by `vcdtoggle`, in
//! either encoding, and prints the recorded cycles and the most
//! active signals.

use simtoggle::ActivityReport;
use std::path::PathBuf;
use itertools::Itertools;

#[derive(clap::Parser, Debug)]
struct ToggleInfoArgs {
    /// The activity file (text if it ends with `csv`).
    input: PathBuf,
    /// How many signals to list.
    #[clap(default_value_t = 20)]
    top: usize,
}

fn main() {
    clilog::init_stderr_color_debug();
    let args = <ToggleInfoArgs as clap::Parser>::parse();
    let report = match ActivityReport::load(&args.input) {
        Ok(r) => r,
        Err(e) => {
            clilog::error!("{}", e);
            std::process::exit(1);
        }
    };
    println!("window: {}", report.window);
    println!("cycles: {}", report.cycles.iter().format(", "));
    println!("reset cycles: {}", report.reset_cycles.iter().format(", "));
    println!("effective cycles: {} ({} windows)",
             report.effective_cycles(), report.num_windows());
    println!("signals: {} ({} bits), nonzero entries: {}",
             report.signals.len(), report.widths.iter().sum::<u64>(),
             report.entries().count());
    let windows = report.num_windows().max(1) as f64;
    // mean density over all windows, idle ones included
    let ranked = (0..report.signals.len())
        .map(|i| (i, report.density(i).iter().map(|&(_, d)| d)
                  .sum::<f64>() / windows))
        .sorted_by(|a, b| b.1.total_cmp(&a.1))
        .take(args.top);
    for (i, density) in ranked {
        println!("{:>10.6}  {}[{}]  ({} windows active)",
                 density, report.signals[i], report.widths[i],
                 report.activity[i].len());
    }
}
