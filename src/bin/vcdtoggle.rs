//! Trace to toggle activity conversion.
//!
//! This program reads one or more VCD traces of the same design,
//! in order, and counts how many bits of every tracked signal
//! changed in each window of clock cycles. Cycles in reset are
//! skipped.
//!
//! The output is written as text if its path ends with `csv`,
//! and as a fixed-layout little-endian binary otherwise.

use simtoggle::{ Config, ToggleError, convert, read_allow_list };
use std::path::PathBuf;

#[derive(clap::Parser, Debug)]
struct VcdToggleArgs {
    /// The input vcd file paths, in simulation order
    #[clap(required = true)]
    vcd: Vec<PathBuf>,
    /// The output file path.
    #[clap(short, long, default_value = "toggles.csv")]
    output: PathBuf,
    /// Number of non-reset cycles per window.
    #[clap(short, long, default_value_t = 1)]
    window: u64,
    /// Optional signal list.
    ///
    /// Each non-empty line names one signal before its first comma.
    /// Signals not listed are ignored.
    #[clap(long)]
    signals: Option<PathBuf>,
    /// Name prefix of the clock signal.
    #[clap(long, default_value = "clock")]
    clock: String,
    /// Name prefix of the reset signal.
    #[clap(long, default_value = "reset")]
    reset: String,
    /// Required clock period (in VCD units).
    ///
    /// If not specified, it is derived from the first rising edges
    /// of every trace.
    #[clap(long)]
    clock_period: Option<u64>,
}

fn run(args: VcdToggleArgs) -> Result<(), ToggleError> {
    let mut config = Config::new(args.vcd, args.output);
    config.window = args.window;
    config.clock = args.clock.into();
    config.reset = args.reset.into();
    config.clock_period = args.clock_period;
    if let Some(path) = &args.signals {
        let names = read_allow_list(path)?;
        clilog::info!("read {} signal names from {}",
                      names.len(), path.display());
        config.allow_list = Some(names);
    }
    let timer = clilog::stimer!("convert traces");
    let report = convert(&config)?;
    clilog::finish!(timer);
    clilog::info!(
        "{} signals, {} windows, {} nonzero entries",
        report.signals.len(), report.num_windows(),
        report.entries().count()
    );
    report.save(&config.output)?;
    clilog::info!("written to {} ({:?})",
                  config.output.display(), config.output_format());
    Ok(())
}

fn main() {
    clilog::init_stderr_color_debug();
    let args = <VcdToggleArgs as clap::Parser>::parse();
    clilog::info!("args: {:?}", args);
    if let Err(e) = run(args) {
        clilog::error!("{}", e);
        std::process::exit(1);
    }
}
