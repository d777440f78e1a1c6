use anyhow::{ensure, Context, Result};
use clap::{Parser, ValueEnum};
use dwell::clock::{DateTime, SECS_PER_DAY};
use dwell::constants::ENV_LOG;
use dwell::record::{encode_line, encode_record};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "dwell-gen", about = "Generate a synthetic gate event log")]
struct Args {
    /// Output log file
    output: PathBuf,
    /// Number of records
    #[arg(long, default_value_t = 1_000_000)]
    records: u64,
    /// Vehicle id domain size; ids are drawn from 0..ids
    #[arg(long, default_value_t = 10_000)]
    ids: u32,
    /// RNG seed, for reproducible fixtures
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Output framing
    #[arg(long, value_enum, default_value = "fixed")]
    format: FormatArg,
    /// Longest dwell in seconds
    #[arg(long, default_value_t = 14_400)]
    max_dwell_secs: i64,
    /// Fraction of records whose end precedes their start
    #[arg(long, default_value_t = 0.0)]
    inverted_share: f64,
    /// Chop the final record short to exercise the malformed path
    #[arg(long)]
    truncate_tail: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Fixed,
    Lines,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var(ENV_LOG).unwrap_or_else(|_| "info".into()))
        .init();
    let args = Args::parse();
    ensure!(args.ids > 0, "id domain must be non-empty");
    ensure!(
        (0.0..=1.0).contains(&args.inverted_share),
        "inverted share must be within 0..=1"
    );

    let mut rng = StdRng::seed_from_u64(args.seed);
    let base = DateTime { year: 2021, month: 1, day: 1, hour: 0, minute: 0, second: 0 }.abs_seconds();
    let span = 365 * SECS_PER_DAY;
    let max_dwell = args.max_dwell_secs.max(1);

    let mut writer = dwell::io::open_writer(&args.output)?;
    let mut buf = Vec::with_capacity(64);
    let mut bytes_out = 0u64;
    for _ in 0..args.records {
        let start_abs = base + rng.gen_range(0..span);
        let mut dwell = rng.gen_range(1..=max_dwell);
        if args.inverted_share > 0.0 && rng.gen_bool(args.inverted_share) {
            dwell = -dwell;
        }
        let start = DateTime::from_abs_seconds(start_abs);
        let end = DateTime::from_abs_seconds(start_abs + dwell);
        let id = rng.gen_range(0..args.ids);

        buf.clear();
        match args.format {
            FormatArg::Fixed => encode_record(&mut buf, &start, &end, id),
            FormatArg::Lines => encode_line(&mut buf, &start, &end, id),
        }
        writer
            .write_all(&buf)
            .with_context(|| format!("write {}", args.output.display()))?;
        bytes_out += buf.len() as u64;
    }

    if args.truncate_tail {
        buf.clear();
        let at = DateTime::from_abs_seconds(base);
        encode_record(&mut buf, &at, &at, 0);
        let partial = &buf[..buf.len() / 2];
        writer
            .write_all(partial)
            .with_context(|| format!("write {}", args.output.display()))?;
        bytes_out += partial.len() as u64;
    }
    writer
        .flush()
        .with_context(|| format!("flush {}", args.output.display()))?;

    info!(
        records = args.records,
        ids = args.ids,
        bytes = bytes_out,
        output = %args.output.display(),
        "log generated"
    );
    Ok(())
}
