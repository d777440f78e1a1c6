use anyhow::Result;
use clap::{Parser, ValueEnum};
use dwell::constants::ENV_LOG;
use dwell::{InputFormat, MergeMode, PipelineConfig, ReportPipeline};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "dwell-report",
    about = "Build a per-vehicle time-in-system report from a gate event log"
)]
struct Args {
    /// Input log file
    input: PathBuf,
    /// Output report file
    output: PathBuf,
    /// Decode lanes; 0 picks the available core count
    #[arg(long, default_value_t = 0)]
    workers: usize,
    /// Input framing
    #[arg(long, value_enum, default_value = "fixed")]
    format: FormatArg,
    /// Merge topology
    #[arg(long, value_enum, default_value = "join")]
    merge: MergeArg,
    /// Exclusive vehicle id bound; enables the dense accumulator
    #[arg(long)]
    max_id: Option<u32>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Fixed,
    Lines,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MergeArg {
    Join,
    Channel,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var(ENV_LOG).unwrap_or_else(|_| "info".into()))
        .init();
    let args = Args::parse();

    let config = PipelineConfig {
        workers: args.workers,
        format: match args.format {
            FormatArg::Fixed => InputFormat::Fixed,
            FormatArg::Lines => InputFormat::Lines,
        },
        merge: match args.merge {
            MergeArg::Join => MergeMode::Join,
            MergeArg::Channel => MergeMode::Channel,
        },
        max_id: args.max_id,
        ..PipelineConfig::default()
    };

    ReportPipeline::new(config).run(&args.input, &args.output)?;
    Ok(())
}
