use crate::accum::{Accumulator, LaneResult};
use crate::constants::{
    self, DEFAULT_BATCH_RECORDS, DEFAULT_CHANNEL_CAP, ENV_BATCH_RECORDS, ENV_CHANNEL_CAP,
    ENV_WORKERS,
};
use crate::io;
use crate::partition::{self, Partition};
use crate::record::{Decoder, FIXED_RECORD_LEN};
use crate::report;
use crate::stats::{LaneStats, RunSummary};
use anyhow::{anyhow, Context, Result};
use crossbeam_channel as channel;
use rayon::prelude::*;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// 50-byte records at fixed offsets; the canonical form.
    Fixed,
    /// `\r\n`-delimited text lines, single-space separated fields.
    Lines,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Lanes fill private accumulators, a join barrier, then one merge fold.
    Join,
    /// Lanes stream contribution batches over a bounded queue into a
    /// dedicated merge task that runs while lanes are still decoding.
    Channel,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Decode lanes; 0 resolves from `DWELL_WORKERS`, then available cores.
    pub workers: usize,
    pub format: InputFormat,
    pub merge: MergeMode,
    /// Exclusive id bound. Set, the run uses a dense accumulator of this
    /// capacity and the decoder rejects ids at or above it.
    pub max_id: Option<u32>,
    pub channel_cap: usize,
    pub batch_records: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            format: InputFormat::Fixed,
            merge: MergeMode::Join,
            max_id: None,
            channel_cap: constants::env_usize(ENV_CHANNEL_CAP, DEFAULT_CHANNEL_CAP).max(1),
            batch_records: constants::env_usize(ENV_BATCH_RECORDS, DEFAULT_BATCH_RECORDS).max(1),
        }
    }
}

impl PipelineConfig {
    fn resolved_workers(&self) -> usize {
        let n = if self.workers > 0 {
            self.workers
        } else {
            constants::env_usize(ENV_WORKERS, num_cpus::get())
        };
        n.max(1)
    }

    fn make_accum(&self) -> Accumulator {
        match self.max_id {
            Some(cap) => Accumulator::dense(cap),
            None => Accumulator::sparse(),
        }
    }

    fn decoder(&self) -> Decoder {
        match self.max_id {
            Some(cap) => Decoder::with_id_limit(cap),
            None => Decoder::new(),
        }
    }
}

enum LaneMsg {
    Batch(Vec<(u32, i64)>),
    Done(LaneStats),
}

/// Decode every record of one chunk, feeding valid events to `on_event`.
/// Returns (decoded, malformed); a bad record is counted and skipped, never
/// a reason to stop the lane.
fn scan_chunk(
    decoder: &Decoder,
    format: InputFormat,
    chunk: &[u8],
    mut on_event: impl FnMut(u32, i64),
) -> (u64, u64) {
    let mut records = 0u64;
    let mut malformed = 0u64;
    match format {
        InputFormat::Fixed => {
            for rec in chunk.chunks_exact(FIXED_RECORD_LEN) {
                match decoder.decode_fixed(rec) {
                    Ok(ev) => {
                        on_event(ev.id, ev.duration_secs);
                        records += 1;
                    }
                    Err(_) => malformed += 1,
                }
            }
        }
        InputFormat::Lines => {
            for line in partition::lines(chunk) {
                match decoder.decode_line(line) {
                    Ok(ev) => {
                        on_event(ev.id, ev.duration_secs);
                        records += 1;
                    }
                    Err(_) => malformed += 1,
                }
            }
        }
    }
    (records, malformed)
}

/// The whole run: mmap input, partition into lane-aligned chunks, decode and
/// accumulate in parallel, merge the partials, write the report.
///
/// I/O failures at the edges are fatal and abort the run; malformed records
/// are per-record skips surfaced once in the summary.
pub struct ReportPipeline {
    config: PipelineConfig,
}

impl ReportPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<RunSummary> {
        let run_start = Instant::now();
        let input = input.as_ref();
        let output = output.as_ref();
        let mut summary = RunSummary::default();

        let data = io::map_input(input)?;
        let bytes = data.bytes();
        let lanes = self.config.resolved_workers();

        let t = Instant::now();
        let plan = match self.config.format {
            InputFormat::Fixed => partition::fixed_plan(bytes.len(), lanes),
            InputFormat::Lines => partition::line_plan(bytes, lanes),
        };
        summary.partition_ms = t.elapsed().as_millis() as u64;
        if plan.trailing_bytes > 0 {
            // an unassignable partial record at the end of the input
            summary.malformed += 1;
        }
        info!(
            phase = "partition",
            lanes,
            input_bytes = bytes.len(),
            trailing_bytes = plan.trailing_bytes,
            wall_ms = summary.partition_ms,
            "input partitioned"
        );

        let final_accum = match self.config.merge {
            MergeMode::Join => {
                let t = Instant::now();
                let results = self.run_join(bytes, &plan)?;
                summary.accumulate_ms = t.elapsed().as_millis() as u64;
                let mut lane_stats: Vec<LaneStats> = results.iter().map(|r| r.stats).collect();
                lane_stats.sort_unstable_by_key(|s| s.lane);
                summary.record_lanes(&lane_stats);
                info!(
                    phase = "decode",
                    lanes = lane_stats.len(),
                    records = summary.records,
                    malformed = summary.malformed,
                    min_lane_ms = summary.min_lane_ms,
                    max_lane_ms = summary.max_lane_ms,
                    wall_ms = summary.accumulate_ms,
                    "decode phase complete"
                );

                let t = Instant::now();
                let mut fin = self.config.make_accum();
                for r in results {
                    fin.merge_from(r.accum);
                }
                summary.merge_ms = t.elapsed().as_millis() as u64;
                info!(phase = "merge", wall_ms = summary.merge_ms, "partials merged");
                fin
            }
            MergeMode::Channel => {
                let t = Instant::now();
                let (fin, mut lane_stats) = self.run_channel(bytes, &plan)?;
                summary.accumulate_ms = t.elapsed().as_millis() as u64;
                lane_stats.sort_unstable_by_key(|s| s.lane);
                summary.record_lanes(&lane_stats);
                info!(
                    phase = "decode_merge",
                    lanes = lane_stats.len(),
                    records = summary.records,
                    malformed = summary.malformed,
                    min_lane_ms = summary.min_lane_ms,
                    max_lane_ms = summary.max_lane_ms,
                    wall_ms = summary.accumulate_ms,
                    "streaming decode+merge complete"
                );
                fin
            }
        };

        let t = Instant::now();
        summary.entries_written = report::write_report(&final_accum, output)?;
        summary.write_ms = t.elapsed().as_millis() as u64;
        info!(
            phase = "write",
            entries = summary.entries_written,
            wall_ms = summary.write_ms,
            "report written"
        );

        summary.wall_ms = run_start.elapsed().as_millis() as u64;
        if summary.malformed > 0 {
            warn!(malformed = summary.malformed, "skipped malformed records");
        }
        info!(
            records = summary.records,
            malformed = summary.malformed,
            entries = summary.entries_written,
            wall_ms = summary.wall_ms,
            "run complete"
        );
        Ok(summary)
    }

    fn run_join(&self, bytes: &[u8], plan: &Partition) -> Result<Vec<LaneResult>> {
        let decoder = self.config.decoder();
        let format = self.config.format;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(plan.ranges.len())
            .build()
            .context("build worker pool")?;
        let results = pool.install(|| {
            plan.ranges
                .par_iter()
                .enumerate()
                .map(|(lane, range)| {
                    let start = Instant::now();
                    let chunk = &bytes[range.clone()];
                    let mut accum = self.config.make_accum();
                    let (records, malformed) =
                        scan_chunk(&decoder, format, chunk, |id, secs| accum.add(id, secs));
                    debug!(lane, records, malformed, "lane complete");
                    LaneResult {
                        accum,
                        stats: LaneStats {
                            lane,
                            records,
                            malformed,
                            wall_ms: start.elapsed().as_millis() as u64,
                        },
                    }
                })
                .collect()
        });
        Ok(results)
    }

    fn run_channel(&self, bytes: &[u8], plan: &Partition) -> Result<(Accumulator, Vec<LaneStats>)> {
        let decoder = self.config.decoder();
        let format = self.config.format;
        let batch_records = self.config.batch_records;
        let (tx, rx) = channel::bounded::<LaneMsg>(self.config.channel_cap);
        let mut fin = self.config.make_accum();

        std::thread::scope(|s| {
            let merge = s.spawn(move || {
                let mut stats = Vec::new();
                for msg in rx {
                    match msg {
                        LaneMsg::Batch(contribs) => {
                            for (id, secs) in contribs {
                                fin.add(id, secs);
                            }
                        }
                        LaneMsg::Done(lane) => stats.push(lane),
                    }
                }
                (fin, stats)
            });

            for (lane, range) in plan.ranges.iter().enumerate() {
                let tx = tx.clone();
                let chunk = &bytes[range.clone()];
                s.spawn(move || {
                    let start = Instant::now();
                    let mut batch = Vec::with_capacity(batch_records);
                    let (records, malformed) = scan_chunk(&decoder, format, chunk, |id, secs| {
                        batch.push((id, secs));
                        if batch.len() >= batch_records {
                            let full =
                                std::mem::replace(&mut batch, Vec::with_capacity(batch_records));
                            // bounded send blocks when the merge task falls behind
                            let _ = tx.send(LaneMsg::Batch(full));
                        }
                    });
                    if !batch.is_empty() {
                        let _ = tx.send(LaneMsg::Batch(batch));
                    }
                    let _ = tx.send(LaneMsg::Done(LaneStats {
                        lane,
                        records,
                        malformed,
                        wall_ms: start.elapsed().as_millis() as u64,
                    }));
                });
            }
            // the merge loop ends once every lane's sender is gone
            drop(tx);
            merge.join().map_err(|_| anyhow!("merge task panicked"))
        })
    }
}
