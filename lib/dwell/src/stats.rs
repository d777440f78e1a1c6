use serde::Serialize;

/// Per-lane outcome of the decode/accumulate phase.
#[derive(Default, Clone, Copy, Debug, Serialize)]
pub struct LaneStats {
    pub lane: usize,
    pub records: u64,
    pub malformed: u64,
    pub wall_ms: u64,
}

/// Whole-run outcome returned to the caller once the report is on disk.
#[derive(Default, Clone, Debug, Serialize)]
pub struct RunSummary {
    pub lanes: usize,
    pub records: u64,
    pub malformed: u64,
    pub entries_written: u64,
    pub partition_ms: u64,
    pub accumulate_ms: u64,
    pub merge_ms: u64,
    pub write_ms: u64,
    pub wall_ms: u64,
    pub min_lane_ms: u64,
    pub max_lane_ms: u64,
}

impl RunSummary {
    pub fn record_lanes(&mut self, lanes: &[LaneStats]) {
        self.lanes = lanes.len();
        self.records = lanes.iter().map(|l| l.records).sum();
        self.malformed += lanes.iter().map(|l| l.malformed).sum::<u64>();
        self.min_lane_ms = lanes.iter().map(|l| l.wall_ms).min().unwrap_or(0);
        self.max_lane_ms = lanes.iter().map(|l| l.wall_ms).max().unwrap_or(0);
    }
}
