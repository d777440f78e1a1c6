use crate::stats::LaneStats;
use std::collections::HashMap;

/// Per-key duration totals. Sparse is the default; dense trades memory for
/// direct indexing and requires the id domain to be bounded up front, with
/// the bound enforced at decode time so indexing never goes out of range.
#[derive(Debug, Clone)]
pub enum Accumulator {
    Sparse(HashMap<u32, i64>),
    Dense(Vec<i64>),
}

impl Accumulator {
    pub fn sparse() -> Self {
        Accumulator::Sparse(HashMap::new())
    }

    pub fn dense(capacity: u32) -> Self {
        Accumulator::Dense(vec![0; capacity as usize])
    }

    pub fn add(&mut self, id: u32, duration_secs: i64) {
        match self {
            Accumulator::Sparse(map) => {
                *map.entry(id).or_insert(0) += duration_secs;
            }
            Accumulator::Dense(slots) => {
                debug_assert!((id as usize) < slots.len());
                slots[id as usize] += duration_secs;
            }
        }
    }

    /// Fold another accumulator in. Addition over unique keys, so the result
    /// is independent of merge order and of which lane saw which record.
    pub fn merge_from(&mut self, other: Accumulator) {
        match other {
            Accumulator::Sparse(map) => {
                for (id, secs) in map {
                    self.add(id, secs);
                }
            }
            Accumulator::Dense(slots) => {
                for (id, secs) in slots.into_iter().enumerate() {
                    if secs != 0 {
                        self.add(id as u32, secs);
                    }
                }
            }
        }
    }

    /// Entries with a non-zero total. Zero contributions are the fold
    /// identity, so skipping them changes neither merges nor the report.
    pub fn entries(&self) -> Vec<(u32, i64)> {
        match self {
            Accumulator::Sparse(map) => {
                map.iter().filter(|(_, &v)| v != 0).map(|(&k, &v)| (k, v)).collect()
            }
            Accumulator::Dense(slots) => slots
                .iter()
                .enumerate()
                .filter(|(_, &v)| v != 0)
                .map(|(i, &v)| (i as u32, v))
                .collect(),
        }
    }
}

/// Everything one lane hands to the merge step: its private accumulator and
/// its counters. Owned by exactly one lane until the handoff.
#[derive(Debug)]
pub struct LaneResult {
    pub accum: Accumulator,
    pub stats: LaneStats,
}
