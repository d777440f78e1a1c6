//! Centralized environment variable names and default values for runtime tuning.

// Environment variable names
pub const ENV_WORKERS: &str = "DWELL_WORKERS";
pub const ENV_CHANNEL_CAP: &str = "DWELL_CHANNEL_CAP";
pub const ENV_BATCH_RECORDS: &str = "DWELL_BATCH_RECORDS";
/// Log filter directive consumed by the binaries
pub const ENV_LOG: &str = "DWELL_LOG";

// Defaults
// Bounded queue between decode lanes and the merge task; caps in-flight batches
pub const DEFAULT_CHANNEL_CAP: usize = 1024;
// Contributions buffered per lane before a channel send
pub const DEFAULT_BATCH_RECORDS: usize = 4096;

pub fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}
