//! Parallel time-in-system reporting over append-only gate event logs.

pub mod accum;
pub mod clock;
pub mod constants;
pub mod io;
pub mod partition;
pub mod record;
pub mod report;
pub mod runtime;
pub mod stats;

pub use accum::Accumulator;
pub use clock::DateTime;
pub use record::{Decoder, MalformedRecord, ParsedEvent};
pub use runtime::{InputFormat, MergeMode, PipelineConfig, ReportPipeline};
pub use stats::RunSummary;
