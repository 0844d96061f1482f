// Core library for chunkagg: chunked, parallel group-and-count over delimited input
//
// Records are read in fixed-size chunks, mapped to per-chunk counts on a
// worker pool, merged into one exact total and ranked.

pub mod config;
pub mod config_file;
pub mod counts;
pub mod decompression;
pub mod error;
pub mod formatters;
pub mod mapper;
pub mod parallel;
pub mod ranking;
pub mod reduce;
pub mod source;
pub mod stats;

pub use config::{AggregatorConfig, InputSource, OutputFormat};
pub use counts::{GlobalAggregation, KeyCounts, PartialAggregation};
pub use error::{AggError, ErrorKind};
pub use mapper::{GroupCountMapper, Mapper};
pub use parallel::{AggregationReport, Coordinator, CoordinatorState, ResultSink};
pub use ranking::{select_top, RankedEntry};
pub use reduce::reduce;
pub use source::{Chunk, ChunkSource, Record, Schema};
pub use stats::ProcessingStats;

/// Run one aggregation with the default group-and-count mapper
pub fn aggregate(config: AggregatorConfig) -> Result<AggregationReport, AggError> {
    Coordinator::new(config).run()
}
