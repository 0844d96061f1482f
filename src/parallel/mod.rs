//! Parallel map phase and run coordination
//!
//! # Module Structure
//!
//! - `types`: Pool configuration, worker reports and the shared abort state
//! - `sink`: Thread-safe collector of partial aggregations
//! - `worker`: Worker thread that maps chunks
//! - `processor`: Coordinator state machine driving the whole run

mod processor;
mod sink;
mod types;
mod worker;

// Re-export public types
pub use processor::{AggregationReport, Coordinator, CoordinatorState};
pub use sink::ResultSink;
pub use types::ParallelConfig;
