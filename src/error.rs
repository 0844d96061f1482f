use std::io;
use std::time::Duration;

use thiserror::Error;

/// Discriminant of [`AggError`], for callers that only care about the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Io,
    MapFailure,
    Timeout,
}

/// Error type for configuration, input and map-phase failures.
///
/// Any of these aborts the whole run; no partial ranking is produced.
#[derive(Debug, Error)]
pub enum AggError {
    #[error("configuration error: {message}")]
    Config { message: String },
    #[error("failed to read '{origin}': {source}")]
    Io {
        origin: String,
        #[source]
        source: io::Error,
    },
    #[error("{}", describe_map_failure(.chunk, .record, .reason))]
    MapFailure {
        chunk: Option<u64>,
        record: Option<u64>,
        reason: String,
    },
    #[error(
        "dispatch phase exceeded deadline of {} (elapsed {})",
        format_duration(.deadline),
        format_duration(.elapsed)
    )]
    Timeout { deadline: Duration, elapsed: Duration },
}

fn format_duration(duration: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*duration)
}

fn describe_map_failure(chunk: &Option<u64>, record: &Option<u64>, reason: &str) -> String {
    match (*chunk, *record) {
        (Some(chunk), Some(record)) => {
            format!("map failed in chunk {} at record {}: {}", chunk, record, reason)
        }
        (Some(chunk), None) => format!("map failed in chunk {}: {}", chunk, reason),
        _ => format!("map failed: {}", reason),
    }
}

impl AggError {
    pub fn config(message: impl Into<String>) -> Self {
        AggError::Config {
            message: message.into(),
        }
    }

    pub fn io(origin: impl Into<String>, source: io::Error) -> Self {
        AggError::Io {
            origin: origin.into(),
            source,
        }
    }

    pub fn map_failure(chunk: u64, record: u64, reason: impl Into<String>) -> Self {
        AggError::MapFailure {
            chunk: Some(chunk),
            record: Some(record),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AggError::Config { .. } => ErrorKind::Config,
            AggError::Io { .. } => ErrorKind::Io,
            AggError::MapFailure { .. } => ErrorKind::MapFailure,
            AggError::Timeout { .. } => ErrorKind::Timeout,
        }
    }
}
