use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

use crate::error::AggError;

pub const DEFAULT_CHUNK_SIZE: usize = 10_000;
pub const DEFAULT_TOP_N: usize = 10;
pub const DEFAULT_GROUP_BY: &str = "name";
pub const DEFAULT_PENDING_CHUNKS: usize = 2;

/// Main configuration struct for an aggregation run
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub input: InputConfig,
    pub ranking: RankingConfig,
    pub performance: PerformanceConfig,
}

/// Input configuration
#[derive(Debug, Clone)]
pub struct InputConfig {
    pub source: InputSource,
    pub delimiter: u8,
}

/// Where records are streamed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    Path(PathBuf),
}

/// Aggregation key and result size
#[derive(Debug, Clone)]
pub struct RankingConfig {
    pub group_by: String,
    pub top_n: usize,
}

/// Performance configuration
#[derive(Debug, Clone)]
pub struct PerformanceConfig {
    pub chunk_size: usize,
    /// `None` means one worker per available CPU.
    pub pool_size: Option<usize>,
    /// Chunks the dispatcher may queue beyond the number of workers.
    pub pending_chunks: usize,
    /// Wall-clock limit on the dispatch phase.
    pub deadline: Option<Duration>,
}

/// Output format enumeration
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Default,
    Json,
    Csv,
}

impl InputSource {
    /// `-` selects standard input, anything else is a file path
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            InputSource::Stdin
        } else {
            InputSource::Path(PathBuf::from(arg))
        }
    }

    /// Human-readable origin used in error messages
    pub fn display_name(&self) -> String {
        match self {
            InputSource::Stdin => "<stdin>".to_string(),
            InputSource::Path(path) => path.display().to_string(),
        }
    }
}

impl AggregatorConfig {
    /// Configuration for a file with all other settings at their defaults
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            input: InputConfig {
                source: InputSource::Path(path.into()),
                ..InputConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.performance.chunk_size = chunk_size;
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.performance.pool_size = Some(pool_size);
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.ranking.top_n = top_n;
        self
    }

    pub fn with_group_by(mut self, field: impl Into<String>) -> Self {
        self.ranking.group_by = field.into();
        self
    }

    pub fn with_pending_chunks(mut self, pending_chunks: usize) -> Self {
        self.performance.pending_chunks = pending_chunks;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.performance.deadline = Some(deadline);
        self
    }

    /// Get effective worker count with defaults
    pub fn effective_pool_size(&self) -> usize {
        self.performance.pool_size.unwrap_or_else(num_cpus::get)
    }

    /// Bound of the chunk queue between the reader and the workers.
    ///
    /// Each worker holds one chunk while mapping, so at most
    /// `pool size + pending_chunks` chunks are in flight.
    pub fn queue_capacity(&self) -> usize {
        self.performance.pending_chunks
    }

    pub fn max_chunks_in_flight(&self) -> usize {
        self.effective_pool_size() + self.queue_capacity()
    }

    /// Reject settings that cannot produce a valid run. Performs no I/O.
    pub fn validate(&self) -> Result<(), AggError> {
        if self.performance.chunk_size == 0 {
            return Err(AggError::config("chunk size must be a positive integer"));
        }
        if self.performance.pool_size == Some(0) {
            return Err(AggError::config("pool size must be a positive integer"));
        }
        if self.ranking.group_by.is_empty() {
            return Err(AggError::config("group-by field name must not be empty"));
        }
        if matches!(self.input.delimiter, b'"' | b'\n' | b'\r') {
            return Err(AggError::config(format!(
                "invalid delimiter {:?}",
                self.input.delimiter as char
            )));
        }
        if self.performance.deadline == Some(Duration::ZERO) {
            return Err(AggError::config("deadline must be greater than zero"));
        }
        Ok(())
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            source: InputSource::Stdin,
            delimiter: b',',
        }
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            input: InputConfig::default(),
            ranking: RankingConfig {
                group_by: DEFAULT_GROUP_BY.to_string(),
                top_n: DEFAULT_TOP_N,
            },
            performance: PerformanceConfig {
                chunk_size: DEFAULT_CHUNK_SIZE,
                pool_size: None,
                pending_chunks: DEFAULT_PENDING_CHUNKS,
                deadline: None,
            },
        }
    }
}

/// Parse a delimiter argument: a single byte, or `tab` / `\t`
pub fn parse_delimiter(value: &str) -> Result<u8, AggError> {
    match value {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        other if other.len() == 1 => Ok(other.as_bytes()[0]),
        other => Err(AggError::config(format!(
            "delimiter must be a single byte, got '{}'",
            other
        ))),
    }
}
