// Command-line interface definitions for the chunkagg binary

use std::path::PathBuf;
use std::time::Duration;

use chunkagg::config::{parse_delimiter, AggregatorConfig, InputSource, OutputFormat};
use chunkagg::config_file::ConfigFile;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "chunkagg")]
#[command(about = "Count records per field value in chunks across a worker pool and print the top N")]
#[command(
    long_about = "Count records per field value in chunks across a worker pool and print the top N\n\nThe input is a delimited file with a header row, optionally gzip or zstd compressed.\nRecords are read in fixed-size chunks, counted in parallel and merged into one exact total.\n\nCOMMON EXAMPLES:\n  chunkagg messages.csv\n  chunkagg -g sender -t 20 -j 8 messages.csv.gz\n  zcat messages.csv.gz | chunkagg -F json -"
)]
#[command(version)]
#[command(args_override_self = true)]
pub struct Cli {
    /// Input file, or "-" for stdin
    pub input: String,

    /// Field separator: a single byte, or "tab"
    #[arg(short = 'd', long = "delimiter", value_parser = parse_delimiter_arg, help_heading = "Input Options")]
    pub delimiter: Option<u8>,

    /// Field whose values are counted
    #[arg(short = 'g', long = "group-by", help_heading = "Aggregation Options")]
    pub group_by: Option<String>,

    /// Number of entries to print
    #[arg(short = 't', long = "top", help_heading = "Aggregation Options")]
    pub top: Option<usize>,

    /// Records per chunk
    #[arg(short = 'c', long = "chunk-size", help_heading = "Performance Options")]
    pub chunk_size: Option<usize>,

    /// Worker threads (default: number of CPUs)
    #[arg(short = 'j', long = "threads", help_heading = "Performance Options")]
    pub threads: Option<usize>,

    /// Chunks buffered beyond the worker count before reading pauses
    #[arg(long = "pending-chunks", help_heading = "Performance Options")]
    pub pending_chunks: Option<usize>,

    /// Abort if reading and mapping take longer than this (e.g. "30s", "2m")
    #[arg(long = "timeout", value_parser = humantime::parse_duration, help_heading = "Performance Options")]
    pub timeout: Option<Duration>,

    /// Output format
    #[arg(
        short = 'F',
        long = "output-format",
        value_enum,
        default_value = "default",
        help_heading = "Output Options"
    )]
    pub output_format: OutputFormat,

    /// Print processing statistics to stderr
    #[arg(short = 's', long = "stats", help_heading = "Output Options")]
    pub stats: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Output Options")]
    pub verbose: u8,

    /// Read settings from this file instead of searching for .chunkaggrc
    #[arg(long = "config-file", help_heading = "Configuration Options")]
    pub config_file: Option<PathBuf>,

    /// Do not load any configuration file
    #[arg(long = "ignore-config", conflicts_with = "config_file", help_heading = "Configuration Options")]
    pub ignore_config: bool,
}

fn parse_delimiter_arg(value: &str) -> Result<u8, String> {
    parse_delimiter(value).map_err(|e| e.to_string())
}

impl Cli {
    /// Build the run configuration: defaults, then the config file, then flags
    pub fn to_config(&self, file: &ConfigFile) -> AggregatorConfig {
        let mut config = AggregatorConfig::default();
        file.apply_to(&mut config);

        config.input.source = InputSource::from_arg(&self.input);
        if let Some(delimiter) = self.delimiter {
            config.input.delimiter = delimiter;
        }
        if let Some(group_by) = &self.group_by {
            config.ranking.group_by = group_by.clone();
        }
        if let Some(top) = self.top {
            config.ranking.top_n = top;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.performance.chunk_size = chunk_size;
        }
        if let Some(threads) = self.threads {
            config.performance.pool_size = Some(threads);
        }
        if let Some(pending) = self.pending_chunks {
            config.performance.pending_chunks = pending;
        }
        if let Some(timeout) = self.timeout {
            config.performance.deadline = Some(timeout);
        }
        config
    }
}
