use std::io::{self, BufWriter};

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use chunkagg::config_file::ConfigFile;
use chunkagg::formatters::render_ranking;
use chunkagg::Coordinator;

mod cli;
mod platform;

use cli::Cli;
use platform::ExitCode;

/// Environment variable holding a tracing filter; overrides `-v`
const LOG_ENV: &str = "CHUNKAGG_LOG";

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(format!("chunkagg={}", default_level)));

    // Only fails if a subscriber is already installed; keep that one
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

fn run(cli: &Cli) -> Result<()> {
    let file_config = if cli.ignore_config {
        ConfigFile::default()
    } else {
        ConfigFile::load_with_custom_path(cli.config_file.as_deref())?
    };
    let config = cli.to_config(&file_config);

    let mut coordinator = Coordinator::new(config);
    let report = coordinator.run()?;

    let stdout = io::stdout();
    render_ranking(
        cli.output_format,
        &coordinator.config().ranking.group_by,
        &report.ranked,
        BufWriter::new(stdout.lock()),
    )?;

    eprintln!(
        "Found {} entries in {:.2} seconds",
        report.ranked.len(),
        report.elapsed.as_secs_f64()
    );
    if cli.stats {
        eprintln!("{}", report.stats.format_stats());
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("chunkagg: Error: {}", e);
        ExitCode::for_error(&e).exit();
    }
    ExitCode::Success.exit();
}
