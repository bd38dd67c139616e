// rdl/src/main.rs
use std::fs;
use std::process;

use clap::Parser;
use colored::Colorize;
use rdl_common::config::Config;
use rdl_common::error::Result;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

mod cli;
use cli::CliArgs;

fn init_logging(config: &Config, verbose: u8) {
    let level_filter = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let max_log_level = level_filter.into_level().unwrap_or(tracing::Level::INFO);

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("RDL_LOG")
        .from_env_lossy();

    let log_dir = config.logs_dir();
    if verbose == 0 {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .without_time()
            .try_init();
        return;
    }

    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!(
            "{} Failed to create log directory {}: {}",
            "Warning:".yellow().bold(),
            log_dir.display(),
            e
        );
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .without_time()
            .try_init();
        return;
    }

    let file_appender = tracing_appender::rolling::daily(&log_dir, "rdl.log");
    let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);
    let stderr_writer = std::io::stderr.with_max_level(max_log_level);
    let file_writer = non_blocking_appender.with_max_level(max_log_level);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(stderr_writer.and(file_writer))
        .with_ansi(true)
        .without_time()
        .try_init();

    // Flushes on drop; must outlive every log call.
    Box::leak(Box::new(guard));

    debug!(
        "Verbose logging enabled. Writing logs to: {}/rdl.log",
        log_dir.display()
    );
}

fn load_config(cli_args: &CliArgs) -> Result<Config> {
    let mut config = Config::load()?;
    if let Some(data_dir) = &cli_args.data_dir {
        config.data_dir = data_dir.clone();
    }
    config.validate()?;
    Ok(config)
}

fn main() {
    let cli_args = CliArgs::parse();

    let config = match load_config(&cli_args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            process::exit(2);
        }
    };
    init_logging(&config, cli_args.verbose);

    if let Err(e) = cli_args.command.run(config) {
        error!("Command failed: {}", e);
        eprintln!("{}: {}", "Error".red().bold(), e);
        process::exit(1);
    }

    debug!("Command completed successfully.");
}
