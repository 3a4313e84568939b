use anyhow::Context;
use clap::Parser;
use experiment_loggers::{get_experiment_loggers_with, init_tracing, LoggerSelection, ResolverOptions};
use std::fs;
use std::path::PathBuf;

/// Resolve the experiment loggers selected by a run configuration.
#[derive(Parser, Debug)]
#[command(name = "resolve-loggers", version, about)]
struct Args {
    /// Run configuration (YAML)
    #[arg(short, long)]
    config: PathBuf,

    /// Console log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Fail instead of creating missing log directories
    #[arg(long)]
    no_create_dirs: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let text = fs::read_to_string(&args.config)
        .with_context(|| format!("Failed to read {}", args.config.display()))?;
    let config: serde_yaml::Value = serde_yaml::from_str(&text)
        .with_context(|| format!("Failed to parse {}", args.config.display()))?;

    let options = ResolverOptions {
        create_log_dirs: !args.no_create_dirs,
    };
    let resolution = get_experiment_loggers_with(config, &options)?;

    match &resolution.loggers {
        LoggerSelection::Disabled => println!("Experiment logging: disabled"),
        LoggerSelection::Enabled(loggers) => {
            println!("Experiment loggers:");
            for (i, logger) in loggers.iter().enumerate() {
                println!(
                    "  {}: {:<12} {:<24} {}",
                    i,
                    logger.kind(),
                    logger.name(),
                    logger.log_dir().display()
                );
            }
        }
    }

    println!("\nConfiguration:");
    print!("{}", serde_yaml::to_string(&resolution.config)?);
    Ok(())
}
