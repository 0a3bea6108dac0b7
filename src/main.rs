//! `castellan` CLI entry point.

use std::fs;

use anyhow::Context;
use clap::Parser;
use castellan::cli::{Cli, Commands};
use castellan::core::config::ExtractionConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_env("CASTELLAN_LOG"))
        .init();

    let cli = Cli::parse_args();

    match cli.command {
        Commands::Scan { target, config, output, pretty } => {
            let extraction_config = load_config(config.as_deref())?.apply_env_overrides();

            let artifact = castellan::extract::run(&target, &extraction_config)
                .with_context(|| format!("scanning {}", target.display()))?;

            let rendered = if pretty {
                serde_json::to_string_pretty(&artifact)?
            } else {
                serde_json::to_string(&artifact)?
            };

            match output {
                Some(path) => fs::write(&path, rendered)
                    .with_context(|| format!("writing artifact to {}", path.display()))?,
                None => println!("{rendered}"),
            }

            Ok(())
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<ExtractionConfig> {
    let Some(path) = path else {
        return Ok(ExtractionConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))
}
