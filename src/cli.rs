use clap::{Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = r#"
{about}

{usage-heading} {usage}

{all-args}

{after-help}"#;

#[derive(Parser)]
#[command(name = "castellan")]
#[command(author, version)]
#[command(about = "Extracts a security-relevant fact index from a web-application source tree")]
#[command(after_help = "Examples:
  castellan scan .                        Scan the current directory
  castellan scan ./app -c castellan.toml  Scan with a config file
  castellan scan ./app -o artifact.json   Write the artifact to a file")]
#[command(help_template = HELP_TEMPLATE)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract the fact index for a source tree and emit it as JSON
    Scan {
        /// Root of the source tree to scan
        #[arg(default_value = ".")]
        target: PathBuf,

        /// Path to a TOML config file merged onto the defaults
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the artifact here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the emitted JSON
        #[arg(long)]
        pretty: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
