//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rirset")]
#[command(author, version, about = "Minimal CIDR rule-sets from RIR delegation feeds")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path (defaults apply when the file does not exist)
    #[arg(short, long, default_value = "rirset.yaml", global = true)]
    pub config: PathBuf,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug output)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the delegation feed and write collapsed rule-sets
    Generate(GenerateArgs),

    /// Collapse CIDRs read from a file (one per line, or a rule-set JSON) or stdin
    Collapse {
        /// Input file; reads stdin when omitted or "-"
        input: Option<PathBuf>,
    },

    /// Print the default configuration file
    Config,

    /// Show version
    Version,
}

/// Overrides for the `generate` command; each one replaces the config value.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct GenerateArgs {
    /// Registry (afrinic, apnic, arin, lacnic, ripencc)
    #[arg(long)]
    pub registry: Option<String>,

    /// Two-letter economy code, e.g. CN
    #[arg(long, short)]
    pub economy: Option<String>,

    /// Read the feed from a local file instead of downloading it
    #[arg(long, short)]
    pub input: Option<PathBuf>,

    /// Feed URL (HTTPS)
    #[arg(long)]
    pub url: Option<String>,

    /// Output directory
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Skip `sing-box rule-set compile`
    #[arg(long)]
    pub no_compile: bool,

    /// Fetch and process but write nothing
    #[arg(long)]
    pub dry_run: bool,
}
