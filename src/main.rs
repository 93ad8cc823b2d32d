//! rirset - Minimal CIDR rule-sets from RIR delegation feeds.

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use rirset::cli::{Cli, Commands};
use rirset::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    // Logs go to stderr so `collapse` output can be piped
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Generate(args) => rirset::commands::generate::run(args, &cli.config).await,
        Commands::Collapse { input } => rirset::commands::collapse::run(input.as_deref()),
        Commands::Config => {
            print!("{}", Config::generate_default_yaml());
            Ok(())
        }
        Commands::Version => {
            println!("rirset {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
