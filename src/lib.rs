//! # rirset - Minimal CIDR Rule-Sets from RIR Delegation Feeds
//!
//! Turns a Regional Internet Registry delegation file into the smallest
//! equivalent set of CIDR blocks for one economy, and publishes the result
//! as sing-box source rule-sets (optionally compiled to binary `.srs`).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        rirset                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CLI (clap)                                                 │
//! │    └── Commands: generate, collapse, config, version        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Config (serde_yaml)                                        │
//! │    └── Registry, economy, statuses, output, compile         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Fetcher (reqwest + rustls)                                 │
//! │    └── delegated-<registry>-latest, or a local file         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Delegation (record interpreter)                            │
//! │    └── registry|economy|family|start|value → CIDR block     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Aggregator (ipnet)                                         │
//! │    └── Range collapse into minimal aligned blocks           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  RuleSet (serde_json) + Compiler (sing-box)                 │
//! │    └── <prefix>_ipv4.json, <prefix>_merged.json, .srs       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use rirset::aggregator::collapse;
//! use rirset::config::Config;
//! use rirset::delegation::{interpret, AddressFamily};
//! use rirset::fetcher::Fetcher;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load_or_default("rirset.yaml")?;
//!
//!     let fetcher = Fetcher::new(Duration::from_secs(config.timeout_secs))?;
//!     let lines = fetcher.fetch_lines(&config.feed_url()).await?;
//!
//!     let filter = config.record_filter(AddressFamily::Ipv4);
//!     let interpretation = interpret(&lines, &filter, config.on_invalid_record)?;
//!     for block in collapse(&interpretation.blocks) {
//!         println!("{}", block);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`aggregator`] - Range collapse of CIDR blocks
//! - [`cli`] - Command-line interface definitions
//! - [`commands`] - CLI command implementations
//! - [`compiler`] - `sing-box rule-set compile` invocation
//! - [`config`] - Configuration parsing and validation
//! - [`delegation`] - Delegation record parsing and block derivation
//! - [`error`] - Error type for the interpretation and collapse core
//! - [`fetcher`] - HTTP client for downloading delegation feeds
//! - [`lock`] - File locking for concurrent execution prevention
//! - [`ruleset`] - Source rule-set documents
//! - [`validation`] - Input validation for registries, economies and URLs

pub mod aggregator;
pub mod cli;
pub mod commands;
pub mod compiler;
pub mod config;
pub mod delegation;
pub mod error;
pub mod fetcher;
pub mod lock;
pub mod ruleset;
pub mod validation;

pub use cli::{Cli, Commands, GenerateArgs};
pub use config::Config;
pub use error::{Result, RirsetError};
