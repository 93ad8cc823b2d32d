//! Generate command implementation.

use anyhow::{Context, Result};
use ipnet::IpNet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::aggregator::{collapse, count_ips};
use crate::cli::GenerateArgs;
use crate::compiler::{CommandExecutor, RuleSetCompiler};
use crate::config::Config;
use crate::delegation::{interpret, AddressFamily};
use crate::fetcher::{read_local_lines, Fetcher};
use crate::lock::LockGuard;
use crate::ruleset::{RuleSetKind, RuleSetWriter};

/// One logical rule-set ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSetOutput {
    pub kind: RuleSetKind,
    pub cidrs: Vec<String>,
}

fn to_strings(nets: &[IpNet]) -> Vec<String> {
    nets.iter().map(|n| n.to_string()).collect()
}

/// Interpret and collapse a feed into every configured rule-set.
///
/// Produces, in order: raw IPv4, (merged IPv4), raw IPv6, (merged IPv6) and
/// the combined set. The combined set is the concatenation of the two
/// independently collapsed families.
pub fn build_outputs<S: AsRef<str>>(lines: &[S], config: &Config) -> Result<Vec<RuleSetOutput>> {
    let mut outputs = Vec::new();
    let mut combined: Vec<IpNet> = Vec::new();

    for family in AddressFamily::ALL {
        let filter = config.record_filter(family);
        let interpretation = interpret(lines, &filter, config.on_invalid_record)
            .with_context(|| format!("Failed to interpret {} records", filter.marker()))?;

        if interpretation.blocks.is_empty() {
            warn!("No records matched {}", filter.marker());
        }

        let merged = collapse(&interpretation.blocks);
        info!(
            "{}: {} records -> {} blocks ({} addresses), {} skipped",
            family,
            interpretation.blocks.len(),
            merged.len(),
            count_ips(&merged),
            interpretation.skipped
        );

        outputs.push(RuleSetOutput {
            kind: RuleSetKind::Raw(family),
            cidrs: interpretation.cidrs(),
        });
        if config.merged_per_family {
            outputs.push(RuleSetOutput {
                kind: RuleSetKind::Merged(family),
                cidrs: to_strings(&merged),
            });
        }
        combined.extend(merged);
    }

    outputs.push(RuleSetOutput {
        kind: RuleSetKind::Combined,
        cidrs: to_strings(&combined),
    });

    Ok(outputs)
}

/// Apply command-line overrides and re-validate
pub fn apply_overrides(config: &mut Config, args: &GenerateArgs) -> Result<()> {
    if let Some(ref registry) = args.registry {
        config.registry = registry.to_ascii_lowercase();
    }
    if let Some(ref economy) = args.economy {
        config.economy = economy.clone();
    }
    if let Some(ref url) = args.url {
        config.source_url = Some(url.clone());
    }
    if let Some(ref output) = args.output {
        config.output_dir = output.clone();
    }
    if args.no_compile {
        config.compile.enabled = false;
    }
    config.normalize()
}

/// Write every output and return the written paths
pub fn write_outputs(
    writer: &RuleSetWriter,
    stem: &str,
    outputs: &[RuleSetOutput],
) -> Result<Vec<(RuleSetKind, PathBuf)>> {
    outputs
        .iter()
        .map(|output| {
            let path = writer.write(&output.kind.json_file_name(stem), &output.cidrs)?;
            info!("Wrote {} rule-set: {:?} ({} entries)", output.kind, path, output.cidrs.len());
            Ok((output.kind, path))
        })
        .collect()
}

/// Compile every written rule-set, continuing past failures.
///
/// Returns an error naming every rule-set that failed to compile.
pub fn compile_outputs<E: CommandExecutor>(
    compiler: &RuleSetCompiler<E>,
    output_dir: &Path,
    stem: &str,
    written: &[(RuleSetKind, PathBuf)],
) -> Result<Vec<PathBuf>> {
    let mut compiled = Vec::new();
    let mut failures = Vec::new();

    for (kind, source) in written {
        let target = output_dir.join(kind.binary_file_name(stem));
        match compiler.compile(source, &target) {
            Ok(()) => compiled.push(target),
            Err(e) => {
                error!("Failed to compile {} rule-set: {}", kind, e);
                failures.push(kind.to_string());
            }
        }
    }

    if !failures.is_empty() {
        anyhow::bail!(
            "{} of {} rule-sets failed to compile: {}",
            failures.len(),
            written.len(),
            failures.join(", ")
        );
    }

    Ok(compiled)
}

/// Run the generate command
pub async fn run(args: GenerateArgs, config_path: &Path) -> Result<()> {
    let mut config = Config::load_or_default(config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    apply_overrides(&mut config, &args)?;

    let lines = match args.input {
        Some(ref path) => read_local_lines(path)?,
        None => {
            let fetcher = Fetcher::new(Duration::from_secs(config.timeout_secs))?;
            fetcher.fetch_lines(&config.feed_url()).await?
        }
    };

    let outputs = build_outputs(&lines, &config)?;

    if args.dry_run {
        for output in &outputs {
            info!("[dry-run] {} rule-set: {} entries", output.kind, output.cidrs.len());
        }
        return Ok(());
    }

    let _lock = LockGuard::acquire(&config.output_dir)?;

    let stem = config.file_stem();
    let writer = RuleSetWriter::new(&config.output_dir, config.ruleset_version);
    let written = write_outputs(&writer, &stem, &outputs)?;

    let mut compiled = Vec::new();
    if config.compile.enabled {
        let compiler = RuleSetCompiler::new(&config.compile.binary);
        compiled = compile_outputs(&compiler, &config.output_dir, &stem, &written)?;
    }

    println!();
    println!(
        "[OK] {} rule-sets written, {} compiled, in {:?}",
        written.len(),
        compiled.len(),
        config.output_dir
    );

    Ok(())
}
