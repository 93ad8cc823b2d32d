//! Configuration management for rirset.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::delegation::{AddressFamily, InvalidRecordPolicy, RecordFilter};
use crate::validation::{normalize_economy, validate_registry, validate_source_url};

/// Rule-set format version written by default (sing-box 1.11+)
pub const DEFAULT_RULESET_VERSION: u8 = 3;

/// Highest rule-set format version sing-box understands
const MAX_RULESET_VERSION: u8 = 3;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Registry whose records are selected (afrinic, apnic, arin, lacnic, ripencc)
    pub registry: String,

    /// Two-letter economy code, e.g. CN
    pub economy: String,

    /// Delegation feed URL; defaults to the registry's published "latest" file
    pub source_url: Option<String>,

    /// HTTP timeout for fetching the feed
    pub timeout_secs: u64,

    /// Directory receiving the rule-set JSON and compiled artifacts
    pub output_dir: PathBuf,

    /// Accepted record statuses (allocated, assigned); empty accepts all
    pub statuses: Vec<String>,

    /// What to do with records whose size or address cannot be interpreted
    pub on_invalid_record: InvalidRecordPolicy,

    /// Rule-set document version
    pub ruleset_version: u8,

    /// Also write collapsed per-family rule-sets next to the combined one
    pub merged_per_family: bool,

    /// Binary rule-set compilation
    pub compile: CompileConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry: "apnic".to_string(),
            economy: "CN".to_string(),
            source_url: None,
            timeout_secs: 30,
            output_dir: PathBuf::from("rules"),
            statuses: Vec::new(),
            on_invalid_record: InvalidRecordPolicy::Skip,
            ruleset_version: DEFAULT_RULESET_VERSION,
            merged_per_family: false,
            compile: CompileConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CompileConfig {
    pub enabled: bool,
    /// sing-box executable, looked up on PATH when not absolute
    pub binary: String,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            binary: "sing-box".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;

        config.normalize()?;

        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is missing
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            debug!(
                "Config file {:?} not found, using defaults",
                path.as_ref()
            );
            Ok(Self::default())
        }
    }

    /// Validate configuration values and upper-case the economy code
    pub fn normalize(&mut self) -> Result<()> {
        self.validate()?;
        self.economy = normalize_economy(&self.economy)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        validate_registry(&self.registry)?;
        normalize_economy(&self.economy)?;

        if let Some(ref url) = self.source_url {
            validate_source_url(url)?;
        }

        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than zero");
        }

        if self.output_dir.as_os_str().is_empty() {
            anyhow::bail!("output_dir cannot be empty");
        }

        if self.ruleset_version == 0 || self.ruleset_version > MAX_RULESET_VERSION {
            anyhow::bail!(
                "Invalid ruleset_version {}. Valid values: 1..={}",
                self.ruleset_version,
                MAX_RULESET_VERSION
            );
        }

        if self.compile.enabled && self.compile.binary.trim().is_empty() {
            anyhow::bail!("compile.binary cannot be empty when compilation is enabled");
        }

        Ok(())
    }

    /// Save configuration to YAML file atomically
    ///
    /// Uses tempfile + rename pattern to prevent corruption on crash.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let path = path.as_ref();
        let content = serde_yaml::to_string(self).with_context(|| "Failed to serialize config")?;

        let parent_dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut temp_file = NamedTempFile::new_in(parent_dir)
            .context("Failed to create temporary file for config")?;

        temp_file.write_all(content.as_bytes())?;
        temp_file.as_file().sync_all()?;

        temp_file
            .persist(path)
            .with_context(|| format!("Failed to persist config file: {:?}", path))?;

        Ok(())
    }

    /// Effective feed URL
    pub fn feed_url(&self) -> String {
        match self.source_url {
            Some(ref url) => url.clone(),
            None => default_source_url(&self.registry),
        }
    }

    /// Record filter for one family
    pub fn record_filter(&self, family: AddressFamily) -> RecordFilter {
        RecordFilter::new(&self.registry, &self.economy, family).with_statuses(self.statuses.clone())
    }

    /// Common file name prefix, e.g. `apnic_cn`
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.registry, self.economy.to_ascii_lowercase())
    }

    /// Generate default config with comments
    pub fn generate_default_yaml() -> String {
        include_str!("../templates/config.yaml").to_string()
    }
}

/// Published "latest" delegation file of a registry
pub fn default_source_url(registry: &str) -> String {
    let path = match registry {
        "afrinic" => "ftp.afrinic.net/pub/stats/afrinic/delegated-afrinic-latest",
        "arin" => "ftp.arin.net/pub/stats/arin/delegated-arin-extended-latest",
        "lacnic" => "ftp.lacnic.net/pub/stats/lacnic/delegated-lacnic-latest",
        "ripencc" => "ftp.ripe.net/pub/stats/ripencc/delegated-ripencc-latest",
        _ => "ftp.apnic.net/stats/apnic/delegated-apnic-latest",
    };
    format!("https://{}", path)
}
