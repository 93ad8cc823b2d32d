//! sing-box source rule-set documents.
//!
//! A source rule-set is a small JSON document:
//!
//! ```text
//! {
//!     "version": 3,
//!     "rules": [
//!         {
//!             "ip_cidr": ["1.0.1.0/24", "2001:250::/35"]
//!         }
//!     ]
//! }
//! ```
//!
//! `sing-box rule-set compile` turns it into the binary `.srs` form.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::delegation::AddressFamily;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub version: u8,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub ip_cidr: Vec<String>,
}

impl RuleSet {
    /// A rule-set with a single `ip_cidr` rule
    pub fn new(version: u8, cidrs: Vec<String>) -> Self {
        Self {
            version,
            rules: vec![Rule { ip_cidr: cidrs }],
        }
    }

    /// Every CIDR across all rules
    pub fn cidrs(&self) -> impl Iterator<Item = &str> {
        self.rules
            .iter()
            .flat_map(|rule| rule.ip_cidr.iter().map(String::as_str))
    }

    /// Pretty-printed JSON with four-space indentation
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)
            .context("Failed to serialize rule-set")?;
        buf.push(b'\n');
        String::from_utf8(buf).context("Rule-set JSON is not valid UTF-8")
    }

    /// Load a source rule-set from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rule-set: {:?}", path))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse rule-set: {:?}", path))
    }
}

/// The logical rule-sets produced for one registry and economy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleSetKind {
    /// Uncollapsed blocks of one family, kept for audit
    Raw(AddressFamily),
    /// Collapsed blocks of one family
    Merged(AddressFamily),
    /// Collapsed IPv4 followed by collapsed IPv6
    Combined,
}

impl RuleSetKind {
    /// File stem for this kind, e.g. `apnic_cn_ipv4` or `apnic_cn_merged`
    pub fn stem(&self, prefix: &str) -> String {
        match self {
            RuleSetKind::Raw(family) => format!("{}_{}", prefix, family),
            RuleSetKind::Merged(family) => format!("{}_{}_merged", prefix, family),
            RuleSetKind::Combined => format!("{}_merged", prefix),
        }
    }

    pub fn json_file_name(&self, prefix: &str) -> String {
        format!("{}.json", self.stem(prefix))
    }

    pub fn binary_file_name(&self, prefix: &str) -> String {
        format!("{}.srs", self.stem(prefix))
    }
}

impl fmt::Display for RuleSetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleSetKind::Raw(family) => write!(f, "raw {}", family),
            RuleSetKind::Merged(family) => write!(f, "merged {}", family),
            RuleSetKind::Combined => f.write_str("combined"),
        }
    }
}

/// Writes rule-set documents into one output directory
#[derive(Debug, Clone)]
pub struct RuleSetWriter {
    output_dir: PathBuf,
    version: u8,
}

impl RuleSetWriter {
    pub fn new(output_dir: impl Into<PathBuf>, version: u8) -> Self {
        Self {
            output_dir: output_dir.into(),
            version,
        }
    }

    /// Write `cidrs` as `<output_dir>/<file_name>` and return the path
    ///
    /// Uses tempfile + rename so a crash never leaves a truncated document.
    pub fn write(&self, file_name: &str, cidrs: &[String]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("Failed to create output directory {:?}", self.output_dir))?;

        let path = self.output_dir.join(file_name);
        let content = RuleSet::new(self.version, cidrs.to_vec()).to_json()?;

        let mut temp_file = NamedTempFile::new_in(&self.output_dir)
            .context("Failed to create temporary file for rule-set")?;
        temp_file.write_all(content.as_bytes())?;
        temp_file.as_file().sync_all()?;
        temp_file
            .persist(&path)
            .with_context(|| format!("Failed to persist rule-set {:?}", path))?;

        debug!("Wrote {} entries to {:?}", cidrs.len(), path);
        Ok(path)
    }
}
