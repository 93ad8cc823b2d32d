//! Collapse command implementation.

use anyhow::{Context, Result};
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::info;

use crate::aggregator::collapse_cidrs;
use crate::ruleset::RuleSet;

/// CIDR entries from plain text, one per line.
/// Blank lines and `#` comments are ignored.
pub fn parse_entries(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Read entries from a file; `.json` files are loaded as source rule-sets
pub fn read_entries(path: &Path) -> Result<Vec<String>> {
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        let ruleset = RuleSet::load(path)?;
        return Ok(ruleset.cidrs().map(String::from).collect());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    Ok(parse_entries(&content))
}

fn read_stdin() -> Result<Vec<String>> {
    let mut content = String::new();
    io::stdin()
        .read_to_string(&mut content)
        .context("Failed to read stdin")?;
    Ok(parse_entries(&content))
}

/// Run the collapse command
pub fn run(input: Option<&Path>) -> Result<()> {
    let entries = match input {
        Some(path) if path != Path::new("-") => read_entries(path)?,
        _ => read_stdin()?,
    };

    let merged = collapse_cidrs(&entries)?;
    info!("Collapsed {} entries into {}", entries.len(), merged.len());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for cidr in &merged {
        writeln!(out, "{}", cidr)?;
    }
    out.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_entries_skips_comments_and_blanks() {
        let content = "# header\n10.0.0.0/24\n\n  10.0.1.0/24  \n# trailing\n";
        assert_eq!(parse_entries(content), vec!["10.0.0.0/24", "10.0.1.0/24"]);
    }

    #[test]
    fn test_read_entries_plain_text() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cidrs.txt");
        std::fs::write(&path, "1.2.4.0/24\n1.2.5.0/24\n").unwrap();

        let entries = read_entries(&path).unwrap();
        assert_eq!(collapse_cidrs(&entries).unwrap(), vec!["1.2.4.0/23"]);
    }

    #[test]
    fn test_read_entries_ruleset_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("apnic_cn_ipv4.json");
        let ruleset = RuleSet::new(
            3,
            vec!["2001:db8::/33".to_string(), "2001:db8:8000::/33".to_string()],
        );
        std::fs::write(&path, ruleset.to_json().unwrap()).unwrap();

        let entries = read_entries(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(collapse_cidrs(&entries).unwrap(), vec!["2001:db8::/32"]);
    }

    #[test]
    fn test_read_entries_missing_file() {
        assert!(read_entries(Path::new("/nonexistent/cidrs.txt")).is_err());
    }

    #[test]
    fn test_run_rejects_invalid_entry() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cidrs.txt");
        std::fs::write(&path, "10.0.0.0/24\nnot-a-cidr\n").unwrap();
        assert!(run(Some(&path)).is_err());
    }

    #[test]
    fn test_run_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cidrs.txt");
        std::fs::write(&path, "10.0.0.0/24\n10.0.1.0/24\n").unwrap();
        assert!(run(Some(&path)).is_ok());
    }
}
