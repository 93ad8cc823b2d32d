//! Centralized validation functions for rirset.
//!
//! This module provides unified validation for:
//! - Registry names
//! - Economy codes
//! - Feed source URLs

use anyhow::{bail, Result};

/// Registries publishing delegation files in the shared format
pub const VALID_REGISTRIES: &[&str] = &["afrinic", "apnic", "arin", "lacnic", "ripencc"];

/// Validate a registry name.
///
/// # Examples
/// ```
/// use rirset::validation::validate_registry;
/// assert!(validate_registry("apnic").is_ok());
/// assert!(validate_registry("APNIC").is_err());
/// ```
pub fn validate_registry(registry: &str) -> Result<()> {
    if !VALID_REGISTRIES.contains(&registry) {
        bail!(
            "Invalid registry '{}'. Valid values: {}",
            registry,
            VALID_REGISTRIES.join(", ")
        );
    }
    Ok(())
}

/// Validate an economy code and return it upper-cased, as the feeds spell it.
///
/// # Examples
/// ```
/// use rirset::validation::normalize_economy;
/// assert_eq!(normalize_economy("cn").unwrap(), "CN");
/// assert!(normalize_economy("CHN").is_err());
/// ```
pub fn normalize_economy(economy: &str) -> Result<String> {
    let trimmed = economy.trim();
    if trimmed.len() != 2 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        bail!(
            "Invalid economy code '{}'. Use a two-letter ISO 3166 code like 'CN'",
            economy
        );
    }
    Ok(trimmed.to_ascii_uppercase())
}

/// Validate that a feed URL uses HTTPS.
///
/// # Examples
/// ```
/// use rirset::validation::validate_source_url;
/// assert!(validate_source_url("https://ftp.apnic.net/stats/apnic/delegated-apnic-latest").is_ok());
/// assert!(validate_source_url("http://ftp.apnic.net/stats/apnic/delegated-apnic-latest").is_err());
/// ```
pub fn validate_source_url(url: &str) -> Result<()> {
    if !url.starts_with("https://") {
        bail!("Source URL must use HTTPS: {}", url);
    }
    if url.len() <= "https://".len() {
        bail!("Source URL has no host: {}", url);
    }
    if url.chars().any(|c| c.is_whitespace() || c.is_control()) {
        bail!("Source URL contains whitespace or control characters");
    }
    Ok(())
}
