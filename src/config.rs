//! # Configuration Module
//!
//! Runtime configuration for the exporter, plus the two input validators the
//! CLI relies on: capacity-string parsing for the size threshold and
//! endpoint URL validation for the gateway list.

use crate::client::Credentials;
use tracing::warn;
use url::Url;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 9198;

/// Default bucket size threshold for per-bucket reporting, human readable.
pub const DEFAULT_MIN_BUCKET_SIZE: &str = "1Mb";

/// Default object count threshold for per-bucket reporting.
pub const DEFAULT_MIN_OBJECT_COUNT: u64 = 1;

/// Validated settings the collection engine runs with.
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoints: Vec<Url>,
    pub credentials: Credentials,
    pub threshold_size: u64,
    pub threshold_objects: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid size '{0}' - expecting <int><suffix> format")]
    InvalidCapacity(String),
    #[error("invalid capacity suffix '{0}' - must be one of: k,kb,kib,m,mb,mib,g,gb,gib,t,tb,tib")]
    InvalidCapacitySuffix(String),
    #[error("no valid endpoints provided")]
    NoValidEndpoints,
}

/// Parses a human readable capacity like `1Mb` or `10GiB` into bytes.
///
/// Decimal suffixes (k, kb, mb, ...) are powers of 1000, binary suffixes
/// (kib, mib, ...) are powers of 1024. The suffix is required.
pub fn parse_capacity(text: &str) -> Result<u64, ConfigError> {
    let trimmed = text.trim();
    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (number, suffix) = trimmed.split_at(digits_end);

    if number.is_empty() || suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ConfigError::InvalidCapacity(text.to_string()));
    }

    let multiplier: u64 = match suffix.to_ascii_lowercase().as_str() {
        "k" | "kb" => 1_000,
        "kib" => 1 << 10,
        "m" | "mb" => 1_000_000,
        "mib" => 1 << 20,
        "g" | "gb" => 1_000_000_000,
        "gib" => 1 << 30,
        "t" | "tb" => 1_000_000_000_000,
        "tib" => 1u64 << 40,
        _ => return Err(ConfigError::InvalidCapacitySuffix(suffix.to_string())),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| ConfigError::InvalidCapacity(text.to_string()))?;
    value
        .checked_mul(multiplier)
        .ok_or_else(|| ConfigError::InvalidCapacity(text.to_string()))
}

/// Keeps the candidate URLs that parse and use http or https, dropping the
/// rest with a warning. Errors only when nothing survives.
pub fn validate_endpoints(candidates: &[String]) -> Result<Vec<Url>, ConfigError> {
    let mut valid = Vec::new();
    for candidate in candidates {
        match Url::parse(candidate.trim()) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => valid.push(url),
            _ => warn!("dropping invalid endpoint URL '{candidate}'"),
        }
    }
    if valid.is_empty() {
        return Err(ConfigError::NoValidEndpoints);
    }
    Ok(valid)
}
