use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default bound on the nesting depth of a package stack, counted in links
/// along the root-to-leaf path.
pub const DEFAULT_MAX_PACKAGE_DEPTH: u32 = 5;

/// Default decimal precision ("Product Unit of Measure") used when comparing
/// quantities during fulfillment checks.
pub const DEFAULT_UNIT_PRECISION_DIGITS: u32 = 3;

/// Validation settings resolved per operating context (warehouse/profile).
///
/// The caller resolves this once per triggering transaction and threads it
/// into every validation call; nothing in the crate reads ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Maximum allowed package nesting depth.
    #[serde(default = "default_max_package_depth")]
    pub max_package_depth: u32,
    /// Decimal digits considered significant when comparing quantities.
    #[serde(default = "default_unit_precision_digits")]
    pub unit_precision_digits: u32,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_package_depth: default_max_package_depth(),
            unit_precision_digits: default_unit_precision_digits(),
        }
    }
}

const fn default_max_package_depth() -> u32 {
    DEFAULT_MAX_PACKAGE_DEPTH
}

const fn default_unit_precision_digits() -> u32 {
    DEFAULT_UNIT_PRECISION_DIGITS
}

/// Load a [`ValidationConfig`] from a TOML file.
///
/// A missing file yields the defaults; a present but malformed file is an
/// error (so a typo does not silently reset the warehouse limits).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_validation_config(path: &Path) -> Result<ValidationConfig> {
    if !path.exists() {
        return Ok(ValidationConfig::default());
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read config file {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parse config file {}", path.display()))
}
