use std::collections::HashSet;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::compliance::BUILTIN_RULES;

pub const DEFAULT_SOURCE_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "ts", "py"];

/// Field-name tokens a plugin config schema must not mention.
pub const DEFAULT_PHI_FIELDS: &[&str] = &[
    "ssn",
    "social_security",
    "patient_name",
    "dob",
    "date_of_birth",
];

/// Root validator configuration deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ValidatorConfig {
    pub scan: ScanConfig,
    pub schema: SchemaConfig,
    pub compliance: ComplianceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScanConfig {
    /// File extensions (without the dot) treated as plugin source.
    pub extensions: Vec<String>,
    /// Directory names never descended into.
    pub skip_dirs: Vec<String>,
    /// Files larger than this are skipped; 0 disables the limit.
    pub max_file_bytes: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_SOURCE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            skip_dirs: Vec::new(),
            max_file_bytes: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchemaConfig {
    pub phi_fields: Vec<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            phi_fields: DEFAULT_PHI_FIELDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ComplianceConfig {
    pub disabled_rules: Vec<String>,
}

impl ValidatorConfig {
    /// Validates structural invariants and provides actionable error messages.
    pub fn validate(&self) -> Result<()> {
        self.scan.validate()?;
        self.schema.validate()?;
        self.compliance.validate()?;
        Ok(())
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<()> {
        if self.extensions.is_empty() {
            bail!("scan.extensions must list at least one source extension");
        }
        let mut seen = HashSet::new();
        for ext in &self.extensions {
            if ext.is_empty() || ext.contains('.') || ext.chars().any(char::is_whitespace) {
                bail!("scan extension `{ext}` must be a bare extension such as `js`");
            }
            if !seen.insert(ext.to_ascii_lowercase()) {
                bail!("duplicate scan extension `{ext}`");
            }
        }
        if self.skip_dirs.iter().any(|d| d.trim().is_empty()) {
            bail!("scan.skip_dirs must not contain empty entries");
        }
        Ok(())
    }

    /// Case-insensitive extension match against the configured filter.
    pub fn is_source_file(&self, file_name: &str) -> bool {
        file_name
            .rsplit_once('.')
            .map(|(_, ext)| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

impl SchemaConfig {
    pub fn validate(&self) -> Result<()> {
        if self.phi_fields.is_empty() {
            bail!("schema.phi_fields must not be empty");
        }
        if self.phi_fields.iter().any(|f| f.trim().is_empty()) {
            bail!("schema.phi_fields must not contain empty entries");
        }
        Ok(())
    }
}

impl ComplianceConfig {
    pub fn validate(&self) -> Result<()> {
        for name in &self.disabled_rules {
            if !BUILTIN_RULES.contains(&name.as_str()) {
                bail!(
                    "unknown compliance rule `{name}` (known rules: {})",
                    BUILTIN_RULES.join(", ")
                );
            }
        }
        Ok(())
    }
}
