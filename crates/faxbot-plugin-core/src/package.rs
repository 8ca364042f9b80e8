use std::{fs, path::Path};

use faxbot_plugin_sdk::MANIFEST_FILE;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use walkdir::{DirEntry, WalkDir};

use crate::{
    compliance::ComplianceScanner,
    config::{ScanConfig, ValidatorConfig},
    manifest::validate_manifest,
    schema::SchemaValidator,
};

/// Outcome of validating one plugin package. `valid` is false as soon as
/// any error is recorded; warnings never affect it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Source files run through the compliance scanner.
    #[serde(default)]
    pub scanned_files: usize,
    /// Source files (or walk entries) that could not be read.
    #[serde(default)]
    pub skipped_files: usize,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            scanned_files: 0,
            skipped_files: 0,
        }
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.valid = false;
        self.errors.push(error.into());
    }

    pub fn add_errors(&mut self, errors: impl IntoIterator<Item = String>) {
        for error in errors {
            self.add_error(error);
        }
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs the manifest, config-schema and compliance checks over a package
/// directory and aggregates their findings.
#[derive(Debug, Default)]
pub struct PackageValidator {
    scan: ScanConfig,
    schema: SchemaValidator,
    scanner: ComplianceScanner,
}

impl PackageValidator {
    pub fn new(config: &ValidatorConfig) -> Self {
        Self {
            scan: config.scan.clone(),
            schema: SchemaValidator::from_config(&config.schema),
            scanner: ComplianceScanner::from_config(&config.compliance),
        }
    }

    pub fn with_scanner(mut self, scanner: ComplianceScanner) -> Self {
        self.scanner = scanner;
        self
    }

    /// Always returns a report; problems inside the package never escape
    /// as errors.
    pub fn validate(&self, dir: &Path) -> ValidationReport {
        let mut report = ValidationReport::new();
        self.check_manifest(dir, &mut report);
        if dir.is_dir() {
            self.scan_sources(dir, &mut report);
        }

        let outcome = if report.valid { "valid" } else { "invalid" };
        metrics::counter!("faxbot_plugin_packages_validated_total", "outcome" => outcome)
            .increment(1);
        metrics::counter!("faxbot_plugin_files_scanned_total")
            .increment(report.scanned_files as u64);
        tracing::info!(
            package = %dir.display(),
            valid = report.valid,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            skipped = report.skipped_files,
            "plugin package validated"
        );
        report
    }

    fn check_manifest(&self, dir: &Path, report: &mut ValidationReport) {
        let path = dir.join(MANIFEST_FILE);
        if !path.is_file() {
            report.add_error(format!("Missing required file: {MANIFEST_FILE}"));
            return;
        }
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) => {
                report.add_error(format!("Failed to read {MANIFEST_FILE}: {err}"));
                return;
            }
        };
        let manifest: Value = match serde_json::from_str(&raw) {
            Ok(manifest) => manifest,
            Err(err) => {
                report.add_error(format!("Failed to parse {MANIFEST_FILE}: {err}"));
                return;
            }
        };

        report.add_errors(validate_manifest(&manifest));
        if let Some(schema) = manifest.get("config_schema").filter(|s| !s.is_null()) {
            report.add_errors(self.schema.validate(schema));
        }
    }

    fn scan_sources(&self, dir: &Path, report: &mut ValidationReport) {
        // Symlinked sources are scanned as their targets; link loops surface
        // as walk errors and count as skipped.
        let walker = WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_skipped_dir(entry));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(error = %err, "skipping unreadable entry");
                    report.skipped_files += 1;
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !self.scan.is_source_file(&name) {
                continue;
            }
            match self.read_source(&entry) {
                Some(code) => {
                    report.scanned_files += 1;
                    for warning in self.scanner.scan(&code) {
                        report.add_warning(format!("{name}: {warning}"));
                    }
                }
                None => report.skipped_files += 1,
            }
        }
    }

    fn is_skipped_dir(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && self
                .scan
                .skip_dirs
                .iter()
                .any(|skip| entry.file_name() == skip.as_str())
    }

    /// File contents, lossily decoded; `None` if unreadable or over the size limit.
    fn read_source(&self, entry: &DirEntry) -> Option<String> {
        if self.scan.max_file_bytes > 0 {
            let len = entry.metadata().ok()?.len();
            if len > self.scan.max_file_bytes {
                tracing::debug!(file = %entry.path().display(), len, "source file over size limit");
                return None;
            }
        }
        match fs::read(entry.path()) {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(err) => {
                tracing::debug!(file = %entry.path().display(), error = %err, "skipping unreadable file");
                None
            }
        }
    }
}

/// [`PackageValidator::validate`] with default configuration.
pub fn validate_plugin_package(dir: impl AsRef<Path>) -> ValidationReport {
    PackageValidator::default().validate(dir.as_ref())
}
