//! Validation engine for fax-gateway plugin packages.

pub mod compliance;
pub mod config;
pub mod manifest;
pub mod package;
pub mod schema;

pub use compliance::{check_hipaa_compliance, ComplianceScanner};
pub use config::ValidatorConfig;
pub use manifest::validate_manifest;
pub use package::{validate_plugin_package, PackageValidator, ValidationReport};
pub use schema::{validate_config_schema, SchemaValidator};

/// Returns the crate version baked in at compile time.
pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
