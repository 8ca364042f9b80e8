use std::sync::OnceLock;

use faxbot_plugin_sdk::Category;
use regex::Regex;
use serde_json::Value;

pub const REQUIRED_FIELDS: &[&str] = &[
    "id",
    "name",
    "version",
    "description",
    "author",
    "categories",
    "capabilities",
];

/// Structural checks over an untyped manifest. Every check runs; the
/// returned list is empty when the manifest is valid.
pub fn validate_manifest(manifest: &Value) -> Vec<String> {
    static ID: OnceLock<Regex> = OnceLock::new();
    static VERSION: OnceLock<Regex> = OnceLock::new();
    let id_re = ID.get_or_init(|| Regex::new(r"^[a-z0-9-]+$").unwrap());
    let version_re = VERSION.get_or_init(|| Regex::new(r"^\d+\.\d+\.\d+").unwrap());

    let mut errors = Vec::new();
    let field = |name: &str| manifest.get(name).filter(|v| !v.is_null());

    for name in REQUIRED_FIELDS {
        if manifest.get(name).is_none() {
            errors.push(format!("Missing required field: {name}"));
        }
    }

    if let Some(id) = field("id") {
        if !id_re.is_match(&scalar_text(id)) {
            errors.push("ID must be lowercase letters, numbers, and hyphens only".to_string());
        }
    }

    if let Some(version) = field("version") {
        if !version_re.is_match(&scalar_text(version)) {
            errors.push("Version must be semver format (e.g., 1.0.0)".to_string());
        }
    }

    let categories = field("categories").and_then(Value::as_array);
    if let Some(categories) = categories {
        for category in categories {
            if parse_category(category).is_none() {
                errors.push(format!("Invalid category: {}", scalar_text(category)));
            }
        }
    }

    let capabilities = field("capabilities").and_then(Value::as_array);
    if let (Some(categories), Some(capabilities)) = (categories, capabilities) {
        let declared: Vec<&str> = capabilities.iter().filter_map(Value::as_str).collect();
        for category in categories.iter().filter_map(parse_category) {
            let required = category.required_capabilities();
            if required.is_empty() {
                continue;
            }
            if !required.iter().any(|cap| declared.contains(cap)) {
                errors.push(format!(
                    "Category {category} requires at least one of: {}",
                    required.join(", ")
                ));
            }
        }
    }

    errors
}

fn parse_category(value: &Value) -> Option<Category> {
    value.as_str()?.parse().ok()
}

/// Strings are used verbatim; any other JSON value uses its compact encoding.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
