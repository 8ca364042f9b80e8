use serde_json::Value;

use crate::config::{SchemaConfig, DEFAULT_PHI_FIELDS};

/// Checks a plugin's declared configuration schema.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    phi_fields: Vec<String>,
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new(DEFAULT_PHI_FIELDS.iter().map(|s| s.to_string()))
    }
}

impl SchemaValidator {
    pub fn new(phi_fields: impl IntoIterator<Item = String>) -> Self {
        Self {
            phi_fields: phi_fields
                .into_iter()
                .map(|f| f.to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &SchemaConfig) -> Self {
        Self::new(config.phi_fields.iter().cloned())
    }

    /// A schema that does not compile yields exactly one error and skips
    /// the PHI scan. Otherwise each PHI token found anywhere in the
    /// serialized schema, keys or values, yields one error.
    pub fn validate(&self, schema: &Value) -> Vec<String> {
        if let Err(err) = jsonschema::draft7::new(schema) {
            return vec![format!("Invalid JSON Schema: {err}")];
        }
        let text = schema.to_string().to_ascii_lowercase();
        self.phi_fields
            .iter()
            .filter(|field| text.contains(field.as_str()))
            .map(|field| format!("Config schema cannot contain PHI field: {field}"))
            .collect()
    }
}

/// [`SchemaValidator::validate`] with the default PHI field list.
pub fn validate_config_schema(schema: &Value) -> Vec<String> {
    SchemaValidator::default().validate(schema)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_clean_schema() {
        let schema = json!({
            "type": "object",
            "required": ["api_key"],
            "properties": {
                "api_key": {"type": "string"},
                "region": {"type": "string", "enum": ["us", "eu"]}
            }
        });
        assert!(validate_config_schema(&schema).is_empty());
    }

    #[test]
    fn invalid_schema_short_circuits_phi_scan() {
        let schema = json!({
            "type": "strnig",
            "properties": {"ssn": {"type": "string"}}
        });
        let errors = validate_config_schema(&schema);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Invalid JSON Schema: "));
    }

    #[test]
    fn flags_phi_field_names_case_insensitively() {
        let schema = json!({
            "type": "object",
            "properties": {"Patient_SSN": {"type": "string"}}
        });
        assert_eq!(
            validate_config_schema(&schema),
            vec!["Config schema cannot contain PHI field: ssn".to_string()]
        );
    }

    #[test]
    fn one_error_per_matching_token() {
        let schema = json!({
            "type": "object",
            "properties": {
                "date_of_birth": {"type": "string"},
                "patient_name": {"type": "string"}
            }
        });
        let errors = validate_config_schema(&schema);
        assert_eq!(
            errors,
            vec![
                "Config schema cannot contain PHI field: patient_name".to_string(),
                "Config schema cannot contain PHI field: date_of_birth".to_string(),
            ]
        );
    }

    #[test]
    fn values_trigger_the_textual_scan_too() {
        let schema = json!({
            "type": "object",
            "properties": {"mode": {"type": "string", "description": "never store the DOB"}}
        });
        assert_eq!(validate_config_schema(&schema).len(), 1);
    }

    #[test]
    fn custom_field_list_replaces_defaults() {
        let validator = SchemaValidator::new(["MRN".to_string()]);
        let schema = json!({"properties": {"mrn": {"type": "string"}, "ssn": {}}});
        assert_eq!(
            validator.validate(&schema),
            vec!["Config schema cannot contain PHI field: mrn".to_string()]
        );
    }
}
