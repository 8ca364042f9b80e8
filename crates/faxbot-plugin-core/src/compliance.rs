//! Heuristic HIPAA lint over plugin source text.
//!
//! Rules are plain regular expressions run against the raw file contents.
//! They are deliberately permissive and do not parse the language, so both
//! false positives and misses are expected. Findings are advisory warnings
//! and never make a package invalid.

use std::{fmt, sync::OnceLock};

use regex::Regex;

use crate::config::ComplianceConfig;

pub const SSN_IN_LOG: &str = "ssn-in-log";
pub const PHONE_IN_LOG: &str = "phone-in-log";
pub const UNMASKED_PHONE_PRINT: &str = "unmasked-phone-print";
pub const PHI_IN_CONFIG: &str = "phi-in-config";
pub const UNENCRYPTED_FILE_IO: &str = "unencrypted-file-io";

/// Built-in rule names in evaluation order.
pub const BUILTIN_RULES: &[&str] = &[
    SSN_IN_LOG,
    PHONE_IN_LOG,
    UNMASKED_PHONE_PRINT,
    PHI_IN_CONFIG,
    UNENCRYPTED_FILE_IO,
];

pub type Detector = Box<dyn Fn(&str) -> bool + Send + Sync>;

struct Rule {
    name: String,
    message: String,
    detector: Detector,
}

/// Ordered set of named detectors. Each rule contributes at most one
/// warning per scanned text.
pub struct ComplianceScanner {
    rules: Vec<Rule>,
}

impl fmt::Debug for ComplianceScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComplianceScanner")
            .field("rules", &self.rule_names())
            .finish()
    }
}

impl Default for ComplianceScanner {
    fn default() -> Self {
        Self::builtin()
    }
}

macro_rules! pattern {
    ($re:literal) => {{
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new($re).unwrap())
    }};
}

impl ComplianceScanner {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn builtin() -> Self {
        Self::empty()
            .with_rule(SSN_IN_LOG, "Possible SSN in log statement", |code| {
                pattern!(r"(?i)log[\w.]*\s*\([^\n]*\d{3}[-.]?\d{2}[-.]?\d{4}").is_match(code)
            })
            .with_rule(
                PHONE_IN_LOG,
                "Possible phone number in log statement",
                |code| pattern!(r"(?i)log[\w.]*\s*\([^\n]*\d{10}").is_match(code),
            )
            .with_rule(
                UNMASKED_PHONE_PRINT,
                "Printing phone numbers; use mask_phone_number() instead",
                |code| {
                    pattern!(r"(?i)(?:console\.\w+|\bprint(?:ln)?!?)\s*\([^)]*to_?number")
                        .is_match(code)
                },
            )
            .with_rule(
                PHI_IN_CONFIG,
                "Possible PHI being stored in configuration",
                |code| {
                    pattern!(r#"(?i)config\s*(?:\[|\.(?:get\s*\()?)\s*["']?\w*(?:patient|ssn|dob)"#)
                        .is_match(code)
                },
            )
            .with_rule(
                UNENCRYPTED_FILE_IO,
                "File operations should encrypt PHI",
                |code| {
                    pattern!(r"\b(?:open|openSync|writeFile|writeFileSync|createWriteStream)\s*\(")
                        .is_match(code)
                },
            )
    }

    /// Built-in rules minus those disabled in `config`.
    pub fn from_config(config: &ComplianceConfig) -> Self {
        config
            .disabled_rules
            .iter()
            .fold(Self::builtin(), |scanner, name| scanner.without_rule(name))
    }

    /// Appends a rule; a rule with the same name is replaced in place.
    pub fn with_rule(
        mut self,
        name: impl Into<String>,
        message: impl Into<String>,
        detector: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        let rule = Rule {
            name: name.into(),
            message: message.into(),
            detector: Box::new(detector),
        };
        match self.rules.iter_mut().find(|r| r.name == rule.name) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
        self
    }

    pub fn without_rule(mut self, name: &str) -> Self {
        self.rules.retain(|r| r.name != name);
        self
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name.as_str()).collect()
    }

    /// Warnings for `code`, in rule order.
    pub fn scan(&self, code: &str) -> Vec<String> {
        self.rules
            .iter()
            .filter(|rule| (rule.detector)(code))
            .map(|rule| rule.message.clone())
            .collect()
    }
}

/// Scans `code` with the built-in rules.
pub fn check_hipaa_compliance(code: &str) -> Vec<String> {
    ComplianceScanner::builtin().scan(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_log_of_to_number_warns_once() {
        let warnings = check_hipaa_compliance(r#"console.log("sending to " + toNumber)"#);
        assert_eq!(
            warnings,
            vec!["Printing phone numbers; use mask_phone_number() instead".to_string()]
        );
    }

    #[test]
    fn python_print_of_to_number_warns() {
        let warnings = check_hipaa_compliance("print(f'fax to {to_number}')");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn ssn_shaped_literal_in_log() {
        let warnings = check_hipaa_compliance(r#"logger.info("patient 123-45-6789 sent")"#);
        assert_eq!(warnings, vec!["Possible SSN in log statement".to_string()]);
    }

    #[test]
    fn ten_digit_run_in_log_also_looks_like_ssn() {
        let warnings = check_hipaa_compliance(r#"log.debug("dialing 5551234567")"#);
        assert_eq!(
            warnings,
            vec![
                "Possible SSN in log statement".to_string(),
                "Possible phone number in log statement".to_string(),
            ]
        );
    }

    #[test]
    fn phi_keys_in_config_access() {
        for code in [
            r#"const id = config["patient_id"];"#,
            "self.config.get('SSN')",
            "config.dob = value",
        ] {
            assert_eq!(
                check_hipaa_compliance(code),
                vec!["Possible PHI being stored in configuration".to_string()],
                "{code}"
            );
        }
        assert!(check_hipaa_compliance(r#"config["api_key"]"#).is_empty());
    }

    #[test]
    fn raw_file_io_warns() {
        assert_eq!(
            check_hipaa_compliance("fs.writeFile(path, pdf, cb)"),
            vec!["File operations should encrypt PHI".to_string()]
        );
        assert_eq!(check_hipaa_compliance("with open(path, 'wb') as f:").len(), 1);
        assert!(check_hipaa_compliance("reopen (x)").is_empty());
    }

    #[test]
    fn clean_source_has_no_warnings() {
        let code = r#"
            const masked = maskPhoneNumber(toNumber);
            logger.info("fax queued", { jobId });
        "#;
        assert!(check_hipaa_compliance(code).is_empty());
    }

    #[test]
    fn rules_can_be_removed_and_added() {
        let scanner = ComplianceScanner::builtin()
            .without_rule(UNENCRYPTED_FILE_IO)
            .with_rule("no-eval", "Avoid eval()", |code| code.contains("eval("));
        assert_eq!(
            scanner.scan("eval(open(p))"),
            vec!["Avoid eval()".to_string()]
        );
        assert_eq!(scanner.rule_names().last(), Some(&"no-eval"));
    }

    #[test]
    fn replacing_a_rule_keeps_its_position() {
        let scanner = ComplianceScanner::builtin().with_rule(SSN_IN_LOG, "custom", |_| false);
        assert_eq!(scanner.rule_names(), BUILTIN_RULES.to_vec());
    }

    #[test]
    fn config_disables_rules() {
        let config = ComplianceConfig {
            disabled_rules: vec![UNENCRYPTED_FILE_IO.to_string()],
        };
        let scanner = ComplianceScanner::from_config(&config);
        assert!(scanner.scan("fs.open(p)").is_empty());
        assert_eq!(scanner.rule_names().len(), BUILTIN_RULES.len() - 1);
    }
}
