//! Small PHI-safety helpers shared by plugins and the validators.

use std::sync::OnceLock;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{SecondsFormat, Utc};
use rand::RngCore;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Masks all but the last four digits of a phone number.
///
/// Empty input yields `[EMPTY]`; fewer than four digits yields `***`.
pub fn mask_phone_number(phone: &str) -> String {
    if phone.is_empty() {
        return "[EMPTY]".to_string();
    }
    let digits: Vec<char> = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return "***".to_string();
    }
    let last4: String = digits[digits.len() - 4..].iter().collect();
    format!("***-***-{last4}")
}

/// Hex-encoded SHA-256 of a document body.
pub fn hash_document(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// URL-safe random token built from `length` bytes of entropy.
pub fn generate_token(length: usize) -> String {
    let mut buf = vec![0u8; length];
    rand::rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

/// Replaces SSN-shaped groups and runs of ten or more digits in free text.
///
/// Only the dashed `ddd-dd-dddd` form is rewritten. Use [`contains_phi`] to
/// also catch bare and dotted SSNs.
pub fn redact_text(text: &str) -> String {
    static SSN: OnceLock<Regex> = OnceLock::new();
    static LONG_DIGITS: OnceLock<Regex> = OnceLock::new();
    let ssn = SSN.get_or_init(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap());
    let long_digits = LONG_DIGITS.get_or_init(|| Regex::new(r"\d{10,}").unwrap());
    let out = ssn.replace_all(text, "***-**-****");
    long_digits.replace_all(&out, "***").into_owned()
}

/// True when `text` holds an SSN in dashed, dotted or bare nine-digit form,
/// or a run of ten or more digits.
pub fn contains_phi(text: &str) -> bool {
    static SSN_LIKE: OnceLock<Regex> = OnceLock::new();
    let ssn_like =
        SSN_LIKE.get_or_init(|| Regex::new(r"\b\d{3}[-.]?\d{2}[-.]?\d{4}\b").unwrap());
    ssn_like.is_match(text) || redact_text(text) != text
}

/// Current UTC time as RFC 3339 with whole seconds, e.g. `2024-05-01T12:00:00Z`.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
