//! Product data model
//!
//! A scan produces a [`ScanCode`]; resolution turns it into a [`ProductRecord`].
//! Records that could not be resolved carry a placeholder name embedding the
//! raw code so that the downstream shopping list entry can be renamed later.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Matches names produced by [`placeholder_name`]; capture group 1 is the code.
static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^unrecognized barcode\[(.+)\]$").expect("valid placeholder regex"));

/// Decoded text of one barcode scan
///
/// Compared by exact string equality. No case folding or zero trimming is done.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanCode(String);

impl ScanCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ScanCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ScanCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ScanCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for ScanCode {
    fn from(code: String) -> Self {
        Self(code)
    }
}

/// Resolved identity of a scanned item
///
/// Unknown fields are rejected on deserialization so that a snapshot written by
/// a different schema fails loudly instead of losing data on the next save.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductRecord {
    /// Display name, also used as the shopping list task content
    pub name: String,
    /// Free-text product type ("Milk", "Butter", ...)
    #[serde(default)]
    pub product_type: String,
    /// One of the [`crate::CategoryOrdering`] labels, or empty
    #[serde(default)]
    pub product_category: String,
    /// Link to the page the name was derived from
    #[serde(default)]
    pub link: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    #[serde(default)]
    pub first_scanned: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_scanned: Option<DateTime<Utc>>,
}

impl ProductRecord {
    /// New record first seen now, with only a name and source link
    pub fn new(name: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            link: link.into(),
            first_scanned: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Placeholder record for a code no resolution path could name
    pub fn placeholder(code: &ScanCode) -> Self {
        Self::new(placeholder_name(code), "")
    }

    /// A record without a name must not be stored or published
    pub fn is_resolved(&self) -> bool {
        !self.name.trim().is_empty()
    }

    pub fn is_placeholder(&self) -> bool {
        PLACEHOLDER_RE.is_match(&self.name)
    }

    /// Update last-seen to `now`, setting first-seen too if it was never recorded
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_scanned = Some(now);
        if self.first_scanned.is_none() {
            self.first_scanned = Some(now);
        }
    }
}

/// Task name used on the shopping list for an unresolved code
pub fn placeholder_name(code: &ScanCode) -> String {
    format!("unrecognized barcode[{}]", code)
}

/// Extract the scan code from a placeholder name, if it is one
pub fn placeholder_code(name: &str) -> Option<ScanCode> {
    PLACEHOLDER_RE
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| ScanCode::new(m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_name_round_trips_code() {
        let code = ScanCode::new("6408180733659");
        let name = placeholder_name(&code);

        assert_eq!(name, "unrecognized barcode[6408180733659]");
        assert_eq!(placeholder_code(&name), Some(code));
    }

    #[test]
    fn test_placeholder_code_rejects_other_names() {
        assert_eq!(placeholder_code("Maito 1 l"), None);
        assert_eq!(placeholder_code("unrecognized barcode[]"), None);
        assert_eq!(placeholder_code("x unrecognized barcode[123]"), None);
    }

    #[test]
    fn test_placeholder_record_is_flagged() {
        let record = ProductRecord::placeholder(&ScanCode::new("123"));
        assert!(record.is_placeholder());
        assert!(record.is_resolved());
        assert!(record.first_scanned.is_some());

        assert!(!ProductRecord::new("Tacokastike", "").is_placeholder());
    }

    #[test]
    fn test_empty_name_is_unresolved() {
        assert!(!ProductRecord::default().is_resolved());
        assert!(!ProductRecord::new("  ", "").is_resolved());
    }

    #[test]
    fn test_touch_sets_first_seen_once() {
        let mut record = ProductRecord::default();
        let first = Utc::now();
        record.touch(first);
        let later = first + chrono::Duration::seconds(5);
        record.touch(later);

        assert_eq!(record.first_scanned, Some(first));
        assert_eq!(record.last_scanned, Some(later));
    }

    #[test]
    fn test_record_rejects_unknown_fields() {
        let json = r#"{"name": "Maito", "price": 1.2}"#;
        assert!(serde_json::from_str::<ProductRecord>(json).is_err());
    }

    #[test]
    fn test_notes_omitted_when_empty() {
        let json = serde_json::to_string(&ProductRecord::new("Maito", "")).unwrap();
        assert!(!json.contains("notes"));
        assert!(json.contains("\"product_type\":\"\""));
    }

    #[test]
    fn test_scan_code_serializes_as_plain_string() {
        let code = ScanCode::new("abc");
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"abc\"");
    }
}
