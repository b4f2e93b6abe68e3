//! Data models module
//!
//! Defines the scalar cell values, projected rows and evidence records
//! that flow between the store, the aggregator and the report formatter.

pub mod analysis;

pub use analysis::AnalysisKind;

use std::fmt;

/// Top-level event field names used by the analyses
pub mod fields {
    pub const EVENT_TYPE: &str = "event_type";
    pub const SRC_IP: &str = "src_ip";
    pub const DEST_IP: &str = "dest_ip";
    pub const DEST_PORT: &str = "dest_port";
    pub const DNS: &str = "dns";
    pub const TLS: &str = "tls";
    pub const HTTP: &str = "http";
}

/// Event type discriminator values (`event_type` column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Dns,
    Tls,
    Http,
    Flow,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Dns => "dns",
            EventType::Tls => "tls",
            EventType::Http => "http",
            EventType::Flow => "flow",
        }
    }
}

/// A single cell produced by a query.
///
/// Ordering is total (`Null < Int < Text`) so sorts over rows are deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    Null,
    Int(i64),
    Text(String),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Text(s) => s.parse().ok(),
            Value::Null => None,
        }
    }

    /// String form used for matching and display; `None` for null.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Int(n) => Some(n.to_string()),
            Value::Text(s) => Some(s.clone()),
        }
    }

    /// Converts a JSON scalar (or nested structure) into a cell value
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Text(n.to_string()),
            },
            serde_json::Value::Bool(b) => Value::Text(b.to_string()),
            other => Value::Text(other.to_string()),
        }
    }

    /// Equality with numeric coercion between `Int` and numeric `Text`
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Int(a), Value::Text(b)) | (Value::Text(b), Value::Int(a)) => {
                b.parse::<i64>().map(|b| b == *a).unwrap_or(false)
            }
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

/// One projected result row
pub type Row = Vec<Value>;

/// A single matched attribute supporting a subject's classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evidence {
    /// Grouping key (usually a source IP); `None` cannot be attributed
    pub subject: Option<String>,
    /// Evidence kind label, e.g. `tls_sni`
    pub kind: Option<String>,
    /// Matched value
    pub detail: String,
    /// Scoring weight, only meaningful for scored grouping
    pub weight: i64,
}

impl Evidence {
    pub fn new(subject: Option<String>, detail: impl Into<String>) -> Self {
        Self {
            subject,
            kind: None,
            detail: detail.into(),
            weight: 0,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_weight(mut self, weight: i64) -> Self {
        self.weight = weight;
        self
    }

    /// Display form: `[kind] detail` when a kind is present
    pub fn label(&self) -> String {
        match &self.kind {
            Some(kind) => format!("[{}] {}", kind, self.detail),
            None => self.detail.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_from_json() {
        assert_eq!(Value::from_json(&json!("dns")), Value::text("dns"));
        assert_eq!(Value::from_json(&json!(53)), Value::Int(53));
        assert_eq!(Value::from_json(&json!(1.5)), Value::text("1.5"));
        assert_eq!(Value::from_json(&json!(true)), Value::text("true"));
        assert_eq!(Value::from_json(&json!(null)), Value::Null);
        assert_eq!(
            Value::from_json(&json!({"a": 1})),
            Value::text("{\"a\":1}")
        );
    }

    #[test]
    fn test_value_ordering() {
        let mut values = vec![Value::text("b"), Value::Int(3), Value::Null, Value::text("a")];
        values.sort();
        assert_eq!(
            values,
            vec![Value::Null, Value::Int(3), Value::text("a"), Value::text("b")]
        );
    }

    #[test]
    fn test_loose_equality() {
        assert!(Value::Int(53).loosely_equals(&Value::text("53")));
        assert!(Value::text("dns").loosely_equals(&Value::text("dns")));
        assert!(!Value::Null.loosely_equals(&Value::Null));
        assert!(!Value::Int(53).loosely_equals(&Value::text("dns")));
    }

    #[test]
    fn test_evidence_label() {
        let evidence = Evidence::new(Some("10.0.0.5".to_string()), "cam.hikvision.com")
            .with_kind("dns");
        assert_eq!(evidence.label(), "[dns] cam.hikvision.com");
        assert_eq!(Evidence::new(None, "x").label(), "x");
    }
}
