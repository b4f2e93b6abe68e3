//! Declarative query description
//!
//! Analyses never build query text. They describe what they need as a
//! [`Query`] value: an event-type filter, an optional unnest of a repeated
//! sub-field, a typed predicate tree, a projection and optional
//! grouping/ordering. Any [`crate::store::EventStore`] executes it.

pub mod builder;

pub use builder::{plan, AnalysisPlan};

use crate::models::{fields, EventType, Row, Value};
use crate::utils::is_private;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

// ============================================================================
// Field references and expressions
// ============================================================================

/// Where a field path is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The event record itself
    Event,
    /// The current element of the unnested repeated field
    Element,
}

/// One step of a field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Path into an event (or unnested element), e.g. `dns.queries[0].rrname`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub scope: Scope,
    pub path: Vec<Segment>,
}

impl FieldRef {
    /// Path resolved against the event, in dotted form
    pub fn event(dotted: &str) -> Self {
        Self {
            scope: Scope::Event,
            path: parse_path(dotted),
        }
    }

    /// Path resolved against the unnested element, in dotted form
    pub fn element(dotted: &str) -> Self {
        Self {
            scope: Scope::Element,
            path: parse_path(dotted),
        }
    }

    /// Top-level column this reference depends on (event scope only)
    pub fn column(&self) -> Option<&str> {
        if self.scope != Scope::Event {
            return None;
        }
        match self.path.first() {
            Some(Segment::Key(name)) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Walks the path; `None` when any step is missing
    pub fn resolve<'a>(
        &self,
        event: &'a serde_json::Value,
        element: Option<&'a serde_json::Value>,
    ) -> Option<&'a serde_json::Value> {
        let mut current = match self.scope {
            Scope::Event => event,
            Scope::Element => element?,
        };
        for segment in &self.path {
            current = match segment {
                Segment::Key(key) => current.get(key.as_str())?,
                Segment::Index(idx) => current.get(*idx)?,
            };
        }
        Some(current)
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scope == Scope::Element {
            f.write_str("<element>")?;
        }
        for (i, segment) in self.path.iter().enumerate() {
            match segment {
                Segment::Key(key) => {
                    if i > 0 || self.scope == Scope::Element {
                        f.write_str(".")?;
                    }
                    f.write_str(key)?;
                }
                Segment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

/// Parse `a.b[0].c` into segments. A bracket suffix that is not a number
/// is kept as part of the key.
fn parse_path(dotted: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    for part in dotted.split('.').filter(|p| !p.is_empty()) {
        let indexed = part
            .strip_suffix(']')
            .and_then(|p| p.split_once('['))
            .and_then(|(name, idx)| idx.parse::<usize>().ok().map(|idx| (name, idx)));
        match indexed {
            Some((name, idx)) => {
                if !name.is_empty() {
                    segments.push(Segment::Key(name.to_string()));
                }
                segments.push(Segment::Index(idx));
            }
            _ => segments.push(Segment::Key(part.to_string())),
        }
    }
    segments
}

/// Value-producing expression used in filters and projections
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Field(FieldRef),
    /// First non-null field, in order
    Coalesce(Vec<FieldRef>),
    Literal(Value),
}

impl Expr {
    pub fn event(dotted: &str) -> Self {
        Expr::Field(FieldRef::event(dotted))
    }

    pub fn element(dotted: &str) -> Self {
        Expr::Field(FieldRef::element(dotted))
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn evaluate(
        &self,
        event: &serde_json::Value,
        element: Option<&serde_json::Value>,
    ) -> Value {
        match self {
            Expr::Field(field) => field
                .resolve(event, element)
                .map(Value::from_json)
                .unwrap_or(Value::Null),
            Expr::Coalesce(candidates) => candidates
                .iter()
                .filter_map(|field| field.resolve(event, element))
                .map(Value::from_json)
                .find(|value| !value.is_null())
                .unwrap_or(Value::Null),
            Expr::Literal(value) => value.clone(),
        }
    }

    fn collect_columns(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Field(field) => out.extend(field.column().map(str::to_string)),
            Expr::Coalesce(candidates) => {
                out.extend(candidates.iter().filter_map(|f| f.column().map(str::to_string)))
            }
            Expr::Literal(_) => {}
        }
    }
}

// ============================================================================
// Predicates
// ============================================================================

/// Leaf test applied to an expression value
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Case-insensitive substring (stored lowercase)
    Contains(String),
    /// Regex search
    Regex(Regex),
    /// Equality with numeric coercion
    Equals(Value),
    /// Null or missing
    IsNull,
    /// RFC1918 IPv4 literal
    PrivateAddress,
}

impl Matcher {
    pub fn contains(keyword: &str) -> Self {
        Matcher::Contains(keyword.to_ascii_lowercase())
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Matcher::IsNull => value.is_null(),
            Matcher::Equals(expected) => value.loosely_equals(expected),
            Matcher::Contains(needle) => value
                .to_text()
                .is_some_and(|text| contains_ignore_ascii_case(&text, needle)),
            Matcher::Regex(regex) => value.to_text().is_some_and(|text| regex.is_match(&text)),
            Matcher::PrivateAddress => value.as_str().is_some_and(is_private),
        }
    }
}

/// Zero-allocation case-insensitive substring search
fn contains_ignore_ascii_case(value: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    if value.len() < needle.len() {
        return false;
    }
    for i in 0..=(value.len() - needle.len()) {
        // Skip positions that would split multi-byte characters
        if !value.is_char_boundary(i) || !value.is_char_boundary(i + needle.len()) {
            continue;
        }
        if value[i..i + needle.len()].eq_ignore_ascii_case(needle) {
            return true;
        }
    }
    false
}

/// Typed predicate tree
#[derive(Debug, Clone)]
pub enum Predicate {
    /// All must hold; empty is true
    And(Vec<Predicate>),
    /// Any must hold; empty is false
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    Leaf { expr: Expr, matcher: Matcher },
}

impl Predicate {
    pub fn leaf(expr: Expr, matcher: Matcher) -> Self {
        Predicate::Leaf { expr, matcher }
    }

    pub fn not(inner: Predicate) -> Self {
        Predicate::Not(Box::new(inner))
    }

    pub fn is_null(expr: Expr) -> Self {
        Self::leaf(expr, Matcher::IsNull)
    }

    pub fn not_null(expr: Expr) -> Self {
        Self::not(Self::is_null(expr))
    }

    pub fn equals(expr: Expr, value: impl Into<Value>) -> Self {
        Self::leaf(expr, Matcher::Equals(value.into()))
    }

    pub fn matches_regex(expr: Expr, regex: &Regex) -> Self {
        Self::leaf(expr, Matcher::Regex(regex.clone()))
    }

    /// Disjunction of case-insensitive substring tests, one per keyword
    pub fn contains_any(expr: &Expr, keywords: &[&str]) -> Self {
        Predicate::Or(
            keywords
                .iter()
                .map(|keyword| Self::leaf(expr.clone(), Matcher::contains(keyword)))
                .collect(),
        )
    }

    pub fn evaluate(
        &self,
        event: &serde_json::Value,
        element: Option<&serde_json::Value>,
    ) -> bool {
        match self {
            Predicate::And(parts) => parts.iter().all(|p| p.evaluate(event, element)),
            Predicate::Or(parts) => parts.iter().any(|p| p.evaluate(event, element)),
            Predicate::Not(inner) => !inner.evaluate(event, element),
            Predicate::Leaf { expr, matcher } => matcher.matches(&expr.evaluate(event, element)),
        }
    }

    fn collect_columns(&self, out: &mut BTreeSet<String>) {
        match self {
            Predicate::And(parts) | Predicate::Or(parts) => {
                parts.iter().for_each(|p| p.collect_columns(out))
            }
            Predicate::Not(inner) => inner.collect_columns(out),
            Predicate::Leaf { expr, .. } => expr.collect_columns(out),
        }
    }
}

// ============================================================================
// Query
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Sort key over a result column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderKey {
    pub column: usize,
    pub direction: Direction,
}

impl OrderKey {
    pub fn asc(column: usize) -> Self {
        Self {
            column,
            direction: Direction::Ascending,
        }
    }

    pub fn desc(column: usize) -> Self {
        Self {
            column,
            direction: Direction::Descending,
        }
    }
}

/// Compare two rows by a list of keys; missing columns compare as null
pub fn compare_rows(a: &Row, b: &Row, keys: &[OrderKey]) -> Ordering {
    for key in keys {
        let left = a.get(key.column).unwrap_or(&Value::Null);
        let right = b.get(key.column).unwrap_or(&Value::Null);
        let ordering = match key.direction {
            Direction::Ascending => left.cmp(right),
            Direction::Descending => right.cmp(left),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Filter-and-project query over the event store
#[derive(Debug, Clone)]
pub struct Query {
    /// Allowed `event_type` values; empty means any
    pub event_types: Vec<EventType>,
    /// Repeated field to traverse, emitting one row per element
    pub unnest: Option<FieldRef>,
    pub filter: Option<Predicate>,
    pub projection: Vec<Expr>,
    pub distinct: bool,
    /// Group by every projected column and append a count column
    pub group_count: bool,
    pub order_by: Vec<OrderKey>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(projection: Vec<Expr>) -> Self {
        Self {
            event_types: Vec::new(),
            unnest: None,
            filter: None,
            projection,
            distinct: false,
            group_count: false,
            order_by: Vec::new(),
            limit: None,
        }
    }

    pub fn event_types(mut self, types: &[EventType]) -> Self {
        self.event_types = types.to_vec();
        self
    }

    pub fn unnest(mut self, path: &str) -> Self {
        self.unnest = Some(FieldRef::event(path));
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(predicate);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn group_count(mut self) -> Self {
        self.group_count = true;
        self
    }

    pub fn order_by(mut self, keys: Vec<OrderKey>) -> Self {
        self.order_by = keys;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Top-level columns the store must expose for this query to bind
    pub fn referenced_columns(&self) -> BTreeSet<String> {
        let mut columns = BTreeSet::new();
        if !self.event_types.is_empty() {
            columns.insert(fields::EVENT_TYPE.to_string());
        }
        if let Some(column) = self.unnest.as_ref().and_then(FieldRef::column) {
            columns.insert(column.to_string());
        }
        if let Some(filter) = &self.filter {
            filter.collect_columns(&mut columns);
        }
        for expr in &self.projection {
            expr.collect_columns(&mut columns);
        }
        columns
    }
}
