//! Evidence aggregation engine
//!
//! Turns the raw rows an analysis query returns into classification
//! results: deduplicated ordered lists, per-subject evidence groups and
//! weighted host scores. Everything here is pure; equal input always gives
//! equal output.

use crate::models::{AnalysisKind, Evidence, Row, Value};
use crate::query::{compare_rows, OrderKey};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

const TARGET_ENGINE: &str = "engine";

// ============================================================================
// Data Structures
// ============================================================================

/// Per-section display limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DisplayLimits {
    /// Rows shown by list sections and the DNS exploration top-N
    pub list: usize,
    /// Queries shown per source IP in the Windows DNS section
    pub windows_group: usize,
    /// Rows in each of the top/bottom flow pair views
    pub flow_pairs: usize,
    /// Evidence lines shown per Linux host
    pub linux_evidence: usize,
}

impl Default for DisplayLimits {
    fn default() -> Self {
        Self {
            list: 50,
            windows_group: 15,
            flow_pairs: 25,
            linux_evidence: 10,
        }
    }
}

/// Ordered, truncated rows and how many were cut
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListResult {
    pub rows: Vec<Row>,
    pub remainder: usize,
}

/// Evidence collected for one subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub subject: String,
    /// Deduplicated, sorted evidence labels (truncated when limited)
    pub evidence: Vec<String>,
    /// Weight sum, only set in scored mode
    pub score: Option<i64>,
    pub remainder: usize,
}

/// Aggregated result of one analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    List(ListResult),
    Grouped(Vec<Group>),
    FlowPairs { top: ListResult, bottom: ListResult },
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        match self {
            Classification::List(list) => list.rows.is_empty(),
            Classification::Grouped(groups) => groups.is_empty(),
            Classification::FlowPairs { top, bottom } => {
                top.rows.is_empty() && bottom.rows.is_empty()
            }
        }
    }
}

// ============================================================================
// Aggregation modes
// ============================================================================

/// List mode: dedupe exact tuples, stable sort, truncate
pub fn list(rows: Vec<Row>, keys: &[OrderKey], limit: Option<usize>) -> ListResult {
    let mut seen = HashSet::new();
    let mut rows: Vec<Row> = rows
        .into_iter()
        .filter(|row| seen.insert(row.clone()))
        .collect();
    rows.sort_by(|a, b| compare_rows(a, b, keys));

    let remainder = match limit {
        Some(limit) if rows.len() > limit => {
            let cut = rows.len() - limit;
            rows.truncate(limit);
            cut
        }
        _ => 0,
    };
    ListResult { rows, remainder }
}

/// Grouped mode: subjects in first-seen order, unattributed evidence dropped
pub fn grouped(evidence: Vec<Evidence>, limit: Option<usize>) -> Vec<Group> {
    collect_groups(evidence, limit, false)
}

/// Scored mode: grouped mode plus a weight sum over every contributing
/// row, groups ordered by descending score. Equal scores keep first-seen
/// order.
pub fn scored(evidence: Vec<Evidence>, limit: Option<usize>) -> Vec<Group> {
    let mut groups = collect_groups(evidence, limit, true);
    groups.sort_by(|a, b| b.score.cmp(&a.score));
    groups
}

fn collect_groups(evidence: Vec<Evidence>, limit: Option<usize>, with_score: bool) -> Vec<Group> {
    let mut order: Vec<String> = Vec::new();
    let mut labels: HashMap<String, BTreeSet<String>> = HashMap::new();
    let mut scores: HashMap<String, i64> = HashMap::new();

    for item in evidence {
        let Some(subject) = item.subject.clone().filter(|s| !s.is_empty()) else {
            continue;
        };
        if !labels.contains_key(&subject) {
            order.push(subject.clone());
        }
        let entry = labels.entry(subject.clone()).or_default();
        if !item.detail.is_empty() {
            entry.insert(item.label());
        }
        *scores.entry(subject).or_insert(0) += item.weight;
    }

    order
        .into_iter()
        .map(|subject| {
            let mut evidence: Vec<String> = labels
                .remove(&subject)
                .unwrap_or_default()
                .into_iter()
                .collect();
            let remainder = match limit {
                Some(limit) if evidence.len() > limit => {
                    let cut = evidence.len() - limit;
                    evidence.truncate(limit);
                    cut
                }
                _ => 0,
            };
            Group {
                score: with_score.then(|| scores.get(&subject).copied().unwrap_or(0)),
                subject,
                evidence,
                remainder,
            }
        })
        .collect()
}

/// Two list views over the same `(src_ip, dest_ip, count)` rows
pub fn flow_pairs(rows: Vec<Row>, limit: usize) -> (ListResult, ListResult) {
    let top = list(
        rows.clone(),
        &[OrderKey::desc(2), OrderKey::asc(0), OrderKey::asc(1)],
        Some(limit),
    );
    let bottom = list(
        rows,
        &[OrderKey::asc(2), OrderKey::asc(0), OrderKey::asc(1)],
        Some(limit),
    );
    (top, bottom)
}

// ============================================================================
// Per-analysis classification
// ============================================================================

fn subject(value: &Value) -> Option<String> {
    value.to_text()
}

fn cell(row: &Row, idx: usize) -> &Value {
    row.get(idx).unwrap_or(&Value::Null)
}

/// Aggregate one analysis' rows according to its column layout
pub fn classify(kind: AnalysisKind, rows: Vec<Row>, limits: &DisplayLimits) -> Classification {
    debug!(target: TARGET_ENGINE, analysis = %kind, rows = rows.len(), "Aggregating");

    match kind {
        AnalysisKind::Cloud => {
            Classification::List(list(rows, &[OrderKey::asc(1)], Some(limits.list)))
        }
        AnalysisKind::DnsExploration => Classification::List(list(
            rows,
            &[OrderKey::desc(1), OrderKey::asc(0)],
            Some(limits.list),
        )),
        AnalysisKind::DnsServers | AnalysisKind::Sni => {
            Classification::List(list(rows, &[OrderKey::asc(0)], Some(limits.list)))
        }
        AnalysisKind::WindowsDns => {
            // Highest counts first decides which source IP is seen first
            let mut rows = rows;
            rows.sort_by(|a, b| {
                compare_rows(a, b, &[OrderKey::desc(2), OrderKey::asc(1), OrderKey::asc(0)])
            });
            let evidence = rows
                .iter()
                .map(|row| {
                    Evidence::new(
                        subject(cell(row, 0)),
                        format!("{} ({})", cell(row, 1), cell(row, 2)),
                    )
                })
                .collect();
            Classification::Grouped(grouped(evidence, Some(limits.windows_group)))
        }
        AnalysisKind::Iot => {
            let evidence = rows
                .iter()
                .map(|row| {
                    let mut item = Evidence::new(
                        subject(cell(row, 0)),
                        cell(row, 2).to_text().unwrap_or_default(),
                    );
                    if let Some(kind) = cell(row, 1).to_text() {
                        item = item.with_kind(kind);
                    }
                    item
                })
                .collect();
            Classification::Grouped(grouped(evidence, None))
        }
        AnalysisKind::LinuxHosts => {
            let evidence = rows
                .iter()
                .map(|row| {
                    Evidence::new(
                        subject(cell(row, 0)),
                        cell(row, 2).to_text().unwrap_or_default(),
                    )
                    .with_weight(cell(row, 1).as_int().unwrap_or(0))
                })
                .collect();
            Classification::Grouped(scored(evidence, Some(limits.linux_evidence)))
        }
        AnalysisKind::FlowPairs => {
            let (top, bottom) = flow_pairs(rows, limits.flow_pairs);
            Classification::FlowPairs { top, bottom }
        }
    }
}
