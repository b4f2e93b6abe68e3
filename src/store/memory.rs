//! In-memory JSON event store and query executor.

use super::{EventStore, QueryError, StoreError};
use crate::models::{fields, Row, Value};
use crate::query::{compare_rows, Query};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::trace;

const TARGET_STORE: &str = "store";

/// Read-only set of JSON events with a union-of-keys column catalog
pub struct JsonEventStore {
    source: PathBuf,
    events: Vec<serde_json::Value>,
    columns: BTreeSet<String>,
}

impl JsonEventStore {
    pub fn from_events<P: AsRef<Path>>(source: P, events: Vec<serde_json::Value>) -> Self {
        let columns = events
            .iter()
            .filter_map(|event| event.as_object())
            .flat_map(|object| object.keys().cloned())
            .collect();
        Self {
            source: source.as_ref().to_path_buf(),
            events,
            columns,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Reject queries that reference absent columns or malformed ordering
    fn bind(&self, query: &Query) -> Result<(), QueryError> {
        if query.projection.is_empty() {
            return Err(QueryError::InvalidQuery("empty projection".to_string()));
        }
        if let Some(missing) = query
            .referenced_columns()
            .into_iter()
            .find(|column| !self.columns.contains(column))
        {
            return Err(QueryError::UnknownColumn(missing));
        }

        let width = query.projection.len() + usize::from(query.group_count);
        if let Some(key) = query.order_by.iter().find(|key| key.column >= width) {
            return Err(QueryError::InvalidQuery(format!(
                "order column {} out of range for {} result columns",
                key.column, width
            )));
        }
        Ok(())
    }

    fn event_type_allowed(query: &Query, event: &serde_json::Value) -> bool {
        if query.event_types.is_empty() {
            return true;
        }
        let event_type = event.get(fields::EVENT_TYPE).and_then(|v| v.as_str());
        query
            .event_types
            .iter()
            .any(|allowed| event_type == Some(allowed.as_str()))
    }

    fn emit(
        query: &Query,
        event: &serde_json::Value,
        element: Option<&serde_json::Value>,
        rows: &mut Vec<Row>,
    ) {
        let keep = query
            .filter
            .as_ref()
            .map_or(true, |predicate| predicate.evaluate(event, element));
        if keep {
            rows.push(
                query
                    .projection
                    .iter()
                    .map(|expr| expr.evaluate(event, element))
                    .collect(),
            );
        }
    }
}

impl EventStore for JsonEventStore {
    fn source(&self) -> &Path {
        &self.source
    }

    fn columns(&self) -> Result<BTreeSet<String>, StoreError> {
        Ok(self.columns.clone())
    }

    fn query(&self, query: &Query) -> Result<Vec<Row>, QueryError> {
        self.bind(query)?;

        let mut rows = Vec::new();
        for event in self
            .events
            .iter()
            .filter(|event| Self::event_type_allowed(query, event))
        {
            match &query.unnest {
                Some(path) => {
                    // Missing or non-list fields produce no rows
                    let Some(elements) = path.resolve(event, None).and_then(|v| v.as_array())
                    else {
                        continue;
                    };
                    for element in elements {
                        Self::emit(query, event, Some(element), &mut rows);
                    }
                }
                None => Self::emit(query, event, None, &mut rows),
            }
        }

        if query.group_count {
            rows = group_and_count(rows);
        } else if query.distinct {
            rows = dedupe(rows);
        }
        if !query.order_by.is_empty() {
            rows.sort_by(|a, b| compare_rows(a, b, &query.order_by));
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        trace!(target: TARGET_STORE, rows = rows.len(), "Query executed");
        Ok(rows)
    }
}

/// Exact-tuple dedupe keeping first-seen order
pub(crate) fn dedupe(rows: Vec<Row>) -> Vec<Row> {
    let mut seen = std::collections::HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(row.clone()))
        .collect()
}

/// Group identical tuples (first-seen order) and append their count
fn group_and_count(rows: Vec<Row>) -> Vec<Row> {
    let mut index: HashMap<Row, usize> = HashMap::new();
    let mut groups: Vec<(Row, i64)> = Vec::new();
    for row in rows {
        match index.get(&row) {
            Some(&i) => groups[i].1 += 1,
            None => {
                index.insert(row.clone(), groups.len());
                groups.push((row, 1));
            }
        }
    }
    groups
        .into_iter()
        .map(|(mut row, count)| {
            row.push(Value::Int(count));
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventType;
    use crate::query::{Expr, OrderKey, Predicate};
    use serde_json::json;

    fn store() -> JsonEventStore {
        JsonEventStore::from_events(
            "mem",
            vec![
                json!({"event_type": "dns", "src_ip": "10.0.0.1", "dest_ip": "10.0.0.53", "dest_port": 53,
                       "dns": {"queries": [{"rrname": "a.example"}, {"rrname": "b.example"}]}}),
                json!({"event_type": "dns", "src_ip": "10.0.0.2", "dest_ip": "1.1.1.1", "dest_port": 53,
                       "dns": {"queries": [{"rrname": "a.example"}]}}),
                json!({"event_type": "dns", "src_ip": "10.0.0.3", "dns": {"type": "answer"}}),
                json!({"event_type": "flow", "src_ip": "10.0.0.1", "dest_ip": "8.8.8.8", "dest_port": 443}),
                json!({"event_type": "flow", "src_ip": "10.0.0.1", "dest_ip": "8.8.8.8", "dest_port": 443}),
            ],
        )
    }

    #[test]
    fn test_unnest_emits_one_row_per_element() {
        let query = Query::new(vec![Expr::event("src_ip"), Expr::element("rrname")])
            .event_types(&[EventType::Dns])
            .unnest("dns.queries");
        let rows = store().query(&query).unwrap();
        assert_eq!(
            rows,
            vec![
                vec![Value::text("10.0.0.1"), Value::text("a.example")],
                vec![Value::text("10.0.0.1"), Value::text("b.example")],
                vec![Value::text("10.0.0.2"), Value::text("a.example")],
            ]
        );
    }

    #[test]
    fn test_group_count_order_and_limit() {
        let query = Query::new(vec![Expr::element("rrname")])
            .event_types(&[EventType::Dns])
            .unnest("dns.queries")
            .group_count()
            .order_by(vec![OrderKey::desc(1), OrderKey::asc(0)])
            .limit(1);
        let rows = store().query(&query).unwrap();
        assert_eq!(rows, vec![vec![Value::text("a.example"), Value::Int(2)]]);
    }

    #[test]
    fn test_distinct_with_filter() {
        let query = Query::new(vec![Expr::event("dest_ip")])
            .filter(Predicate::And(vec![
                Predicate::equals(Expr::event("dest_port"), 443i64),
                Predicate::not_null(Expr::event("dest_ip")),
            ]))
            .distinct();
        let rows = store().query(&query).unwrap();
        assert_eq!(rows, vec![vec![Value::text("8.8.8.8")]]);
    }

    #[test]
    fn test_unknown_column_is_rejected() {
        let query = Query::new(vec![Expr::event("tls.sni")]).event_types(&[EventType::Tls]);
        match store().query(&query) {
            Err(QueryError::UnknownColumn(column)) => assert_eq!(column, "tls"),
            other => panic!("Expected unknown column, got {:?}", other),
        }
    }

    #[test]
    fn test_order_out_of_range_is_invalid() {
        let query = Query::new(vec![Expr::event("src_ip")]).order_by(vec![OrderKey::asc(3)]);
        assert!(matches!(
            store().query(&query),
            Err(QueryError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_union_concatenates_in_order() {
        let flows = Query::new(vec![Expr::event("dest_ip")]).event_types(&[EventType::Flow]);
        let dns = Query::new(vec![Expr::event("src_ip")])
            .event_types(&[EventType::Dns])
            .distinct();
        let rows = store().query_union(&[flows, dns]).unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0], vec![Value::text("8.8.8.8")]);
        assert_eq!(rows[2], vec![Value::text("10.0.0.1")]);
    }

    #[test]
    fn test_dedupe_keeps_first_seen_order() {
        let rows = vec![
            vec![Value::text("b")],
            vec![Value::text("a")],
            vec![Value::text("b")],
        ];
        assert_eq!(
            dedupe(rows),
            vec![vec![Value::text("b")], vec![Value::text("a")]]
        );
    }
}
