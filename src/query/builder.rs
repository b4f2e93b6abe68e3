//! Predicate/query builder
//!
//! Turns an analysis kind plus the probed schema into the queries it needs.
//! Sub-queries whose payload column is absent are never built; if nothing
//! remains the analysis is skipped without touching the store.

use super::{Expr, FieldRef, Matcher, Predicate, Query};
use crate::models::{fields, AnalysisKind, EventType};
use crate::rules::{
    CLOUD_KEYWORDS, IOT_KEYWORDS, LINUX_DOMAINS_REGEX, LINUX_USER_AGENT_REGEX, WINDOWS_INDICATORS,
};
use crate::schema::SchemaAvailability;

const DNS_QUERIES: &str = "dns.queries";
const RRNAME: &str = "rrname";
const TLS_SNI: &str = "tls.sni";
const TLS_SUBJECT: &str = "tls.subject";
const HTTP_HOSTNAME: &str = "http.hostname";
const HTTP_USER_AGENT: &str = "http.http_user_agent";

/// Evidence kind labels attached to IoT sub-queries
pub mod kinds {
    pub const DNS: &str = "dns";
    pub const TLS_SNI: &str = "tls_sni";
    pub const TLS_SUBJECT: &str = "tls_subject";
    pub const HTTP_HOST: &str = "http_host";
    pub const HTTP_UA: &str = "http_ua";
}

/// Linux evidence weights; hostname/SNI hits count more than user agents
pub mod weights {
    pub const HTTP_USER_AGENT: i64 = 1;
    pub const HTTP_HOSTNAME: i64 = 2;
    pub const TLS_SNI: i64 = 2;
    pub const DNS_RRNAME: i64 = 1;
}

/// What an analysis will do for a given schema
#[derive(Debug, Clone)]
pub enum AnalysisPlan {
    /// Required columns are missing; no query is issued
    Skipped { reason: String },
    /// Queries to run; more than one means a union in order
    Run(Vec<Query>),
}

impl AnalysisPlan {
    fn skipped(kind: AnalysisKind) -> Self {
        AnalysisPlan::Skipped {
            reason: format!("no suitable columns (requires {})", kind.requirement()),
        }
    }

    fn from_union(kind: AnalysisKind, queries: Vec<Query>) -> Self {
        if queries.is_empty() {
            Self::skipped(kind)
        } else {
            AnalysisPlan::Run(queries)
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, AnalysisPlan::Skipped { .. })
    }
}

/// Build the plan for one analysis.
///
/// Result column layouts:
/// - cloud: `event_type, domain`
/// - windows dns: `src_ip, rrname, count`
/// - dns exploration: `rrname, count`
/// - dns servers: `dest_ip`
/// - sni: `sni`
/// - iot: `src_ip, kind, detail`
/// - linux hosts: `src_ip, weight, evidence`
/// - flow pairs: `src_ip, dest_ip, count`
pub fn plan(kind: AnalysisKind, schema: &SchemaAvailability) -> AnalysisPlan {
    match kind {
        AnalysisKind::Cloud => cloud(schema),
        AnalysisKind::WindowsDns if schema.has_dns => AnalysisPlan::Run(vec![windows_dns()]),
        AnalysisKind::DnsExploration if schema.has_dns => {
            AnalysisPlan::Run(vec![dns_exploration()])
        }
        AnalysisKind::DnsServers if schema.has_dns => AnalysisPlan::Run(vec![dns_servers()]),
        AnalysisKind::Sni if schema.has_tls => AnalysisPlan::Run(vec![unique_sni()]),
        AnalysisKind::Iot => AnalysisPlan::from_union(kind, iot(schema)),
        AnalysisKind::LinuxHosts => AnalysisPlan::from_union(kind, linux_hosts(schema)),
        AnalysisKind::FlowPairs => AnalysisPlan::Run(vec![flow_pairs()]),
        _ => AnalysisPlan::skipped(kind),
    }
}

fn rrname() -> Expr {
    Expr::element(RRNAME)
}

fn cloud(schema: &SchemaAvailability) -> AnalysisPlan {
    let mut candidates = Vec::new();
    if schema.has_tls {
        candidates.push(FieldRef::event(TLS_SNI));
        candidates.push(FieldRef::event(TLS_SUBJECT));
    }
    if schema.has_dns {
        candidates.push(FieldRef::event("dns.queries[0].rrname"));
    }
    if candidates.is_empty() {
        return AnalysisPlan::skipped(AnalysisKind::Cloud);
    }

    let domain = Expr::Coalesce(candidates);
    let query = Query::new(vec![Expr::event(fields::EVENT_TYPE), domain.clone()])
        .event_types(&[EventType::Tls, EventType::Dns])
        .filter(Predicate::And(vec![
            Predicate::not_null(domain.clone()),
            Predicate::contains_any(&domain, CLOUD_KEYWORDS),
        ]))
        .distinct();
    AnalysisPlan::Run(vec![query])
}

fn windows_dns() -> Query {
    Query::new(vec![Expr::event(fields::SRC_IP), rrname()])
        .event_types(&[EventType::Dns])
        .unnest(DNS_QUERIES)
        .filter(Predicate::And(vec![
            Predicate::not_null(rrname()),
            Predicate::contains_any(&rrname(), WINDOWS_INDICATORS),
        ]))
        .group_count()
}

fn dns_exploration() -> Query {
    Query::new(vec![rrname()])
        .event_types(&[EventType::Dns])
        .unnest(DNS_QUERIES)
        .filter(Predicate::not_null(rrname()))
        .group_count()
}

fn dns_servers() -> Query {
    // Port 53 traffic counts even when it was not decoded as dns
    Query::new(vec![Expr::event(fields::DEST_IP)])
        .filter(Predicate::And(vec![
            Predicate::Or(vec![
                Predicate::equals(Expr::event(fields::EVENT_TYPE), EventType::Dns.as_str()),
                Predicate::equals(Expr::event(fields::DEST_PORT), 53i64),
            ]),
            Predicate::not_null(Expr::event(fields::DEST_IP)),
        ]))
        .distinct()
}

fn unique_sni() -> Query {
    Query::new(vec![Expr::event(TLS_SNI)])
        .event_types(&[EventType::Tls])
        .filter(Predicate::not_null(Expr::event(TLS_SNI)))
        .distinct()
}

/// `(src_ip, label, detail)` keyword sub-query over one field
fn keyword_evidence(event_type: EventType, label: &str, detail: Expr, keywords: &[&str]) -> Query {
    let mut query = Query::new(vec![
        Expr::event(fields::SRC_IP),
        Expr::literal(label),
        detail.clone(),
    ])
    .event_types(&[event_type])
    .filter(Predicate::And(vec![
        Predicate::not_null(detail.clone()),
        Predicate::contains_any(&detail, keywords),
    ]));
    if event_type == EventType::Dns {
        query = query.unnest(DNS_QUERIES);
    }
    query
}

fn iot(schema: &SchemaAvailability) -> Vec<Query> {
    let mut queries = Vec::new();
    if schema.has_dns {
        queries.push(keyword_evidence(EventType::Dns, kinds::DNS, rrname(), IOT_KEYWORDS));
    }
    if schema.has_tls {
        queries.push(keyword_evidence(
            EventType::Tls,
            kinds::TLS_SNI,
            Expr::event(TLS_SNI),
            IOT_KEYWORDS,
        ));
        queries.push(keyword_evidence(
            EventType::Tls,
            kinds::TLS_SUBJECT,
            Expr::event(TLS_SUBJECT),
            IOT_KEYWORDS,
        ));
    }
    if schema.has_http {
        queries.push(keyword_evidence(
            EventType::Http,
            kinds::HTTP_HOST,
            Expr::event(HTTP_HOSTNAME),
            IOT_KEYWORDS,
        ));
        queries.push(keyword_evidence(
            EventType::Http,
            kinds::HTTP_UA,
            Expr::event(HTTP_USER_AGENT),
            IOT_KEYWORDS,
        ));
    }
    queries
}

/// `(src_ip, weight, evidence)` regex sub-query restricted to internal sources
fn weighted_evidence(
    event_type: EventType,
    weight: i64,
    evidence: Expr,
    regex: &regex::Regex,
) -> Query {
    let mut query = Query::new(vec![
        Expr::event(fields::SRC_IP),
        Expr::literal(weight),
        evidence.clone(),
    ])
    .event_types(&[event_type])
    .filter(Predicate::And(vec![
        Predicate::matches_regex(evidence, regex),
        Predicate::leaf(Expr::event(fields::SRC_IP), Matcher::PrivateAddress),
    ]));
    if event_type == EventType::Dns {
        query = query.unnest(DNS_QUERIES);
    }
    query
}

fn linux_hosts(schema: &SchemaAvailability) -> Vec<Query> {
    let mut queries = Vec::new();
    if schema.has_http {
        queries.push(weighted_evidence(
            EventType::Http,
            weights::HTTP_USER_AGENT,
            Expr::event(HTTP_USER_AGENT),
            &LINUX_USER_AGENT_REGEX,
        ));
        queries.push(weighted_evidence(
            EventType::Http,
            weights::HTTP_HOSTNAME,
            Expr::event(HTTP_HOSTNAME),
            &LINUX_DOMAINS_REGEX,
        ));
    }
    if schema.has_tls {
        queries.push(weighted_evidence(
            EventType::Tls,
            weights::TLS_SNI,
            Expr::event(TLS_SNI),
            &LINUX_DOMAINS_REGEX,
        ));
    }
    if schema.has_dns {
        queries.push(weighted_evidence(
            EventType::Dns,
            weights::DNS_RRNAME,
            rrname(),
            &LINUX_DOMAINS_REGEX,
        ));
    }
    queries
}

fn flow_pairs() -> Query {
    Query::new(vec![Expr::event(fields::SRC_IP), Expr::event(fields::DEST_IP)])
        .event_types(&[EventType::Flow])
        .filter(Predicate::And(vec![
            Predicate::not_null(Expr::event(fields::SRC_IP)),
            Predicate::not_null(Expr::event(fields::DEST_IP)),
            Predicate::not(Predicate::leaf(
                Expr::event(fields::DEST_IP),
                Matcher::PrivateAddress,
            )),
        ]))
        .group_count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Value;

    fn schema(http: bool, dns: bool, tls: bool) -> SchemaAvailability {
        SchemaAvailability {
            has_http: http,
            has_dns: dns,
            has_tls: tls,
        }
    }

    fn queries(plan: AnalysisPlan) -> Vec<Query> {
        match plan {
            AnalysisPlan::Run(queries) => queries,
            AnalysisPlan::Skipped { reason } => panic!("Unexpected skip: {}", reason),
        }
    }

    #[test]
    fn test_bare_schema_skips_payload_analyses() {
        let bare = schema(false, false, false);
        for kind in AnalysisKind::SEQUENCE {
            let result = plan(kind, &bare);
            assert_eq!(
                result.is_skipped(),
                kind != AnalysisKind::FlowPairs,
                "unexpected plan for {}",
                kind
            );
        }
    }

    #[test]
    fn test_skip_reason_names_columns() {
        match plan(AnalysisKind::Sni, &schema(true, true, false)) {
            AnalysisPlan::Skipped { reason } => {
                assert_eq!(reason, "no suitable columns (requires tls)")
            }
            AnalysisPlan::Run(_) => panic!("Expected skip"),
        }
    }

    #[test]
    fn test_cloud_coalesce_follows_schema() {
        let plan_queries = queries(plan(AnalysisKind::Cloud, &schema(false, true, false)));
        assert_eq!(plan_queries.len(), 1);
        match &plan_queries[0].projection[1] {
            Expr::Coalesce(candidates) => {
                let names: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
                assert_eq!(names, vec!["dns.queries[0].rrname"]);
            }
            other => panic!("Expected coalesce, got {:?}", other),
        }

        let plan_queries = queries(plan(AnalysisKind::Cloud, &schema(false, true, true)));
        match &plan_queries[0].projection[1] {
            Expr::Coalesce(candidates) => assert_eq!(candidates.len(), 3),
            other => panic!("Expected coalesce, got {:?}", other),
        }
        assert!(plan_queries[0].distinct);
    }

    #[test]
    fn test_windows_dns_unnests_queries() {
        let query = queries(plan(AnalysisKind::WindowsDns, &schema(false, true, false))).remove(0);
        assert_eq!(
            query.unnest.as_ref().map(|f| f.to_string()).as_deref(),
            Some("dns.queries")
        );
        assert_eq!(query.event_types, vec![EventType::Dns]);
        assert!(query.group_count);
    }

    #[test]
    fn test_iot_union_only_uses_available_fields() {
        let only_tls = queries(plan(AnalysisKind::Iot, &schema(false, false, true)));
        let labels: Vec<Value> = only_tls.iter().map(|q| literal(&q.projection[1])).collect();
        assert_eq!(
            labels,
            vec![Value::text(kinds::TLS_SNI), Value::text(kinds::TLS_SUBJECT)]
        );
        for query in &only_tls {
            let columns = query.referenced_columns();
            assert!(!columns.contains("dns"));
            assert!(!columns.contains("http"));
        }

        let everything = queries(plan(AnalysisKind::Iot, &schema(true, true, true)));
        assert_eq!(everything.len(), 5);
        assert!(everything[0].unnest.is_some());
    }

    #[test]
    fn test_linux_weights() {
        let all = queries(plan(AnalysisKind::LinuxHosts, &schema(true, true, true)));
        let weights: Vec<Value> = all.iter().map(|q| literal(&q.projection[1])).collect();
        assert_eq!(
            weights,
            vec![Value::Int(1), Value::Int(2), Value::Int(2), Value::Int(1)]
        );

        let dns_only = queries(plan(AnalysisKind::LinuxHosts, &schema(false, true, false)));
        assert_eq!(dns_only.len(), 1);
        assert_eq!(literal(&dns_only[0].projection[1]), Value::Int(weights::DNS_RRNAME));
    }

    #[test]
    fn test_flow_pairs_always_planned() {
        let query = queries(plan(AnalysisKind::FlowPairs, &schema(false, false, false))).remove(0);
        assert_eq!(query.event_types, vec![EventType::Flow]);
        assert!(query.group_count);
        let columns: Vec<String> = query.referenced_columns().into_iter().collect();
        assert_eq!(columns, vec!["dest_ip", "event_type", "src_ip"]);
    }

    fn literal(expr: &Expr) -> Value {
        match expr {
            Expr::Literal(value) => value.clone(),
            other => panic!("Expected literal, got {:?}", other),
        }
    }
}
