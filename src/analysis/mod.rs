//! Analysis orchestrator
//!
//! Runs the fixed analysis sequence against one event store: plan each
//! analysis from the probed schema, execute its queries, aggregate and
//! append the section to the report. A failing query only empties its
//! own section.

use crate::engine::{self, DisplayLimits};
use crate::models::{AnalysisKind, Row};
use crate::query::{plan, AnalysisPlan, Query};
use crate::report::{self, Report, Section, SectionBody};
use crate::schema::SchemaAvailability;
use crate::store::{EventStore, QueryError};
use tracing::{debug, info, warn};

const TARGET_ANALYSIS: &str = "analysis";

pub struct Analyzer<'a> {
    store: &'a dyn EventStore,
    schema: SchemaAvailability,
    limits: DisplayLimits,
}

impl<'a> Analyzer<'a> {
    pub fn new(store: &'a dyn EventStore, schema: SchemaAvailability, limits: DisplayLimits) -> Self {
        Self {
            store,
            schema,
            limits,
        }
    }

    fn execute(&self, queries: &[Query]) -> Result<Vec<Row>, QueryError> {
        match queries {
            [single] => self.store.query(single),
            many => self.store.query_union(many),
        }
    }

    /// Run one analysis and build its section
    pub fn run_one(&self, kind: AnalysisKind) -> Section {
        let title = report::title(kind, &self.limits);

        let body = match plan(kind, &self.schema) {
            AnalysisPlan::Skipped { reason } => {
                info!(target: TARGET_ANALYSIS, analysis = %kind, reason = %reason, "Analysis skipped");
                SectionBody::Skipped(reason)
            }
            AnalysisPlan::Run(queries) => {
                info!(target: TARGET_ANALYSIS, analysis = %kind, "Running analysis");
                debug!(target: TARGET_ANALYSIS, analysis = %kind, queries = queries.len(), "Plan built");

                let rows = self.execute(&queries).unwrap_or_else(|e| {
                    warn!(target: TARGET_ANALYSIS, analysis = %kind, error = %e, "Query failed; section left empty");
                    Vec::new()
                });
                debug!(target: TARGET_ANALYSIS, analysis = %kind, rows = rows.len(), "Query returned");

                SectionBody::Completed(engine::classify(kind, rows, &self.limits))
            }
        };

        Section { kind, title, body }
    }

    /// Run every analysis in report order
    pub fn run(&self) -> Report {
        let mut report = Report::new(self.store.source(), self.limits);
        for kind in AnalysisKind::SEQUENCE {
            report.push(self.run_one(kind));
        }
        info!(target: TARGET_ANALYSIS, sections = report.sections.len(), "Analyses complete");
        report
    }
}
