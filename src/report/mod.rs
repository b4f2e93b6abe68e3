//! Markdown report formatter
//!
//! Renders aggregated classification results into the analyst log: one
//! `##` section per analysis, each closed by a `---` separator.

use crate::engine::{Classification, DisplayLimits, Group, ListResult};
use crate::models::{AnalysisKind, Row};
use crate::utils::report_timestamp;
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Outcome of one analysis step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionBody {
    /// Required columns were absent; carries the skip reason
    Skipped(String),
    Completed(Classification),
}

/// One rendered analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: AnalysisKind,
    pub title: String,
    pub body: SectionBody,
}

/// Section heading for an analysis
pub fn title(kind: AnalysisKind, limits: &DisplayLimits) -> String {
    match kind {
        AnalysisKind::Cloud => "Cloud Destinations".to_string(),
        AnalysisKind::WindowsDns => "Windows DNS Analysis".to_string(),
        AnalysisKind::DnsExploration => format!("Top {} DNS Queries", limits.list),
        AnalysisKind::DnsServers => "DNS Servers (Dest IPs)".to_string(),
        AnalysisKind::Sni => "Unique SNIs".to_string(),
        AnalysisKind::Iot => "IoT Device Analysis".to_string(),
        AnalysisKind::LinuxHosts => "Linux Host Analysis".to_string(),
        AnalysisKind::FlowPairs => "Flow Pair Analysis (Public Dest IPs)".to_string(),
    }
}

fn empty_line(kind: AnalysisKind) -> &'static str {
    match kind {
        AnalysisKind::WindowsDns => "No Windows activity found.",
        AnalysisKind::Iot => "No IoT devices found.",
        AnalysisKind::LinuxHosts => "No Linux hosts identified.",
        AnalysisKind::FlowPairs => "No flow pairs found.",
        _ => "No results found.",
    }
}

fn joined(row: &Row) -> String {
    row.iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn remainder_line(out: &mut String, remainder: usize) {
    if remainder > 0 {
        let _ = writeln!(out, "- ... ({} more)", remainder);
    }
}

fn render_list(out: &mut String, kind: AnalysisKind, list: &ListResult) {
    for row in &list.rows {
        let line = match kind {
            AnalysisKind::DnsExploration => match row.as_slice() {
                [name, count, ..] => format!("{}: {}", count, name),
                _ => joined(row),
            },
            _ => joined(row),
        };
        let _ = writeln!(out, "- {}", line);
    }
    remainder_line(out, list.remainder);
}

fn render_groups(out: &mut String, kind: AnalysisKind, groups: &[Group]) {
    for group in groups {
        match (kind, group.score) {
            (AnalysisKind::LinuxHosts, Some(score)) => {
                let _ = writeln!(out, "### Host: {} (Score: {})", group.subject, score);
            }
            _ => {
                let _ = writeln!(out, "### Source IP: {}", group.subject);
            }
        }
        for evidence in &group.evidence {
            let _ = writeln!(out, "- {}", evidence);
        }
        remainder_line(out, group.remainder);
        out.push('\n');
    }
}

fn render_flow_view(out: &mut String, heading: &str, limit: usize, list: &ListResult) {
    let _ = writeln!(out, "### {} {} Source/Dest Pairs\n", heading, limit);
    if list.rows.is_empty() {
        let _ = writeln!(out, "{}", empty_line(AnalysisKind::FlowPairs));
    }
    for row in &list.rows {
        match row.as_slice() {
            [src, dest, count, ..] => {
                let _ = writeln!(out, "- {} -> {} (flows: {})", src, dest, count);
            }
            _ => {
                let _ = writeln!(out, "- {}", joined(row));
            }
        }
    }
    remainder_line(out, list.remainder);
    out.push('\n');
}

/// Render one section, including its trailing separator
pub fn render_section(section: &Section, limits: &DisplayLimits) -> String {
    let mut out = format!("## {}\n\n", section.title);

    match &section.body {
        SectionBody::Skipped(reason) => {
            let _ = writeln!(out, "Skipped: {}.\n", reason);
        }
        SectionBody::Completed(Classification::FlowPairs { top, bottom }) => {
            render_flow_view(&mut out, "Top", limits.flow_pairs, top);
            render_flow_view(&mut out, "Bottom", limits.flow_pairs, bottom);
        }
        SectionBody::Completed(result) if result.is_empty() => {
            let _ = writeln!(out, "{}\n", empty_line(section.kind));
        }
        SectionBody::Completed(Classification::List(list)) => {
            render_list(&mut out, section.kind, list);
            out.push('\n');
        }
        SectionBody::Completed(Classification::Grouped(groups)) => {
            render_groups(&mut out, section.kind, groups);
        }
    }

    out.push_str("---\n\n");
    out
}

/// Complete analyst log for one run
#[derive(Debug, Clone)]
pub struct Report {
    pub generated_at: DateTime<Local>,
    pub source: PathBuf,
    pub limits: DisplayLimits,
    pub sections: Vec<Section>,
}

impl Report {
    pub fn new(source: &Path, limits: DisplayLimits) -> Self {
        Self {
            generated_at: Local::now(),
            source: source.to_path_buf(),
            limits,
            sections: Vec::new(),
        }
    }

    pub fn push(&mut self, section: Section) {
        self.sections.push(section);
    }

    pub fn render(&self) -> String {
        let mut out = format!(
            "# Analyst Log - {}\n\nData Source: `{}`\n\n",
            report_timestamp(&self.generated_at),
            self.source.display()
        );
        for section in &self.sections {
            out.push_str(&render_section(section, &self.limits));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Value;
    use chrono::TimeZone;

    fn section(kind: AnalysisKind, body: SectionBody) -> Section {
        Section {
            kind,
            title: title(kind, &DisplayLimits::default()),
            body,
        }
    }

    #[test]
    fn test_skipped_section() {
        let text = render_section(
            &section(
                AnalysisKind::Sni,
                SectionBody::Skipped("no suitable columns (requires tls)".to_string()),
            ),
            &DisplayLimits::default(),
        );
        assert_eq!(
            text,
            "## Unique SNIs\n\nSkipped: no suitable columns (requires tls).\n\n---\n\n"
        );
    }

    #[test]
    fn test_list_section_with_remainder() {
        let list = ListResult {
            rows: vec![vec![Value::text("tls"), Value::text("s3.amazonaws.com")]],
            remainder: 4,
        };
        let text = render_section(
            &section(
                AnalysisKind::Cloud,
                SectionBody::Completed(Classification::List(list)),
            ),
            &DisplayLimits::default(),
        );
        assert_eq!(
            text,
            "## Cloud Destinations\n\n- tls, s3.amazonaws.com\n- ... (4 more)\n\n---\n\n"
        );
    }

    #[test]
    fn test_dns_exploration_lines() {
        let list = ListResult {
            rows: vec![vec![Value::text("example.com"), Value::Int(12)]],
            remainder: 7,
        };
        let text = render_section(
            &section(
                AnalysisKind::DnsExploration,
                SectionBody::Completed(Classification::List(list)),
            ),
            &DisplayLimits::default(),
        );
        assert_eq!(
            text,
            "## Top 50 DNS Queries\n\n- 12: example.com\n- ... (7 more)\n\n---\n\n"
        );
    }

    #[test]
    fn test_empty_sections_use_analysis_message() {
        let limits = DisplayLimits::default();
        let windows = render_section(
            &section(
                AnalysisKind::WindowsDns,
                SectionBody::Completed(Classification::Grouped(Vec::new())),
            ),
            &limits,
        );
        assert!(windows.contains("No Windows activity found.\n"));

        let linux = render_section(
            &section(
                AnalysisKind::LinuxHosts,
                SectionBody::Completed(Classification::Grouped(Vec::new())),
            ),
            &limits,
        );
        assert!(linux.contains("No Linux hosts identified.\n"));
    }

    #[test]
    fn test_linux_group_heading() {
        let group = Group {
            subject: "10.0.0.5".to_string(),
            evidence: vec!["archive.ubuntu.com".to_string()],
            score: Some(3),
            remainder: 2,
        };
        let text = render_section(
            &section(
                AnalysisKind::LinuxHosts,
                SectionBody::Completed(Classification::Grouped(vec![group])),
            ),
            &DisplayLimits::default(),
        );
        assert_eq!(
            text,
            "## Linux Host Analysis\n\n### Host: 10.0.0.5 (Score: 3)\n- archive.ubuntu.com\n- ... (2 more)\n\n---\n\n"
        );
    }

    #[test]
    fn test_flow_pair_views() {
        let top = ListResult {
            rows: vec![vec![
                Value::text("10.0.0.1"),
                Value::text("8.8.8.8"),
                Value::Int(2),
            ]],
            remainder: 0,
        };
        let text = render_section(
            &section(
                AnalysisKind::FlowPairs,
                SectionBody::Completed(Classification::FlowPairs {
                    top: top.clone(),
                    bottom: top,
                }),
            ),
            &DisplayLimits::default(),
        );
        assert!(text.starts_with(
            "## Flow Pair Analysis (Public Dest IPs)\n\n### Top 25 Source/Dest Pairs\n\n- 10.0.0.1 -> 8.8.8.8 (flows: 2)\n\n"
        ));
        assert!(text.contains("### Bottom 25 Source/Dest Pairs\n\n- 10.0.0.1 -> 8.8.8.8 (flows: 2)\n"));
        assert!(text.ends_with("---\n\n"));
    }

    #[test]
    fn test_flow_pair_views_report_remainder() {
        let rows: Vec<Row> = (0..27)
            .map(|i| {
                vec![
                    Value::text("10.0.0.1"),
                    Value::text(format!("203.0.113.{}", i)),
                    Value::Int(1),
                ]
            })
            .collect();
        let limits = DisplayLimits::default();
        let (top, bottom) = crate::engine::flow_pairs(rows, limits.flow_pairs);
        assert_eq!(top.rows.len(), 25);
        assert_eq!(top.remainder, 2);

        let text = render_section(
            &section(
                AnalysisKind::FlowPairs,
                SectionBody::Completed(Classification::FlowPairs { top, bottom }),
            ),
            &limits,
        );
        assert_eq!(text.matches("- ... (2 more)\n").count(), 2);
        assert!(text.contains("(flows: 1)\n- ... (2 more)\n\n### Bottom 25 Source/Dest Pairs"));
    }

    #[test]
    fn test_empty_flow_pairs() {
        let text = render_section(
            &section(
                AnalysisKind::FlowPairs,
                SectionBody::Completed(Classification::FlowPairs {
                    top: ListResult::default(),
                    bottom: ListResult::default(),
                }),
            ),
            &DisplayLimits::default(),
        );
        assert_eq!(text.matches("No flow pairs found.").count(), 2);
    }

    #[test]
    fn test_report_header() {
        let mut report = Report::new(Path::new("logs/eve.json"), DisplayLimits::default());
        report.generated_at = Local.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(
            report.render(),
            "# Analyst Log - 2025-03-04 05:06:07\n\nData Source: `logs/eve.json`\n\n"
        );
    }
}
