//! Report rendering. Every function here is a pure projection of the final
//! sink state (plus, for the matrix, the extracted registry).

use crate::core::config::GateConfig;
use crate::core::diagnostics::{DiagnosticSink, Severity};
use crate::core::extractor::CardRegistry;
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeSet;

const SEVERITY_ORDER: [Severity; 4] = [
    Severity::Error,
    Severity::Warning,
    Severity::Info,
    Severity::Pass,
];

/// Matrix columns after `in_console`: (header, diagnostic category).
const MATRIX_COLUMNS: [(&str, &str); 4] = [
    ("demo_data", "demo-data"),
    ("isDemoData", "isDemoData"),
    ("failures", "consecutiveFailures"),
    ("i18n", "i18n"),
];

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct JsonEntry {
    pub category: String,
    pub message: String,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct JsonReport {
    pub errors: Vec<JsonEntry>,
    pub warnings: Vec<JsonEntry>,
    pub info: Vec<JsonEntry>,
    pub passes: Vec<JsonEntry>,
    pub exit_code: i32,
}

impl JsonReport {
    pub fn from_sink(sink: &DiagnosticSink) -> Self {
        let bucket = |severity| {
            sink.with_severity(severity)
                .map(|d| JsonEntry {
                    category: d.category.clone(),
                    message: d.message.clone(),
                })
                .collect()
        };
        Self {
            errors: bucket(Severity::Error),
            warnings: bucket(Severity::Warning),
            info: bucket(Severity::Info),
            passes: bucket(Severity::Pass),
            exit_code: sink.exit_code(),
        }
    }
}

fn result_line(sink: &DiagnosticSink) -> String {
    format!(
        "{} error(s), {} warning(s), {} passed",
        sink.errors(),
        sink.warnings(),
        sink.passes()
    )
}

/// Plain-text dump grouped by severity, followed by the result line.
pub fn render_text(sink: &DiagnosticSink, colorize: bool) -> String {
    let mut out = String::new();
    for severity in SEVERITY_ORDER {
        for d in sink.with_severity(severity) {
            let tag = severity.tag();
            let tag = if colorize {
                match severity {
                    Severity::Error => tag.bright_red().bold().to_string(),
                    Severity::Warning => tag.bright_yellow().to_string(),
                    Severity::Info => tag.bright_blue().to_string(),
                    Severity::Pass => tag.bright_green().to_string(),
                }
            } else {
                tag.to_string()
            };
            out.push_str(&format!("  {} [{}] {}\n", tag, d.category, d.message));
        }
    }
    out.push('\n');
    out.push_str(&format!("Result: {}\n", result_line(sink)));
    out
}

pub fn render_json(sink: &DiagnosticSink) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonReport::from_sink(sink))
}

/// Markdown digest for CI job summaries. Passes are counted, not listed.
pub fn render_markdown(sink: &DiagnosticSink) -> String {
    let mut lines = vec![
        format!("### Marketplace Quality: {}", result_line(sink)),
        String::new(),
    ];
    for (severity, heading) in [
        (Severity::Error, "Errors"),
        (Severity::Warning, "Warnings"),
        (Severity::Info, "Info"),
    ] {
        if sink.count(severity) == 0 {
            continue;
        }
        lines.push(format!("#### {}", heading));
        for d in sink.with_severity(severity) {
            lines.push(format!("- **[{}]** {}", d.category, d.message));
        }
        lines.push(String::new());
    }
    lines.join("\n")
}

/// Per-card-type quality table over every marketplace card type.
///
/// `Y` pass, `N` issue found, `~` dynamic card, `-` not applicable.
pub fn render_quality_matrix(
    marketplace_types: &BTreeSet<String>,
    registry: &CardRegistry,
    config: &GateConfig,
    sink: &DiagnosticSink,
) -> String {
    let mut header = "| card_type | in_console |".to_string();
    let mut rule = "|-----------|:----------:|".to_string();
    for (title, _) in MATRIX_COLUMNS {
        header.push_str(&format!(" {} |", title));
        rule.push_str(&format!(":{}:|", "-".repeat(title.len())));
    }
    let mut lines = vec![
        "### Card Quality Matrix".to_string(),
        String::new(),
        header,
        rule,
    ];

    for card_type in marketplace_types {
        let registered = registry.contains(card_type);
        let dynamic = !registered && config.is_dynamic(card_type);
        let presence = if registered {
            "Y"
        } else if dynamic {
            "~"
        } else {
            "N"
        };

        let mut row = format!("| `{}` | {} |", card_type, presence);
        for (_, category) in MATRIX_COLUMNS {
            let cell = if sink.has_issue(category, card_type) {
                "N"
            } else if registered {
                "Y"
            } else if dynamic {
                "~"
            } else {
                "-"
            };
            row.push_str(&format!(" {} |", cell));
        }
        lines.push(row);
    }

    lines.push(String::new());
    lines.push(
        "Key: Y=pass, N=issue found, ~=dynamic card (expected), -=not applicable".to_string(),
    );
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DiagnosticSink {
        let mut sink = DiagnosticSink::new();
        sink.pass("json-syntax", "`registry.json` valid");
        sink.warn("i18n", "`pod_status` has no translation keys in cards.json");
        sink.error("naming", "`presets/a.json`: card_type 'a-b' uses hyphens");
        sink.note("cncf-coverage", "2 CNCF presets reference unimplemented card types");
        sink
    }

    #[test]
    fn test_text_groups_by_severity() {
        let text = render_text(&sample(), false);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("  ERROR [naming]"));
        assert!(lines[1].starts_with("  WARN  [i18n]"));
        assert!(lines[2].starts_with("  INFO  [cncf-coverage]"));
        assert!(lines[3].starts_with("  OK    [json-syntax]"));
        assert_eq!(lines.last(), Some(&"Result: 1 error(s), 1 warning(s), 1 passed"));
    }

    #[test]
    fn test_json_report_shape() {
        let sink = sample();
        let value: serde_json::Value = serde_json::from_str(&render_json(&sink).unwrap()).unwrap();
        assert_eq!(value["exit_code"], 1);
        assert_eq!(value["errors"][0]["category"], "naming");
        assert_eq!(value["warnings"].as_array().unwrap().len(), 1);
        assert_eq!(value["info"].as_array().unwrap().len(), 1);
        assert_eq!(value["passes"][0]["message"], "`registry.json` valid");
    }

    #[test]
    fn test_markdown_skips_passes() {
        let md = render_markdown(&sample());
        assert!(md.starts_with("### Marketplace Quality: 1 error(s), 1 warning(s), 1 passed"));
        assert!(md.contains("#### Errors\n- **[naming]**"));
        assert!(md.contains("#### Info"));
        assert!(!md.contains("json-syntax"));
    }

    #[test]
    fn test_rendering_does_not_mutate() {
        let sink = sample();
        let before = sink.all().to_vec();
        let _ = render_text(&sink, true);
        let _ = render_markdown(&sink);
        let _ = render_json(&sink);
        assert_eq!(sink.all(), before.as_slice());
    }

    #[test]
    fn test_quality_matrix_cells() {
        let registry = CardRegistry::parse(
            "const RAW_CARD_COMPONENTS = {\n  pod_status: PodStatusCard,\n  node_health: NodeHealthCard,\n}\n",
        );
        let types: BTreeSet<String> = ["custom_status", "node_health", "pod_status", "widget"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut sink = DiagnosticSink::new();
        sink.warn("i18n", "`pod_status` has no translation keys in cards.json");
        sink.warn("demo-data", "`node_health` (NodeHealthCard) missing demoData.ts in x");

        let table = render_quality_matrix(&types, &registry, &GateConfig::default(), &sink);
        assert!(table.contains("| `custom_status` | ~ | ~ | ~ | ~ | ~ |"));
        assert!(table.contains("| `node_health` | Y | N | Y | Y | Y |"));
        assert!(table.contains("| `pod_status` | Y | Y | Y | Y | N |"));
        assert!(table.contains("| `widget` | N | - | - | - | - |"));
        assert!(table.ends_with("-=not applicable"));
    }

    #[test]
    fn test_quality_matrix_prefix_types_are_independent() {
        let registry = CardRegistry::parse(
            "const RAW_CARD_COMPONENTS = {\n  pod: PodCard,\n  pod_status: PodStatusCard,\n}\n",
        );
        let types: BTreeSet<String> = ["pod", "pod_status"].iter().map(|s| s.to_string()).collect();
        let mut sink = DiagnosticSink::new();
        sink.warn("i18n", "`pod_status` has no translation keys in cards.json");

        let table = render_quality_matrix(&types, &registry, &GateConfig::default(), &sink);
        assert!(table.contains("| `pod` | Y | Y | Y | Y | Y |"));
        assert!(table.contains("| `pod_status` | Y | Y | Y | Y | N |"));
    }
}
