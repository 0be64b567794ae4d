//! Static gates: checks that need only the marketplace tree.
//!
//! - Preset, dashboard and theme schema
//! - Dashboard grid legality (12 columns)
//! - `card_type` naming (snake_case)
//! - Registry manifest self-consistency
//!
//! Files that failed to parse were reported by the loader and are skipped here.

use crate::core::diagnostics::DiagnosticSink;
use crate::core::error::GateError;
use crate::core::loader::{
    CARD_SOURCE_PATTERNS, ContentIndex, DASHBOARD_PATTERNS, PRESET_PATTERNS, REGISTRY_FILE,
    RegistryDoc, THEME_PATTERNS,
};
use crate::core::model::{Checked, Dashboard, GRID_COLUMNS, Preset, RegistryManifest, Theme};
use crate::gates::trace_gate;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

/// Segment of a download URL that precedes the repository-relative path.
static DOWNLOAD_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/main/(.+)$").unwrap());

fn report_issues<T>(sink: &mut DiagnosticSink, category: &str, rel: &str, checked: &Checked<T>) {
    for issue in &checked.issues {
        sink.push(issue.severity, category, issue.render(rel));
    }
}

pub fn check_preset_schema(index: &ContentIndex, sink: &mut DiagnosticSink) -> Result<(), GateError> {
    trace_gate("preset-schema");
    for (rel, doc) in index.select(PRESET_PATTERNS)? {
        report_issues(sink, "preset-schema", rel, &Preset::from_json(doc));
    }
    Ok(())
}

/// Dashboard schema plus grid overflow (`dashboard-grid`).
pub fn check_dashboard_schema(
    index: &ContentIndex,
    sink: &mut DiagnosticSink,
) -> Result<(), GateError> {
    trace_gate("dashboard-schema");
    for (rel, doc) in index.select(DASHBOARD_PATTERNS)? {
        let checked = Dashboard::from_json(doc);
        report_issues(sink, "dashboard-schema", rel, &checked);

        for card in checked.value.cards.iter().flatten() {
            if let Some((x, w, end)) = card.grid_overflow() {
                sink.error(
                    "dashboard-grid",
                    format!(
                        "`{}` cards[{}] ({}): x({}) + w({}) = {} > {} (grid overflow)",
                        rel,
                        card.index,
                        card.card_type.as_deref().unwrap_or("?"),
                        x,
                        w,
                        end,
                        GRID_COLUMNS
                    ),
                );
            }
        }
    }
    Ok(())
}

pub fn check_theme_schema(index: &ContentIndex, sink: &mut DiagnosticSink) -> Result<(), GateError> {
    trace_gate("theme-schema");
    for (rel, doc) in index.select(THEME_PATTERNS)? {
        report_issues(sink, "theme-schema", rel, &Theme::from_json(doc));
    }
    Ok(())
}

/// `card_type` values as written in one preset or dashboard, in document order.
fn card_types_in(doc: &serde_json::Value) -> Vec<String> {
    let mut out = Vec::new();
    let preset = Preset::from_json(doc);
    if !preset.value.card_type.is_empty() {
        out.push(preset.value.card_type);
    }
    let dashboard = Dashboard::from_json(doc);
    out.extend(dashboard.value.card_types().map(str::to_string));
    out
}

/// Every card type referenced by presets and dashboards, sorted.
pub fn marketplace_card_types(index: &ContentIndex) -> Result<BTreeSet<String>, GateError> {
    let mut types = BTreeSet::new();
    for (_, doc) in index.select(CARD_SOURCE_PATTERNS)? {
        types.extend(card_types_in(doc));
    }
    Ok(types)
}

/// Snake-case suggestion for a hyphenated card type, `None` when already valid.
pub fn snake_case_suggestion(card_type: &str) -> Option<String> {
    card_type
        .contains('-')
        .then(|| card_type.replace('-', "_"))
}

pub fn check_naming_conventions(
    index: &ContentIndex,
    sink: &mut DiagnosticSink,
) -> Result<(), GateError> {
    trace_gate("naming");
    for (rel, doc) in index.select(CARD_SOURCE_PATTERNS)? {
        for card_type in card_types_in(doc) {
            if let Some(suggested) = snake_case_suggestion(&card_type) {
                sink.error(
                    "naming",
                    format!(
                        "`{}`: card_type '{}' uses hyphens, must be snake_case: '{}'",
                        rel, card_type, suggested
                    ),
                );
            }
        }
    }
    Ok(())
}

pub fn check_registry_consistency(
    index: &ContentIndex,
    sink: &mut DiagnosticSink,
) -> Result<(), GateError> {
    trace_gate("registry");
    let doc = match index.registry() {
        RegistryDoc::Parsed(doc) => doc,
        RegistryDoc::Unparsable => return Ok(()),
        RegistryDoc::Missing => {
            sink.error(
                "registry",
                format!(
                    "{}: File not found: {}",
                    REGISTRY_FILE,
                    index.root().join(REGISTRY_FILE).display()
                ),
            );
            return Ok(());
        }
    };

    let root = index.root();
    let manifest = RegistryManifest::from_json(doc);
    let mut seen: HashSet<&str> = HashSet::new();

    for item in &manifest.items {
        if !seen.insert(item.id.as_str()) {
            sink.error(
                "registry",
                format!("Duplicate id '{}' in {}", item.id, REGISTRY_FILE),
            );
        }

        let candidates = item.kind.expected_paths(&item.id);
        if !candidates.is_empty() && !candidates.iter().any(|c| root.join(c).is_file()) {
            let location = if candidates.len() == 1 {
                format!("at {}", candidates[0])
            } else {
                "in presets/ or card-presets/".to_string()
            };
            sink.error(
                "registry",
                format!(
                    "Registry entry '{}' ({}) has no file {}",
                    item.id,
                    item.kind.as_str(),
                    location
                ),
            );
        }

        if let Some(url) = &item.download_url
            && let Some(caps) = DOWNLOAD_PATH.captures(url)
        {
            let url_path = &caps[1];
            if !root.join(url_path).is_file() {
                sink.error(
                    "registry",
                    format!(
                        "Registry '{}': downloadUrl path '{}' does not match any file",
                        item.id, url_path
                    ),
                );
            }
        }
    }

    sink.pass(
        "registry",
        format!(
            "Checked {} registry entries, {} unique IDs",
            manifest.items.len(),
            seen.len()
        ),
    );
    Ok(())
}

/// All static gates in their fixed order.
pub fn run_static_gates(index: &ContentIndex, sink: &mut DiagnosticSink) -> Result<(), GateError> {
    check_preset_schema(index, sink)?;
    check_dashboard_schema(index, sink)?;
    check_theme_schema(index, sink)?;
    check_naming_conventions(index, sink)?;
    check_registry_consistency(index, sink)?;
    Ok(())
}
