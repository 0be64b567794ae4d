//! Cross-repo gates: marketplace content checked against a console checkout.
//!
//! Card-type existence produces the known-type set. Every per-card gate after
//! it walks only that set, and skips (silently) any type whose component or
//! import path the extractor could not resolve. The network-isolation scan is
//! the exception: it covers every hook file regardless of card type.

use crate::core::config::{ConsoleLayout, GateConfig};
use crate::core::diagnostics::DiagnosticSink;
use crate::core::error::GateError;
use crate::core::extractor::CardRegistry;
use crate::core::loader::{discover, load_json, rel_path};
use crate::gates::trace_gate;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

const LOADING_HOOK: &str = "useCardLoadingState";
const DEMO_FLAG: &str = "isDemoData";
const FAILURE_COUNTER: &str = "consecutiveFailures";
const DEMO_DATA_FILES: &[&str] = &["demoData.ts", "demoData.tsx"];
const PROXY_ROUTE: &str = "/api/proxy/";

/// Loading-state hook call whose argument window mentions the demo flag.
static DEMO_WIRED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:useCardLoadingState|useReportCardDataState)\([^)]*isDemoData").unwrap()
});
static CACHED_HOOK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"useCached\w+").unwrap());
static EXTERNAL_FETCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:\bfetch|\baxios\.\w+)\(\s*['"`]https?://([^'"`]*)"#).unwrap()
});

/// Resolved locations inside one console checkout.
pub struct Console<'a> {
    pub root: &'a Path,
    pub layout: &'a ConsoleLayout,
}

impl<'a> Console<'a> {
    pub fn new(root: &'a Path, layout: &'a ConsoleLayout) -> Self {
        Self { root, layout }
    }

    pub fn registry_source(&self) -> PathBuf {
        self.root.join(&self.layout.registry_source)
    }

    /// Directory that lazy import paths are relative to.
    pub fn cards_dir(&self) -> PathBuf {
        let source = self.registry_source();
        source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.to_path_buf())
    }

    pub fn hooks_dir(&self) -> PathBuf {
        self.root.join(&self.layout.hooks_dir)
    }

    pub fn locale_file(&self) -> PathBuf {
        self.root.join(&self.layout.locale_file)
    }
}

/// Extracts the console card registry. A missing or unreadable source is one
/// `card-type` error and `None`; downstream gates then see an empty known set.
pub fn load_console_registry(console: &Console<'_>, sink: &mut DiagnosticSink) -> Option<CardRegistry> {
    let path = console.registry_source();
    if !path.is_file() {
        sink.error(
            "card-type",
            format!("Console card registry not found at {}", path.display()),
        );
        return None;
    }
    match CardRegistry::from_file(&path) {
        Ok(registry) => Some(registry),
        Err(e) => {
            sink.error(
                "card-type",
                format!("Console card registry unreadable at {}: {}", path.display(), e),
            );
            None
        }
    }
}

/// Records one diagnostic per marketplace card type and returns the known set:
/// registered types plus dynamic ones. Unknown types are left out.
pub fn check_card_type_existence(
    marketplace_types: &BTreeSet<String>,
    registry: Option<&CardRegistry>,
    config: &GateConfig,
    sink: &mut DiagnosticSink,
) -> BTreeSet<String> {
    trace_gate("card-type");
    let mut known = BTreeSet::new();
    let Some(registry) = registry else {
        return known;
    };

    for card_type in marketplace_types {
        if registry.contains(card_type) {
            sink.pass(
                "card-type",
                format!("`{}` exists in console registry", card_type),
            );
            known.insert(card_type.clone());
        } else if config.is_dynamic(card_type) {
            sink.warn(
                "card-type",
                format!(
                    "`{}` not in console registry (expected CNCF dynamic card)",
                    card_type
                ),
            );
            known.insert(card_type.clone());
        } else {
            sink.error(
                "card-type",
                format!(
                    "`{}` not found in console registry (not a recognized card type)",
                    card_type
                ),
            );
        }
    }
    known
}

/// A known card type whose component directory could be resolved.
struct ResolvedCard<'r> {
    card_type: &'r str,
    component: &'r str,
    dir: PathBuf,
}

fn resolved_cards<'r>(
    console: &Console<'_>,
    registry: &'r CardRegistry,
    known: &'r BTreeSet<String>,
) -> Vec<ResolvedCard<'r>> {
    let cards_dir = console.cards_dir();
    known
        .iter()
        .filter_map(|card_type| {
            let (component, import_path) = registry.resolve(card_type)?;
            Some(ResolvedCard {
                card_type,
                component,
                dir: cards_dir.join(import_path),
            })
        })
        .collect()
}

/// Non-test, non-demo-data `.ts`/`.tsx` sources directly inside `dir`, sorted.
fn component_sources(dir: &Path) -> Result<Vec<String>, GateError> {
    let sources = discover(dir, &["*.ts", "*.tsx"])?
        .into_iter()
        .filter(|p| {
            let name = p.file_name().and_then(|n| n.to_str()).unwrap_or("");
            !name.ends_with(".test.ts") && !name.ends_with(".test.tsx") && !name.contains("demoData")
        })
        .filter_map(|p| fs::read_to_string(p).ok())
        .collect();
    Ok(sources)
}

pub fn check_demo_data(
    console: &Console<'_>,
    registry: &CardRegistry,
    known: &BTreeSet<String>,
    sink: &mut DiagnosticSink,
) {
    trace_gate("demo-data");
    for card in resolved_cards(console, registry, known) {
        // Single-file components have nowhere to keep demo data.
        if !card.dir.is_dir() {
            continue;
        }
        if DEMO_DATA_FILES.iter().any(|f| card.dir.join(f).is_file()) {
            sink.pass("demo-data", format!("`{}` has demoData.ts", card.card_type));
        } else {
            sink.warn(
                "demo-data",
                format!(
                    "`{}` ({}) missing demoData.ts in {}",
                    card.card_type,
                    card.component,
                    rel_path(console.root, &card.dir)
                ),
            );
        }
    }
}

pub fn check_demo_data_wiring(
    console: &Console<'_>,
    registry: &CardRegistry,
    known: &BTreeSet<String>,
    sink: &mut DiagnosticSink,
) -> Result<(), GateError> {
    trace_gate("isDemoData");
    for card in resolved_cards(console, registry, known) {
        let sources = component_sources(&card.dir)?;
        let uses_hook = sources.iter().any(|s| s.contains(LOADING_HOOK));
        let wired = sources.iter().any(|s| DEMO_WIRED.is_match(s));
        if uses_hook && !wired {
            sink.warn(
                DEMO_FLAG,
                format!(
                    "`{}` ({}) calls {} but does not pass {}",
                    card.card_type, card.component, LOADING_HOOK, DEMO_FLAG
                ),
            );
        }
    }
    Ok(())
}

pub fn check_consecutive_failures(
    console: &Console<'_>,
    registry: &CardRegistry,
    known: &BTreeSet<String>,
    sink: &mut DiagnosticSink,
) -> Result<(), GateError> {
    trace_gate("consecutiveFailures");
    for card in resolved_cards(console, registry, known) {
        let sources = component_sources(&card.dir)?;
        let uses_cached = sources.iter().any(|s| CACHED_HOOK.is_match(s));
        let forwards = sources.iter().any(|s| s.contains(FAILURE_COUNTER));
        if uses_cached && !forwards {
            sink.warn(
                FAILURE_COUNTER,
                format!(
                    "`{}` ({}) uses useCached* hook but does not reference {}",
                    card.card_type, card.component, FAILURE_COUNTER
                ),
            );
        }
    }
    Ok(())
}

/// Dotted leaf keys of a translation table, plus its top-level keys.
pub fn flatten_translation_keys(table: &Value) -> BTreeSet<String> {
    fn walk(value: &Value, prefix: &str, out: &mut BTreeSet<String>) {
        match value {
            Value::Object(map) => {
                for (k, v) in map {
                    let key = if prefix.is_empty() {
                        k.clone()
                    } else {
                        format!("{}.{}", prefix, k)
                    };
                    walk(v, &key, out);
                }
            }
            _ => {
                out.insert(prefix.to_string());
            }
        }
    }

    let mut keys = BTreeSet::new();
    walk(table, "", &mut keys);
    if let Value::Object(map) = table {
        keys.extend(map.keys().cloned());
    }
    keys.remove("");
    keys
}

fn has_translation(keys: &BTreeSet<String>, card_type: &str) -> bool {
    let dotted = format!("{}.", card_type);
    let underscored = format!("{}_", card_type);
    keys.iter()
        .any(|k| k == card_type || k.starts_with(&dotted) || k.starts_with(&underscored))
}

pub fn check_i18n_keys(console: &Console<'_>, known: &BTreeSet<String>, sink: &mut DiagnosticSink) {
    trace_gate("i18n");
    let path = console.locale_file();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "translation file".to_string());
    if !path.is_file() {
        sink.warn(
            "i18n",
            format!("Console {} not found, skipping i18n check", file_name),
        );
        return;
    }
    let table = match load_json(&path) {
        Ok(table) => table,
        Err(e) => {
            sink.warn("i18n", format!("Failed to parse {}: {}", file_name, e));
            return;
        }
    };

    let keys = flatten_translation_keys(&table);
    for card_type in known {
        if !has_translation(&keys, card_type) {
            sink.warn(
                "i18n",
                format!("`{}` has no translation keys in {}", card_type, file_name),
            );
        }
    }
}

/// True when `source` fetches a non-local absolute URL directly.
pub fn has_external_fetch(source: &str) -> bool {
    EXTERNAL_FETCH.captures_iter(source).any(|caps| {
        let target = &caps[1];
        !(target.starts_with("localhost") || target.starts_with("127.0.0.1"))
    })
}

pub fn check_cors_proxy(console: &Console<'_>, sink: &mut DiagnosticSink) -> Result<(), GateError> {
    trace_gate("cors");
    let hooks_dir = console.hooks_dir();
    if !hooks_dir.is_dir() {
        sink.warn(
            "cors",
            "Console hooks directory not found, skipping CORS check",
        );
        return Ok(());
    }

    for path in discover(&hooks_dir, &["**/*.ts", "**/*.tsx"])? {
        let Ok(source) = fs::read_to_string(&path) else {
            continue;
        };
        if has_external_fetch(&source) {
            sink.warn(
                "cors",
                format!(
                    "`{}` contains direct external fetch, should use backend proxy `{}`",
                    rel_path(console.root, &path),
                    PROXY_ROUTE
                ),
            );
        }
    }
    Ok(())
}

/// Per-card gates over the known set, then the hook scan.
pub fn run_cross_repo_gates(
    console: &Console<'_>,
    registry: Option<&CardRegistry>,
    known: &BTreeSet<String>,
    sink: &mut DiagnosticSink,
) -> Result<(), GateError> {
    let empty = CardRegistry::default();
    let registry = registry.unwrap_or(&empty);
    check_demo_data(console, registry, known, sink);
    check_demo_data_wiring(console, registry, known, sink)?;
    check_consecutive_failures(console, registry, known, sink)?;
    check_i18n_keys(console, known, sink);
    check_cors_proxy(console, sink)?;
    Ok(())
}
