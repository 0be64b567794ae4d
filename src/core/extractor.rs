//! Best-effort scraper for the console's card registry source.
//!
//! This is deliberately not a TypeScript parser. It recognises a handful of
//! line shapes and ignores everything else, so cosmetic churn in a file we do
//! not own never turns into a failure here. Cross-repo gates already treat an
//! unmapped card type as "skip".
//!
//! Recognised shapes:
//!
//! ```text
//! const RAW_CARD_COMPONENTS = {          // table: opened by its declaration, closed by `}` at column 0
//!   pod_status: PodStatusCard,
//! }
//! const PodStatusCard = lazy(() => import('./PodStatus'))            // direct
//! const _deployBundle = import('./deploy-bundle')                    // bundle path
//! const DeployCard = lazy(() => _deployBundle.then(m => ...))        // via bundle
//! ```

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::LazyLock;

/// Identifier of the card-type registration table.
pub const REGISTRY_TABLE: &str = "RAW_CARD_COMPONENTS";
/// Stripped from bundle identifiers so declaration and reference agree.
pub const BUNDLE_SUFFIX: &str = "Bundle";

static TABLE_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^\s*(?:export\s+)?(?:const|let|var)\s+{}\b",
        REGISTRY_TABLE
    ))
    .unwrap()
});
static TABLE_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s+['"]?(\w+)['"]?\s*:\s*(\w+)?"#).unwrap());
static DIRECT_LAZY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*(?:export\s+)?const\s+(\w+)\s*=\s*lazy\(\s*\(\)\s*=>\s*import\(\s*['"]\./([^'"]+)['"]\s*\)"#,
    )
    .unwrap()
});
static BUNDLE_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:export\s+)?const\s+_(\w+)\s*=\s*import\(\s*['"]\./([^'"]+)['"]\s*\)"#)
        .unwrap()
});
static BUNDLE_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:export\s+)?const\s+(\w+)\s*=\s*lazy\(\s*\(\)\s*=>\s*_(\w+)\.then\("#)
        .unwrap()
});

/// Card metadata recovered from the console registry source. Built once per
/// run and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardRegistry {
    /// Registered card-type keys.
    pub keys: BTreeSet<String>,
    /// Card type -> component name.
    pub components: BTreeMap<String, String>,
    /// Component name -> path relative to the registry file's directory.
    pub imports: BTreeMap<String, String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum TableState {
    Searching,
    AwaitingBrace,
    Inside,
    Done,
}

fn bundle_key(name: &str) -> &str {
    name.strip_suffix(BUNDLE_SUFFIX).unwrap_or(name)
}

fn is_comment(trimmed: &str) -> bool {
    trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*')
}

impl CardRegistry {
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let source = fs::read_to_string(path)?;
        let registry = Self::parse(&source);
        tracing::debug!(
            path = %path.display(),
            keys = registry.keys.len(),
            imports = registry.imports.len(),
            "card registry extracted"
        );
        Ok(registry)
    }

    pub fn parse(source: &str) -> Self {
        let mut registry = CardRegistry::default();
        let mut state = TableState::Searching;
        let mut bundles: BTreeMap<String, String> = BTreeMap::new();
        let mut bundle_refs: Vec<(String, String)> = Vec::new();

        for line in source.lines() {
            match state {
                TableState::Searching if TABLE_DECL.is_match(line) => {
                    state = if line.contains('{') {
                        TableState::Inside
                    } else {
                        TableState::AwaitingBrace
                    };
                    continue;
                }
                TableState::AwaitingBrace => {
                    if line.contains('{') {
                        state = TableState::Inside;
                    }
                    continue;
                }
                TableState::Inside => {
                    if line.starts_with('}') {
                        state = TableState::Done;
                    } else if !is_comment(line.trim())
                        && let Some(caps) = TABLE_ENTRY.captures(line)
                    {
                        let key = caps[1].to_string();
                        if let Some(component) = caps.get(2) {
                            registry
                                .components
                                .insert(key.clone(), component.as_str().to_string());
                        }
                        registry.keys.insert(key);
                    }
                    continue;
                }
                _ => {}
            }

            if let Some(caps) = DIRECT_LAZY.captures(line) {
                registry
                    .imports
                    .insert(caps[1].to_string(), caps[2].to_string());
            } else if let Some(caps) = BUNDLE_REF.captures(line) {
                bundle_refs.push((caps[1].to_string(), bundle_key(&caps[2]).to_string()));
            } else if let Some(caps) = BUNDLE_DECL.captures(line) {
                bundles.insert(bundle_key(&caps[1]).to_string(), caps[2].to_string());
            }
        }

        // Bundle declarations may follow their references; resolve last.
        for (component, bundle) in bundle_refs {
            if let Some(path) = bundles.get(&bundle) {
                registry.imports.insert(component, path.clone());
            }
        }

        registry
    }

    pub fn contains(&self, card_type: &str) -> bool {
        self.keys.contains(card_type)
    }

    pub fn component_for(&self, card_type: &str) -> Option<&str> {
        self.components.get(card_type).map(String::as_str)
    }

    /// Card type -> component -> import path, when both hops resolve.
    pub fn resolve(&self, card_type: &str) -> Option<(&str, &str)> {
        let component = self.component_for(card_type)?;
        let path = self.imports.get(component)?;
        Some((component, path.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"import { lazy } from 'react'

const _deployBundle = import('./deploy-bundle')
const PodStatusCard = lazy(() => import('./PodStatus'))
const NodeHealthCard = lazy(() => import("./NodeHealth"))
const DeployCard = lazy(() => _deployBundle.then(m => ({ default: m.DeployCard })))
const RolloutCard = lazy(() => _deployBundle.then(m => ({ default: m.RolloutCard })))
const OrphanCard = lazy(() => _missingBundle.then(m => ({ default: m.OrphanCard })))
const WeirdCard = React.lazy(loadWeird)

const RAW_CARD_COMPONENTS: Record<string, CardComponent> = {
  pod_status: PodStatusCard,
  // retired_card: RetiredCard,
  node_health: NodeHealthCard,
  deploy_status: DeployCard,
  rollout: RolloutCard,
  orphan: OrphanCard,
}

export const OTHER = {
  not_a_card: Something,
}
"#;

    #[test]
    fn test_table_keys_and_components() {
        let r = CardRegistry::parse(SOURCE);
        let keys: Vec<&str> = r.keys.iter().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["deploy_status", "node_health", "orphan", "pod_status", "rollout"]
        );
        assert_eq!(r.component_for("pod_status"), Some("PodStatusCard"));
        assert!(!r.contains("retired_card"));
        assert!(!r.contains("not_a_card"));
    }

    #[test]
    fn test_direct_and_bundle_imports() {
        let r = CardRegistry::parse(SOURCE);
        assert_eq!(r.resolve("pod_status"), Some(("PodStatusCard", "PodStatus")));
        assert_eq!(r.resolve("node_health"), Some(("NodeHealthCard", "NodeHealth")));
        assert_eq!(r.resolve("deploy_status"), Some(("DeployCard", "deploy-bundle")));
        assert_eq!(r.resolve("rollout"), Some(("RolloutCard", "deploy-bundle")));
        // Unknown bundle and unrecognised shapes are skipped, not errors.
        assert_eq!(r.resolve("orphan"), None);
        assert!(!r.imports.contains_key("WeirdCard"));
    }

    #[test]
    fn test_brace_on_later_line() {
        let src = "export const RAW_CARD_COMPONENTS =\n  {\n  pod_status: PodStatusCard,\n  node_health: NodeHealthCard,\n}\n";
        let r = CardRegistry::parse(src);
        assert_eq!(r.keys.len(), 2);
        assert_eq!(r.component_for("node_health"), Some("NodeHealthCard"));
    }

    #[test]
    fn test_table_name_in_comment_does_not_open_table() {
        let src = "// Cards are registered in RAW_CARD_COMPONENTS below.\n\
import { lazy } from 'react'\n\
const PodStatusCard = lazy(() => import('./PodStatus'))\n\
/* see RAW_CARD_COMPONENTS */\n\
const _deployBundle = import('./deploy-bundle')\n\
const DeployCard = lazy(() => _deployBundle.then(m => m))\n\
const RAW_CARD_COMPONENTS = {\n  pod_status: PodStatusCard,\n  deploy_status: DeployCard,\n}\n";
        let r = CardRegistry::parse(src);
        assert_eq!(r.keys.len(), 2);
        assert_eq!(r.resolve("pod_status"), Some(("PodStatusCard", "PodStatus")));
        assert_eq!(r.resolve("deploy_status"), Some(("DeployCard", "deploy-bundle")));
    }

    #[test]
    fn test_missing_table_yields_empty_registry() {
        let r = CardRegistry::parse("const Foo = lazy(() => import('./Foo'))\n");
        assert!(r.is_empty());
        assert_eq!(r.imports.get("Foo").map(String::as_str), Some("Foo"));
    }

    #[test]
    fn test_bundle_declared_after_reference() {
        let src = "const A = lazy(() => _chartsBundle.then(m => m))\nconst _chartsBundle = import('./charts')\n";
        let r = CardRegistry::parse(src);
        assert_eq!(r.imports.get("A").map(String::as_str), Some("charts"));
    }

    #[test]
    fn test_from_file_missing() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(CardRegistry::from_file(&tmp.path().join("cardRegistry.ts")).is_err());
    }
}
