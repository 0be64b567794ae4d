//! Marketplace content discovery and JSON loading.
//!
//! Every content file is parsed exactly once. A parse failure is recorded as a
//! single `json-syntax` error and the file is invisible to every later gate.

use crate::core::diagnostics::DiagnosticSink;
use crate::core::error::GateError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const REGISTRY_FILE: &str = "registry.json";
pub const PRESET_PATTERNS: &[&str] = &["presets/*.json", "card-presets/*.json"];
pub const DASHBOARD_PATTERNS: &[&str] = &["dashboards/*/dashboard.json"];
pub const THEME_PATTERNS: &[&str] = &["themes/*.json"];
pub const CARD_SOURCE_PATTERNS: &[&str] = &[
    "presets/*.json",
    "card-presets/*.json",
    "dashboards/*/dashboard.json",
];

/// Everything the json-syntax gate covers.
pub const CONTENT_PATTERNS: &[&str] = &[
    "registry.json",
    "presets/*.json",
    "card-presets/*.json",
    "dashboards/*/dashboard.json",
    "themes/*.json",
];

#[derive(Debug)]
pub enum LoadError {
    NotFound(PathBuf),
    Unreadable(io::Error),
    InvalidJson {
        line: usize,
        column: usize,
        message: String,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::NotFound(p) => write!(f, "File not found: {}", p.display()),
            LoadError::Unreadable(e) => write!(f, "Unreadable: {}", e),
            LoadError::InvalidJson {
                line,
                column,
                message,
            } => write!(
                f,
                "Invalid JSON: {} (line {} column {})",
                message, line, column
            ),
        }
    }
}

pub fn load_json(path: &Path) -> Result<Value, LoadError> {
    let raw = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
        _ => LoadError::Unreadable(e),
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        let message = e.to_string();
        // serde_json appends " at line L column C"; keep only the reason.
        let message = message
            .split(" at line ")
            .next()
            .unwrap_or(&message)
            .to_string();
        LoadError::InvalidJson {
            line: e.line(),
            column: e.column(),
            message,
        }
    })
}

pub(crate) fn compile_globset(patterns: &[&str]) -> Result<GlobSet, GateError> {
    let mut builder = GlobSetBuilder::new();
    for p in patterns {
        let glob = GlobBuilder::new(p)
            .literal_separator(true)
            .build()
            .map_err(|e| GateError::PatternError(format!("{p:?}: {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| GateError::PatternError(e.to_string()))
}

fn should_walk_dir_entry(entry: &walkdir::DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    !matches!(name.as_ref(), ".git" | "node_modules" | "target")
}

/// Forward-slash path of `path` relative to `base`.
pub fn rel_path(base: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Files under `base` matching any of `patterns`, sorted and deduplicated.
pub fn discover(base: &Path, patterns: &[&str]) -> Result<Vec<PathBuf>, GateError> {
    if !base.is_dir() {
        return Ok(Vec::new());
    }
    let set = compile_globset(patterns)?;
    let max_depth = if patterns.iter().any(|p| p.contains("**")) {
        usize::MAX
    } else {
        patterns
            .iter()
            .map(|p| p.split('/').count())
            .max()
            .unwrap_or(1)
    };

    let mut found = BTreeSet::new();
    for entry in WalkDir::new(base)
        .follow_links(false)
        .max_depth(max_depth)
        .into_iter()
        .filter_entry(should_walk_dir_entry)
        .flatten()
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = rel_path(base, entry.path());
        if set.is_match(&rel) {
            found.insert(entry.into_path());
        }
    }
    Ok(found.into_iter().collect())
}

/// Outcome of looking up the registry manifest.
pub enum RegistryDoc<'a> {
    Missing,
    /// Present but failed to parse; already reported under `json-syntax`.
    Unparsable,
    Parsed(&'a Value),
}

/// Parsed marketplace content keyed by forward-slash relative path.
pub struct ContentIndex {
    root: PathBuf,
    docs: BTreeMap<String, Option<Value>>,
}

impl ContentIndex {
    /// Discovers and parses every content file, recording one `json-syntax`
    /// diagnostic per file.
    pub fn load(root: &Path, sink: &mut DiagnosticSink) -> Result<Self, GateError> {
        let mut docs = BTreeMap::new();
        for path in discover(root, CONTENT_PATTERNS)? {
            let rel = rel_path(root, &path);
            match load_json(&path) {
                Ok(value) => {
                    sink.pass("json-syntax", format!("`{}` valid", rel));
                    docs.insert(rel, Some(value));
                }
                Err(e) => {
                    sink.error("json-syntax", format!("`{}`: {}", rel, e));
                    docs.insert(rel, None);
                }
            }
        }
        tracing::debug!(root = %root.display(), files = docs.len(), "content indexed");
        Ok(Self {
            root: root.to_path_buf(),
            docs,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Successfully parsed documents matching `patterns`, in sorted path order.
    pub fn select(&self, patterns: &[&str]) -> Result<Vec<(&str, &Value)>, GateError> {
        let set = compile_globset(patterns)?;
        Ok(self
            .docs
            .iter()
            .filter(|(rel, _)| set.is_match(rel.as_str()))
            .filter_map(|(rel, doc)| doc.as_ref().map(|v| (rel.as_str(), v)))
            .collect())
    }

    pub fn registry(&self) -> RegistryDoc<'_> {
        match self.docs.get(REGISTRY_FILE) {
            None => RegistryDoc::Missing,
            Some(None) => RegistryDoc::Unparsable,
            Some(Some(v)) => RegistryDoc::Parsed(v),
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}
