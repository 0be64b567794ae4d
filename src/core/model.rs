//! Typed marketplace records, validated at the JSON boundary.
//!
//! Each `from_json` returns the record together with the schema issues found
//! while reading it. Gates report the issues and work with the typed record,
//! never with raw `Value` lookups.

use crate::core::diagnostics::Severity;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

pub const PRESET_FORMAT: &str = "kc-card-preset-v1";
pub const DASHBOARD_FORMAT: &str = "kc-dashboard-v1";
pub const GRID_COLUMNS: f64 = 12.0;

pub const REQUIRED_THEME_KEYS: &[&str] = &["id", "name", "dark"];
pub const REQUIRED_THEME_COLORS: &[&str] = &[
    "background",
    "foreground",
    "card",
    "primary",
    "secondary",
    "muted",
    "accent",
    "destructive",
    "border",
    "input",
    "ring",
];
pub const MIN_CHART_COLORS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    pub severity: Severity,
    /// Element inside the document, e.g. `cards[2]`.
    pub scope: Option<String>,
    pub message: String,
}

impl SchemaIssue {
    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            scope: None,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            scope: None,
            message: message.into(),
        }
    }

    fn card_error(index: usize, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            scope: Some(format!("cards[{}]", index)),
            message: message.into(),
        }
    }

    /// Diagnostic text for this issue found in `rel`.
    pub fn render(&self, rel: &str) -> String {
        match &self.scope {
            Some(scope) => format!("`{}` {}: {}", rel, scope, self.message),
            None => format!("`{}`: {}", rel, self.message),
        }
    }
}

/// A record plus the issues found while reading it.
#[derive(Debug, Clone)]
pub struct Checked<T> {
    pub value: T,
    pub issues: Vec<SchemaIssue>,
}

impl<T> Checked<T> {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

fn non_empty_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Python-ish truthiness used by the "missing or empty" checks.
fn is_truthy(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
    }
}

fn display_value(v: Option<&Value>) -> String {
    match v {
        None | Some(Value::Null) => "None".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn empty_map() -> &'static Map<String, Value> {
    static EMPTY: std::sync::LazyLock<Map<String, Value>> = std::sync::LazyLock::new(Map::new);
    &EMPTY
}

// ===== Presets =====

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    pub format: String,
    pub card_type: String,
    pub title: String,
}

impl Preset {
    pub fn from_json(v: &Value) -> Checked<Preset> {
        let obj = v.as_object().unwrap_or(empty_map());
        let mut issues = Vec::new();

        let format = obj.get("format");
        if format.and_then(Value::as_str) != Some(PRESET_FORMAT) {
            issues.push(SchemaIssue::error(format!(
                "format must be '{}', got '{}'",
                PRESET_FORMAT,
                display_value(format)
            )));
        }
        if !is_truthy(obj.get("card_type")) {
            issues.push(SchemaIssue::error("missing or empty 'card_type'"));
        }
        if !is_truthy(obj.get("title")) {
            issues.push(SchemaIssue::error("missing or empty 'title'"));
        }

        Checked {
            value: Preset {
                format: non_empty_str(obj, "format").unwrap_or_default(),
                card_type: non_empty_str(obj, "card_type").unwrap_or_default(),
                title: non_empty_str(obj, "title").unwrap_or_default(),
            },
            issues,
        }
    }
}

// ===== Dashboards =====

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub w: Option<f64>,
    pub h: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardPlacement {
    pub index: usize,
    pub card_type: Option<String>,
    pub position: Option<Position>,
}

impl CardPlacement {
    /// `(x, w, x + w)` when the placement runs past the grid's right edge.
    /// Non-numeric `x` or `w` is not checked.
    pub fn grid_overflow(&self) -> Option<(f64, f64, f64)> {
        let pos = self.position?;
        let (x, w) = (pos.x?, pos.w?);
        let end = x + w;
        (end > GRID_COLUMNS).then_some((x, w, end))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub format: String,
    pub name: String,
    /// `None` when `cards` is not an array; the dashboard is then unusable.
    pub cards: Option<Vec<CardPlacement>>,
}

impl Dashboard {
    pub fn from_json(v: &Value) -> Checked<Dashboard> {
        let obj = v.as_object().unwrap_or(empty_map());
        let mut issues = Vec::new();

        let format = obj.get("format");
        if format.and_then(Value::as_str) != Some(DASHBOARD_FORMAT) {
            issues.push(SchemaIssue::error(format!(
                "format must be '{}', got '{}'",
                DASHBOARD_FORMAT,
                display_value(format)
            )));
        }
        if !is_truthy(obj.get("name")) {
            issues.push(SchemaIssue::error("missing 'name' field"));
        }

        let cards = match obj.get("cards").and_then(Value::as_array) {
            None => {
                issues.push(SchemaIssue::error("'cards' must be an array"));
                None
            }
            Some(raw) => Some(
                raw.iter()
                    .enumerate()
                    .map(|(i, card)| read_card(i, card, &mut issues))
                    .collect(),
            ),
        };

        Checked {
            value: Dashboard {
                format: non_empty_str(obj, "format").unwrap_or_default(),
                name: non_empty_str(obj, "name").unwrap_or_default(),
                cards,
            },
            issues,
        }
    }

    /// Non-empty `card_type` values in placement order.
    pub fn card_types(&self) -> impl Iterator<Item = &str> {
        self.cards
            .iter()
            .flatten()
            .filter_map(|c| c.card_type.as_deref())
            .filter(|t| !t.is_empty())
    }
}

/// Missing coordinates read as 0 (the missing key is reported on its own);
/// non-numeric ones read as `None`.
fn coord(pos: &Map<String, Value>, key: &str) -> Option<f64> {
    match pos.get(key) {
        None => Some(0.0),
        Some(v) => v.as_f64(),
    }
}

fn read_card(index: usize, card: &Value, issues: &mut Vec<SchemaIssue>) -> CardPlacement {
    let obj = card.as_object().unwrap_or(empty_map());
    if !is_truthy(obj.get("card_type")) {
        issues.push(SchemaIssue::card_error(index, "missing 'card_type'"));
    }
    let card_type = obj
        .get("card_type")
        .and_then(Value::as_str)
        .map(str::to_string);

    let position = match obj.get("position").and_then(Value::as_object) {
        None => {
            issues.push(SchemaIssue::card_error(index, "missing 'position'"));
            None
        }
        Some(pos) => {
            for key in ["x", "y", "w", "h"] {
                if !pos.contains_key(key) {
                    issues.push(SchemaIssue::card_error(
                        index,
                        format!("position missing '{}'", key),
                    ));
                }
            }
            Some(Position {
                x: coord(pos, "x"),
                y: coord(pos, "y"),
                w: coord(pos, "w"),
                h: coord(pos, "h"),
            })
        }
    };

    CardPlacement {
        index,
        card_type,
        position,
    }
}

// ===== Themes =====

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ThemeFont {
    pub family: Option<String>,
    pub mono_family: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub id: Option<String>,
    pub name: Option<String>,
    pub dark: Option<bool>,
    /// `None` when `colors` is present but not an object.
    pub color_keys: Option<BTreeSet<String>>,
    pub font: Option<ThemeFont>,
}

impl Theme {
    pub fn from_json(v: &Value) -> Checked<Theme> {
        let obj = v.as_object().unwrap_or(empty_map());
        let mut issues = Vec::new();

        for key in REQUIRED_THEME_KEYS {
            if !obj.contains_key(*key) {
                issues.push(SchemaIssue::error(format!(
                    "missing required key '{}'",
                    key
                )));
            }
        }

        let colors = match obj.get("colors") {
            None => Some(empty_map()),
            Some(Value::Object(map)) => Some(map),
            Some(_) => {
                issues.push(SchemaIssue::error("'colors' must be an object"));
                None
            }
        };

        let font = match obj.get("font") {
            None => Some(ThemeFont::default()),
            Some(Value::Object(f)) => Some(ThemeFont {
                family: non_empty_str(f, "family"),
                mono_family: non_empty_str(f, "monoFamily"),
            }),
            Some(_) => None,
        };

        // A non-object `colors` ends the colour and font checks.
        if let Some(colors) = colors {
            for key in REQUIRED_THEME_COLORS {
                if !colors.contains_key(*key) {
                    issues.push(SchemaIssue::error(format!("colors missing '{}'", key)));
                }
            }
            if !colors.contains_key("brandPrimary") {
                issues.push(SchemaIssue::warning("colors missing 'brandPrimary'"));
            }
            let chart_ok = colors
                .get("chartColors")
                .and_then(Value::as_array)
                .is_some_and(|a| a.len() >= MIN_CHART_COLORS);
            if !chart_ok {
                issues.push(SchemaIssue::warning(format!(
                    "chartColors should be an array with >= {} colors",
                    MIN_CHART_COLORS
                )));
            }
            if let Some(f) = &font {
                if f.family.is_none() {
                    issues.push(SchemaIssue::warning("font.family is missing"));
                }
                if f.mono_family.is_none() {
                    issues.push(SchemaIssue::warning("font.monoFamily is missing"));
                }
            }
        }

        Checked {
            value: Theme {
                id: non_empty_str(obj, "id"),
                name: non_empty_str(obj, "name"),
                dark: obj.get("dark").and_then(Value::as_bool),
                color_keys: colors.map(|c| c.keys().cloned().collect()),
                font,
            },
            issues,
        }
    }
}

// ===== Registry manifest =====

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    Dashboard,
    CardPreset,
    Theme,
    Other(String),
}

impl ItemKind {
    pub fn parse(raw: Option<&str>) -> ItemKind {
        match raw {
            Some("dashboard") => ItemKind::Dashboard,
            Some("card-preset") => ItemKind::CardPreset,
            Some("theme") => ItemKind::Theme,
            Some(other) => ItemKind::Other(other.to_string()),
            None => ItemKind::Other("<no-type>".to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ItemKind::Dashboard => "dashboard",
            ItemKind::CardPreset => "card-preset",
            ItemKind::Theme => "theme",
            ItemKind::Other(s) => s,
        }
    }

    /// Candidate relative locations for an item of this kind.
    pub fn expected_paths(&self, id: &str) -> Vec<String> {
        match self {
            ItemKind::Dashboard => vec![format!("dashboards/{}/dashboard.json", id)],
            ItemKind::CardPreset => vec![
                format!("presets/{}.json", id),
                format!("card-presets/{}.json", id),
            ],
            ItemKind::Theme => vec![format!("themes/{}.json", id)],
            ItemKind::Other(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryItem {
    pub id: String,
    pub kind: ItemKind,
    pub download_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegistryManifest {
    pub updated_at: Option<String>,
    pub items: Vec<RegistryItem>,
}

impl RegistryManifest {
    pub fn from_json(v: &Value) -> RegistryManifest {
        let obj = v.as_object().unwrap_or(empty_map());
        let items = obj
            .get("items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|item| {
                        let item = item.as_object().unwrap_or(empty_map());
                        RegistryItem {
                            id: item
                                .get("id")
                                .and_then(Value::as_str)
                                .unwrap_or("<no-id>")
                                .to_string(),
                            kind: ItemKind::parse(item.get("type").and_then(Value::as_str)),
                            download_url: non_empty_str(item, "downloadUrl"),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        RegistryManifest {
            updated_at: non_empty_str(obj, "updatedAt"),
            items,
        }
    }
}
