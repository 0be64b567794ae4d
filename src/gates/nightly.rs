//! Nightly gates: network reachability and time-based staleness.
//!
//! Only `full` mode runs these. Download URLs are probed on a fixed-size
//! worker pool; each probe writes to its own buffer and the buffers are merged
//! in registry order, so completion order never shows up in the report.

use crate::core::config::GateConfig;
use crate::core::diagnostics::DiagnosticSink;
use crate::core::error::GateError;
use crate::core::extractor::CardRegistry;
use crate::core::loader::{ContentIndex, REGISTRY_FILE, RegistryDoc, THEME_PATTERNS};
use crate::core::model::{Preset, RegistryItem, RegistryManifest, Theme};
use crate::gates::trace_gate;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::time::Duration;

/// Most card types listed in the CNCF coverage note.
const CNCF_LIST_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Request completed with a non-error status.
    Status(u16),
    /// Server answered with an HTTP error status.
    HttpError(u16),
    /// Timeout, DNS, TLS or connection failure.
    Unreachable(String),
}

/// HEAD-style reachability probe. Implementations must be shareable across
/// worker threads.
pub trait UrlProbe: Sync {
    fn head(&self, url: &str) -> ProbeOutcome;
}

pub struct HttpProbe {
    agent: ureq::Agent,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent }
    }
}

impl UrlProbe for HttpProbe {
    fn head(&self, url: &str) -> ProbeOutcome {
        match self.agent.head(url).call() {
            Ok(resp) => ProbeOutcome::Status(resp.status().as_u16()),
            Err(ureq::Error::StatusCode(code)) => ProbeOutcome::HttpError(code),
            Err(e) => ProbeOutcome::Unreachable(e.to_string()),
        }
    }
}

fn probe_item(item: &RegistryItem, probe: &dyn UrlProbe) -> DiagnosticSink {
    let mut local = DiagnosticSink::new();
    let Some(url) = item.download_url.as_deref() else {
        local.warn("download-url", format!("'{}' has no downloadUrl", item.id));
        return local;
    };

    let outcome = probe.head(url);
    tracing::debug!(id = %item.id, url, ?outcome, "probe finished");
    match outcome {
        ProbeOutcome::Status(200) => {
            local.pass("download-url", format!("'{}' URL OK (200)", item.id));
        }
        ProbeOutcome::Status(code) => {
            local.warn(
                "download-url",
                format!("'{}' URL returned {}: {}", item.id, code, url),
            );
        }
        ProbeOutcome::HttpError(code) => {
            local.error(
                "download-url",
                format!("'{}' URL returned {}: {}", item.id, code, url),
            );
        }
        ProbeOutcome::Unreachable(reason) => {
            local.warn(
                "download-url",
                format!("'{}' URL unreachable: {}", item.id, reason),
            );
        }
    }
    local
}

fn parsed_manifest(index: &ContentIndex) -> Option<RegistryManifest> {
    match index.registry() {
        RegistryDoc::Parsed(doc) => Some(RegistryManifest::from_json(doc)),
        RegistryDoc::Missing | RegistryDoc::Unparsable => None,
    }
}

pub fn check_download_urls(
    index: &ContentIndex,
    probe: &dyn UrlProbe,
    workers: usize,
    sink: &mut DiagnosticSink,
) -> Result<(), GateError> {
    trace_gate("download-url");
    let Some(manifest) = parsed_manifest(index) else {
        return Ok(());
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(|e| GateError::WorkerPool(e.to_string()))?;
    let buffers: Vec<DiagnosticSink> = pool.install(|| {
        manifest
            .items
            .par_iter()
            .map(|item| probe_item(item, probe))
            .collect()
    });
    for buffer in buffers {
        sink.absorb(buffer);
    }
    Ok(())
}

/// Accepts RFC 3339, a naive date-time (read as UTC) or a plain date.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn check_registry_staleness(
    index: &ContentIndex,
    stale_after_days: i64,
    now: DateTime<Utc>,
    sink: &mut DiagnosticSink,
) {
    trace_gate("staleness");
    let Some(manifest) = parsed_manifest(index) else {
        return;
    };
    let Some(raw) = manifest.updated_at else {
        sink.warn(
            "staleness",
            format!("{} missing 'updatedAt' field", REGISTRY_FILE),
        );
        return;
    };
    let Some(updated) = parse_timestamp(&raw) else {
        sink.warn(
            "staleness",
            format!("{} updatedAt is not valid ISO: '{}'", REGISTRY_FILE, raw),
        );
        return;
    };

    let age = now - updated;
    let days = age.num_days();
    if age > chrono::Duration::days(stale_after_days) {
        sink.warn(
            "staleness",
            format!(
                "{} updatedAt is {} days old ({}), consider updating",
                REGISTRY_FILE, days, raw
            ),
        );
    } else {
        sink.pass(
            "staleness",
            format!("{} updatedAt is {} days old", REGISTRY_FILE, days),
        );
    }
}

pub fn check_theme_consistency(
    index: &ContentIndex,
    sink: &mut DiagnosticSink,
) -> Result<(), GateError> {
    trace_gate("theme-consistency");
    let themes: Vec<(&str, BTreeSet<String>)> = index
        .select(THEME_PATTERNS)?
        .into_iter()
        .map(|(rel, doc)| {
            let keys = Theme::from_json(doc).value.color_keys.unwrap_or_default();
            (rel, keys)
        })
        .collect();

    let Some(((ref_name, ref_keys), rest)) = themes.split_first().filter(|(_, r)| !r.is_empty())
    else {
        sink.note(
            "theme-consistency",
            "Only one theme found, nothing to compare",
        );
        return Ok(());
    };

    for (name, keys) in rest {
        let missing: Vec<&str> = ref_keys.difference(keys).map(String::as_str).collect();
        let extra: Vec<&str> = keys.difference(ref_keys).map(String::as_str).collect();
        if !missing.is_empty() {
            sink.warn(
                "theme-consistency",
                format!(
                    "`{}` missing color keys present in `{}`: {}",
                    name,
                    ref_name,
                    missing.join(", ")
                ),
            );
        }
        if !extra.is_empty() {
            sink.note(
                "theme-consistency",
                format!(
                    "`{}` has extra color keys not in `{}`: {}",
                    name,
                    ref_name,
                    extra.join(", ")
                ),
            );
        }
    }
    Ok(())
}

pub fn check_cncf_coverage(
    index: &ContentIndex,
    registry: &CardRegistry,
    cncf_prefix: &str,
    sink: &mut DiagnosticSink,
) -> Result<(), GateError> {
    trace_gate("cncf-coverage");
    let pattern = format!("presets/{}*.json", cncf_prefix);
    let mut preset_count = 0usize;
    let mut missing = BTreeSet::new();
    for (_, doc) in index.select(&[pattern.as_str()])? {
        let card_type = Preset::from_json(doc).value.card_type;
        if !card_type.is_empty() && !registry.contains(&card_type) {
            preset_count += 1;
            missing.insert(card_type);
        }
    }

    if missing.is_empty() {
        sink.pass(
            "cncf-coverage",
            "All CNCF presets map to console card types",
        );
        return Ok(());
    }

    let shown: Vec<&str> = missing
        .iter()
        .take(CNCF_LIST_LIMIT)
        .map(String::as_str)
        .collect();
    sink.note(
        "cncf-coverage",
        format!(
            "{} CNCF presets reference unimplemented card types: {}{}",
            preset_count,
            shown.join(", "),
            if missing.len() > CNCF_LIST_LIMIT { "..." } else { "" }
        ),
    );
    Ok(())
}

/// All nightly gates. `cncf_registry` is `None` when no console was supplied.
pub fn run_nightly_gates(
    index: &ContentIndex,
    cncf_registry: Option<&CardRegistry>,
    config: &GateConfig,
    probe: &dyn UrlProbe,
    now: DateTime<Utc>,
    sink: &mut DiagnosticSink,
) -> Result<(), GateError> {
    check_download_urls(index, probe, config.probe.workers, sink)?;
    check_registry_staleness(index, config.stale_after_days, now, sink);
    check_theme_consistency(index, sink)?;
    if let Some(registry) = cncf_registry {
        check_cncf_coverage(index, registry, &config.cncf_prefix, sink)?;
    }
    Ok(())
}
