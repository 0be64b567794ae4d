//! Mode-driven orchestration: which gate families run, in which order, and
//! which values flow between them.

use crate::core::config::GateConfig;
use crate::core::diagnostics::DiagnosticSink;
use crate::core::error::GateError;
use crate::core::extractor::CardRegistry;
use crate::core::loader::ContentIndex;
use crate::core::output::Narrator;
use crate::gates::cross_repo::{self, Console};
use crate::gates::nightly::{self, UrlProbe};
use crate::gates::static_gate;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Mode {
    /// Marketplace repository only.
    #[default]
    Static,
    /// Static plus checks against a console checkout.
    CrossRepo,
    /// Cross-repo plus network probes and staleness audits.
    Full,
}

impl Mode {
    pub fn needs_console(self) -> bool {
        matches!(self, Mode::CrossRepo | Mode::Full)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Static => "static",
            Mode::CrossRepo => "cross-repo",
            Mode::Full => "full",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub mode: Mode,
    pub marketplace_root: PathBuf,
    pub console_root: Option<PathBuf>,
    pub config: GateConfig,
    pub now: DateTime<Utc>,
}

/// Values the renderers need after the run.
#[derive(Debug, Default)]
pub struct PipelineOutcome {
    pub marketplace_types: BTreeSet<String>,
    pub known_types: BTreeSet<String>,
    /// Set only when a console was supplied and its registry was readable.
    pub registry: Option<CardRegistry>,
}

/// Runs every gate the mode selects, appending to `sink`.
///
/// The only early failure is a console-requiring mode with no console path;
/// in that case nothing is recorded.
pub fn run_pipeline(
    opts: &PipelineOptions,
    probe: &dyn UrlProbe,
    narrator: &Narrator,
    sink: &mut DiagnosticSink,
) -> Result<PipelineOutcome, GateError> {
    let console_root = match (&opts.console_root, opts.mode.needs_console()) {
        (Some(root), true) => Some(root.as_path()),
        (None, true) => return Err(GateError::MissingConsolePath(opts.mode)),
        (_, false) => None,
    };
    tracing::debug!(mode = %opts.mode, root = %opts.marketplace_root.display(), "pipeline start");

    narrator.banner("Static Validation");
    let index = ContentIndex::load(&opts.marketplace_root, sink)?;
    static_gate::run_static_gates(&index, sink)?;

    let mut outcome = PipelineOutcome {
        marketplace_types: static_gate::marketplace_card_types(&index)?,
        ..PipelineOutcome::default()
    };

    let Some(console_root) = console_root else {
        return Ok(outcome);
    };

    narrator.banner("Cross-Repo Quality Checks");
    let console = Console::new(console_root, &opts.config.console);
    outcome.registry = cross_repo::load_console_registry(&console, sink);
    outcome.known_types = cross_repo::check_card_type_existence(
        &outcome.marketplace_types,
        outcome.registry.as_ref(),
        &opts.config,
        sink,
    );
    cross_repo::run_cross_repo_gates(&console, outcome.registry.as_ref(), &outcome.known_types, sink)?;

    if opts.mode == Mode::Full {
        narrator.banner("Nightly Checks");
        let empty = CardRegistry::default();
        let cncf_registry = outcome.registry.as_ref().unwrap_or(&empty);
        nightly::run_nightly_gates(
            &index,
            Some(cncf_registry),
            &opts.config,
            probe,
            opts.now,
            sink,
        )?;
    }

    tracing::debug!(
        errors = sink.errors(),
        warnings = sink.warnings(),
        "pipeline done"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diagnostics::Severity;
    use crate::gates::nightly::ProbeOutcome;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    struct NoNetwork;

    impl UrlProbe for NoNetwork {
        fn head(&self, _url: &str) -> ProbeOutcome {
            ProbeOutcome::Status(200)
        }
    }

    fn write(root: &Path, rel: &str, body: &str) {
        let p = root.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, body).unwrap();
    }

    fn options(mode: Mode, market: &Path, console: Option<&Path>) -> PipelineOptions {
        PipelineOptions {
            mode,
            marketplace_root: market.to_path_buf(),
            console_root: console.map(Path::to_path_buf),
            config: GateConfig::default(),
            now: Utc::now(),
        }
    }

    #[test]
    fn test_mode_display_matches_cli_names() {
        assert_eq!(Mode::CrossRepo.to_string(), "cross-repo");
        assert_eq!(Mode::Full.to_string(), "full");
        assert!(!Mode::Static.needs_console());
    }

    #[test]
    fn test_console_modes_fail_fast_without_path() {
        let market = tempdir().unwrap();
        for mode in [Mode::CrossRepo, Mode::Full] {
            let mut sink = DiagnosticSink::new();
            let err = run_pipeline(
                &options(mode, market.path(), None),
                &NoNetwork,
                &Narrator::Silent,
                &mut sink,
            )
            .unwrap_err();
            assert!(matches!(err, GateError::MissingConsolePath(m) if m == mode));
            assert!(sink.is_empty());
        }
    }

    #[test]
    fn test_static_mode_ignores_console() {
        let market = tempdir().unwrap();
        write(
            market.path(),
            "presets/pods.json",
            r#"{"format":"kc-card-preset-v1","card_type":"pod_status","title":"Pods"}"#,
        );
        let mut sink = DiagnosticSink::new();
        let outcome = run_pipeline(
            &options(Mode::Static, market.path(), Some(Path::new("/nonexistent"))),
            &NoNetwork,
            &Narrator::Silent,
            &mut sink,
        )
        .unwrap();
        assert!(outcome.registry.is_none());
        assert!(outcome.known_types.is_empty());
        assert!(outcome.marketplace_types.contains("pod_status"));
        assert!(sink.all().iter().all(|d| d.category != "card-type"));
    }

    #[test]
    fn test_missing_console_registry_is_single_error() {
        let market = tempdir().unwrap();
        let console = tempdir().unwrap();
        write(
            market.path(),
            "presets/pods.json",
            r#"{"format":"kc-card-preset-v1","card_type":"pod_status","title":"Pods"}"#,
        );
        let mut sink = DiagnosticSink::new();
        let outcome = run_pipeline(
            &options(Mode::CrossRepo, market.path(), Some(console.path())),
            &NoNetwork,
            &Narrator::Silent,
            &mut sink,
        )
        .unwrap();
        let card_type: Vec<_> = sink.all().iter().filter(|d| d.category == "card-type").collect();
        assert_eq!(card_type.len(), 1);
        assert_eq!(card_type[0].severity, Severity::Error);
        assert!(outcome.known_types.is_empty());
    }

    #[test]
    fn test_full_mode_runs_nightly() {
        let market = tempdir().unwrap();
        let console = tempdir().unwrap();
        write(
            market.path(),
            "registry.json",
            r#"{"updatedAt":"2020-01-01T00:00:00Z","items":[]}"#,
        );
        let mut sink = DiagnosticSink::new();
        run_pipeline(
            &options(Mode::Full, market.path(), Some(console.path())),
            &NoNetwork,
            &Narrator::Silent,
            &mut sink,
        )
        .unwrap();
        assert!(sink.all().iter().any(|d| d.category == "staleness"));
    }
}
