//! marketgate: a quality gate for a content marketplace.
//!
//! The marketplace repository holds card presets, dashboards, themes and a
//! registry manifest. A separate console repository renders them. marketgate
//! checks the marketplace on its own and against the console, then reports
//! every finding with a CI-friendly exit code.
//!
//! # Modes
//!
//! - `static`: JSON syntax, schemas, naming, registry consistency
//! - `cross-repo`: adds card-type existence, demo data, `isDemoData` wiring,
//!   failure forwarding, localization keys and CORS proxy scans
//! - `full`: adds download URL probes, registry staleness, theme key
//!   consistency and CNCF preset coverage
//!
//! # Exit codes
//!
//! `1` if any error was recorded, else `2` if any warning, else `0`.
//!
//! ```bash
//! marketgate --mode static
//! marketgate --mode full --console-path ../console --json
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: sink, loader, typed views, extractor, config, pipeline, reports
//! - [`gates`]: the three rule families

pub mod cli;
pub mod core;
pub mod gates;

use crate::cli::Cli;
use crate::core::config::GateConfig;
use crate::core::diagnostics::DiagnosticSink;
use crate::core::error::GateError;
use crate::core::output::Narrator;
use crate::core::pipeline::{PipelineOptions, run_pipeline};
use crate::core::report;
use crate::gates::nightly::HttpProbe;
use std::time::Duration;

/// What the binary still has to do once the report is printed.
#[derive(Debug)]
pub struct RunOutcome {
    pub exit_code: i32,
    /// Markdown digest (and matrix, when a console was checked).
    pub summary: String,
}

pub fn run(cli: &Cli) -> Result<RunOutcome, GateError> {
    if cli.no_color {
        colored::control::set_override(false);
    }

    let config = GateConfig::load(cli.config.as_deref(), &cli.marketplace_path)?;
    let probe = HttpProbe::new(Duration::from_secs(config.probe.timeout_secs));
    let opts = PipelineOptions {
        mode: cli.mode,
        marketplace_root: cli.marketplace_path.clone(),
        console_root: cli.console_path.clone(),
        config,
        now: chrono::Utc::now(),
    };

    let mut sink = DiagnosticSink::new();
    let outcome = run_pipeline(&opts, &probe, &Narrator::for_json(cli.json), &mut sink)?;

    if cli.json {
        println!("{}", report::render_json(&sink)?);
    } else {
        println!();
        print!("{}", report::render_text(&sink, !cli.no_color));
    }

    let mut summary = report::render_markdown(&sink);
    if let Some(registry) = &outcome.registry {
        summary.push('\n');
        summary.push_str(&report::render_quality_matrix(
            &outcome.marketplace_types,
            registry,
            &opts.config,
            &sink,
        ));
        summary.push('\n');
    }

    Ok(RunOutcome {
        exit_code: sink.exit_code(),
        summary,
    })
}
