//! Rule sets run by the pipeline.
//!
//! - [`static_gate`]: marketplace tree only (every mode)
//! - [`cross_repo`]: marketplace plus a console checkout (`cross-repo`, `full`)
//! - [`nightly`]: network and staleness audits (`full`)
//!
//! Gates append to a [`DiagnosticSink`](crate::core::diagnostics::DiagnosticSink)
//! and never read each other's diagnostics; the only value passed between them
//! is the known card-type set.

pub mod cross_repo;
pub mod nightly;
pub mod static_gate;

pub(crate) fn trace_gate(name: &str) {
    tracing::debug!(gate = name, "running gate");
}
