//! Core building blocks shared by every gate: the diagnostic sink, file
//! loading, typed document views, the console registry extractor,
//! configuration, the pipeline, and report rendering.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod extractor;
pub mod loader;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod report;
