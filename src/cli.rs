//! CLI struct definitions for the `marketgate` command-line interface.
//!
//! All clap-derived types live here. Dispatch lives in [`crate::run`].

use crate::core::pipeline::Mode;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "marketgate",
    version = env!("CARGO_PKG_VERSION"),
    about = "Quality gate for a card/dashboard/theme marketplace and the console that renders it."
)]
pub struct Cli {
    /// Which gate families to run.
    #[clap(long, value_enum, default_value_t = Mode::Static)]
    pub mode: Mode,
    /// Path to the console checkout. Required for 'cross-repo' and 'full'.
    #[clap(long)]
    pub console_path: Option<PathBuf>,
    /// Marketplace repository root.
    #[clap(long, default_value = ".")]
    pub marketplace_path: PathBuf,
    /// Emit the report as JSON on stdout; banners move to stderr.
    #[clap(long)]
    pub json: bool,
    /// Append a markdown digest to this file (e.g. $GITHUB_STEP_SUMMARY).
    #[clap(long)]
    pub github_summary: Option<PathBuf>,
    /// Gate configuration file. Defaults to `<marketplace>/marketgate.toml` if present.
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// Disable coloured text output.
    #[clap(long)]
    pub no_color: bool,
    /// Debug-level logging on stderr.
    #[clap(long, short = 'v')]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["marketgate"]).unwrap();
        assert_eq!(cli.mode, Mode::Static);
        assert_eq!(cli.marketplace_path, PathBuf::from("."));
        assert!(!cli.json);
        assert!(cli.console_path.is_none());
    }

    #[test]
    fn test_mode_values() {
        let cli = Cli::try_parse_from(["marketgate", "--mode", "cross-repo", "--console-path", "/c"])
            .unwrap();
        assert_eq!(cli.mode, Mode::CrossRepo);
        assert!(Cli::try_parse_from(["marketgate", "--mode", "nightly"]).is_err());
    }
}
