//! Terminal and file output plumbing for the CLI.
//!
//! Section banners go wherever the report does not: stdout for text reports,
//! stderr when stdout carries JSON.

use crate::core::error::GateError;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Narrator {
    Stdout,
    Stderr,
    Silent,
}

impl Narrator {
    pub fn for_json(json: bool) -> Self {
        if json { Narrator::Stderr } else { Narrator::Stdout }
    }

    pub fn banner(&self, title: &str) {
        let line = format_banner(title);
        match self {
            Narrator::Stdout => println!("{}", line),
            Narrator::Stderr => eprintln!("{}", line),
            Narrator::Silent => {}
        }
    }
}

pub fn format_banner(title: &str) -> String {
    format!("\n=== {} ===", title)
}

/// Appends `text` to the summary file, creating it if absent.
pub fn append_summary(path: &Path, text: &str) -> Result<(), GateError> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        file.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_banner_format() {
        assert_eq!(format_banner("Nightly Checks"), "\n=== Nightly Checks ===");
        assert_eq!(Narrator::for_json(true), Narrator::Stderr);
        assert_eq!(Narrator::for_json(false), Narrator::Stdout);
    }

    #[test]
    fn test_append_summary_keeps_existing_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("summary.md");
        std::fs::write(&path, "# Earlier step\n").unwrap();
        append_summary(&path, "### Marketplace Quality").unwrap();
        append_summary(&path, "second\n").unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        assert_eq!(body, "# Earlier step\n### Marketplace Quality\nsecond\n");
    }
}
