//! Report document template.
//!
//! The report is written from `<template_dir>/template.qmd`, or from the
//! template bundled into the binary when no directory is configured. The
//! template reads its tables from a results directory; that location is
//! rewritten to the absolute results path of the current run.

use crate::error::RenderError;
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use std::fs;
use std::path::Path;

/// File name of the template inside a template directory.
pub const TEMPLATE_FILE: &str = "template.qmd";

/// Template used when no template directory is configured.
pub const DEFAULT_TEMPLATE: &str = include_str!("../../templates/quarto/template.qmd");

/// Environment-driven results location, in either quote style.
static RESULTS_DIR_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"results_dir\s*=\s*os\.getenv\(\s*['"]RESULTS_DIR['"]\s*,\s*['"]results['"]\s*\)"#)
        .expect("Invalid regex: results_dir assignment")
});

const RESULTS_DIR_PLACEHOLDER: &str = "{{results_dir}}";

/// Read the template from `template_dir`, or return the bundled one.
pub fn load_template(template_dir: Option<&Path>) -> Result<String, RenderError> {
    match template_dir {
        None => Ok(DEFAULT_TEMPLATE.to_string()),
        Some(dir) => {
            let path = dir.join(TEMPLATE_FILE);
            if !path.is_file() {
                return Err(RenderError::TemplateMissing(path));
            }
            Ok(fs::read_to_string(&path)?)
        }
    }
}

/// Point the template at `results_dir`.
///
/// Rewrites the `os.getenv('RESULTS_DIR', 'results')` assignment to a string
/// literal and replaces every `{{results_dir}}` placeholder.
pub fn substitute_results_dir(template: &str, results_dir: &Path) -> String {
    let path = results_dir.to_string_lossy();
    let assignment = format!("results_dir = {:?}", path.as_ref());
    RESULTS_DIR_ASSIGNMENT
        .replace_all(template, NoExpand(&assignment))
        .replace(RESULTS_DIR_PLACEHOLDER, &path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn test_bundled_template_reads_results_dir() {
        assert!(RESULTS_DIR_ASSIGNMENT.is_match(DEFAULT_TEMPLATE));
    }

    #[test]
    fn test_substitute_assignment() {
        let template = "x = 1\nresults_dir = os.getenv('RESULTS_DIR', 'results')\n";
        let out = substitute_results_dir(template, &PathBuf::from("/tmp/report_1/results"));
        assert_eq!(out, "x = 1\nresults_dir = \"/tmp/report_1/results\"\n");
    }

    #[test]
    fn test_substitute_double_quotes_and_placeholder() {
        let template = "results_dir = os.getenv(\"RESULTS_DIR\", \"results\")\nsee {{results_dir}}";
        let out = substitute_results_dir(template, &PathBuf::from("/data/$HOME/results"));
        assert_eq!(
            out,
            "results_dir = \"/data/$HOME/results\"\nsee /data/$HOME/results"
        );
    }

    #[test]
    fn test_load_template_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("template.qmd"), "custom").unwrap();
        assert_eq!(load_template(Some(dir.path())).unwrap(), "custom");
    }

    #[test]
    fn test_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_template(Some(dir.path())).unwrap_err();
        assert!(matches!(err, RenderError::TemplateMissing(path) if path.ends_with("template.qmd")));
    }

    #[test]
    fn test_default_template_when_no_dir() {
        assert_eq!(load_template(None).unwrap(), DEFAULT_TEMPLATE);
    }
}
