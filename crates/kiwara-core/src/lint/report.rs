//! Rendering a [`LintReport`] for people and for machines.

use super::engine::{FindingKind, LintFinding, LintReport};
use crate::pkg::format_path;
use serde::Serialize;
use std::io::{self, Write};

/// Schema version of [`JsonReport`].
pub const LINT_REPORT_SCHEMA_VERSION: u32 = 1;

/// Counts by finding kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JsonSummary {
    pub errors: usize,
    pub warnings: usize,
    pub internal_errors: usize,
}

/// Error that stopped the run before any rule was evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JsonRunError {
    pub code: String,
    pub message: String,
}

/// Machine-readable result of `kiwara lint --json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JsonReport {
    pub schema_version: u32,
    pub ok: bool,
    pub exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    pub summary: JsonSummary,
    pub findings: Vec<LintFinding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRunError>,
}

impl JsonReport {
    #[must_use]
    pub fn from_report(root: impl Into<String>, report: &LintReport) -> Self {
        let exit_code = report.exit_code();
        Self {
            schema_version: LINT_REPORT_SCHEMA_VERSION,
            ok: exit_code == 0,
            exit_code,
            root: Some(root.into()),
            summary: JsonSummary {
                errors: report.error_count(),
                warnings: report.warning_count(),
                internal_errors: report.internal_error_count(),
            },
            findings: report.findings.clone(),
            error: None,
        }
    }

    /// A run that failed before evaluation (resolution error, cancellation).
    #[must_use]
    pub fn from_error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            schema_version: LINT_REPORT_SCHEMA_VERSION,
            ok: false,
            exit_code: 1,
            root: None,
            summary: JsonSummary::default(),
            findings: Vec::new(),
            error: Some(JsonRunError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// Write findings grouped under their package path, then a summary.
///
/// ```text
///
/// root@1.0.0 → dep1@1.0.0
///   [warn][dep1@1.0.0][deprecated]: Package is deprecated: use dep4
///
/// Found 1 warning(s) and 0 error(s)
/// ```
pub fn write_human<W: Write>(out: &mut W, findings: &[LintFinding]) -> io::Result<()> {
    let mut errors = 0;
    let mut warnings = 0;
    let mut internal_errors = 0;
    let mut current_path: Option<String> = None;

    for finding in findings {
        let path = format_path(&finding.path);
        if current_path.as_deref() != Some(path.as_str()) {
            writeln!(out, "\n{path}")?;
            current_path = Some(path);
        }

        writeln!(
            out,
            "  [{}][{}][{}]: {}",
            finding.kind, finding.package, finding.rule, finding.message
        )?;

        match finding.kind {
            FindingKind::Error => errors += 1,
            FindingKind::Warn => warnings += 1,
            FindingKind::InternalError => internal_errors += 1,
        }
    }

    if findings.is_empty() {
        writeln!(out, "\nFound no issues (0 warnings, 0 errors)")?;
    } else {
        writeln!(out, "\nFound {warnings} warning(s) and {errors} error(s)")?;
    }

    if internal_errors > 0 {
        writeln!(
            out,
            "Terminated with {internal_errors} internal error(s), please check lint output"
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkg::NodeId;

    fn finding(kind: FindingKind, path: &[(&str, &str)], rule: &str, message: &str) -> LintFinding {
        let path: Vec<(String, String)> = path
            .iter()
            .map(|(n, v)| ((*n).to_string(), (*v).to_string()))
            .collect();
        let (name, version) = path.last().cloned().unwrap();
        LintFinding {
            kind,
            rule: rule.to_string(),
            message: message.to_string(),
            package: format!("{name}@{version}"),
            path,
            node: NodeId::ROOT,
        }
    }

    fn render(findings: &[LintFinding]) -> String {
        let mut out = Vec::new();
        write_human(&mut out, findings).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_no_issues() {
        assert_eq!(render(&[]), "\nFound no issues (0 warnings, 0 errors)\n");
    }

    #[test]
    fn test_path_printed_once_per_change() {
        let dep1 = [("root", "1.0.0"), ("dep1", "1.0.0")];
        let findings = vec![
            finding(FindingKind::Warn, &dep1, "a", "first"),
            finding(FindingKind::Error, &dep1, "b", "second"),
            finding(FindingKind::Warn, &[("root", "1.0.0")], "a", "third"),
        ];

        assert_eq!(
            render(&findings),
            "\nroot@1.0.0 → dep1@1.0.0\n\
             \x20 [warn][dep1@1.0.0][a]: first\n\
             \x20 [error][dep1@1.0.0][b]: second\n\
             \nroot@1.0.0\n\
             \x20 [warn][root@1.0.0][a]: third\n\
             \nFound 2 warning(s) and 1 error(s)\n"
        );
    }

    #[test]
    fn test_internal_errors_banner() {
        let findings = vec![finding(
            FindingKind::InternalError,
            &[("root", "1.0.0")],
            "broken",
            "boom",
        )];
        let text = render(&findings);
        assert!(text.contains("  [internal-error][root@1.0.0][broken]: boom"));
        assert!(text.contains("Found 0 warning(s) and 0 error(s)"));
        assert!(text.ends_with("Terminated with 1 internal error(s), please check lint output\n"));
    }

    #[test]
    fn test_json_report() {
        let report = LintReport {
            findings: vec![
                finding(FindingKind::Warn, &[("root", "1.0.0")], "a", "w"),
                finding(FindingKind::InternalError, &[("root", "1.0.0")], "b", "x"),
            ],
        };
        let json = serde_json::to_value(JsonReport::from_report("root@1.0.0", &report)).unwrap();

        assert_eq!(json["schema_version"], LINT_REPORT_SCHEMA_VERSION);
        assert_eq!(json["ok"], false);
        assert_eq!(json["exit_code"], 1);
        assert_eq!(json["root"], "root@1.0.0");
        assert_eq!(json["summary"]["warnings"], 1);
        assert_eq!(json["summary"]["internal_errors"], 1);
        assert_eq!(json["findings"][1]["type"], "internal-error");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_json_error_report() {
        let json =
            serde_json::to_value(JsonReport::from_error("PKG_NOT_FOUND", "Couldn't get package"))
                .unwrap();
        assert_eq!(json["exit_code"], 1);
        assert_eq!(json["error"]["code"], "PKG_NOT_FOUND");
        assert_eq!(json["findings"], serde_json::json!([]));
    }
}
