//! Rule evaluation.
//!
//! Every rule runs against every node, in tree pre-order and then rule order.
//! A check that errors or panics yields one `internal-error` finding for that
//! `(node, rule)` pair and evaluation carries on.

use super::attachment::AttachmentLookup;
use super::rule::{CheckContext, CheckOutput, Rule, RuleSet, Severity};
use super::scope::ScopedView;
use crate::cancel::CancelToken;
use crate::error::Error;
use crate::logger::Logger;
use crate::pkg::{NodeId, PackageNode, PackageTree, PackageView};
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Kind of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    Error,
    Warn,
    /// The check itself failed.
    InternalError,
}

impl FindingKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::InternalError => "internal-error",
        }
    }

    /// Whether a finding of this kind fails the run.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Warn)
    }
}

impl From<Severity> for FindingKind {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Error => Self::Error,
            Severity::Warn => Self::Warn,
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message about one package from one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintFinding {
    #[serde(rename = "type")]
    pub kind: FindingKind,
    pub rule: String,
    pub message: String,
    /// `(name, version)` pairs from the root down to the package.
    pub path: Vec<(String, String)>,
    /// `name@version` of the package.
    pub package: String,
    #[serde(skip)]
    pub node: NodeId,
}

/// Findings of a run, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintReport {
    pub findings: Vec<LintFinding>,
}

impl LintReport {
    fn count(&self, kind: FindingKind) -> usize {
        self.findings.iter().filter(|f| f.kind == kind).count()
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.count(FindingKind::Error)
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.count(FindingKind::Warn)
    }

    #[must_use]
    pub fn internal_error_count(&self) -> usize {
        self.count(FindingKind::InternalError)
    }

    /// 1 if any error or internal error was found, else 0.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(self.findings.iter().any(|f| f.kind.is_failure()))
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.exit_code() == 0
    }
}

/// Run `rules` against every node of `tree`.
///
/// # Errors
/// Only [`Error::Cancelled`]; check failures become findings.
pub fn evaluate(
    tree: &PackageTree,
    rules: &RuleSet,
    lookup: &AttachmentLookup,
    logger: &dyn Logger,
    cancel: &CancelToken,
) -> Result<LintReport, Error> {
    let mut report = LintReport::default();

    for node in tree.pre_order() {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let path = node.path();
        let package = node.full_name();

        for (index, rule) in rules.iter().enumerate() {
            let finding = |kind: FindingKind, message: String| LintFinding {
                kind,
                rule: rule.name().to_string(),
                message,
                path: path.clone(),
                package: package.clone(),
                node: node.id(),
            };

            match run_check(node, index, rule, lookup, logger) {
                Ok(output) => report.findings.extend(
                    output
                        .into_messages()
                        .into_iter()
                        .map(|message| finding(rule.severity().into(), message)),
                ),
                Err(message) => report
                    .findings
                    .push(finding(FindingKind::InternalError, message)),
            }
        }
    }

    Ok(report)
}

/// Run one rule on one node. `Err` carries the internal-error message.
fn run_check(
    node: PackageNode<'_>,
    index: usize,
    rule: &Rule,
    lookup: &AttachmentLookup,
    logger: &dyn Logger,
) -> Result<CheckOutput, String> {
    let view = ScopedView::build(node, index, rule.name(), lookup).map_err(|e| e.to_string())?;

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let ctx = CheckContext {
            pkg: view.root(),
            params: rule.params(),
            logger,
        };
        rule.run(&ctx)
    }));

    match outcome {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(e.to_string()),
        Err(panic) => Err(panic_message(panic.as_ref())),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "check panicked".to_string()
    }
}
