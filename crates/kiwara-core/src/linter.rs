//! One lint run: resolve the tree, then evaluate every rule on it.

use crate::cancel::CancelToken;
use crate::config::LintConfig;
use crate::error::Error;
use crate::lint::{evaluate, LintReport, RuleSet};
use crate::logger::{LevelFilter, Logger, SharedLogger};
use crate::pkg::{MetadataProvider, PackageRef, PackageTree, PackageView};
use crate::resolver::GraphResolver;
use std::sync::Arc;

/// Outcome of a completed run.
#[derive(Debug)]
pub struct LintRun {
    pub tree: PackageTree,
    pub report: LintReport,
}

impl LintRun {
    /// `name@version` of the resolved root.
    #[must_use]
    pub fn root_full_name(&self) -> String {
        self.tree.root().full_name()
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.report.exit_code()
    }
}

pub struct Linter<P> {
    provider: P,
    rules: RuleSet,
    config: LintConfig,
    logger: SharedLogger,
    cancel: CancelToken,
}

impl<P: MetadataProvider> Linter<P> {
    /// Messages above `config.log_level` are dropped before reaching `logger`.
    pub fn new(provider: P, rules: RuleSet, config: LintConfig, logger: SharedLogger) -> Self {
        let logger: SharedLogger = Arc::new(LevelFilter::new(logger, config.log_level));
        Self {
            provider,
            rules,
            config,
            logger,
            cancel: CancelToken::never(),
        }
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Lint `root` and everything it depends on.
    ///
    /// # Errors
    /// Resolution failures and cancellation. Rule failures are reported as
    /// internal-error findings instead. The failure itself is left to the
    /// caller to display.
    pub async fn run(&self, root: &PackageRef) -> Result<LintRun, Error> {
        let resolution = GraphResolver::new(&self.provider, &self.rules, &self.config, self.logger.clone())
            .with_cancel(self.cancel.clone())
            .resolve(root)
            .await?;

        self.logger
            .log(&format!("Root package: {}", resolution.tree.root().full_name()));

        let report = evaluate(
            &resolution.tree,
            &self.rules,
            &resolution.attachments,
            self.logger.as_ref(),
            &self.cancel,
        )?;

        Ok(LintRun {
            tree: resolution.tree,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::cancel_pair;
    use crate::lint::{check_fn, CheckOutput, FindingKind, Rule, Severity};
    use crate::logger::{LogLevel, MemoryLogger};
    use crate::pkg::MemoryProvider;
    use crate::rules::{rule_set, RuleOptions, DEPENDENCY_LOOP, DEPRECATED};
    use serde_json::json;

    fn provider() -> MemoryProvider {
        MemoryProvider::from_manifests([
            json!({ "name": "app", "version": "1.0.0",
                    "dependencies": { "old": "^1.0.0", "cyclic": "1.0.0" } }),
            json!({ "name": "old", "version": "1.4.0", "deprecated": "use new instead" }),
            json!({ "name": "cyclic", "version": "1.0.0", "dependencies": { "app": "1.0.0" } }),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_run_reports_and_exit_code() {
        let rules = rule_set([DEPRECATED, DEPENDENCY_LOOP], &RuleOptions::default()).unwrap();
        let sink = Arc::new(MemoryLogger::new());
        let linter = Linter::new(provider(), rules, LintConfig::new(), sink.clone());

        let run = linter.run(&PackageRef::new("app", None)).await.unwrap();

        assert_eq!(run.root_full_name(), "app@1.0.0");
        let kinds: Vec<_> = run
            .report
            .findings
            .iter()
            .map(|f| (f.rule.as_str(), f.package.as_str(), f.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("deprecated", "old@1.4.0", FindingKind::Error),
                ("dependency-loop", "app@1.0.0", FindingKind::Warn),
            ]
        );
        assert_eq!(run.exit_code(), 1);
        assert!(sink
            .messages(LogLevel::Log)
            .contains(&"Root package: app@1.0.0".to_string()));
    }

    #[tokio::test]
    async fn test_warnings_only_exit_zero() {
        let rules = rule_set([DEPENDENCY_LOOP], &RuleOptions::default()).unwrap();
        let linter = Linter::new(provider(), rules, LintConfig::new(), Arc::new(MemoryLogger::new()));

        let run = linter.run(&PackageRef::new("app", None)).await.unwrap();
        assert_eq!(run.report.warning_count(), 1);
        assert_eq!(run.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_log_level_filters_sink() {
        let sink = Arc::new(MemoryLogger::new());
        let config = LintConfig::new().with_log_level(LogLevel::Error);
        let linter = Linter::new(provider(), RuleSet::new(), config, sink.clone());

        linter.run(&PackageRef::new("app", None)).await.unwrap();
        assert!(sink.lines().is_empty());

        let err = linter
            .run(&PackageRef::new("missing", None))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("PKG_NOT_FOUND"));
        assert_eq!(
            sink.lines(),
            vec![(LogLevel::Error, "Error evaluating dependencies".to_string())]
        );
    }

    #[tokio::test]
    async fn test_panicking_rule_is_isolated() {
        let rules = RuleSet::new()
            .with(
                Rule::new(
                    Severity::Warn,
                    check_fn("boom", |_ctx| -> Result<CheckOutput, _> { panic!("kaboom") }),
                )
                .unwrap(),
            )
            .with(
                Rule::new(
                    Severity::Warn,
                    check_fn("fine", |ctx| Ok(ctx.pkg.name().to_string().into())),
                )
                .unwrap(),
            );
        let linter = Linter::new(provider(), rules, LintConfig::new(), Arc::new(MemoryLogger::new()));

        let run = linter.run(&PackageRef::new("app", None)).await.unwrap();
        assert_eq!(run.report.internal_error_count(), 4);
        assert_eq!(run.report.warning_count(), 4);
        assert_eq!(run.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let (handle, token) = cancel_pair();
        handle.cancel();
        let linter = Linter::new(provider(), RuleSet::new(), LintConfig::new(), Arc::new(MemoryLogger::new()))
            .with_cancel(token);

        let err = linter.run(&PackageRef::new("app", None)).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }
}
