use crate::logging::TracingLogger;
use kiwara_core::lint::{write_human, JsonReport};
use kiwara_core::pkg::{
    DependencyType, DownloadsClient, MemoryProvider, MetadataProvider, PackageRef,
    RegistryClient, RegistryProvider, DEFAULT_DOWNLOADS_API, DOWNLOADS_API_ENV,
};
use kiwara_core::rules::{rule_set, RuleOptions, BUILTIN_RULES, DOWNLOAD_COUNT};
use kiwara_core::{cancel_pair, CancelToken, Error, LintConfig, Linter, LogLevel};
use miette::{IntoDiagnostic, Result};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// Error code reported for failures that carry no registry code.
const LINT_FAILED: &str = "LINT_FAILED";

/// Everything `kiwara lint` was asked to do.
#[derive(Debug, Clone)]
pub struct LintAction {
    pub package: String,
    pub max_depth: Option<usize>,
    pub dev: bool,
    pub rules: Vec<String>,
    pub min_downloads: Option<u64>,
    pub max_versions: Option<usize>,
    pub max_direct: Option<usize>,
    pub concurrency: Option<usize>,
    pub registry: Option<String>,
    pub from_dir: Option<PathBuf>,
    pub log_level: Option<LogLevel>,
}

/// Run the lint command and return the process exit code.
pub fn run(action: LintAction, json: bool) -> Result<i32> {
    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    runtime.block_on(run_async(action, json))
}

async fn run_async(action: LintAction, json: bool) -> Result<i32> {
    let root = match PackageRef::parse(&action.package) {
        Ok(root) => root,
        Err(e) => return fail(json, e.code(), &e.to_string()),
    };

    let registry = match &action.registry {
        Some(url) => RegistryClient::new(url),
        None => RegistryClient::from_env(),
    };
    let registry = match registry {
        Ok(registry) => registry,
        Err(e) => return fail(json, e.code(), &e.to_string()),
    };

    let downloads_url =
        std::env::var(DOWNLOADS_API_ENV).unwrap_or_else(|_| DEFAULT_DOWNLOADS_API.to_string());
    let downloads = match DownloadsClient::with_http(&downloads_url, registry.http().clone()) {
        Ok(downloads) => downloads,
        Err(e) => return fail(json, e.code(), &e.to_string()),
    };

    let defaults = RuleOptions::default();
    let options = RuleOptions {
        min_downloads: action.min_downloads.unwrap_or(defaults.min_downloads),
        max_versions: action.max_versions.unwrap_or(defaults.max_versions),
        max_direct_dependencies: action.max_direct.unwrap_or(defaults.max_direct_dependencies),
        downloads: Some(downloads),
    };

    let names: Vec<String> = if action.rules.is_empty() {
        default_rules(action.from_dir.is_some())
    } else {
        action.rules.clone()
    };
    let rules = match rule_set(&names, &options) {
        Ok(rules) => rules,
        Err(e) => return fail(json, LINT_FAILED, &e.to_string()),
    };

    let mut config = LintConfig::new().with_max_depth(action.max_depth);
    if action.dev {
        config = config.with_dependency_type(DependencyType::DevDependencies);
    }
    if let Some(concurrency) = action.concurrency {
        config = config.with_concurrency(concurrency);
    }
    if let Some(level) = action.log_level {
        config = config.with_log_level(level);
    }

    tracing::debug!(
        package = %action.package,
        rules = ?names,
        max_depth = ?config.max_depth,
        dependency_type = %config.dependency_type,
        "Starting lint"
    );

    // Ctrl-C cancels in-flight lookups
    let (handle, cancel) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    match &action.from_dir {
        Some(dir) => match MemoryProvider::from_dir(dir) {
            Ok(provider) => lint(provider, rules, config, cancel, &root, json).await,
            Err(e) => fail(json, e.code(), &e.to_string()),
        },
        None => {
            let provider = RegistryProvider::new(registry);
            lint(provider, rules, config, cancel, &root, json).await
        }
    }
}

async fn lint<P: MetadataProvider>(
    provider: P,
    rules: kiwara_core::lint::RuleSet,
    config: LintConfig,
    cancel: CancelToken,
    root: &PackageRef,
    json: bool,
) -> Result<i32> {
    let linter =
        Linter::new(provider, rules, config, Arc::new(TracingLogger)).with_cancel(cancel);

    let run = match linter.run(root).await {
        Ok(run) => run,
        Err(e) => {
            let code = e.code().unwrap_or(if matches!(e, Error::Cancelled) {
                "LINT_CANCELLED"
            } else {
                LINT_FAILED
            });
            return fail(json, code, &e.to_string());
        }
    };

    if json {
        print_json(&JsonReport::from_report(run.root_full_name(), &run.report))?;
    } else {
        let mut out = io::stdout().lock();
        write_human(&mut out, &run.report.findings).into_diagnostic()?;
        out.flush().into_diagnostic()?;
    }

    Ok(run.exit_code())
}

/// Built-in rules run when `--rules` is absent. Offline runs skip the ones
/// that call out to the network.
fn default_rules(offline: bool) -> Vec<String> {
    BUILTIN_RULES
        .iter()
        .filter(|name| !(offline && **name == DOWNLOAD_COUNT))
        .map(ToString::to_string)
        .collect()
}

/// Report a failure that left no findings to print.
fn fail(json: bool, code: &str, message: &str) -> Result<i32> {
    if json {
        print_json(&JsonReport::from_error(code, message))?;
    } else {
        tracing::error!("{message}");
    }
    Ok(1)
}

fn print_json(report: &JsonReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).into_diagnostic()?;
    println!("{json}");
    Ok(())
}
