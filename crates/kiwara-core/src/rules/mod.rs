//! Built-in rules.

mod deprecated;
mod direct;
mod downloads;
mod loops;
mod sprawl;

pub use deprecated::DeprecatedCheck;
pub use direct::MaxDirectDependenciesCheck;
pub use downloads::DownloadCountCheck;
pub use loops::DependencyLoopCheck;
pub use sprawl::VersionSprawlCheck;

use crate::error::Error;
use crate::lint::{Rule, RuleSet, Severity};
use crate::pkg::DownloadsClient;
use serde_json::json;

pub const DEPRECATED: &str = "deprecated";
pub const DOWNLOAD_COUNT: &str = "download-count";
pub const VERSION_SPRAWL: &str = "version-sprawl";
pub const DEPENDENCY_LOOP: &str = "dependency-loop";
pub const MAX_DIRECT_DEPENDENCIES: &str = "max-direct-dependencies";

/// Every built-in rule name, in default evaluation order.
pub const BUILTIN_RULES: &[&str] = &[
    DEPRECATED,
    DOWNLOAD_COUNT,
    VERSION_SPRAWL,
    DEPENDENCY_LOOP,
    MAX_DIRECT_DEPENDENCIES,
];

/// Parameters for the built-in rules.
#[derive(Debug, Clone)]
pub struct RuleOptions {
    /// Weekly downloads below this are reported.
    pub min_downloads: u64,
    /// A name resolved to more versions than this is reported.
    pub max_versions: usize,
    /// More direct dependencies than this are reported.
    pub max_direct_dependencies: usize,
    /// Client used by `download-count`. Required only if that rule is enabled.
    pub downloads: Option<DownloadsClient>,
}

impl Default for RuleOptions {
    fn default() -> Self {
        Self {
            min_downloads: 1_000,
            max_versions: 1,
            max_direct_dependencies: 20,
            downloads: None,
        }
    }
}

/// Build one built-in rule by name.
///
/// # Errors
/// Returns [`Error::UnknownRule`] for an unknown name, or
/// [`Error::InvalidRule`] when `download-count` has no client.
pub fn builtin_rule(name: &str, options: &RuleOptions) -> Result<Rule, Error> {
    match name {
        DEPRECATED => Rule::new(Severity::Error, DeprecatedCheck),
        DOWNLOAD_COUNT => {
            let client = options.downloads.clone().ok_or_else(|| {
                Error::invalid_rule(DOWNLOAD_COUNT, "no download statistics client configured")
            })?;
            Rule::new(Severity::Warn, DownloadCountCheck::new(client))?
                .with_params(json!({ "minimum": options.min_downloads }))
        }
        VERSION_SPRAWL => Rule::new(Severity::Warn, VersionSprawlCheck)?
            .with_params(json!({ "max_versions": options.max_versions })),
        DEPENDENCY_LOOP => Rule::new(Severity::Warn, DependencyLoopCheck),
        MAX_DIRECT_DEPENDENCIES => Rule::new(Severity::Warn, MaxDirectDependenciesCheck)?
            .with_params(json!({ "max": options.max_direct_dependencies })),
        other => Err(Error::UnknownRule(other.to_string())),
    }
}

/// Build a rule set from names, keeping their order.
pub fn rule_set<I, S>(names: I, options: &RuleOptions) -> Result<RuleSet, Error>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| builtin_rule(name.as_ref(), options))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_rule() {
        let err = builtin_rule("no-such-rule", &RuleOptions::default()).unwrap_err();
        assert!(matches!(err, Error::UnknownRule(name) if name == "no-such-rule"));
    }

    #[test]
    fn test_download_count_needs_client() {
        let err = builtin_rule(DOWNLOAD_COUNT, &RuleOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidRule { .. }));

        let options = RuleOptions {
            downloads: Some(DownloadsClient::new("http://127.0.0.1:9").unwrap()),
            min_downloads: 50,
            ..RuleOptions::default()
        };
        let rule = builtin_rule(DOWNLOAD_COUNT, &options).unwrap();
        assert_eq!(rule.params()["minimum"], 50);
        assert_eq!(rule.attachments().names().collect::<Vec<_>>(), vec!["downloads"]);
    }

    #[test]
    fn test_rule_set_keeps_requested_order() {
        let rules = rule_set([DEPENDENCY_LOOP, DEPRECATED], &RuleOptions::default()).unwrap();
        let names: Vec<_> = rules.iter().map(Rule::name).collect();
        assert_eq!(names, vec![DEPENDENCY_LOOP, DEPRECATED]);
    }
}
