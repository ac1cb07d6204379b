use crate::logger::LogLevel;
use crate::pkg::DependencyType;
use serde::{Deserialize, Serialize};

/// Default number of concurrent registry/attachment fetches.
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Options for one lint run, passed explicitly to the resolver and evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintConfig {
    /// Deepest level to resolve (root = 0). `None` means unbounded.
    pub max_depth: Option<usize>,

    /// Manifest section followed when walking the tree.
    pub dependency_type: DependencyType,

    /// Messages chattier than this never reach the logger.
    pub log_level: LogLevel,

    /// Upper bound on in-flight fetches (manifests and attachments).
    pub concurrency: usize,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            dependency_type: DependencyType::default(),
            log_level: LogLevel::default(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl LintConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_dependency_type(mut self, dependency_type: DependencyType) -> Self {
        self.dependency_type = dependency_type;
        self
    }

    #[must_use]
    pub fn with_log_level(mut self, log_level: LogLevel) -> Self {
        self.log_level = log_level;
        self
    }

    /// Set fetch concurrency (clamped to at least 1).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Whether children of a node at `depth` should be resolved.
    #[must_use]
    pub fn descends_below(&self, depth: usize) -> bool {
        self.max_depth.map_or(true, |max| depth < max)
    }
}
