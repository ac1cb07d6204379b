//! Attachments: auxiliary data a rule needs about each package.
//!
//! A rule declares named fetchers. While the tree is resolved, every fetcher
//! of every rule runs once per node and the results are stored per
//! `(node, rule)` in an [`AttachmentLookup`]. A failing fetcher only removes
//! its own key; it never fails the node or the run.

use crate::logger::{Logger, SharedLogger};
use crate::pkg::{Manifest, NodeId, PkgError};
use futures::future::{join_all, BoxFuture, FutureExt};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;

/// Attachment results of one rule for one node, keyed by attachment name.
pub type AttachmentData = BTreeMap<String, Value>;

/// Why a fetcher produced no value.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct AttachmentError(String);

impl AttachmentError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl From<PkgError> for AttachmentError {
    fn from(err: PkgError) -> Self {
        Self(err.to_string())
    }
}

impl From<reqwest::Error> for AttachmentError {
    fn from(err: reqwest::Error) -> Self {
        Self(err.to_string())
    }
}

impl From<serde_json::Error> for AttachmentError {
    fn from(err: serde_json::Error) -> Self {
        Self(err.to_string())
    }
}

/// What a fetcher may see of a package: identity and raw manifest only,
/// never another rule's attachment data.
#[derive(Debug, Clone)]
pub struct AttachmentTarget {
    manifest: Manifest,
}

impl AttachmentTarget {
    pub(crate) fn new(manifest: Manifest) -> Self {
        Self { manifest }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.manifest.name()
    }

    #[must_use]
    pub fn version(&self) -> &str {
        self.manifest.version()
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        self.manifest.full_name()
    }

    #[must_use]
    pub fn data(&self) -> Value {
        self.manifest.data()
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.manifest.get(path)
    }
}

/// Arguments handed to a fetcher.
#[derive(Clone)]
pub struct AttachmentArgs {
    pub package: AttachmentTarget,
    pub logger: SharedLogger,
}

/// An asynchronous source of attachment data.
pub trait AttachmentFetcher: Send + Sync {
    fn fetch(&self, args: AttachmentArgs) -> BoxFuture<'static, Result<Value, AttachmentError>>;
}

impl<F, Fut> AttachmentFetcher for F
where
    F: Fn(AttachmentArgs) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, AttachmentError>> + Send + 'static,
{
    fn fetch(&self, args: AttachmentArgs) -> BoxFuture<'static, Result<Value, AttachmentError>> {
        self(args).boxed()
    }
}

/// Ordered, named fetchers declared by one check.
#[derive(Clone, Default)]
pub struct Attachments {
    entries: Vec<(String, Arc<dyn AttachmentFetcher>)>,
}

impl Attachments {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a fetcher under `name`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, fetcher: impl AttachmentFetcher + 'static) -> Self {
        self.entries.push((name.into(), Arc::new(fetcher)));
        self
    }

    /// Declare an already shared fetcher under `name`.
    #[must_use]
    pub fn with_shared(mut self, name: impl Into<String>, fetcher: Arc<dyn AttachmentFetcher>) -> Self {
        self.entries.push((name.into(), fetcher));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reject blank or repeated names.
    pub(crate) fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for (name, _) in &self.entries {
            if name.trim().is_empty() {
                return Err("attachment name is empty".to_string());
            }
            if !seen.insert(name.as_str()) {
                return Err(format!("attachment \"{name}\" is declared twice"));
            }
        }
        Ok(())
    }

    /// Run every fetcher for one package and collect what succeeded.
    pub(crate) async fn compute(
        &self,
        manifest: &Manifest,
        logger: &SharedLogger,
        limiter: &Semaphore,
    ) -> AttachmentData {
        if self.entries.is_empty() {
            return AttachmentData::new();
        }

        let total = self.entries.len();
        let full_name = manifest.full_name();

        let fetches = self.entries.iter().enumerate().map(|(i, (name, fetcher))| {
            let args = AttachmentArgs {
                package: AttachmentTarget::new(manifest.clone()),
                logger: Arc::clone(logger),
            };
            let full_name = &full_name;
            async move {
                let _permit = limiter.acquire().await.ok();
                logger.log(&progress_line(full_name, i, total, name));

                let panicked = || Err(AttachmentError::new("fetcher panicked"));
                let result = match catch_unwind(AssertUnwindSafe(|| fetcher.fetch(args))) {
                    Ok(fetch) => AssertUnwindSafe(fetch)
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|_| panicked()),
                    Err(_) => panicked(),
                };

                match result {
                    Ok(value) => Some((name.clone(), value)),
                    Err(e) => {
                        logger.warn(&format!("Failed to apply attachment: {name} ({e})"));
                        None
                    }
                }
            }
        });

        join_all(fetches).await.into_iter().flatten().collect()
    }
}

impl fmt::Debug for Attachments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// `[name@1.0.0][Attachment: 1/2 - downloads]`
#[must_use]
pub fn progress_line(full_name: &str, index: usize, total: usize, name: &str) -> String {
    format!(
        "[{full_name}][Attachment: {} - {name}]",
        num_padding(index, total)
    )
}

/// One-based position `i + 1` over `total`, left-padded to the width of
/// `total`: `num_padding(33, 1457) == "  34/1457"`.
#[must_use]
pub fn num_padding(index: usize, total: usize) -> String {
    let width = total.to_string().len();
    format!("{:>width$}/{total}", index + 1)
}

/// Attachment data per node, one entry per rule in rule-set order.
#[derive(Debug, Default)]
pub struct AttachmentLookup {
    entries: HashMap<NodeId, Vec<Arc<AttachmentData>>>,
}

impl AttachmentLookup {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a node's data. Each node is written exactly once.
    pub(crate) fn insert(&mut self, node: NodeId, per_rule: Vec<Arc<AttachmentData>>) {
        let previous = self.entries.insert(node, per_rule);
        debug_assert!(previous.is_none(), "attachments recorded twice for {node}");
    }

    /// Data the rule at `rule_index` holds for `node`.
    #[must_use]
    pub fn get(&self, node: NodeId, rule_index: usize) -> Option<&Arc<AttachmentData>> {
        self.entries.get(&node)?.get(rule_index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
