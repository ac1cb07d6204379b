//! Graph resolver.
//!
//! Turns a root reference into a [`PackageTree`] plus the attachment data of
//! every rule for every node.
//!
//! Siblings are resolved concurrently. Each branch carries its own copy of
//! the ancestor path, so a package reached through two different branches
//! (a diamond) is never mistaken for a cycle; only a package that re-declares
//! one of its own ancestors is a loop. Child manifests are fetched as a batch
//! whose order is fixed by the parent's manifest before anything is
//! dispatched, so tree order never depends on network timing.
//!
//! The tree is assembled only after every branch finished. A failed lookup
//! or a cancellation therefore never leaves a half-built tree behind.

use crate::cancel::CancelToken;
use crate::config::LintConfig;
use crate::error::Error;
use crate::lint::attachment::{AttachmentData, AttachmentLookup};
use crate::lint::rule::RuleSet;
use crate::logger::{Logger, SharedLogger};
use crate::pkg::{Manifest, MetadataProvider, NodeId, PackageRef, PackageTree};
use futures::future::{join_all, try_join_all, BoxFuture, FutureExt};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// A resolved tree and the attachment data computed while resolving it.
#[derive(Debug)]
pub struct Resolution {
    pub tree: PackageTree,
    pub attachments: AttachmentLookup,
}

/// A subtree before it is written into the arena.
struct Branch {
    manifest: Manifest,
    attachments: Vec<Arc<AttachmentData>>,
    is_loop: bool,
    children: Vec<Branch>,
}

pub struct GraphResolver<'a, P: ?Sized> {
    provider: &'a P,
    rules: &'a RuleSet,
    config: &'a LintConfig,
    logger: SharedLogger,
    limiter: Semaphore,
    cancel: CancelToken,
}

impl<'a, P: MetadataProvider + ?Sized> GraphResolver<'a, P> {
    pub fn new(
        provider: &'a P,
        rules: &'a RuleSet,
        config: &'a LintConfig,
        logger: SharedLogger,
    ) -> Self {
        Self {
            provider,
            rules,
            config,
            logger,
            limiter: Semaphore::new(config.concurrency.max(1)),
            cancel: CancelToken::never(),
        }
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Resolve `root` and everything below it.
    ///
    /// # Errors
    /// Any lookup failure aborts the whole resolution. Returns
    /// [`Error::Cancelled`] if the run is cancelled first.
    pub async fn resolve(&self, root: &PackageRef) -> Result<Resolution, Error> {
        self.logger.log("Looking up dependencies...");

        let resolved = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(Error::Cancelled),
            resolved = self.resolve_root(root) => resolved,
        };

        match resolved {
            Ok(branch) => Ok(assemble(branch)),
            Err(e) => {
                self.logger.error("Error evaluating dependencies");
                Err(e)
            }
        }
    }

    async fn resolve_root(&self, root: &PackageRef) -> Result<Branch, Error> {
        let manifest = self.fetch(&root.name, root.range.as_deref()).await?;
        self.resolve_branch(manifest, Vec::new(), 0).await
    }

    /// Resolve one non-loop node at `depth`. `ancestors` holds the full names
    /// of the nodes above it on this branch.
    fn resolve_branch(
        &self,
        manifest: Manifest,
        mut ancestors: Vec<String>,
        depth: usize,
    ) -> BoxFuture<'_, Result<Branch, Error>> {
        async move {
            ancestors.push(manifest.full_name());

            let children = async {
                if !self.config.descends_below(depth) {
                    return Ok(Vec::new());
                }

                let declared = manifest.dependencies(self.config.dependency_type)?;
                let manifests = try_join_all(
                    declared
                        .iter()
                        .map(|(name, range)| self.fetch(name, Some(range.as_str()))),
                )
                .await?;

                try_join_all(manifests.into_iter().map(|child| {
                    if ancestors.contains(&child.full_name()) {
                        self.resolve_loop(child).boxed()
                    } else {
                        self.resolve_branch(child, ancestors.clone(), depth + 1)
                    }
                }))
                .await
            };

            let (attachments, children) =
                futures::join!(self.attachments_for(&manifest), children);

            Ok(Branch {
                manifest,
                attachments,
                is_loop: false,
                children: children?,
            })
        }
        .boxed()
    }

    /// A node that repeats one of its ancestors: attachments, no children.
    async fn resolve_loop(&self, manifest: Manifest) -> Result<Branch, Error> {
        let attachments = self.attachments_for(&manifest).await;
        Ok(Branch {
            manifest,
            attachments,
            is_loop: true,
            children: Vec::new(),
        })
    }

    async fn fetch(&self, name: &str, range: Option<&str>) -> Result<Manifest, Error> {
        let _permit = self.limiter.acquire().await.ok();
        Ok(self.provider.resolve(name, range).await?)
    }

    /// Attachment data of every rule for one node, in rule order.
    async fn attachments_for(&self, manifest: &Manifest) -> Vec<Arc<AttachmentData>> {
        join_all(self.rules.iter().map(|rule| async move {
            Arc::new(
                rule.attachments()
                    .compute(manifest, &self.logger, &self.limiter)
                    .await,
            )
        }))
        .await
    }
}

/// Write a finished branch into an arena, in pre-order.
fn assemble(root: Branch) -> Resolution {
    let Branch {
        manifest,
        attachments,
        children,
        ..
    } = root;

    let mut tree = PackageTree::new(manifest);
    let mut lookup = AttachmentLookup::new();
    lookup.insert(NodeId::ROOT, attachments);

    let mut pending: Vec<(NodeId, Branch)> = children
        .into_iter()
        .rev()
        .map(|branch| (NodeId::ROOT, branch))
        .collect();

    while let Some((parent, branch)) = pending.pop() {
        let id = tree.attach(parent, branch.manifest, branch.is_loop);
        lookup.insert(id, branch.attachments);
        pending.extend(branch.children.into_iter().rev().map(|child| (id, child)));
    }

    Resolution {
        tree,
        attachments: lookup,
    }
}
