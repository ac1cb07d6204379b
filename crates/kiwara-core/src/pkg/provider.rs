//! Metadata providers: where manifests come from.
//!
//! The resolver only sees [`MetadataProvider`]. Providers own caching: a
//! packument is fetched once per run no matter how many branches of the tree
//! ask for it, and a resolved `name@version` always hands back the same
//! [`Manifest`].

use super::error::PkgError;
use super::manifest::Manifest;
use super::registry::{manifest_from_packument, RegistryClient};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Resolves a package name and optional version, range or tag to a manifest.
pub trait MetadataProvider: Send + Sync {
    /// Resolve `name` against `range` (None means `latest`).
    fn resolve<'a>(
        &'a self,
        name: &'a str,
        range: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Manifest, PkgError>>;
}

impl<P: MetadataProvider + ?Sized> MetadataProvider for Arc<P> {
    fn resolve<'a>(
        &'a self,
        name: &'a str,
        range: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Manifest, PkgError>> {
        (**self).resolve(name, range)
    }
}

/// Manifests already handed out, keyed by `name@version`.
#[derive(Default)]
struct ManifestMemo {
    manifests: Mutex<HashMap<String, Manifest>>,
}

impl ManifestMemo {
    async fn intern(&self, manifest: Manifest) -> Manifest {
        let mut manifests = self.manifests.lock().await;
        manifests
            .entry(manifest.full_name())
            .or_insert(manifest)
            .clone()
    }
}

type PackumentFuture = Shared<BoxFuture<'static, Result<Arc<Value>, PkgError>>>;

/// Provider backed by an npm registry.
///
/// Concurrent requests for the same package share one in-flight fetch.
pub struct RegistryProvider {
    client: RegistryClient,
    packuments: Mutex<HashMap<String, PackumentFuture>>,
    memo: ManifestMemo,
    fetch_count: AtomicUsize,
}

impl RegistryProvider {
    #[must_use]
    pub fn new(client: RegistryClient) -> Self {
        Self {
            client,
            packuments: Mutex::new(HashMap::new()),
            memo: ManifestMemo::default(),
            fetch_count: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn client(&self) -> &RegistryClient {
        &self.client
    }

    /// Number of packuments actually requested from the registry.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::Relaxed)
    }

    async fn packument(&self, name: &str) -> Result<Arc<Value>, PkgError> {
        let pending = {
            let mut packuments = self.packuments.lock().await;
            packuments
                .entry(name.to_string())
                .or_insert_with(|| {
                    self.fetch_count.fetch_add(1, Ordering::Relaxed);
                    let client = self.client.clone();
                    let name = name.to_string();
                    async move { client.fetch_packument(&name).await.map(Arc::new) }
                        .boxed()
                        .shared()
                })
                .clone()
        };

        let result = pending.await;
        if result.is_err() {
            // Let a later run retry instead of replaying the failure.
            self.packuments.lock().await.remove(name);
        }
        result
    }
}

impl MetadataProvider for RegistryProvider {
    fn resolve<'a>(
        &'a self,
        name: &'a str,
        range: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Manifest, PkgError>> {
        async move {
            let packument = self.packument(name).await?;
            let manifest = manifest_from_packument(name, &packument, range)?;
            Ok(self.memo.intern(manifest).await)
        }
        .boxed()
    }
}

/// Provider serving packuments held in memory.
///
/// Used for offline linting from a folder of packuments and as the registry
/// double in tests.
#[derive(Default)]
pub struct MemoryProvider {
    packuments: HashMap<String, Value>,
    memo: ManifestMemo,
    request_count: AtomicUsize,
}

impl MemoryProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a full packument (must carry a `name`).
    ///
    /// # Errors
    /// Returns `PKG_MANIFEST_INVALID` if the packument has no name.
    pub fn insert_packument(&mut self, packument: Value) -> Result<(), PkgError> {
        let name = packument
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| PkgError::manifest_invalid("Packument is missing a \"name\" field"))?
            .to_string();
        self.packuments.insert(name, packument);
        Ok(())
    }

    /// Add one published version. The highest version of a name becomes its
    /// `latest` tag.
    ///
    /// # Errors
    /// Returns `PKG_MANIFEST_INVALID` if the manifest lacks a name or version.
    pub fn insert_manifest(&mut self, manifest: Value) -> Result<(), PkgError> {
        let parsed = Manifest::new(manifest.clone())?;
        let name = parsed.name().to_string();
        let version = parsed.version().to_string();

        let packument = self.packuments.entry(name.clone()).or_insert_with(|| {
            serde_json::json!({ "name": name, "dist-tags": {}, "versions": {} })
        });
        packument["versions"][&version] = manifest;

        let latest = super::registry::get_versions(packument)
            .into_iter()
            .filter_map(|v| semver::Version::parse(v).ok())
            .max()
            .map(|v| v.to_string());
        if let Some(latest) = latest {
            packument["dist-tags"]["latest"] = Value::String(latest);
        }
        Ok(())
    }

    /// Build a provider from individual version manifests.
    ///
    /// # Errors
    /// Returns the first invalid manifest's error.
    pub fn from_manifests<I>(manifests: I) -> Result<Self, PkgError>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut provider = Self::new();
        for manifest in manifests {
            provider.insert_manifest(manifest)?;
        }
        Ok(provider)
    }

    /// Load every `*.json` packument in `dir`, including `@scope/` subfolders.
    ///
    /// # Errors
    /// Returns `PKG_REGISTRY_ERROR` on I/O or JSON errors.
    pub fn from_dir(dir: &Path) -> Result<Self, PkgError> {
        let mut provider = Self::new();
        provider.load_dir(dir, true)?;
        Ok(provider)
    }

    fn load_dir(&mut self, dir: &Path, descend_scopes: bool) -> Result<(), PkgError> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            PkgError::registry(format!("Failed to read {}: {e}", dir.display()))
        })?;

        let mut paths: Vec<_> = entries.flatten().map(|e| e.path()).collect();
        paths.sort();

        for path in paths {
            let is_scope = path
                .file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with('@'));

            if path.is_dir() && is_scope && descend_scopes {
                self.load_dir(&path, false)?;
            } else if path.extension().is_some_and(|ext| ext == "json") {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    PkgError::registry(format!("Failed to read {}: {e}", path.display()))
                })?;
                let packument: Value = serde_json::from_str(&content)?;
                self.insert_packument(packument)?;
            }
        }
        Ok(())
    }

    /// Number of `resolve` calls served.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }
}

impl MetadataProvider for MemoryProvider {
    fn resolve<'a>(
        &'a self,
        name: &'a str,
        range: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Manifest, PkgError>> {
        async move {
            self.request_count.fetch_add(1, Ordering::Relaxed);
            let packument = self
                .packuments
                .get(name)
                .ok_or_else(|| PkgError::not_found(name))?;
            let manifest = manifest_from_packument(name, packument, range)?;
            Ok(self.memo.intern(manifest).await)
        }
        .boxed()
    }
}
