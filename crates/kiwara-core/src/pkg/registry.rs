//! npm registry client.

use super::error::PkgError;
use super::manifest::Manifest;
use super::version::resolve_version;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Default npm registry URL.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

/// Environment variable to override registry URL.
pub const REGISTRY_ENV: &str = "KIWARA_NPM_REGISTRY";

/// Registry client for fetching packuments.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    base_url: Url,
    http: Client,
}

impl RegistryClient {
    /// Create a new registry client with the given base URL.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be created.
    pub fn new(base_url: &str) -> Result<Self, PkgError> {
        let base_url = parse_base_url(base_url)?;
        let http = build_http_client()?;
        Ok(Self { base_url, http })
    }

    /// Create a client using the registry URL from environment or default.
    ///
    /// # Errors
    /// Returns an error if the client cannot be created.
    pub fn from_env() -> Result<Self, PkgError> {
        let url = std::env::var(REGISTRY_ENV).unwrap_or_else(|_| DEFAULT_REGISTRY.to_string());
        Self::new(&url)
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get the HTTP client (shared with the download statistics client).
    #[must_use]
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Fetch the packument (all published versions) for a package.
    ///
    /// # Errors
    /// Returns `PKG_NOT_FOUND` on 404 and `PKG_REGISTRY_ERROR` for any other failure.
    pub async fn fetch_packument(&self, name: &str) -> Result<serde_json::Value, PkgError> {
        // Scoped packages keep the @ but escape the slash
        let encoded_name = name.replace('/', "%2F");

        let url = self
            .base_url
            .join(&encoded_name)
            .map_err(|e| PkgError::registry(format!("Failed to build URL for '{name}': {e}")))?;

        let response = self.http.get(url.as_str()).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PkgError::not_found(name));
        }

        if !response.status().is_success() {
            return Err(PkgError::registry(format!(
                "Registry returned status {} for '{name}'",
                response.status()
            )));
        }

        let json: serde_json::Value = response.json().await?;
        Ok(json)
    }
}

/// Parse a base URL, making sure it ends with `/` so `join` appends.
pub(crate) fn parse_base_url(base_url: &str) -> Result<Url, PkgError> {
    let normalized = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{base_url}/")
    };
    Url::parse(&normalized)
        .map_err(|e| PkgError::registry(format!("Invalid registry URL '{base_url}': {e}")))
}

pub(crate) fn build_http_client() -> Result<Client, PkgError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(30))
        .user_agent(concat!("kiwara/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| PkgError::registry(format!("Failed to create HTTP client: {e}")))
}

/// Extract the latest version from a packument.
#[must_use]
pub fn get_latest_version(packument: &serde_json::Value) -> Option<&str> {
    get_dist_tag(packument, "latest")
}

/// Look up a dist-tag (`latest`, `next`, ...).
#[must_use]
pub fn get_dist_tag<'a>(packument: &'a serde_json::Value, tag: &str) -> Option<&'a str> {
    packument.get("dist-tags")?.get(tag)?.as_str()
}

/// Get all available version strings from a packument.
#[must_use]
pub fn get_versions(packument: &serde_json::Value) -> Vec<&str> {
    packument
        .get("versions")
        .and_then(|v| v.as_object())
        .map(|obj| obj.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

/// Whether the registry reports the package as unpublished.
#[must_use]
pub fn is_unpublished(packument: &serde_json::Value) -> bool {
    packument
        .get("time")
        .and_then(|t| t.get("unpublished"))
        .is_some()
}

/// Resolve a request against a packument and return the chosen manifest.
///
/// # Errors
/// Returns `PKG_UNPUBLISHED`, `PKG_VERSION_NOT_FOUND`, `PKG_SPEC_INVALID` or
/// `PKG_MANIFEST_INVALID`.
pub fn manifest_from_packument(
    name: &str,
    packument: &serde_json::Value,
    range: Option<&str>,
) -> Result<Manifest, PkgError> {
    if is_unpublished(packument) {
        return Err(PkgError::unpublished(name));
    }

    let version = resolve_version(packument, range)?;

    let data = packument
        .get("versions")
        .and_then(|v| v.get(&version))
        .ok_or_else(|| PkgError::version_not_found(name, &version))?;

    Manifest::new(data.clone())
}
