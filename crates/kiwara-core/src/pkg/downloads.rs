//! npm download statistics API client.

use super::error::PkgError;
use super::registry::{build_http_client, parse_base_url};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

/// Default download statistics API.
pub const DEFAULT_DOWNLOADS_API: &str = "https://api.npmjs.org/";

/// Environment variable to override the download statistics API URL.
pub const DOWNLOADS_API_ENV: &str = "KIWARA_NPM_DOWNLOADS_API";

/// Downloads of one package over a period, as reported by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadStatistic {
    pub downloads: u64,
    pub start: String,
    pub end: String,
    pub package: String,
}

#[derive(Debug, Clone)]
pub struct DownloadsClient {
    base_url: Url,
    http: Client,
}

impl DownloadsClient {
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be created.
    pub fn new(base_url: &str) -> Result<Self, PkgError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            http: build_http_client()?,
        })
    }

    /// Reuse an existing HTTP client (e.g. the registry client's).
    pub fn with_http(base_url: &str, http: Client) -> Result<Self, PkgError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            http,
        })
    }

    /// Create a client using the API URL from environment or default.
    pub fn from_env() -> Result<Self, PkgError> {
        let url =
            std::env::var(DOWNLOADS_API_ENV).unwrap_or_else(|_| DEFAULT_DOWNLOADS_API.to_string());
        Self::new(&url)
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn point_url(&self, name: &str) -> Result<Url, PkgError> {
        let encoded = name.replace('@', "%40").replace('/', "%2F");
        self.base_url
            .join(&format!("downloads/point/last-week/{encoded}"))
            .map_err(|e| PkgError::registry(format!("Failed to build URL for '{name}': {e}")))
    }

    /// Downloads of `name` over the last week.
    ///
    /// # Errors
    /// Returns `PKG_NOT_FOUND` on 404 and `PKG_REGISTRY_ERROR` for any other failure.
    pub async fn last_week(&self, name: &str) -> Result<DownloadStatistic, PkgError> {
        let url = self.point_url(name)?;
        let response = self.http.get(url.as_str()).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PkgError::not_found(name));
        }

        if !response.status().is_success() {
            return Err(PkgError::registry(format!(
                "Download statistics API returned status {} for '{name}'",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_url_escapes_scopes() {
        let client = DownloadsClient::new("http://127.0.0.1:9999").unwrap();
        assert_eq!(
            client.point_url("@types/node").unwrap().as_str(),
            "http://127.0.0.1:9999/downloads/point/last-week/%40types%2Fnode"
        );
        assert_eq!(
            client.point_url("react").unwrap().as_str(),
            "http://127.0.0.1:9999/downloads/point/last-week/react"
        );
    }

    #[test]
    fn test_statistic_shape() {
        let stat: DownloadStatistic = serde_json::from_str(
            r#"{"downloads":1234,"start":"2024-01-01","end":"2024-01-07","package":"react"}"#,
        )
        .unwrap();
        assert_eq!(stat.downloads, 1234);
        assert_eq!(stat.package, "react");
    }

    #[test]
    fn test_default_api() {
        let client = DownloadsClient::new(DEFAULT_DOWNLOADS_API).unwrap();
        assert_eq!(client.base_url().as_str(), DEFAULT_DOWNLOADS_API);
    }
}
