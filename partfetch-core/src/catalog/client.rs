//! Parts catalog HTTP client
//!
//! Every request first consults the offline gate. When offline mode is
//! active the call fails with [`FetchError::NotConfigured`] before a request
//! is built, so no network I/O happens at all.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::config::Settings;
use crate::error::FetchError;
use crate::offline::OfflineGate;
use crate::part::PartId;
use crate::resolver::PartSource;

/// Response returned by the catalog
#[derive(Debug, Clone)]
pub struct CatalogResponse {
    /// URL the response came from
    pub url: String,

    /// HTTP status code
    pub status: u16,

    /// Raw response body
    pub body: String,
}

impl CatalogResponse {
    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        serde_json::from_str(&self.body).map_err(|source| FetchError::Decode {
            url: self.url.clone(),
            source,
        })
    }
}

/// Client for the remote parts catalog
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: String,
    gate: OfflineGate,
}

impl CatalogClient {
    /// Create a client for the catalog at `base_url`
    pub fn new(base_url: &str, gate: OfflineGate) -> Result<Self, FetchError> {
        Self::build(base_url, gate, crate::config::DEFAULT_TIMEOUT)
    }

    /// Create a client from process settings
    pub fn from_settings(settings: &Settings, gate: OfflineGate) -> Result<Self, FetchError> {
        Self::build(&settings.api_url, gate, settings.timeout)
    }

    fn build(
        base_url: &str,
        gate: OfflineGate,
        timeout: std::time::Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("partfetch/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|source| FetchError::Request {
                url: base_url.to_string(),
                source,
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            gate,
        })
    }

    /// The gate this client consults
    pub fn gate(&self) -> &OfflineGate {
        &self.gate
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn ensure_online(&self, operation: &str) -> Result<(), FetchError> {
        if self.gate.read() {
            tracing::debug!("Blocked catalog call in offline mode: {}", operation);
            return Err(FetchError::NotConfigured {
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    /// GET a catalog path
    pub async fn get(&self, path: &str) -> Result<CatalogResponse, FetchError> {
        self.ensure_online(&format!("GET {path}"))?;
        self.send_get(self.url(path)).await
    }

    /// GET a catalog resource addressed by raw path segments
    ///
    /// Each segment is percent-encoded, so identifiers containing `#`, `?`,
    /// `%` or `/` stay inside their own segment.
    pub async fn get_segments(&self, segments: &[&str]) -> Result<CatalogResponse, FetchError> {
        self.ensure_online(&format!("GET /{}", segments.join("/")))?;
        let url = self.segment_url(segments)?;
        self.send_get(url).await
    }

    fn segment_url(&self, segments: &[&str]) -> Result<String, FetchError> {
        let invalid = |reason: String| FetchError::InvalidUrl {
            url: self.base_url.clone(),
            reason,
        };

        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);

        Ok(url.into())
    }

    async fn send_get(&self, url: String) -> Result<CatalogResponse, FetchError> {
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.clone(),
                source,
            })?;

        read_response(url, response).await
    }

    /// POST a JSON body to a catalog path
    pub async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<CatalogResponse, FetchError> {
        self.ensure_online(&format!("POST {path}"))?;

        let url = self.url(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.clone(),
                source,
            })?;

        read_response(url, response).await
    }

    /// Download raw bytes from an absolute URL (package archives)
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.ensure_online(&format!("download {url}"))?;

        let request_err = |source| FetchError::Request {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(request_err)?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(request_err)?;
        Ok(bytes.to_vec())
    }
}

async fn read_response(
    url: String,
    response: reqwest::Response,
) -> Result<CatalogResponse, FetchError> {
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url,
            status: status.as_u16(),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|source| FetchError::Request {
            url: url.clone(),
            source,
        })?;

    Ok(CatalogResponse {
        url,
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl PartSource for CatalogClient {
    async fn fetch_part(&self, id: &PartId) -> Result<serde_json::Value, FetchError> {
        tracing::info!("Fetching part {} from the catalog", id);
        self.get_segments(&["v1", "parts", id.as_str()])
            .await?
            .json()
    }
}
