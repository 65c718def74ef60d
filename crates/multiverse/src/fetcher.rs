use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::entity::EntityKind;
use crate::error::{ClientError, ClientResult, FetchError};

pub const DEFAULT_API_BASE_URL: &str = "https://rickandmortyapi.com/api";

/// GETs an absolute URL and returns its JSON body.
///
/// Network failures, non-success statuses and unparseable bodies all surface
/// as [`FetchError`]. Implementations do not retry.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Value, FetchError>;
}

/// Decodes a fetched JSON value into a typed record.
pub fn decode<T: DeserializeOwned>(url: &str, value: Value) -> Result<T, FetchError> {
    serde_json::from_value(value).map_err(|error| FetchError::Parse {
        url: url.to_string(),
        message: error.to_string(),
    })
}

/// Fetches `url` and decodes the body as `T`.
pub async fn fetch_as<T: DeserializeOwned>(
    fetcher: &dyn ContentFetcher,
    url: &str,
) -> Result<T, FetchError> {
    let value = fetcher.fetch(url).await?;
    decode(url, value)
}

/// [`ContentFetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Option<Duration>) -> ClientResult<Self> {
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        tracing::debug!(url, "fetching");
        let network = |error: reqwest::Error| FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url, status = status.as_u16(), "fetch returned error status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(network)?;
        serde_json::from_slice(&bytes).map_err(|error| FetchError::Parse {
            url: url.to_string(),
            message: error.to_string(),
        })
    }
}

/// Builds endpoint URLs under the API base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiUrls {
    base: String,
}

impl ApiUrls {
    pub fn new(base: impl Into<String>) -> Self {
        let base: String = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Listing endpoint of a kind, e.g. `{base}/character`.
    pub fn collection(&self, kind: EntityKind) -> String {
        format!("{}/{}", self.base, kind.path_segment())
    }

    pub fn page(&self, kind: EntityKind, page: usize) -> String {
        page_url(&self.collection(kind), page)
    }

    pub fn item(&self, kind: EntityKind, id: u32) -> String {
        format!("{}/{id}", self.collection(kind))
    }

    /// Multi-item endpoint, e.g. `{base}/episode/1,2,3`.
    pub fn items(&self, kind: EntityKind, ids: &[u32]) -> String {
        let joined = ids
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        format!("{}/{joined}", self.collection(kind))
    }
}

impl Default for ApiUrls {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL)
    }
}

/// Appends the `page` query parameter to a listing endpoint.
pub fn page_url(endpoint: &str, page: usize) -> String {
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    format!("{endpoint}{separator}page={page}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Character;
    use serde_json::json;

    #[test]
    fn urls_are_built_under_base() {
        let urls = ApiUrls::new("https://api.test/api/");
        assert_eq!(urls.collection(EntityKind::Location), "https://api.test/api/location");
        assert_eq!(urls.page(EntityKind::Episode, 3), "https://api.test/api/episode?page=3");
        assert_eq!(urls.item(EntityKind::Character, 42), "https://api.test/api/character/42");
        assert_eq!(
            urls.items(EntityKind::Character, &[1, 2, 35]),
            "https://api.test/api/character/1,2,35"
        );
    }

    #[test]
    fn page_url_respects_existing_query() {
        assert_eq!(page_url("https://api.test/x?name=rick", 2), "https://api.test/x?name=rick&page=2");
    }

    #[test]
    fn decode_reports_malformed_payload_as_parse_error() {
        let error = decode::<Character>("https://api.test/character/1", json!({ "id": "one" }))
            .expect_err("malformed");
        assert!(matches!(error, FetchError::Parse { .. }));
        assert_eq!(error.url(), "https://api.test/character/1");
    }

    #[tokio::test]
    async fn http_fetcher_reports_unreachable_host_as_network_error() {
        let fetcher = HttpFetcher::new(Some(Duration::from_secs(2))).expect("client");
        let error = fetcher
            .fetch("http://127.0.0.1:9/character")
            .await
            .expect_err("connection refused");
        assert!(matches!(error, FetchError::Network { .. }));
    }
}
