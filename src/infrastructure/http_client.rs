// Thin typed wrapper over HTTP GET against the backend base URL
use crate::error::SyncError;
use std::time::Duration;

/// One shared reqwest client with a finite request timeout, so a hung
/// request can never wedge a poller's generation.
#[derive(Debug, Clone)]
pub struct EndpointClient {
    base_url: String,
    client: reqwest::Client,
}

impl EndpointClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exactly one outbound GET per call; retries live a layer up. A non-2xx
    /// status maps to `Http`, transport and timeout failures to `Network`,
    /// an unparseable body to `Parse`. An empty body is a valid success and
    /// comes back as `Value::Null` for the caller to interpret.
    pub async fn fetch_json(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, SyncError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "fetching");

        let response = self.client.get(&url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&body).map_err(|err| SyncError::parse(err.to_string()))
    }
}
