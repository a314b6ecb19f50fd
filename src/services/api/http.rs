use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Url;
use serde_json::Value;

use super::{server_message, ApiRequest, Method, Transport};
use crate::errors::ApiError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON-over-HTTP transport to the booking backend.
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }
}

impl HttpTransport {
    /// Appends each segment percent-encoded, so an id can never climb out of
    /// its route or smuggle in a query string.
    fn url_for(&self, request: &ApiRequest) -> Result<Url, ApiError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, request.path))
            .map_err(|e| ApiError::network(format!("invalid backend URL: {e}")))?;

        if request.segments.is_empty() {
            return Ok(url);
        }
        // No resource is addressed by an empty or dot segment.
        if request
            .segments
            .iter()
            .any(|s| matches!(s.as_str(), "" | "." | ".."))
        {
            return Err(ApiError::http(404, None));
        }
        url.path_segments_mut()
            .map_err(|()| ApiError::network("backend URL cannot carry a path"))?
            .extend(&request.segments);
        Ok(url)
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::network(err.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let url = self.url_for(&request)?;

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(transport_error)?;
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(transport_error)?;
        let body: Option<Value> = serde_json::from_slice(&bytes).ok();

        if !status.is_success() {
            return Err(ApiError::http(
                status.as_u16(),
                body.as_ref().and_then(server_message),
            ));
        }

        body.ok_or_else(|| {
            ApiError::Decode("Unexpected response from the booking service".to_string())
        })
    }
}
