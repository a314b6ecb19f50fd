pub mod endpoints;
pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ApiError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Fixed route prefix, trusted as written.
    pub path: String,
    /// Caller-supplied path segments such as ids. The transport encodes each
    /// one so it stays a single segment.
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            segments: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            segments: Vec::new(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Put,
            path: path.into(),
            segments: Vec::new(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn segment(mut self, value: impl Into<String>) -> Self {
        self.segments.push(value.into());
        self
    }

    /// Unencoded path including segments, for logs and assertions.
    pub fn target(&self) -> String {
        let mut target = self.path.clone();
        for segment in &self.segments {
            target.push('/');
            target.push_str(segment);
        }
        target
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Issues one request against the booking backend and returns the decoded
/// JSON body of a successful response.
///
/// Implementations report timeouts, connection failures and non-2xx
/// responses through `ApiError`. They never retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError>;
}

/// Picks the human-readable message out of an error body.
pub(crate) fn server_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .or_else(|| body.get("error").and_then(Value::as_str))
        .or_else(|| {
            body.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
        })
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}

#[derive(Deserialize)]
struct Wrapper {
    success: bool,
    #[serde(default)]
    data: Option<Value>,
}

/// The response shapes the backend is known to produce.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// `{success: true, data: {success: true, data: payload}}`
    DoublyWrapped(Value),
    /// `{success: true, data: payload}`
    Wrapped(Value),
    /// `{success: false, message}` at either nesting level.
    Rejected(String),
    /// The resource itself, recognised by its `id`.
    Bare(Value),
}

impl Envelope {
    /// Tries each known shape in order: doubly wrapped, wrapped, bare.
    pub fn decode(raw: Value) -> Result<Envelope, ApiError> {
        if let Ok(outer) = Wrapper::deserialize(&raw) {
            if !outer.success {
                return Ok(Envelope::Rejected(
                    server_message(&raw).unwrap_or_else(|| "Request failed".to_string()),
                ));
            }

            let data = outer.data.filter(|d| !d.is_null());
            if let Some(data) = data {
                if let Ok(inner) = Wrapper::deserialize(&data) {
                    if !inner.success {
                        return Ok(Envelope::Rejected(
                            server_message(&data)
                                .unwrap_or_else(|| "Request failed".to_string()),
                        ));
                    }
                    if let Some(payload) = inner.data.filter(|d| !d.is_null()) {
                        return Ok(Envelope::DoublyWrapped(payload));
                    }
                }
                return Ok(Envelope::Wrapped(data));
            }
        }

        if raw.get("id").is_some_and(|id| !id.is_null()) {
            return Ok(Envelope::Bare(raw));
        }

        Err(ApiError::UnrecognizedEnvelope)
    }

    pub fn into_payload(self) -> Result<Value, ApiError> {
        match self {
            Envelope::DoublyWrapped(v) | Envelope::Wrapped(v) | Envelope::Bare(v) => Ok(v),
            Envelope::Rejected(message) => Err(ApiError::Backend(message)),
        }
    }
}

/// Turns whatever the backend sent into the payload, or a single error.
pub fn normalize<T: DeserializeOwned>(raw: Value) -> ApiResult<T> {
    let payload = Envelope::decode(raw)?.into_payload()?;
    serde_json::from_value(payload).map_err(|e| {
        ApiError::Decode(format!("Unexpected response from the booking service: {e}"))
    })
}

/// Thin wrapper pairing a transport with the envelope normalizer.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        let path = request.target();
        tracing::debug!(method = ?request.method, path = %path, "backend request");

        let result = match self.transport.send(request).await {
            Ok(raw) => normalize(raw),
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            tracing::warn!(path = %path, error = %e, "backend request failed");
        }
        result
    }
}

/// Uniform result body returned to UI callers.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl<T> From<ApiResult<T>> for ApiResponse<T> {
    fn from(result: ApiResult<T>) -> Self {
        match result {
            Ok(data) => ApiResponse::ok(data),
            Err(e) => ApiResponse {
                success: false,
                data: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Replays canned responses in order and records every request.
    pub struct MockTransport {
        responses: Mutex<VecDeque<Result<Value, ApiError>>>,
        pub requests: Mutex<Vec<ApiRequest>>,
    }

    impl MockTransport {
        pub fn new(responses: Vec<Result<Value, ApiError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn request(&self, i: usize) -> ApiRequest {
            self.requests.lock().unwrap()[i].clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::network("no canned response")))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::testing::MockTransport;
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Thing {
        id: String,
    }

    #[test]
    fn test_decode_doubly_wrapped() {
        let raw = json!({"success": true, "data": {"success": true, "data": {"id": "x"}}});
        assert_eq!(
            Envelope::decode(raw).unwrap(),
            Envelope::DoublyWrapped(json!({"id": "x"}))
        );
    }

    #[test]
    fn test_decode_wrapped() {
        let raw = json!({"success": true, "message": "ok", "data": {"id": "x"}});
        assert_eq!(
            Envelope::decode(raw).unwrap(),
            Envelope::Wrapped(json!({"id": "x"}))
        );
    }

    #[test]
    fn test_decode_bare() {
        let raw = json!({"id": "x", "groupSize": 2});
        assert_eq!(Envelope::decode(raw.clone()).unwrap(), Envelope::Bare(raw));
    }

    #[test]
    fn test_decode_rejected() {
        let raw = json!({"success": false, "message": "Slot is full"});
        assert_eq!(
            Envelope::decode(raw).unwrap(),
            Envelope::Rejected("Slot is full".to_string())
        );

        let raw = json!({"success": true, "data": {"success": false, "error": "Token expired"}});
        assert_eq!(
            Envelope::decode(raw).unwrap(),
            Envelope::Rejected("Token expired".to_string())
        );

        let raw = json!({"success": false});
        assert_eq!(
            Envelope::decode(raw).unwrap(),
            Envelope::Rejected("Request failed".to_string())
        );
    }

    #[test]
    fn test_decode_unrecognized() {
        assert_eq!(
            Envelope::decode(json!({"success": true, "data": null})),
            Err(ApiError::UnrecognizedEnvelope)
        );
        assert_eq!(
            Envelope::decode(json!([1, 2, 3])),
            Err(ApiError::UnrecognizedEnvelope)
        );
        assert_eq!(
            Envelope::decode(json!({"name": "no id"})),
            Err(ApiError::UnrecognizedEnvelope)
        );
    }

    #[test]
    fn test_normalize_shapes_agree() {
        let shapes = [
            json!({"success": true, "data": {"success": true, "data": {"id": "x"}}}),
            json!({"success": true, "data": {"id": "x"}}),
            json!({"id": "x"}),
        ];
        for raw in shapes {
            let thing: Thing = normalize(raw).unwrap();
            assert_eq!(thing, Thing { id: "x".to_string() });
        }
    }

    #[test]
    fn test_normalize_decode_error() {
        let result: ApiResult<Thing> = normalize(json!({"success": true, "data": {"name": 1}}));
        assert!(matches!(result, Err(ApiError::Decode(_))));
    }

    #[test]
    fn test_server_message_preference() {
        assert_eq!(
            server_message(&json!({"message": "m", "error": "e"})),
            Some("m".to_string())
        );
        assert_eq!(server_message(&json!({"error": "e"})), Some("e".to_string()));
        assert_eq!(
            server_message(&json!({"error": {"message": "nested"}})),
            Some("nested".to_string())
        );
        assert_eq!(server_message(&json!({"message": ""})), None);
    }

    #[tokio::test]
    async fn test_client_passes_transport_errors_through() {
        let transport = MockTransport::new(vec![Err(ApiError::Timeout)]);
        let client = ApiClient::new(transport.clone());
        let result: ApiResult<Thing> = client.fetch(ApiRequest::get("/x")).await;
        assert_eq!(result, Err(ApiError::Timeout));
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn test_api_response_has_one_side() {
        let ok: ApiResponse<u32> = Ok(3).into();
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"success": true, "data": 3})
        );

        let err: ApiResponse<u32> = Err(ApiError::Backend("nope".to_string())).into();
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"success": false, "error": "nope"})
        );
    }
}
