use super::api::{endpoints, ApiClient, ApiRequest, ApiResult};
use super::with_fallback;
use crate::errors::ApiError;
use crate::models::{NewVisitor, Visitor};

#[derive(Clone)]
pub struct VisitorService {
    api: ApiClient,
}

impl VisitorService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Registers a visitor on its own. Booking creation registers the
    /// visitor implicitly, so this is only needed outside the booking flow.
    pub async fn create_visitor(&self, visitor: &NewVisitor) -> ApiResult<Visitor> {
        let body = serde_json::to_value(visitor).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.api
            .fetch(ApiRequest::post(endpoints::VISITORS, body))
            .await
            .map_err(|e| with_fallback(e, "Failed to create visitor"))
    }
}
