use chrono::NaiveDate;
use serde::Deserialize;

use super::api::{endpoints, ApiClient, ApiRequest, ApiResult};
use super::with_fallback;
use crate::models::VisitSlot;

/// Date range for the slot listing. A lone `date` is shorthand for a
/// one-day range.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotFilter {
    pub date: Option<NaiveDate>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl SlotFilter {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let fmt = |d: NaiveDate| d.format("%Y-%m-%d").to_string();
        let mut pairs = Vec::new();
        if let Some(from) = self.date_from {
            pairs.push(("dateFrom", fmt(from)));
        }
        if let Some(to) = self.date_to {
            pairs.push(("dateTo", fmt(to)));
        }
        if let (Some(date), None, None) = (self.date, self.date_from, self.date_to) {
            pairs.push(("dateFrom", fmt(date)));
            pairs.push(("dateTo", fmt(date)));
        }
        pairs
    }
}

#[derive(Deserialize)]
struct SlotList {
    slots: Vec<VisitSlot>,
}

#[derive(Clone)]
pub struct ScheduleService {
    api: ApiClient,
}

impl ScheduleService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list_available_slots(&self, filter: &SlotFilter) -> ApiResult<Vec<VisitSlot>> {
        let mut request = ApiRequest::get(endpoints::AVAILABLE_SLOTS);
        for (key, value) in filter.query_pairs() {
            request = request.query(key, value);
        }

        self.api
            .fetch::<SlotList>(request)
            .await
            .map(|list| list.slots)
            .map_err(|e| with_fallback(e, "Failed to load available slots"))
    }

    pub async fn get_slot(&self, id: &str) -> ApiResult<VisitSlot> {
        self.api
            .fetch(ApiRequest::get(endpoints::SLOTS).segment(id))
            .await
            .map_err(|e| with_fallback(e, "Failed to load slot"))
    }
}
