use std::sync::Arc;

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::services::api::{ApiClient, Transport};
use crate::services::booking::BookingService;
use crate::services::captcha::ChallengeSigner;
use crate::services::schedule::ScheduleService;
use crate::services::visitor::VisitorService;

pub struct AppState {
    pub config: AppConfig,
    pub schedule: ScheduleService,
    pub bookings: BookingService,
    pub visitors: VisitorService,
    pub captcha: ChallengeSigner,
    pub clock: Box<dyn Clock>,
}

impl AppState {
    pub fn new(config: AppConfig, transport: Arc<dyn Transport>, clock: Box<dyn Clock>) -> Self {
        let api = ApiClient::new(transport);
        Self {
            captcha: ChallengeSigner::new(&config.captcha_secret, config.captcha_ttl_secs),
            schedule: ScheduleService::new(api.clone()),
            bookings: BookingService::new(api.clone()),
            visitors: VisitorService::new(api),
            config,
            clock,
        }
    }
}
