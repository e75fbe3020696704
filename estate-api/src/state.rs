use std::sync::Arc;

use estate_store::app_config::BusinessRules;
use estate_store::{EstateStore, EventPublisher, MockPaymentAdapter};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<EstateStore>,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}

impl AppState {
    /// Fresh in-memory store wired to the mock payment provider
    pub fn in_memory(jwt_secret: impl Into<String>, business_rules: BusinessRules) -> Self {
        let events = EventPublisher::new(business_rules.event_buffer);
        let store = EstateStore::new(events, Arc::new(MockPaymentAdapter));
        Self {
            store: Arc::new(store),
            auth: AuthConfig { secret: jwt_secret.into() },
            business_rules,
        }
    }
}
