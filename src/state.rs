use crate::analytics::{EventSink, TracingSink};
use crate::config::AppConfig;
use crate::pricing::PricingClient;
use crate::storage::LastSearchStore;
use crate::subscribe::SubscriptionClient;
use reqwest::Client;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pricing: PricingClient,
    pub subscriptions: SubscriptionClient,
    pub last_search: Arc<LastSearchStore>,
    pub events: Arc<dyn EventSink>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(config.http_timeout).build()?;
        let pricing = PricingClient::new(http.clone(), config.pricing_url.clone(), config.pricing_api_key.clone());
        let subscriptions = SubscriptionClient::new(
            http,
            config.klaviyo_url.clone(),
            config.klaviyo_api_key.clone(),
            config.klaviyo_list_id.clone(),
        );
        let last_search = Arc::new(LastSearchStore::new(config.data_path.clone()));

        Ok(Self {
            config: Arc::new(config),
            pricing,
            subscriptions,
            last_search,
            events: Arc::new(TracingSink),
        })
    }
}
