use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/search", post(handlers::submit_search))
        .route("/loading", get(handlers::loading))
        .route("/imminent", get(handlers::imminent))
        .route("/chart", get(handlers::chart))
        .route("/no-data", get(handlers::no_data))
        .route("/subscribe", post(handlers::subscribe_form))
        .route("/api/decision", get(handlers::decision))
        .route("/api/flight-prices", get(handlers::api_flight_prices))
        .route("/api/subscribe", post(handlers::api_subscribe))
        .route("/api/destinations", get(handlers::destinations))
        .with_state(state)
}
