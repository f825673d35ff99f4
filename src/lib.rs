pub mod airports;
pub mod analytics;
pub mod app;
pub mod booking;
pub mod classify;
pub mod config;
pub mod dates;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod navigation;
pub mod pricing;
pub mod search;
pub mod state;
pub mod storage;
pub mod subscribe;
pub mod ui;

pub use app::router;
pub use config::AppConfig;
pub use state::AppState;
