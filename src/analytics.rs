use crate::models::CaptureSource;
use serde_json::Value;
use tracing::info;

pub const ESTIMATION_STARTED: &str = "estimation_started";

pub trait EventSink: Send + Sync {
    fn record(&self, name: &str, payload: Value);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, name: &str, payload: Value) {
        info!(target: "analytics", event = name, %payload, "analytics event");
    }
}

pub fn capture_event(source: CaptureSource) -> &'static str {
    match source {
        CaptureSource::PriceAlert => "Email_submitted_pricealert",
        CaptureSource::CustomPrice => "Email_submitted_customPrice",
        CaptureSource::BookingReminder => "Email_submitted_bookingReminder",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<(String, Value)>>,
    }

    impl EventSink for RecordingSink {
        fn record(&self, name: &str, payload: Value) {
            self.events.lock().unwrap().push((name.to_string(), payload));
        }
    }

    #[test]
    fn each_capture_page_has_its_own_event() {
        assert_eq!(capture_event(CaptureSource::PriceAlert), "Email_submitted_pricealert");
        assert_eq!(capture_event(CaptureSource::CustomPrice), "Email_submitted_customPrice");
        assert_eq!(capture_event(CaptureSource::BookingReminder), "Email_submitted_bookingReminder");
    }

    #[test]
    fn sinks_are_usable_behind_a_trait_object() {
        let recording = std::sync::Arc::new(RecordingSink::default());
        let sink: std::sync::Arc<dyn EventSink> = recording.clone();
        sink.record(ESTIMATION_STARTED, json!({ "destination": "DPS" }));
        TracingSink.record(ESTIMATION_STARTED, json!({}));

        let events = recording.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, ESTIMATION_STARTED);
        assert_eq!(events[0].1["destination"], "DPS");
    }
}
