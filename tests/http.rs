use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Datelike, Days, Local, NaiveDate};
use once_cell::sync::Lazy;
use reqwest::{redirect, Client};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

const PRICING_KEY: &str = "test-key";
const KLAVIYO_KEY: &str = "test-klaviyo";
const LIST_ID: &str = "LIST1";

#[derive(Debug, Deserialize)]
struct DecisionBody {
    outcome: String,
    location: String,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static CONFIGURED: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));
static UNCONFIGURED: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));
static UPSTREAM: Lazy<Upstream> = Lazy::new(start_upstream);

#[cfg(unix)]
mod cleanup {
    use std::sync::Mutex;
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PIDS: Mutex<Vec<i32>> = Mutex::new(Vec::new());

    pub fn register(pid: u32) {
        REGISTER.call_once(|| unsafe {
            libc::atexit(on_exit);
        });
        if let Ok(mut pids) = PIDS.lock() {
            pids.push(pid as i32);
        }
    }

    extern "C" fn on_exit() {
        if let Ok(pids) = PIDS.lock() {
            for &pid in pids.iter().filter(|pid| **pid > 0) {
                unsafe {
                    libc::kill(pid, libc::SIGTERM);
                }
            }
        }
    }
}

/// Stand-in for both the pricing API and the email provider.
struct Upstream {
    base_url: String,
    pricing_hits: Arc<AtomicUsize>,
}

#[derive(Clone)]
struct MockState {
    pricing_hits: Arc<AtomicUsize>,
    profiles: Arc<std::sync::Mutex<HashSet<String>>>,
}

fn start_upstream() -> Upstream {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind upstream port");
    listener.set_nonblocking(true).expect("non-blocking upstream listener");
    let addr = listener.local_addr().unwrap();
    let pricing_hits = Arc::new(AtomicUsize::new(0));
    let state = MockState {
        pricing_hits: Arc::clone(&pricing_hits),
        profiles: Arc::new(std::sync::Mutex::new(HashSet::new())),
    };

    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("upstream runtime");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).expect("upstream listener");
            let app = Router::new()
                .route("/average_price", get(mock_average_price))
                .route("/api/profiles/", post(mock_create_profile))
                .route("/api/lists/:list_id/relationships/profiles/", post(mock_add_to_list))
                .with_state(state);
            axum::serve(listener, app).await.expect("upstream server");
        });
    });

    Upstream {
        base_url: format!("http://{addr}"),
        pricing_hits,
    }
}

async fn mock_average_price(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if headers.get("x-api-key").and_then(|value| value.to_str().ok()) != Some(PRICING_KEY) {
        return (StatusCode::UNAUTHORIZED, "missing key").into_response();
    }
    state.pricing_hits.fetch_add(1, Ordering::SeqCst);

    let json_body = |body: String| ([(header::CONTENT_TYPE, "application/json")], body).into_response();
    match params.get("destination_iata").map(String::as_str) {
        Some("ERR") => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        Some("BAD") => json_body("<html>not json</html>".to_string()),
        Some("NIL") => json_body("[]".to_string()),
        Some("MIS") => json_body(json!({ "result": [] }).to_string()),
        Some("NUL") => {
            let analysis: Vec<Value> = (1..=12)
                .map(|month| json!({ "booking_month": month, "adjusted_avg_price": null }))
                .collect();
            json_body(json!({ "analysis": analysis }).to_string())
        }
        Some(code) => {
            let analysis: Vec<Value> = (1..=12)
                .rev()
                .map(|month| json!({ "booking_month": month, "adjusted_avg_price": 500.0 + 40.0 * month as f64 }))
                .collect();
            json_body(json!({ "destination_iata": code, "analysis": analysis }).to_string())
        }
        None => (StatusCode::BAD_REQUEST, "destination required").into_response(),
    }
}

async fn mock_create_profile(State(state): State<MockState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let expected = format!("Klaviyo-API-Key {KLAVIYO_KEY}");
    if headers.get(header::AUTHORIZATION).and_then(|value| value.to_str().ok()) != Some(expected.as_str()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let email = body
        .pointer("/data/attributes/email")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if email.starts_with("fail") {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "errors": [{ "detail": "secret upstream detail" }] })))
            .into_response();
    }

    if email.starts_with("noid") {
        return (StatusCode::CONFLICT, Json(json!({ "errors": [{}] }))).into_response();
    }

    let created = !email.starts_with("nolist") && state.profiles.lock().unwrap().insert(email.clone());
    if created {
        (
            StatusCode::CREATED,
            Json(json!({ "data": { "type": "profile", "id": format!("new-{email}") } })),
        )
            .into_response()
    } else {
        (
            StatusCode::CONFLICT,
            Json(json!({
                "errors": [{
                    "status": 409,
                    "code": "duplicate_profile",
                    "meta": { "duplicate_profile_id": format!("dup-{email}") }
                }]
            })),
        )
            .into_response()
    }
}

async fn mock_add_to_list(Path(list_id): Path<String>, Json(body): Json<Value>) -> StatusCode {
    let profile_id = body.pointer("/data/0/id").and_then(Value::as_str).unwrap_or_default();
    if list_id == LIST_ID && !profile_id.is_empty() && !profile_id.starts_with("dup-nolist") {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_suffix() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}_{nanos}", std::process::id())
}

fn unique_data_path() -> String {
    let mut path = std::env::temp_dir();
    path.push(format!("fare_watch_http_{}", unique_suffix()));
    path.push("last_search.json");
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/destinations")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server(with_credentials: bool) -> TestServer {
    let upstream = &*UPSTREAM;
    let port = pick_free_port();
    let mut command = Command::new(env!("CARGO_BIN_EXE_fare_watch"));
    command
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", unique_data_path())
        .env("PRICING_API_URL", format!("{}/average_price", upstream.base_url))
        .env("KLAVIYO_API_URL", &upstream.base_url)
        .env("ANIMATION_MS", "0")
        .env("GRACE_MS", "1500")
        .env("RUST_LOG", "info")
        .env_remove("API_KEY")
        .env_remove("KLAVIYO_API_KEY")
        .env_remove("KLAVIYO_LIST_ID")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    if with_credentials {
        command
            .env("API_KEY", PRICING_KEY)
            .env("KLAVIYO_API_KEY", KLAVIYO_KEY)
            .env("KLAVIYO_LIST_ID", LIST_ID);
    }
    let child = command.spawn().expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server(slot: &Mutex<Option<Arc<TestServer>>>, with_credentials: bool) -> Arc<TestServer> {
    let mut guard = slot.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server(with_credentials).await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn configured_server() -> Arc<TestServer> {
    shared_server(&CONFIGURED, true).await
}

async fn unconfigured_server() -> Arc<TestServer> {
    shared_server(&UNCONFIGURED, false).await
}

fn client() -> Client {
    Client::builder().redirect(redirect::Policy::none()).build().unwrap()
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// First day of a month at least three months ahead.
fn future_departure() -> NaiveDate {
    let ahead = today().checked_add_days(Days::new(95)).unwrap();
    NaiveDate::from_ymd_opt(ahead.year(), ahead.month(), 1).unwrap()
}

fn search_params(to: &str, code: &str, depart: NaiveDate) -> Vec<(&'static str, String)> {
    vec![
        ("from", "Sydney (SYD)".to_string()),
        ("to", format!("{to} ({code})")),
        ("toIata", code.to_string()),
        ("departDate", depart.format("%Y-%m-%d").to_string()),
        ("returnDate", (depart + Days::new(7)).format("%Y-%m-%d").to_string()),
        ("departureIata", "SYD".to_string()),
    ]
}

async fn decide(server: &TestServer, params: &[(&'static str, String)]) -> DecisionBody {
    let response = client()
        .get(format!("{}/api/decision", server.base_url))
        .query(params)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    response.json().await.unwrap()
}

async fn get_prices(server: &TestServer, code: &str, month: u32) -> (u16, Value) {
    let response = client()
        .get(format!("{}/api/flight-prices", server.base_url))
        .query(&[("destination_iata", code.to_string()), ("departure_month", month.to_string())])
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

async fn post_subscribe(server: &TestServer, email: &str) -> (u16, Value) {
    let response = client()
        .post(format!("{}/api/subscribe", server.base_url))
        .json(&json!({ "email": email }))
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn http_prices_proxy_returns_sorted_series() {
    let _guard = TEST_LOCK.lock().await;
    let server = configured_server().await;

    let (status, body) = get_prices(&server, "DPS", 8).await;
    assert_eq!(status, 200);
    assert_eq!(body["destination_iata"], "DPS");
    assert_eq!(body["departure_month"], 8);
    let months: Vec<u64> = body["analysis"]
        .as_array()
        .unwrap()
        .iter()
        .map(|point| point["booking_month"].as_u64().unwrap())
        .collect();
    assert_eq!(months, (1..=12).collect::<Vec<u64>>());
}

#[tokio::test]
async fn http_every_upstream_failure_is_no_data() {
    let _guard = TEST_LOCK.lock().await;
    let server = configured_server().await;

    for code in ["ERR", "BAD", "NIL", "MIS"] {
        let (status, body) = get_prices(&server, code, 8).await;
        assert_eq!(status, 200, "{code}");
        assert_eq!(body, json!({ "noData": true }), "{code}");
    }

    let (status, body) = get_prices(&server, "DPS", 13).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "noData": true }));
}

#[tokio::test]
async fn http_missing_api_key_is_configuration_error() {
    let _guard = TEST_LOCK.lock().await;
    let server = unconfigured_server().await;

    let (status, body) = get_prices(&server, "DPS", 8).await;
    assert_eq!(status, 500);
    assert_eq!(body, json!({ "error": "API configuration error" }));

    let decision = decide(&server, &search_params("Bali", "DPS", future_departure())).await;
    assert_eq!(decision.outcome, "no_data");
}

#[tokio::test]
async fn http_same_email_twice_both_succeed() {
    let _guard = TEST_LOCK.lock().await;
    let server = configured_server().await;
    let email = format!("traveller_{}@example.com", unique_suffix());

    for _ in 0..2 {
        let (status, body) = post_subscribe(&server, &email).await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({ "success": true }));
    }
}

#[tokio::test]
async fn http_conflict_without_profile_id_still_succeeds() {
    let _guard = TEST_LOCK.lock().await;
    let server = configured_server().await;

    let (status, body) = post_subscribe(&server, "noid@example.com").await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "success": true }));
}

#[tokio::test]
async fn http_list_failure_after_conflict_is_bad_gateway() {
    let _guard = TEST_LOCK.lock().await;
    let server = configured_server().await;

    let (status, body) = post_subscribe(&server, "nolist@example.com").await;
    assert_eq!(status, 502);
    assert_eq!(body, json!({ "error": "Failed to subscribe" }));
}

#[tokio::test]
async fn http_subscribe_errors_are_generic() {
    let _guard = TEST_LOCK.lock().await;
    let server = configured_server().await;

    let (status, body) = post_subscribe(&server, "   ").await;
    assert_eq!(status, 400);
    assert_eq!(body, json!({ "error": "email is required" }));

    let (status, body) = post_subscribe(&server, "fail@example.com").await;
    assert_eq!(status, 502);
    assert_eq!(body, json!({ "error": "Failed to subscribe" }));

    let unconfigured = unconfigured_server().await;
    let (status, body) = post_subscribe(&unconfigured, "ana@example.com").await;
    assert_eq!(status, 500);
    assert_eq!(body, json!({ "error": "Missing subscription configuration" }));
}

#[tokio::test]
async fn http_current_month_is_imminent_without_lookup() {
    let _guard = TEST_LOCK.lock().await;
    let server = configured_server().await;
    let before = UPSTREAM.pricing_hits.load(Ordering::SeqCst);

    let decision = decide(&server, &search_params("Bali", "DPS", today())).await;
    assert_eq!(decision.outcome, "imminent");
    assert!(decision.location.starts_with("/imminent?"), "{}", decision.location);
    assert_eq!(UPSTREAM.pricing_hits.load(Ordering::SeqCst), before);

    let page = client()
        .get(format!("{}{}", server.base_url, decision.location))
        .send()
        .await
        .unwrap();
    assert_eq!(page.status(), 200);
    let html = page.text().await.unwrap();
    assert!(html.contains("https://www.paylatertravel.com.au/flightssearch/s/SYD/DPS/"));
    assert!(html.contains(r#"value="booking_reminder""#));
}

#[tokio::test]
async fn http_future_month_with_prices_goes_to_chart() {
    let _guard = TEST_LOCK.lock().await;
    let server = configured_server().await;

    let decision = decide(&server, &search_params("Bali", "DPS", future_departure())).await;
    assert_eq!(decision.outcome, "chart");
    assert!(decision.location.starts_with("/chart?"), "{}", decision.location);
    assert!(decision.location.contains("generatedUrl="));

    let page = client()
        .get(format!("{}{}", server.base_url, decision.location))
        .send()
        .await
        .unwrap();
    assert_eq!(page.status(), 200);
    let html = page.text().await.unwrap();
    assert!(html.contains("renderLineChart"));
    assert!(html.contains("https://app.paylatertravel.com.au/flightssearch/s/SYD/DPS/"));
}

#[tokio::test]
async fn http_null_current_price_is_no_data() {
    let _guard = TEST_LOCK.lock().await;
    let server = configured_server().await;

    let decision = decide(&server, &search_params("Nowhere", "NUL", future_departure())).await;
    assert_eq!(decision.outcome, "no_data");
    assert!(decision.location.starts_with("/no-data?"), "{}", decision.location);

    let chart = client()
        .get(format!("{}/chart", server.base_url))
        .query(&search_params("Nowhere", "NUL", future_departure()))
        .send()
        .await
        .unwrap();
    assert_eq!(chart.status(), 303);
    assert!(location(&chart).starts_with("/no-data?"));
}

#[tokio::test]
async fn http_search_form_validates_and_redirects() {
    let _guard = TEST_LOCK.lock().await;
    let server = configured_server().await;
    let depart = future_departure().format("%Y-%m-%d").to_string();

    let accepted = client()
        .post(format!("{}/search", server.base_url))
        .form(&[
            ("from", "Perth (PER)"),
            ("to", "Bali (DPS)"),
            ("departDate", depart.as_str()),
            ("returnDate", ""),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(accepted.status(), 303);
    let target = location(&accepted);
    assert!(target.starts_with("/loading?"), "{target}");
    assert!(target.contains("departureIata=PER"));

    let index = client().get(format!("{}/", server.base_url)).send().await.unwrap();
    let prefilled = index.text().await.unwrap();
    assert!(prefilled.contains(&format!(r#"name="departDate" value="{depart}""#)));
    assert!(prefilled.contains(r#"<option value="Perth (PER)" selected>"#));

    let rejected = client()
        .post(format!("{}/search", server.base_url))
        .form(&[("from", "Perth (PER)"), ("to", "Bali"), ("departDate", depart.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), 422);
    let html = rejected.text().await.unwrap();
    assert!(html.contains("Please select a valid destination with an IATA code."));
    assert!(html.contains(r#"value="Bali""#));
}

#[tokio::test]
async fn http_capture_form_redirects_back_with_flags() {
    let _guard = TEST_LOCK.lock().await;
    let server = configured_server().await;
    let email = format!("capture_{}@example.com", unique_suffix());

    let submitted = client()
        .post(format!("{}/subscribe", server.base_url))
        .form(&[
            ("email", email.as_str()),
            ("source", "custom_price"),
            ("back", "/no-data?toIata=DPS"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(submitted.status(), 303);
    assert_eq!(location(&submitted), "/no-data?toIata=DPS&subscribed=1");

    let failed = client()
        .post(format!("{}/subscribe", server.base_url))
        .form(&[
            ("email", "fail@example.com"),
            ("source", "price_alert"),
            ("back", "//evil.example/"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(failed.status(), 303);
    assert_eq!(location(&failed), "/?subscribe_error=failed&email=fail%40example.com");
}
