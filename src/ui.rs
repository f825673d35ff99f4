use crate::airports::{DESTINATIONS, ORIGIN_CITIES};
use crate::classify::{ChartPoint, Classification};
use crate::errors::ValidationError;
use crate::models::{CaptureSource, PageParams, PriceStatus};
use crate::search::with_query;
use serde::Serialize;

pub struct SearchView {
    pub from: String,
    pub to: String,
    pub depart_date: String,
    pub return_date: String,
    pub notice: Option<String>,
}

pub struct LoadingView {
    pub destination: String,
    pub dates: String,
    pub decision_url: String,
    pub fallback_url: String,
    pub animation_ms: u128,
}

pub struct ImminentView {
    pub origin: String,
    pub destination: String,
    pub dates: String,
    pub booking_url: String,
    pub capture: CaptureView,
}

pub struct ChartView {
    pub destination: String,
    pub dates: String,
    pub booking_url: String,
    pub current_price: f64,
    pub current: Classification,
    pub points: Vec<ChartPoint>,
    pub capture: CaptureView,
}

pub struct NoDataView {
    pub destination: String,
    pub dates: String,
    pub capture: CaptureView,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Submitted,
    Failed { email: String, message: String },
}

impl CaptureState {
    pub fn from_params(params: &PageParams) -> Self {
        if params.subscribed.as_deref() == Some("1") {
            return CaptureState::Submitted;
        }
        match params.subscribe_error.as_deref() {
            Some("missing") => CaptureState::Failed {
                email: String::new(),
                message: ValidationError::MissingEmail.to_string(),
            },
            Some(_) => CaptureState::Failed {
                email: params.email.clone().unwrap_or_default(),
                message: "Something went wrong. Please try again.".to_string(),
            },
            None => CaptureState::Idle,
        }
    }
}

pub struct CaptureView {
    pub source: CaptureSource,
    pub back: String,
    pub state: CaptureState,
}

impl CaptureView {
    pub fn new(source: CaptureSource, path: &str, params: &PageParams) -> Self {
        Self {
            source,
            back: with_query(path, &params.canonical_pairs()),
            state: CaptureState::from_params(params),
        }
    }
}

pub fn status_headline(status: PriceStatus) -> &'static str {
    match status {
        PriceStatus::Low => "Prices are typically low this time of the year. Book your flights now!",
        PriceStatus::Average => {
            "Prices may get cheaper. However, fares fluctuate all the time. Enter your email to access exclusive offers and updates."
        }
        PriceStatus::High => {
            "Based on our data, prices are quite expensive. Enter your email to access exclusive offers and updates."
        }
    }
}

pub fn render_search(view: &SearchView) -> String {
    let origins: String = ORIGIN_CITIES
        .iter()
        .map(|city| {
            let selected = if *city == view.from { " selected" } else { "" };
            format!(r#"<option value="{0}"{selected}>{0}</option>"#, escape_html(city))
        })
        .collect();
    let destinations: String = DESTINATIONS
        .iter()
        .map(|dest| format!(r#"<option value="{}"></option>"#, escape_html(&dest.label())))
        .collect();
    let notice = view
        .notice
        .as_deref()
        .map(|notice| format!(r#"<p class="notice" role="alert">{}</p>"#, escape_html(notice)))
        .unwrap_or_default();

    let body = fill(
        SEARCH_BODY,
        &[
            ("NOTICE", notice),
            ("ORIGINS", origins),
            ("DESTINATIONS", destinations),
            ("TO", escape_html(&view.to)),
            ("DEPART", escape_html(&view.depart_date)),
            ("RETURN", escape_html(&view.return_date)),
        ],
    );
    layout("Flight Price Estimator", &body, "")
}

pub fn render_loading(view: &LoadingView) -> String {
    let body = fill(
        LOADING_BODY,
        &[
            ("DESTINATION", escape_html(&view.destination)),
            ("DATES", escape_html(&view.dates)),
            ("ANIMATION_MS", view.animation_ms.to_string()),
        ],
    );
    let script = fill(
        LOADING_SCRIPT,
        &[
            ("DECISION_URL", script_json(&view.decision_url)),
            ("FALLBACK_URL", script_json(&view.fallback_url)),
        ],
    );
    layout("Checking prices", &body, &script)
}

pub fn render_imminent(view: &ImminentView) -> String {
    let body = fill(
        IMMINENT_BODY,
        &[
            ("ORIGIN", escape_html(&view.origin)),
            ("DESTINATION", escape_html(&view.destination)),
            ("DATES", escape_html(&view.dates)),
            ("BOOKING_URL", escape_html(&view.booking_url)),
            ("CAPTURE", render_capture(&view.capture, "Remind me before I book")),
        ],
    );
    layout("Your trip is close", &body, "")
}

pub fn render_chart(view: &ChartView) -> String {
    let status = view.current.status;
    let body = fill(
        CHART_BODY,
        &[
            ("DESTINATION", escape_html(&view.destination)),
            ("DATES", escape_html(&view.dates)),
            ("STATUS", status.as_str().to_string()),
            ("HEADLINE", escape_html(status_headline(status))),
            ("PRICE", format!("{:.0}", view.current_price)),
            ("POSITION", format!("{:.0}", view.current.position)),
            ("BOOKING_URL", escape_html(&view.booking_url)),
            ("CAPTURE", render_capture(&view.capture, "Unlock Insider Info")),
        ],
    );
    let script = fill(CHART_SCRIPT, &[("POINTS", script_json(&view.points))]);
    layout("Flight price outlook", &body, &script)
}

pub fn render_no_data(view: &NoDataView) -> String {
    let body = fill(
        NO_DATA_BODY,
        &[
            ("DESTINATION", escape_html(&view.destination)),
            ("DATES", escape_html(&view.dates)),
            ("CAPTURE", render_capture(&view.capture, "Get my custom price")),
        ],
    );
    layout("We're not that good yet", &body, "")
}

fn render_capture(view: &CaptureView, button: &str) -> String {
    let (email, disabled, message) = match &view.state {
        CaptureState::Idle => (String::new(), "", String::new()),
        CaptureState::Submitted => (
            String::new(),
            " disabled",
            format!(
                r#"<p class="status" data-type="ok">Thank you! Your email has been captured. <a href="{}">Use another email</a></p>"#,
                escape_html(&view.back)
            ),
        ),
        CaptureState::Failed { email, message } => (
            escape_html(email),
            "",
            format!(r#"<p class="status" data-type="error">{}</p>"#, escape_html(message)),
        ),
    };
    fill(
        CAPTURE_FORM,
        &[
            ("SOURCE", view.source.as_str().to_string()),
            ("BACK", escape_html(&view.back)),
            ("EMAIL", email),
            ("DISABLED", disabled.to_string()),
            ("BUTTON", escape_html(button)),
            ("MESSAGE", message),
        ],
    )
}

fn layout(title: &str, body: &str, script: &str) -> String {
    fill(
        LAYOUT_HTML,
        &[
            ("TITLE", escape_html(title)),
            ("BODY", body.to_string()),
            ("SCRIPT", script.to_string()),
        ],
    )
}

/// Single-pass `{{KEY}}` substitution, so inserted values are never rescanned.
fn fill(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = &after[..end];
                match values.iter().find(|(name, _)| *name == key) {
                    Some((_, value)) => out.push_str(value),
                    None => out.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// JSON literal that is safe to embed inside a `<script>` element.
pub fn script_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/")
}

const LAYOUT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}}</title>
  <style>
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --bg-1: #eef4fb;
      --bg-2: #bcd7f5;
      --ink: #1f2a37;
      --accent: #ff6b4a;
      --accent-2: #1d4e89;
      --low: #2d7a4b;
      --average: #d99a1e;
      --high: #c63b2b;
      --card: rgba(255, 255, 255, 0.9);
      --shadow: 0 24px 60px rgba(29, 78, 137, 0.18);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #e3efff 60%, #f6f9fd 100%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(860px, 100%);
      background: var(--card);
      backdrop-filter: blur(12px);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 36px;
      display: grid;
      gap: 28px;
      animation: rise 600ms ease;
    }

    h1 {
      font-family: "Fraunces", "Georgia", serif;
      font-weight: 600;
      font-size: clamp(2rem, 4vw, 2.6rem);
      margin: 0;
    }

    .subtitle {
      margin: 0;
      color: #5a6470;
    }

    form {
      display: grid;
      gap: 14px;
    }

    label {
      display: grid;
      gap: 6px;
      font-size: 0.85rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: #6b7480;
    }

    input, select {
      font: inherit;
      padding: 12px 14px;
      border-radius: 14px;
      border: 1px solid rgba(29, 78, 137, 0.2);
      background: white;
    }

    .row {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
      gap: 16px;
    }

    button, .button {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 14px 20px;
      font: inherit;
      font-weight: 600;
      cursor: pointer;
      background: var(--accent);
      color: white;
      text-align: center;
      text-decoration: none;
      box-shadow: 0 10px 24px rgba(255, 107, 74, 0.3);
    }

    button:disabled {
      opacity: 0.5;
      cursor: default;
    }

    .card {
      background: white;
      border-radius: 20px;
      padding: 18px;
      border: 1px solid rgba(29, 78, 137, 0.08);
      display: grid;
      gap: 12px;
    }

    .badge {
      display: inline-block;
      padding: 4px 12px;
      border-radius: 999px;
      color: white;
      font-weight: 600;
      text-transform: uppercase;
      letter-spacing: 0.08em;
      font-size: 0.8rem;
    }

    .badge[data-status="low"] { background: var(--low); }
    .badge[data-status="average"] { background: var(--average); }
    .badge[data-status="high"] { background: var(--high); }

    .meter {
      position: relative;
      height: 10px;
      border-radius: 999px;
      background: linear-gradient(90deg, var(--low) 0 25%, var(--average) 25% 70%, var(--high) 70% 100%);
    }

    .meter span {
      position: absolute;
      top: -5px;
      width: 20px;
      height: 20px;
      margin-left: -10px;
      border-radius: 50%;
      background: white;
      border: 3px solid var(--ink);
    }

    .progress {
      height: 10px;
      border-radius: 999px;
      background: rgba(29, 78, 137, 0.1);
      overflow: hidden;
    }

    .progress span {
      display: block;
      height: 100%;
      width: 0;
      background: var(--accent-2);
      animation: fill linear forwards;
    }

    #chart {
      width: 100%;
      height: 260px;
      display: block;
    }

    #chart text {
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
    }

    .chart-line {
      fill: none;
      stroke: var(--accent-2);
      stroke-width: 3;
    }

    .chart-point {
      fill: white;
      stroke-width: 2;
    }

    .chart-point.low { stroke: var(--low); }
    .chart-point.average { stroke: var(--average); }
    .chart-point.high { stroke: var(--high); }

    .chart-grid {
      stroke: rgba(29, 78, 137, 0.12);
    }

    .chart-label {
      fill: #6b7480;
      font-size: 11px;
    }

    .notice, .status[data-type="error"] {
      color: var(--high);
    }

    .status[data-type="ok"] {
      color: var(--low);
    }

    @keyframes rise {
      from {
        opacity: 0;
        transform: translateY(18px);
      }
      to {
        opacity: 1;
        transform: translateY(0);
      }
    }

    @keyframes fill {
      to {
        width: 100%;
      }
    }

    @media (max-width: 600px) {
      .app {
        padding: 28px 22px;
      }
    }
  </style>
</head>
<body>
  <main class="app">
{{BODY}}
  </main>
{{SCRIPT}}
</body>
</html>
"#;

const SEARCH_BODY: &str = r#"    <header>
      <h1>Flight Price Estimator</h1>
      <p class="subtitle">See if flight ticket prices are going to get cheaper or not.</p>
    </header>
    {{NOTICE}}
    <form method="post" action="/search" class="card">
      <div class="row">
        <label>Departure city
          <select name="from">{{ORIGINS}}</select>
        </label>
        <label>Arrival city
          <input name="to" list="destinations" value="{{TO}}" placeholder="Bali (DPS)" autocomplete="off" required />
          <datalist id="destinations">{{DESTINATIONS}}</datalist>
        </label>
      </div>
      <div class="row">
        <label>Departure date
          <input type="date" name="departDate" value="{{DEPART}}" />
        </label>
        <label>Return date
          <input type="date" name="returnDate" value="{{RETURN}}" />
        </label>
      </div>
      <button type="submit">Check Prices</button>
    </form>
"#;

const LOADING_BODY: &str = r#"    <header>
      <h1>Checking prices</h1>
      <p class="subtitle">{{DESTINATION}} &middot; {{DATES}}</p>
    </header>
    <div class="progress" aria-hidden="true"><span style="animation-duration: {{ANIMATION_MS}}ms"></span></div>
    <p class="subtitle">Comparing this season's fares with the rest of the year.</p>
"#;

const LOADING_SCRIPT: &str = r#"  <script>
    const decisionUrl = {{DECISION_URL}};
    const fallbackUrl = {{FALLBACK_URL}};
    let active = true;

    window.addEventListener('pagehide', () => {
      active = false;
    });

    const go = (location) => {
      if (active) {
        window.location.replace(location);
      }
    };

    fetch(decisionUrl, { headers: { accept: 'application/json' } })
      .then((res) => (res.ok ? res.json() : Promise.reject(new Error('decision failed'))))
      .then((body) => go(body.location || fallbackUrl))
      .catch(() => go(fallbackUrl));
  </script>"#;

const IMMINENT_BODY: &str = r#"    <header>
      <h1>You're so close to the trip!</h1>
      <p class="subtitle">{{ORIGIN}} to {{DESTINATION}} &middot; {{DATES}}</p>
    </header>
    <section class="card">
      <p>Flight prices are only going to increase. Get transported to our website to book your flight.</p>
      <a class="button" href="{{BOOKING_URL}}" rel="noopener">Book Now</a>
    </section>
    {{CAPTURE}}
"#;

const CHART_BODY: &str = r#"    <header>
      <h1>{{DESTINATION}}</h1>
      <p class="subtitle">{{DATES}}</p>
    </header>
    <section class="card">
      <div><span class="badge" data-status="{{STATUS}}">{{STATUS}}</span> <strong>${{PRICE}}</strong> average right now</div>
      <div class="meter" aria-label="Price position {{POSITION}} of 100"><span style="left: {{POSITION}}%"></span></div>
      <p>{{HEADLINE}}</p>
      <a class="button" href="{{BOOKING_URL}}" rel="noopener">Book Now</a>
    </section>
    <section class="card">
      <svg id="chart" viewBox="0 0 600 260" aria-label="Average price by booking month" role="img"></svg>
    </section>
    {{CAPTURE}}
"#;

const CHART_SCRIPT: &str = r#"  <script>
    const points = {{POINTS}};
    const chartEl = document.getElementById('chart');

    const formatPrice = (value) => `$${Math.round(value)}`;

    const renderLineChart = (points) => {
      if (!points.length) {
        chartEl.innerHTML = '<text class="chart-label" x="50%" y="50%" text-anchor="middle">No data yet</text>';
        return;
      }

      const width = 600;
      const height = 260;
      const paddingX = 54;
      const paddingY = 34;
      const top = 24;

      const values = points.map((point) => point.price);
      let min = Math.min(...values);
      let max = Math.max(...values);
      if (min === max) {
        min -= 1;
        max += 1;
      }

      const range = max - min;
      const xStep = points.length > 1 ? (width - paddingX * 2) / (points.length - 1) : 0;
      const scaleY = (height - top - paddingY) / range;
      const x = (index) => paddingX + index * xStep;
      const y = (value) => height - paddingY - (value - min) * scaleY;

      const path = points
        .map((point, index) => `${index === 0 ? 'M' : 'L'} ${x(index).toFixed(2)} ${y(point.price).toFixed(2)}`)
        .join(' ');

      const ticks = 4;
      let grid = '';
      for (let i = 0; i <= ticks; i += 1) {
        const value = min + (range * i) / ticks;
        const yPos = y(value);
        grid += `<line class="chart-grid" x1="${paddingX}" y1="${yPos}" x2="${width - paddingX}" y2="${yPos}" />`;
        grid += `<text class="chart-label" x="${paddingX - 10}" y="${yPos + 4}" text-anchor="end">${formatPrice(value)}</text>`;
      }

      const xLabels = points
        .map((point, index) => `<text class="chart-label" x="${x(index)}" y="${height - paddingY + 18}" text-anchor="middle">${point.label}</text>`)
        .join('');

      const circles = points
        .map((point, index) => `<circle class="chart-point ${point.status}" cx="${x(index)}" cy="${y(point.price)}" r="5"><title>${point.label}: ${formatPrice(point.price)}</title></circle>`)
        .join('');

      chartEl.setAttribute('viewBox', `0 0 ${width} ${height}`);
      chartEl.innerHTML = `
        ${grid}
        <path class="chart-line" d="${path}" />
        ${circles}
        ${xLabels}
      `;
    };

    renderLineChart(points);
  </script>"#;

const NO_DATA_BODY: &str = r#"    <header>
      <h1>We're not that good yet.</h1>
      <p class="subtitle">{{DESTINATION}} &middot; {{DATES}}</p>
    </header>
    <section class="card">
      <p>We don't have the data for this route, drop your email and we'll send you over a customised price.</p>
    </section>
    {{CAPTURE}}
"#;

const CAPTURE_FORM: &str = r#"<form method="post" action="/subscribe" class="card">
      <label>Enter your email for exclusive access to offers and updates
        <input type="email" name="email" value="{{EMAIL}}" placeholder="you@example.com"{{DISABLED}} />
      </label>
      <input type="hidden" name="source" value="{{SOURCE}}" />
      <input type="hidden" name="back" value="{{BACK}}" />
      <button type="submit"{{DISABLED}}>{{BUTTON}}</button>
      {{MESSAGE}}
    </form>"#;
