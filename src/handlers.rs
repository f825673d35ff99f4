use crate::airports::search_destinations;
use crate::analytics::{capture_event, ESTIMATION_STARTED};
use crate::booking::booking_url;
use crate::classify::{chart_points, classify, current_price};
use crate::errors::AppError;
use crate::models::{
    CaptureSource, DecisionResponse, DestinationOption, DestinationParams, LastSearch, PageParams, PricesParams,
    PricesResponse, SearchForm, SubscribeForm, SubscribeResponse, SubscriptionRequest,
};
use crate::navigation::decide;
use crate::pricing::PricingError;
use crate::search::{safe_return_path, with_query, SearchQuery};
use crate::state::AppState;
use crate::subscribe::{SubscribeError, Subscribed};
use crate::ui::{
    render_chart, render_imminent, render_loading, render_no_data, render_search, CaptureView, ChartView,
    ImminentView, LoadingView, NoDataView, SearchView,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use chrono::{Datelike, Local, NaiveDate};
use serde_json::json;
use tracing::{error, info, warn};

const DESTINATION_LIMIT: usize = 8;

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let last = state.last_search.recall().await.unwrap_or_default();
    Html(render_search(&SearchView {
        from: last.departure_city,
        to: last.arrival_city,
        depart_date: last.depart_date.unwrap_or_default(),
        return_date: last.return_date.unwrap_or_default(),
        notice: None,
    }))
}

pub async fn submit_search(State(state): State<AppState>, Form(form): Form<SearchForm>) -> Response {
    let query = match SearchQuery::from_form(&form) {
        Ok(query) => query,
        Err(err) => {
            info!(%err, "search rejected");
            let page = render_search(&SearchView {
                from: form.from,
                to: form.to,
                depart_date: form.depart_date,
                return_date: form.return_date,
                notice: Some(err.to_string()),
            });
            return (StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response();
        }
    };

    state.last_search.remember(&LastSearch::from(&query)).await;
    state.events.record(
        ESTIMATION_STARTED,
        json!({
            "departure": query.departure_code,
            "destination": query.arrival_code,
            "departDate": query.depart_date.format("%Y-%m-%d").to_string(),
            "returnDate": query.return_date.format("%Y-%m-%d").to_string(),
        }),
    );
    Redirect::to(&query.loading_url()).into_response()
}

pub async fn loading(State(state): State<AppState>, Query(params): Query<PageParams>) -> Response {
    let Some(query) = page_query(&params) else {
        return home();
    };
    Html(render_loading(&LoadingView {
        destination: query.arrival_city.clone(),
        dates: query.date_range().label(),
        decision_url: query.decision_url(),
        fallback_url: query.page_url("/no-data"),
        animation_ms: state.config.pacing.animation.as_millis(),
    }))
    .into_response()
}

pub async fn decision(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<DecisionResponse>, AppError> {
    let query = SearchQuery::from_params(&params)?;
    let decision = decide(&state.pricing, &query, today(), state.config.pacing).await;
    info!(outcome = ?decision.outcome(), destination = %query.arrival_code, "navigation decided");

    Ok(Json(DecisionResponse {
        outcome: decision.outcome(),
        location: decision.location(&query),
    }))
}

pub async fn imminent(State(state): State<AppState>, Query(params): Query<PageParams>) -> Response {
    let Some(query) = page_query(&params) else {
        return home();
    };
    Html(render_imminent(&ImminentView {
        origin: query.departure_city.clone(),
        destination: query.arrival_city.clone(),
        dates: query.date_range().label(),
        booking_url: booking_url(state.config.imminent_booking, &query),
        capture: CaptureView::new(CaptureSource::BookingReminder, "/imminent", &params),
    }))
    .into_response()
}

pub async fn chart(State(state): State<AppState>, Query(params): Query<PageParams>) -> Response {
    let Some(query) = page_query(&params) else {
        return home();
    };
    let no_data = || Redirect::to(&query.page_url("/no-data")).into_response();

    let Some(request) = query.pricing_request(params.generated_url.as_deref()) else {
        return no_data();
    };

    let series = match state.pricing.fetch_average_price(&request.destination, request.month).await {
        Ok(series) => series,
        Err(err) => {
            warn!(destination = %request.destination, month = request.month, %err, "chart has no series");
            return no_data();
        }
    };
    let Some(price) = current_price(&series, today().month()) else {
        info!(destination = %request.destination, "current price is missing");
        return no_data();
    };

    Html(render_chart(&ChartView {
        destination: query.arrival_city.clone(),
        dates: query.date_range().short_label(),
        booking_url: booking_url(state.config.chart_booking, &query),
        current_price: price,
        current: classify(&series, price),
        points: chart_points(&series),
        capture: CaptureView::new(CaptureSource::PriceAlert, "/chart", &params),
    }))
    .into_response()
}

pub async fn no_data(Query(params): Query<PageParams>) -> Response {
    let Some(query) = page_query(&params) else {
        return home();
    };
    Html(render_no_data(&NoDataView {
        destination: query.arrival_city.clone(),
        dates: query.date_range().short_label(),
        capture: CaptureView::new(CaptureSource::CustomPrice, "/no-data", &params),
    }))
    .into_response()
}

pub async fn subscribe_form(State(state): State<AppState>, Form(form): Form<SubscribeForm>) -> Redirect {
    let back = safe_return_path(&form.back).unwrap_or("/");
    let target = match state.subscriptions.subscribe(&form.email).await {
        Ok(outcome) => {
            state.events.record(
                capture_event(form.source),
                json!({
                    "source": form.source.as_str(),
                    "existing": matches!(outcome, Subscribed::Existing { .. }),
                }),
            );
            with_query(back, &[("subscribed", "1".to_string())])
        }
        Err(SubscribeError::MissingEmail) => with_query(back, &[("subscribe_error", "missing".to_string())]),
        Err(err) => {
            if matches!(err, SubscribeError::MissingConfiguration) {
                error!("subscription provider credentials are not configured");
            } else {
                warn!(source = form.source.as_str(), "email capture failed: {err}");
            }
            with_query(
                back,
                &[
                    ("subscribe_error", "failed".to_string()),
                    ("email", form.email.trim().to_string()),
                ],
            )
        }
    };
    Redirect::to(&target)
}

pub async fn api_flight_prices(
    State(state): State<AppState>,
    Query(params): Query<PricesParams>,
) -> Result<Json<PricesResponse>, AppError> {
    let destination = params.destination_iata.unwrap_or_default();
    let destination = destination.trim();
    let month = params
        .departure_month
        .as_deref()
        .and_then(|month| month.trim().parse::<u32>().ok())
        .unwrap_or(0);

    match state.pricing.fetch_average_price(destination, month).await {
        Ok(series) => Ok(Json(PricesResponse::Series(series))),
        Err(PricingError::MissingApiKey) => {
            error!("pricing API key is not configured");
            Err(AppError::configuration("API configuration error"))
        }
        Err(PricingError::NoData(reason)) => {
            info!(destination, month, %reason, "no pricing data");
            Ok(Json(PricesResponse::no_data()))
        }
    }
}

pub async fn api_subscribe(
    State(state): State<AppState>,
    Json(payload): Json<SubscriptionRequest>,
) -> Result<Json<SubscribeResponse>, AppError> {
    state.subscriptions.subscribe(&payload.email).await?;
    Ok(Json(SubscribeResponse { success: true }))
}

pub async fn destinations(Query(params): Query<DestinationParams>) -> Json<Vec<DestinationOption>> {
    let query = params.q.unwrap_or_default();
    let options = search_destinations(&query, DESTINATION_LIMIT)
        .into_iter()
        .map(|dest| DestinationOption {
            code: dest.code,
            label: dest.label(),
        })
        .collect();
    Json(options)
}

fn page_query(params: &PageParams) -> Option<SearchQuery> {
    SearchQuery::from_params(params)
        .map_err(|err| warn!(%err, "page opened without a usable search"))
        .ok()
}

fn home() -> Response {
    Redirect::to("/").into_response()
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
