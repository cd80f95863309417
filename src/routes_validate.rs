// --------------------------------------------------
// HTTP adapter over the validation engine.
//
// Responsibilities:
// - Validate a weekly pattern against a goal specification
// - Validate dated calendar events over a date range
// - Evaluate creation-flow readiness
// - Expose the active engine settings
// --------------------------------------------------

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::warn;

use crate::models::{CalendarEvent, GoalSpecification, WeeklyPattern};
use crate::readiness::{evaluate_readiness, ReadinessContext};
use crate::settings::EngineSettings;
use crate::validate_events::validate_events_with;
use crate::validate_pattern::validate_pattern_with;

pub type SharedSettings = Arc<EngineSettings>;

pub fn router(settings: SharedSettings) -> Router {
    Router::new()
        .route("/validate/pattern", post(validate_pattern))
        .route("/validate/events", post(validate_events))
        .route("/readiness", post(readiness))
        .route("/settings", get(get_settings))
        .with_state(settings)
}

#[derive(Debug, Deserialize)]
pub struct PatternRequest {
    pub pattern: WeeklyPattern,
    #[serde(default)]
    pub spec: GoalSpecification,
}

#[derive(Debug, Deserialize)]
pub struct EventsRequest {
    pub events: Vec<CalendarEvent>,
    #[serde(default)]
    pub spec: GoalSpecification,
    pub start_date: NaiveDate, // "YYYY-MM-DD"
    pub end_date: NaiveDate,
}

// -----------------------------
// POST /api/validate/pattern
// -----------------------------
pub async fn validate_pattern(
    State(settings): State<SharedSettings>,
    Json(req): Json<PatternRequest>,
) -> impl IntoResponse {
    let result = validate_pattern_with(&req.pattern, &req.spec, &settings.validation_options());
    Json(result)
}

// -----------------------------
// POST /api/validate/events
// 400 when start_date is after end_date
// -----------------------------
pub async fn validate_events(
    State(settings): State<SharedSettings>,
    Json(req): Json<EventsRequest>,
) -> impl IntoResponse {
    match validate_events_with(
        &req.events,
        &req.spec,
        req.start_date,
        req.end_date,
        &settings.validation_options(),
    ) {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            warn!(error = %e, "rejected event validation request");
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

// -----------------------------
// POST /api/readiness
// -----------------------------
pub async fn readiness(Json(ctx): Json<ReadinessContext>) -> impl IntoResponse {
    Json(evaluate_readiness(&ctx))
}

// -----------------------------
// GET /api/settings
// -----------------------------
pub async fn get_settings(State(settings): State<SharedSettings>) -> impl IntoResponse {
    Json(settings.as_ref().clone())
}
