use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::db::models::{Fixture, FixtureStatus};
use crate::error::{PredictError, Result};
use crate::model::{Confidence, Market};
use crate::pipeline::Pipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

type ApiError = (StatusCode, Json<Value>);

/// Build the Axum router for the read-only API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/fixtures", get(fixtures_handler))
        .route("/api/predictions", get(predictions_handler))
        .route("/api/value-picks", get(value_picks_handler))
        .route("/api/stats", get(stats_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

#[derive(Debug, Deserialize)]
struct DateQuery {
    date: Option<NaiveDate>,
}

impl DateQuery {
    fn day(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| Utc::now().date_naive())
    }
}

/// What the API says about a fixture's prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PredictionView {
    Published {
        confidence: Confidence,
        markets: BTreeMap<Market, u8>,
        result: Option<BTreeMap<Market, bool>>,
        evaluated: bool,
    },
    /// Not enough history to publish probabilities.
    LowConfidence { confidence: Confidence },
    /// Publishable tier, not kicked off, no snapshot stored yet.
    Pending,
    /// Publishable tier, but the fixture kicked off without a snapshot.
    NotPublished,
}

#[derive(Debug, Clone, Serialize)]
pub struct FixtureView {
    #[serde(flatten)]
    pub fixture: Fixture,
    pub prediction: PredictionView,
}

/// Stored fixtures on `date` with their prediction status.
pub fn fixture_views(pipeline: &Pipeline, date: NaiveDate) -> Result<Vec<FixtureView>> {
    let fixtures = pipeline.db().list_fixtures_on(date)?;
    let mut views = Vec::with_capacity(fixtures.len());

    for fixture in fixtures {
        let prediction = match pipeline.store().get_prediction(fixture.id)? {
            Some(snap) => PredictionView::Published {
                confidence: snap.confidence,
                markets: snap.markets,
                result: snap.result,
                evaluated: snap.evaluated,
            },
            None => {
                let confidence = pipeline.tier(&fixture)?;
                if !confidence.publishes_probabilities() {
                    PredictionView::LowConfidence { confidence }
                } else if fixture.status() == FixtureStatus::NotStarted {
                    PredictionView::Pending
                } else {
                    PredictionView::NotPublished
                }
            }
        };
        views.push(FixtureView {
            fixture,
            prediction,
        });
    }

    Ok(views)
}

fn unavailable(e: PredictError) -> ApiError {
    warn!("API read failed: {}", e);
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "error": "data_unavailable" })),
    )
}

/// GET /api/fixtures?date=YYYY-MM-DD
async fn fixtures_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DateQuery>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    fixture_views(&state.pipeline, q.day())
        .map(Json)
        .map_err(unavailable)
}

/// GET /api/predictions?date=YYYY-MM-DD
async fn predictions_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DateQuery>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    state
        .pipeline
        .db()
        .list_predictions_on(q.day())
        .map(Json)
        .map_err(unavailable)
}

/// GET /api/value-picks?date=YYYY-MM-DD
async fn value_picks_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DateQuery>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    state
        .pipeline
        .value_picks(q.day())
        .map(Json)
        .map_err(unavailable)
}

/// GET /api/stats
async fn stats_handler(
    State(state): State<Arc<AppState>>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    state
        .pipeline
        .db()
        .market_records()
        .map(Json)
        .map_err(unavailable)
}
