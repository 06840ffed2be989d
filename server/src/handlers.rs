use std::time::Instant;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use knnrec_core::{Recommendation, RecommendError, Resources};
use rayon::prelude::*;
use tokio::task;

use crate::errors::{
    map_json_rejection, map_path_rejection, map_query_rejection, map_recommend_error, ApiError,
};
use crate::handler_utils::{build_recommendation_response, canonical_customer_id, resolve_top_n};
use crate::models::{
    BatchRecommendRequest, BatchRecommendResponse, LiveResponse, ReadyResponse, RecommendQuery,
    RecommendRequest, RecommendationResponse,
};
use crate::state::AppState;

pub(crate) async fn live(State(state): State<AppState>) -> Json<LiveResponse> {
    Json(LiveResponse {
        status: "live",
        uptime_ms: state.started_at.elapsed().as_millis() as u64,
    })
}

// Resources are loaded before the listener binds, so a running server is ready.
pub(crate) async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    Json(ReadyResponse {
        status: "ready",
        uptime_ms: state.started_at.elapsed().as_millis() as u64,
        customers: state.resources.matrix.len(),
        products: state.resources.matrix.dimension(),
        indexed_customers: state.resources.index.len(),
    })
}

pub(crate) async fn recommend_for_customer(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<RecommendQuery>, QueryRejection>,
) -> Result<Json<RecommendationResponse>, ApiError> {
    let response = path.map_err(map_path_rejection).and_then(|Path(customer_id)| {
        let Query(query) = query.map_err(map_query_rejection)?;
        serve_one(&state, &customer_id, query.top_n)
    });
    record_failure(&state, response).map(Json)
}

pub(crate) async fn recommend(
    State(state): State<AppState>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<Json<RecommendationResponse>, ApiError> {
    let response = payload
        .map_err(map_json_rejection)
        .and_then(|Json(payload)| serve_one(&state, &payload.customer_id, payload.top_n));
    record_failure(&state, response).map(Json)
}

pub(crate) async fn recommend_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchRecommendRequest>, JsonRejection>,
) -> Result<Json<BatchRecommendResponse>, ApiError> {
    let response = serve_batch(&state, payload).await;
    record_failure(&state, response).map(Json)
}

pub(crate) async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let body = state.metrics.render().map_err(|error| {
        tracing::error!(%error, "failed to render metrics");
        ApiError::internal("failed to render metrics")
    })?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    ))
}

fn serve_one(
    state: &AppState,
    customer_id: &str,
    top_n: Option<i64>,
) -> Result<RecommendationResponse, ApiError> {
    let customer_id = canonical_customer_id(customer_id)?;
    let top_n = resolve_top_n(top_n, &state.config)?;

    let (recommendation, elapsed) = timed_recommend(&state.resources, &customer_id, top_n);
    let recommendation = recommendation.map_err(map_recommend_error)?;
    record_success(state, &customer_id, &recommendation, elapsed);

    Ok(build_recommendation_response(customer_id, recommendation))
}

async fn serve_batch(
    state: &AppState,
    payload: Result<Json<BatchRecommendRequest>, JsonRejection>,
) -> Result<BatchRecommendResponse, ApiError> {
    let Json(payload) = payload.map_err(map_json_rejection)?;
    if payload.customer_ids.is_empty() {
        return Err(ApiError::invalid_argument("customer_ids must not be empty"));
    }
    if payload.customer_ids.len() > state.config.max_batch {
        return Err(ApiError::invalid_argument(format!(
            "batch of {} customers exceeds configured maximum {}",
            payload.customer_ids.len(),
            state.config.max_batch
        )));
    }
    let top_n = resolve_top_n(payload.top_n, &state.config)?;
    let customer_ids = payload
        .customer_ids
        .iter()
        .enumerate()
        .map(|(position, customer_id)| {
            canonical_customer_id(customer_id).map_err(|_| {
                ApiError::invalid_argument(format!(
                    "customer_ids[{position}] must not be empty"
                ))
            })
        })
        .collect::<Result<Vec<String>, ApiError>>()?;

    let resources = state.resources.clone();
    let outcomes = task::spawn_blocking(move || {
        customer_ids
            .into_par_iter()
            .map(|customer_id| {
                let (recommendation, elapsed) = timed_recommend(&resources, &customer_id, top_n);
                recommendation.map(|recommendation| (customer_id, recommendation, elapsed))
            })
            .collect::<Result<Vec<_>, RecommendError>>()
    })
    .await
    .map_err(|_| ApiError::internal("batch worker task failed"))?
    .map_err(map_recommend_error)?;

    let results = outcomes
        .into_iter()
        .map(|(customer_id, recommendation, elapsed)| {
            record_success(state, &customer_id, &recommendation, elapsed);
            build_recommendation_response(customer_id, recommendation)
        })
        .collect();

    Ok(BatchRecommendResponse { top_n, results })
}

fn timed_recommend(
    resources: &Resources,
    customer_id: &str,
    top_n: usize,
) -> (Result<Recommendation, RecommendError>, f64) {
    let started = Instant::now();
    let recommendation = resources.recommend(customer_id, top_n);
    (recommendation, started.elapsed().as_secs_f64())
}

fn record_success(
    state: &AppState,
    customer_id: &str,
    recommendation: &Recommendation,
    elapsed_seconds: f64,
) {
    state.metrics.record_recommendation(
        recommendation.classification,
        recommendation.items.len(),
        elapsed_seconds,
    );
    tracing::debug!(
        customer_id,
        classification = recommendation.classification.as_str(),
        items = recommendation.items.len(),
        elapsed_us = (elapsed_seconds * 1_000_000.0) as u64,
        "recommendation served"
    );
}

fn record_failure<T>(state: &AppState, result: Result<T, ApiError>) -> Result<T, ApiError> {
    if let Err(error) = &result {
        state.metrics.record_error(error.code());
    }
    result
}
