//! Axum handlers mapping the lease endpoints onto [`LeaseStore`].
//!
//! ```text
//! /elysees-api/v1
//! ├── GET  /isalive
//! ├── POST /requestLease
//! ├── POST /renewLease
//! ├── POST /releaseLease
//! └── GET  /durationTillExpiry?leaseName=
//! ```

use crate::config::ServerConfig;
use crate::validate;
use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use elysees::wire::*;
use elysees::{API_BASE_PATH, LeaseStore};
use log::*;
use std::sync::Arc;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Clone)]
struct AppState {
    store: Arc<LeaseStore>,
    max_lease_duration_ms: i64,
    max_lease_extension_duration_ms: i64,
}

type Reply<T> = (StatusCode, Json<T>);

/// Undecodable bodies are answered like failed validation.
fn malformed<T>(call: &str, rejection: JsonRejection, rejected: fn(&str, String) -> T) -> Reply<T> {
    warn!("{call} rejected: {rejection}");
    (StatusCode::BAD_REQUEST, Json(rejected("", rejection.body_text())))
}

pub fn router(config: &ServerConfig, store: Arc<LeaseStore>) -> Router {
    let state = AppState {
        store,
        max_lease_duration_ms: config.max_lease_duration_ms,
        max_lease_extension_duration_ms: config.max_lease_extension_duration_ms,
    };

    let api = Router::new()
        .route("/isalive", get(is_alive))
        .route("/requestLease", post(request_lease))
        .route("/renewLease", post(renew_lease))
        .route("/releaseLease", post(release_lease))
        .route("/durationTillExpiry", get(duration_till_expiry))
        .with_state(state);

    Router::new().nest(API_BASE_PATH, api)
}

async fn is_alive() -> Result<String, StatusCode> {
    debug!("isalive called");
    OffsetDateTime::now_utc().format(&Rfc3339).map_err(|e| {
        error!("isalive: cannot format timestamp: {e}");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

async fn request_lease(
    State(state): State<AppState>,
    payload: Result<Json<LeaseCreationRequest>, JsonRejection>,
) -> Reply<LeaseCreationResponse> {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return malformed("requestLease", rejection, LeaseCreationResponse::rejected),
    };
    info!("requestLease: {}, {} ms", req.lease_name, req.duration_in_millis);
    if let Some(problem) = validate::creation(&req, state.max_lease_duration_ms) {
        warn!("requestLease rejected: {problem}");
        return (
            StatusCode::BAD_REQUEST,
            Json(LeaseCreationResponse::rejected(&req.lease_name, problem)),
        );
    }

    let out = state.store.request(&req.lease_name, req.duration_in_millis);
    (StatusCode::OK, Json(LeaseCreationResponse::from_outcome(req.lease_name, out)))
}

async fn renew_lease(
    State(state): State<AppState>,
    payload: Result<Json<LeaseRenewRequest>, JsonRejection>,
) -> Reply<LeaseRenewResponse> {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return malformed("renewLease", rejection, LeaseRenewResponse::rejected),
    };
    info!("renewLease: {}, {} ms", req.lease_name, req.duration_in_millis);
    if let Some(problem) = validate::renew(&req, state.max_lease_extension_duration_ms) {
        warn!("renewLease rejected: {problem}");
        return (
            StatusCode::BAD_REQUEST,
            Json(LeaseRenewResponse::rejected(&req.lease_name, problem)),
        );
    }

    let out = state.store.renew(&req.lease_name, &req.token, req.duration_in_millis);
    (StatusCode::OK, Json(LeaseRenewResponse::from_outcome(req.lease_name, out)))
}

async fn release_lease(
    State(state): State<AppState>,
    payload: Result<Json<LeaseReleaseRequest>, JsonRejection>,
) -> Reply<LeaseReleaseResponse> {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return malformed("releaseLease", rejection, LeaseReleaseResponse::rejected),
    };
    info!("releaseLease: {}", req.lease_name);
    if let Some(problem) = validate::release(&req) {
        warn!("releaseLease rejected: {problem}");
        return (
            StatusCode::BAD_REQUEST,
            Json(LeaseReleaseResponse::rejected(&req.lease_name, problem)),
        );
    }

    let out = state.store.release(&req.lease_name, &req.token);
    (StatusCode::OK, Json(LeaseReleaseResponse::from_outcome(req.lease_name, out)))
}

async fn duration_till_expiry(
    State(state): State<AppState>,
    Query(q): Query<LeaseExpiryQuery>,
) -> Reply<LeaseExpiryResponse> {
    debug!("durationTillExpiry: {}", q.lease_name);
    if let Some(problem) = validate::expiry(&q.lease_name) {
        return (
            StatusCode::BAD_REQUEST,
            Json(LeaseExpiryResponse::rejected(&q.lease_name, problem)),
        );
    }

    let out = state.store.duration_till_expiry(&q.lease_name);
    (StatusCode::OK, Json(LeaseExpiryResponse::from_outcome(q.lease_name, out)))
}
