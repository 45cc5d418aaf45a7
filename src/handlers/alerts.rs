//! Alert delivery surface: pull endpoint, snooze management, and the
//! server-sent-events push stream.

use axum::{
    extract::{Extension, Query, RawQuery, State},
    http::{header, HeaderMap},
    response::{
        sse::{Event as SseEvent, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use super::common::success_response;
use crate::auth::{stream_token, OrgContext};
use crate::errors::ServiceError;
use crate::services::alerts::clamp_limit;
use crate::services::alerts::AlertsSnapshot;
use crate::services::snooze::{SnoozeRequest, UnsnoozeRequest};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    pub limit: Option<u64>,
}

/// Routes guarded by the bearer-token middleware.
pub fn alert_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_alerts))
        .route("/snooze", post(snooze_alert).delete(unsnooze_alert))
        .route("/snoozes", get(list_snoozes))
}

/// The stream route authenticates on its own (query token or cookie), so it
/// lives outside the middleware stack.
pub fn stream_routes() -> Router<AppState> {
    Router::new().route("/stream", get(stream_alerts))
}

async fn get_alerts(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Query(params): Query<AlertQuery>,
) -> Result<Response, ServiceError> {
    let snapshot = state
        .services
        .alerts
        .get_alerts(ctx.organization_id, clamp_limit(params.limit))
        .await?;
    Ok(success_response(snapshot))
}

async fn snooze_alert(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Json(request): Json<SnoozeRequest>,
) -> Result<Response, ServiceError> {
    let row = state
        .services
        .snoozes
        .snooze(ctx.organization_id, request)
        .await?;
    Ok(success_response(row))
}

async fn unsnooze_alert(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
    Json(request): Json<UnsnoozeRequest>,
) -> Result<Response, ServiceError> {
    // Idempotent: absence of a matching row is still success.
    let removed = state
        .services
        .snoozes
        .unsnooze(ctx.organization_id, request)
        .await?;
    debug!(removed, "unsnooze processed");
    Ok(success_response(json!({ "ok": true })))
}

async fn list_snoozes(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrgContext>,
) -> Result<Response, ServiceError> {
    let snoozes = state
        .services
        .snoozes
        .list_snoozes(ctx.organization_id)
        .await?;
    Ok(success_response(snoozes))
}

/// Long-lived alert push stream.
///
/// Identity is resolved once at connect time from a `token` query parameter
/// or an `access_token` cookie; EventSource clients cannot set headers.
/// After the first emission the loop recomputes alerts on a fixed interval
/// and emits only when the snapshot structurally changed. The loop tears
/// down when the client disconnects or a computation fails.
async fn stream_alerts(
    State(state): State<AppState>,
    Query(params): Query<AlertQuery>,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
) -> Result<Response, ServiceError> {
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok());
    let token = stream_token(raw_query.as_deref(), cookie)
        .ok_or_else(|| ServiceError::BadRequest("missing stream token".to_string()))?;

    let claims = state
        .auth
        .verify_token(&token)
        .map_err(|_| ServiceError::BadRequest("invalid stream token".to_string()))?;
    // Organization scope is fixed at connect time and not re-resolved per
    // tick.
    let ctx = state.auth.resolve_org(&claims).await?;

    let limit = clamp_limit(params.limit);
    let interval = Duration::from_secs(state.config.alert_stream_interval_secs);
    let alerts = state.services.alerts.clone();
    let organization_id = ctx.organization_id;

    // Capacity 1: at most one emission buffered beyond the in-flight tick.
    let (tx, rx) = mpsc::channel::<Result<SseEvent, Infallible>>(1);

    tokio::spawn(async move {
        let mut last: Option<AlertsSnapshot> = None;
        let mut ticker = tokio::time::interval(interval);

        loop {
            // First tick fires immediately. The closed branch covers
            // connections whose alerts never change again: without it the
            // loop would only notice the disconnect on its next send.
            tokio::select! {
                _ = ticker.tick() => {}
                _ = tx.closed() => break,
            }

            match alerts.get_alerts(organization_id, limit).await {
                Ok(snapshot) => {
                    if last.as_ref() == Some(&snapshot) {
                        continue;
                    }
                    let event = match SseEvent::default().event("alerts").json_data(&snapshot) {
                        Ok(event) => event,
                        Err(e) => {
                            warn!(error = %e, "failed to serialize alert snapshot");
                            break;
                        }
                    };
                    if tx.send(Ok(event)).await.is_err() {
                        // Client disconnected.
                        break;
                    }
                    last = Some(snapshot);
                }
                Err(e) => {
                    warn!(%organization_id, error = %e, "alert stream computation failed");
                    let event = SseEvent::default()
                        .event("error")
                        .data(e.response_message());
                    let _ = tx.send(Ok(event)).await;
                    break;
                }
            }
        }

        debug!(%organization_id, "alert stream closed");
    });

    Ok(Sse::new(ReceiverStream::new(rx))
        .keep_alive(KeepAlive::default())
        .into_response())
}
