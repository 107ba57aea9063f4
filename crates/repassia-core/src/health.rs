use axum::Json;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Liveness check for `GET /healthz`.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Body of the readiness check.
#[derive(Debug, Serialize)]
pub struct ReadinessReport {
    pub status: &'static str,
    pub database: &'static str,
    #[serde(serialize_with = "crate::serde::to_rfc3339_ms")]
    pub timestamp: DateTime<Utc>,
}

/// Build the `GET /readyz` response from the result of a database ping.
/// 200 when connected, 503 otherwise.
pub fn readiness(database_ok: bool) -> (StatusCode, Json<ReadinessReport>) {
    let (status, report) = if database_ok {
        (StatusCode::OK, ("ok", "connected"))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, ("degraded", "disconnected"))
    };
    (
        status,
        Json(ReadinessReport {
            status: report.0,
            database: report.1,
            timestamp: Utc::now(),
        }),
    )
}
