use crate::api::ApiContext;
use crate::api::responses::{
    CalibrateAcceptedResponse, HealthResponseBody, NodeHealth, OccupancyErrorCode,
    OccupancyErrorResponse, OccupancySuccessResponse, SeatStatusResponse,
};
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt;
use std::time::SystemTime;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{error, info};

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug)]
enum TimestampError {
    Format(time::error::Format),
}

impl fmt::Display for TimestampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampError::Format(err) => write!(f, "timestamp format error: {err}"),
        }
    }
}

fn format_timestamp(timestamp: SystemTime) -> Result<String, TimestampError> {
    let datetime = OffsetDateTime::from(timestamp);
    datetime.format(&Rfc3339).map_err(TimestampError::Format)
}

fn fallback_timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

pub enum OccupancyResponse {
    Success(OccupancySuccessResponse),
    Error {
        status: StatusCode,
        body: OccupancyErrorResponse,
    },
}

impl IntoResponse for OccupancyResponse {
    fn into_response(self) -> Response {
        match self {
            OccupancyResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            OccupancyResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn get_occupancy(State(ctx): State<ApiContext>) -> impl IntoResponse {
    build_occupancy_response(&ctx, SystemTime::now())
}

fn build_occupancy_response(ctx: &ApiContext, now: SystemTime) -> OccupancyResponse {
    let guard = match ctx.state.read() {
        Ok(guard) => guard,
        Err(_) => {
            return occupancy_internal_error("state lock poisoned while reading occupancy");
        }
    };

    let node_id = guard.node_id().to_string();
    let snapshot = guard.occupancy().cloned();
    drop(guard);

    match snapshot {
        Some(snapshot) => {
            let timestamp = match format_timestamp(snapshot.timestamp) {
                Ok(formatted) => formatted,
                Err(_) => {
                    return occupancy_internal_error("timestamp formatting failure");
                }
            };
            let seats = snapshot
                .seats
                .iter()
                .enumerate()
                .map(|(seat, &occupied)| SeatStatusResponse { seat, occupied })
                .collect();
            OccupancyResponse::Success(OccupancySuccessResponse {
                node_id,
                free_seats: snapshot.free_seats,
                total_seats: snapshot.total_seats,
                seats,
                timestamp,
            })
        }
        None => no_data_response(now),
    }
}

fn no_data_response(now: SystemTime) -> OccupancyResponse {
    match format_timestamp(now) {
        Ok(formatted) => OccupancyResponse::Error {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: OccupancyErrorResponse {
                error_code: OccupancyErrorCode::NoData,
                error_message: "No completed scan yet".to_string(),
                timestamp: formatted,
            },
        },
        Err(_) => occupancy_internal_error("timestamp formatting failure"),
    }
}

fn occupancy_internal_error(message: &str) -> OccupancyResponse {
    error!(message = message, "Internal error while handling /api/occupancy");
    OccupancyResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: OccupancyErrorResponse {
            error_code: OccupancyErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: fallback_timestamp(),
        },
    }
}

pub async fn get_health(State(ctx): State<ApiContext>) -> impl IntoResponse {
    build_health_response(&ctx, SystemTime::now())
}

fn build_health_response(
    ctx: &ApiContext,
    now: SystemTime,
) -> (StatusCode, Json<HealthResponseBody>) {
    let (health, state_name) = match ctx.state.read() {
        Ok(guard) => {
            let health = if guard.hardware_ready() {
                NodeHealth::Ok
            } else if guard.init_failed() {
                NodeHealth::Error
            } else {
                NodeHealth::Starting
            };
            (health, guard.machine_state().as_str().to_string())
        }
        Err(_) => {
            error!("state lock poisoned while reading health");
            (NodeHealth::Error, "unknown".to_string())
        }
    };

    let status = match health {
        NodeHealth::Ok => StatusCode::OK,
        NodeHealth::Starting | NodeHealth::Error => StatusCode::SERVICE_UNAVAILABLE,
    };
    let timestamp = format_timestamp(now).unwrap_or_else(|_| fallback_timestamp());

    (
        status,
        Json(HealthResponseBody {
            status: health,
            state: state_name,
            timestamp,
        }),
    )
}

pub async fn post_calibrate(State(ctx): State<ApiContext>) -> impl IntoResponse {
    build_calibrate_response(&ctx, SystemTime::now())
}

fn build_calibrate_response(
    ctx: &ApiContext,
    now: SystemTime,
) -> (StatusCode, Json<CalibrateAcceptedResponse>) {
    ctx.calibration.request();
    info!("recalibration requested via admin api");
    let timestamp = format_timestamp(now).unwrap_or_else(|_| fallback_timestamp());
    (
        StatusCode::ACCEPTED,
        Json(CalibrateAcceptedResponse {
            requested: true,
            timestamp,
        }),
    )
}
