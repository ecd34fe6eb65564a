use crate::machine::CalibrationRequest;
use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};
use std::sync::{Arc, RwLock};

pub mod handlers;
pub mod responses;

#[derive(Clone)]
pub struct ApiContext {
    pub state: Arc<RwLock<AppState>>,
    pub calibration: CalibrationRequest,
}

pub fn router(ctx: ApiContext) -> Router {
    Router::new()
        .route("/api/occupancy", get(handlers::get_occupancy))
        .route("/api/health", get(handlers::get_health))
        .route("/api/calibrate", post(handlers::post_calibrate))
        .with_state(ctx)
}
