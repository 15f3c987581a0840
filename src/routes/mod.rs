pub mod submissions;

use axum::routing::get;
use axum::Json;
use axum::Router;
use serde_json::{json, Value};

use crate::state::SharedState;

pub const SERVICE_MESSAGE: &str = "Landing Page Signup API";

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route(
            "/api/submissions",
            get(submissions::list).post(submissions::create),
        )
}

async fn root() -> Json<Value> {
    Json(json!({ "message": SERVICE_MESSAGE }))
}

async fn health() -> &'static str {
    "ok"
}
