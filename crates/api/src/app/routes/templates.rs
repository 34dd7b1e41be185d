use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_templates))
        .route("/:slug", get(get_template))
}

pub async fn list_templates(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let items = services
        .templates()
        .list()
        .map(dto::template_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_template(
    Extension(services): Extension<Arc<AppServices>>,
    Path(slug): Path<String>,
) -> axum::response::Response {
    match services.templates().get(&slug) {
        Some(t) => (StatusCode::OK, Json(dto::template_to_json(t))).into_response(),
        None => errors::json_error(
            StatusCode::NOT_FOUND,
            "unknown_template",
            format!("no approval template named '{slug}'"),
        ),
    }
}
