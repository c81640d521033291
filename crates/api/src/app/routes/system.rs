use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "backend": services.backend_name(),
        })),
    )
}

pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    let p = principal.principal();
    Json(serde_json::json!({
        "user_id": p.user_id,
        "roles": p.roles.iter().map(|r| r.as_str()).collect::<Vec<_>>(),
        "permissions": p.permissions.iter().map(|perm| perm.as_str()).collect::<Vec<_>>(),
    }))
}
