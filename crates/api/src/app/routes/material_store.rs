//! `/material-store` routes.
//!
//! Mutations answer with the uniform `{ success, ..., error?, error_code? }`
//! shape; the authenticated user becomes `performed_by`.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/inventory", get(get_inventory))
        .route("/inventory/:material_type", get(get_material_stock))
        .route("/transfers", post(transfer_from_pos))
        .route("/returns", post(return_to_pos))
        .route("/bulk-transfers", post(bulk_transfer_from_pos))
        .route("/field-usage", post(use_in_field_work))
        .route("/transactions", get(get_transactions))
        .route("/low-stock", get(get_low_stock_alerts))
        .route("/analytics", get(get_usage_analytics))
        .layer(axum::middleware::from_fn(authz::require_resources_access))
}

// -------------------------
// Mutations
// -------------------------

pub async fn transfer_from_pos(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::MovementRequest>,
) -> axum::response::Response {
    let result = services
        .transfer_from_pos(&body.material_type, body.quantity, principal.user_id(), body.options())
        .await;
    errors::operation_response(result)
}

pub async fn return_to_pos(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::MovementRequest>,
) -> axum::response::Response {
    let result = services
        .return_to_pos(&body.material_type, body.quantity, principal.user_id(), body.options())
        .await;
    errors::operation_response(result)
}

pub async fn bulk_transfer_from_pos(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::BulkTransferRequest>,
) -> axum::response::Response {
    let result = services
        .bulk_transfer_from_pos(&body.transfers, principal.user_id())
        .await;
    errors::operation_response(result)
}

pub async fn use_in_field_work(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::FieldUsageRequest>,
) -> axum::response::Response {
    let result = services
        .use_in_field_work(body.field_report_id, &body.materials_used, principal.user_id())
        .await;
    errors::operation_response(result)
}

// -------------------------
// Queries
// -------------------------

pub async fn get_inventory(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.get_store_inventory().await {
        Ok(balances) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "count": balances.len(),
                "inventory": balances,
            })),
        )
            .into_response(),
        Err(e) => errors::ledger_error_response(&e),
    }
}

pub async fn get_material_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(material_type): Path<String>,
) -> axum::response::Response {
    match services.get_material_stock(&material_type).await {
        Ok(Some(balance)) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "stock": balance })),
        )
            .into_response(),
        Ok(None) => errors::json_error(
            StatusCode::NOT_FOUND,
            "material_not_available",
            format!("material '{material_type}' not available in material store"),
        ),
        Err(e) => errors::ledger_error_response(&e),
    }
}

pub async fn get_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::TransactionsQuery>,
) -> axum::response::Response {
    let filter = match query.into_filter() {
        Ok(f) => f,
        Err(msg) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_request", msg),
    };

    match services.get_transactions(&filter).await {
        Ok(rows) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "count": rows.len(),
                "transactions": rows,
            })),
        )
            .into_response(),
        Err(e) => errors::ledger_error_response(&e),
    }
}

pub async fn get_low_stock_alerts(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::LowStockQuery>,
) -> axum::response::Response {
    let threshold = query.threshold.unwrap_or_else(|| services.low_stock_threshold());

    match services.get_low_stock_alerts(threshold).await {
        Ok(alerts) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "threshold": threshold,
                "count": alerts.len(),
                "alerts": alerts,
            })),
        )
            .into_response(),
        Err(e) => errors::ledger_error_response(&e),
    }
}

pub async fn get_usage_analytics(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::AnalyticsQuery>,
) -> axum::response::Response {
    let filter = query.into_filter();

    match services.get_usage_analytics(&filter).await {
        Ok(analytics) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "date_from": filter.date_from,
                "date_to": filter.date_to,
                "analytics": analytics,
            })),
        )
            .into_response(),
        Err(e) => errors::ledger_error_response(&e),
    }
}
