use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use serde_json::json;

use drillstore_infra::service::ALL_TRANSFERS_FAILED;
use drillstore_ledger::{LedgerError, OperationResult};

/// HTTP status for a ledger `error_code`.
pub fn status_for_code(code: &str) -> StatusCode {
    match code {
        "invalid_quantity" | "invalid_request" | "overflow" => StatusCode::BAD_REQUEST,
        "material_not_found" => StatusCode::NOT_FOUND,
        "conflict" => StatusCode::CONFLICT,
        "insufficient_stock" | "material_not_available" => StatusCode::UNPROCESSABLE_ENTITY,
        ALL_TRANSFERS_FAILED => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Render a mutation result: 200 on success, the mapped status otherwise.
pub fn operation_response<T: Serialize>(result: OperationResult<T>) -> axum::response::Response {
    let status = match result.error_code {
        Some(code) if !result.success => status_for_code(code),
        _ => StatusCode::OK,
    };
    (status, axum::Json(result)).into_response()
}

pub fn ledger_error_response(err: &LedgerError) -> axum::response::Response {
    json_error(status_for_code(err.code()), err.code(), err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": message.into(),
            "error_code": code,
        })),
    )
        .into_response()
}
