//! API-side authorization guard.
//!
//! Material store routes require `resources.access`; the check runs before
//! any handler so the ledger stays auth-agnostic.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::Response,
};

use drillstore_auth::{AuthzError, Permission, authorize};

use crate::app::errors;
use crate::context::PrincipalContext;

/// Check that the request principal holds `required`.
pub fn require_permission(principal: &PrincipalContext, required: &Permission) -> Result<(), AuthzError> {
    authorize(&principal.principal(), required)
}

/// Route layer rejecting principals without `resources.access`.
pub async fn require_resources_access(req: Request, next: Next) -> Response {
    let Some(principal) = req.extensions().get::<PrincipalContext>() else {
        return errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "missing principal");
    };

    if let Err(e) = require_permission(principal, &Permission::RESOURCES_ACCESS) {
        tracing::warn!(user_id = %principal.user_id(), error = %e, "material store access denied");
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    next.run(req).await
}
