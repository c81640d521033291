use axum::{routing::get, Router};

pub mod material_store;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/material-store", material_store::router())
}
