/// API routes and handlers
pub mod admin;
pub mod entities;
pub mod health;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(entities::routes())
        .merge(admin::routes())
}
