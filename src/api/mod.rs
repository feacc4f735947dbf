/// API routes and handlers
pub mod agent;
pub mod analytics;
pub mod auth;
pub mod middleware;
pub mod patients;
pub mod sessions;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(auth::routes())
        .merge(patients::routes())
        .merge(sessions::routes())
        .merge(analytics::routes())
        .merge(agent::routes())
}
