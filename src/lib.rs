pub mod audit;
pub mod auth;
pub mod calendar;
pub mod goals;
pub mod notify;
pub mod shared;
pub mod store;
pub mod tasks;
pub mod team;
pub mod todos;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use shared::state::AppState;

/// Assemble the full API surface over a prepared application state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api/auth", auth::router())
        .nest("/api/team", team::router())
        .nest("/api/tasks", tasks::router())
        .nest("/api/goals", goals::router())
        .nest("/api/todos", todos::router())
        .nest("/api/calendar", calendar::router())
        .nest("/api/audit", audit::routes::router())
        .nest("/api/notifications", notify::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
