//! Admin-only HTTP surface for browsing and exporting the audit trail.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::auth::{ensure_admin, CurrentUser};
use crate::shared::error::AppError;
use crate::shared::state::AppState;

use super::export;
use super::query::{self, AuditFilter, AuditPage, AuditStats};
use super::AuditAction;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditListParams {
    pub action: Option<AuditAction>,
    pub collection: Option<String>,
    pub user_id: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

impl AuditListParams {
    fn filter(&self) -> AuditFilter {
        AuditFilter {
            action: self.action,
            collection: self.collection.clone(),
            user_id: self.user_id.clone(),
            start: self.start,
            end: self.end,
            search: self.search.clone(),
        }
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_audit_logs))
        .route("/stats", get(audit_stats))
        .route("/export", get(export_audit_logs))
}

async fn list_audit_logs(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(params): Query<AuditListParams>,
) -> Result<Json<AuditPage>, AppError> {
    ensure_admin(&state, &user, "audit log access").await?;

    let entries = query::query(state.store.as_ref(), &params.filter()).await?;
    let page = query::paginate(
        entries,
        params.page.unwrap_or(1),
        params.per_page.unwrap_or(50),
    );
    Ok(Json(page))
}

async fn audit_stats(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<AuditStats>, AppError> {
    ensure_admin(&state, &user, "audit statistics").await?;

    let entries = query::query(state.store.as_ref(), &AuditFilter::default()).await?;
    Ok(Json(query::stats(&entries)))
}

/// CSV download of the (filtered) audit trail.
async fn export_audit_logs(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(params): Query<AuditListParams>,
) -> Result<impl IntoResponse, AppError> {
    ensure_admin(&state, &user, "audit log export").await?;

    let entries = query::query(state.store.as_ref(), &params.filter()).await?;
    let csv = export::to_csv(&entries)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"audit-logs.csv\"",
            ),
        ],
        csv,
    ))
}
