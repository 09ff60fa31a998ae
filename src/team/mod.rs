pub mod lifecycle;
pub mod types;

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;

use crate::auth::{ensure_admin, set_credential, CurrentUser};
use crate::notify::NotificationKind;
use crate::shared::error::AppError;
use crate::shared::state::AppState;
use crate::store::{collections, from_document, to_document, Document, DocumentStore};

use types::{
    CreateMemberRequest, MemberStatus, TeamMember, TerminateRequest, TerminateResponse,
    UpdateMemberRequest,
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_members).post(create_member))
        .route("/{id}", get(get_member).put(update_member).delete(delete_member))
        .route("/{id}/terminate", post(terminate_member))
        .route("/{id}/reactivate", post(reactivate_member))
}

async fn fetch_member(store: &dyn DocumentStore, id: &str) -> Result<(TeamMember, Document), AppError> {
    let doc = store
        .get(collections::TEAM, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("team member {id}")))?;
    Ok((from_document(doc.clone())?, doc))
}

async fn list_members(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
) -> Result<Json<Vec<TeamMember>>, AppError> {
    let docs = state.store.list(collections::TEAM, &[]).await?;
    let members = docs
        .into_iter()
        .map(from_document)
        .collect::<Result<Vec<TeamMember>, _>>()?;
    Ok(Json(members))
}

async fn get_member(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<TeamMember>, AppError> {
    let (member, _) = fetch_member(state.store.as_ref(), &id).await?;
    Ok(Json(member))
}

async fn create_member(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(payload): Json<CreateMemberRequest>,
) -> Result<Json<TeamMember>, AppError> {
    ensure_admin(&state, &user, "team member creation").await?;

    if state.store.get(collections::TEAM, &payload.id).await?.is_some() {
        return Err(AppError::Validation(format!(
            "team member {} already exists",
            payload.id
        )));
    }

    let member = TeamMember {
        id: payload.id.clone(),
        name: payload.name,
        email: payload.email,
        phone: payload.phone,
        role: payload.role,
        status: MemberStatus::Active,
        is_system_account: payload.is_system_account,
        terminated_date: None,
        terminated_by: None,
        termination_reason: None,
        created_date: Some(Utc::now()),
    };
    let doc = to_document(&member)?;
    state.store.set(collections::TEAM, &member.id, doc.clone()).await?;

    if let Some(ref password) = payload.password {
        set_credential(state.store.as_ref(), &member.id, password).await?;
    }

    state
        .audit
        .log_create(&user.actor(), collections::TEAM, &member.id, &doc, None)
        .await;
    state
        .notifications
        .show(
            NotificationKind::Success,
            "Team member added",
            &format!("{} has joined the team.", member.name),
        )
        .await;

    Ok(Json(member))
}

async fn update_member(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateMemberRequest>,
) -> Result<Json<TeamMember>, AppError> {
    ensure_admin(&state, &user, "team member update").await?;
    let (_, previous) = fetch_member(state.store.as_ref(), &id).await?;

    let mut patch = Document::new();
    if let Some(name) = payload.name {
        patch.insert("name".into(), json!(name));
    }
    if let Some(email) = payload.email {
        patch.insert("email".into(), json!(email));
    }
    if let Some(phone) = payload.phone {
        patch.insert("phone".into(), json!(phone));
    }
    if let Some(role) = payload.role {
        patch.insert("role".into(), json!(role));
    }
    if patch.is_empty() {
        return Err(AppError::Validation("no fields to update".into()));
    }

    state.store.update(collections::TEAM, &id, patch).await?;
    let (member, current) = fetch_member(state.store.as_ref(), &id).await?;

    state
        .audit
        .log_update(&user.actor(), collections::TEAM, &id, &previous, &current, None)
        .await;

    Ok(Json(member))
}

async fn delete_member(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    ensure_admin(&state, &user, "team member deletion").await?;
    let (member, previous) = fetch_member(state.store.as_ref(), &id).await?;

    state.store.delete(collections::TEAM, &id).await?;
    state
        .audit
        .log_delete(&user.actor(), collections::TEAM, &id, &previous, None)
        .await;
    state
        .notifications
        .show(
            NotificationKind::Success,
            "Team member removed",
            &format!("{} was removed from the team.", member.name),
        )
        .await;

    Ok(Json(json!({ "deleted": id })))
}

async fn terminate_member(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<TerminateRequest>,
) -> Result<Json<TerminateResponse>, AppError> {
    ensure_admin(&state, &user, "member termination").await?;
    let (before, previous) = fetch_member(state.store.as_ref(), &id).await?;

    let cascade = match lifecycle::terminate_member(
        state.store.as_ref(),
        &id,
        &user.member.id,
        payload.reason.as_deref(),
    )
    .await
    {
        Ok(cascade) => cascade,
        Err(err) => {
            state
                .notifications
                .show(
                    NotificationKind::Error,
                    "Termination failed",
                    &format!("Could not terminate {}: {err}", before.name),
                )
                .await;
            return Err(err.into());
        }
    };

    let (member, current) = fetch_member(state.store.as_ref(), &id).await?;

    // Best-effort audit trail, outside the cascade's atomic batch.
    state
        .audit
        .log_update(&user.actor(), collections::TEAM, &id, &previous, &current, None)
        .await;
    if cascade.released_count() > 0 {
        state
            .audit
            .log_bulk_operation(
                &user.actor(),
                "unassign_tasks",
                collections::TASKS,
                &cascade.released_task_ids,
                json!({ "terminatedMemberId": id, "terminatedBy": user.member.id }),
                None,
            )
            .await;
    }

    state
        .notifications
        .show(
            NotificationKind::Success,
            "Member terminated",
            &format!(
                "{} has been terminated; {} open task(s) returned to the pool.",
                member.name,
                cascade.released_count()
            ),
        )
        .await;

    Ok(Json(TerminateResponse {
        member,
        released_task_count: cascade.released_count(),
    }))
}

async fn reactivate_member(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<TeamMember>, AppError> {
    ensure_admin(&state, &user, "member reactivation").await?;
    let (_, previous) = fetch_member(state.store.as_ref(), &id).await?;

    lifecycle::reactivate_member(state.store.as_ref(), &id).await?;
    let (member, current) = fetch_member(state.store.as_ref(), &id).await?;

    state
        .audit
        .log_update(&user.actor(), collections::TEAM, &id, &previous, &current, None)
        .await;
    state
        .notifications
        .show(
            NotificationKind::Success,
            "Member reactivated",
            &format!("{} is active again. Their previous tasks remain unassigned.", member.name),
        )
        .await;

    Ok(Json(member))
}
