pub mod types;

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::notify::NotificationKind;
use crate::shared::error::AppError;
use crate::shared::state::AppState;
use crate::store::{collections, from_document, to_document, Document, DocumentStore, Filter};
use crate::team::types::MemberStatus;

use types::{CreateTaskRequest, Task, TaskFilters, TaskPriority, TaskStatus, UpdateTaskRequest};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/{id}", get(get_task).put(update_task).delete(delete_task))
        .route("/{id}/claim", post(claim_task))
        .route("/{id}/unclaim", post(unclaim_task))
}

async fn fetch_task(store: &dyn DocumentStore, id: &str) -> Result<(Task, Document), AppError> {
    let doc = store
        .get(collections::TASKS, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("task {id}")))?;
    Ok((from_document(doc.clone())?, doc))
}

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Query(filters): Query<TaskFilters>,
) -> Result<Json<Vec<Task>>, AppError> {
    let mut store_filters = Vec::new();
    if let Some(status) = filters.status {
        store_filters.push(Filter::eq("status", json!(status)));
    }
    if let Some(ref assignee_id) = filters.assignee_id {
        store_filters.push(Filter::eq("assigneeId", json!(assignee_id)));
    }
    if let Some(ref goal_id) = filters.goal_id {
        store_filters.push(Filter::eq("goalId", json!(goal_id)));
    }

    let docs = state.store.list(collections::TASKS, &store_filters).await?;
    let mut tasks = docs
        .into_iter()
        .map(from_document)
        .collect::<Result<Vec<Task>, _>>()?;
    tasks.sort_by(|a, b| a.due_date.cmp(&b.due_date));
    Ok(Json(tasks))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Task>, AppError> {
    let (task, _) = fetch_task(state.store.as_ref(), &id).await?;
    Ok(Json(task))
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<Json<Task>, AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::Validation("task title is required".into()));
    }

    let task = Task {
        id: Uuid::new_v4().to_string(),
        title: payload.title,
        description: payload.description.unwrap_or_default(),
        assignee_id: payload.assignee_id,
        goal_id: payload.goal_id,
        due_date: payload.due_date,
        status: TaskStatus::NotStarted,
        priority: payload.priority.unwrap_or(TaskPriority::Medium),
        action_steps: payload.action_steps.unwrap_or_default(),
        completed_by: None,
        completed_date: None,
        created_date: Some(Utc::now()),
    };

    let doc = to_document(&task)?;
    state.store.set(collections::TASKS, &task.id, doc.clone()).await?;

    state
        .audit
        .log_create(&user.actor(), collections::TASKS, &task.id, &doc, None)
        .await;
    state
        .notifications
        .show(
            NotificationKind::Success,
            "Task created",
            &format!("\"{}\" was created.", task.title),
        )
        .await;

    Ok(Json(task))
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, AppError> {
    let (before, previous) = fetch_task(state.store.as_ref(), &id).await?;

    let mut patch = Document::new();
    if let Some(title) = payload.title {
        patch.insert("title".into(), json!(title));
    }
    if let Some(description) = payload.description {
        patch.insert("description".into(), json!(description));
    }
    if let Some(goal_id) = payload.goal_id {
        patch.insert("goalId".into(), json!(goal_id));
    }
    if let Some(due_date) = payload.due_date {
        patch.insert("dueDate".into(), json!(due_date));
    }
    if let Some(priority) = payload.priority {
        patch.insert("priority".into(), json!(priority));
    }
    if let Some(action_steps) = payload.action_steps {
        patch.insert("actionSteps".into(), json!(action_steps));
    }
    if let Some(status) = payload.status {
        patch.insert("status".into(), json!(status));
        // Completion stamping: entering Completed records who and when,
        // leaving it clears both.
        if status == TaskStatus::Completed && before.status != TaskStatus::Completed {
            patch.insert("completedBy".into(), json!(user.member.id));
            patch.insert("completedDate".into(), json!(Utc::now()));
        } else if status != TaskStatus::Completed && before.status == TaskStatus::Completed {
            patch.insert("completedBy".into(), Value::Null);
            patch.insert("completedDate".into(), Value::Null);
        }
    }
    if patch.is_empty() {
        return Err(AppError::Validation("no fields to update".into()));
    }

    if let Err(err) = state.store.update(collections::TASKS, &id, patch).await {
        state
            .notifications
            .show(
                NotificationKind::Error,
                "Task update failed",
                &format!("Could not update \"{}\": {err}", before.title),
            )
            .await;
        return Err(err.into());
    }
    let (task, current) = fetch_task(state.store.as_ref(), &id).await?;

    state
        .audit
        .log_update(&user.actor(), collections::TASKS, &id, &previous, &current, None)
        .await;
    state
        .notifications
        .show(
            NotificationKind::Success,
            "Task updated",
            &format!("\"{}\" was updated.", task.title),
        )
        .await;

    Ok(Json(task))
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (task, previous) = fetch_task(state.store.as_ref(), &id).await?;

    state.store.delete(collections::TASKS, &id).await?;
    state
        .audit
        .log_delete(&user.actor(), collections::TASKS, &id, &previous, None)
        .await;
    state
        .notifications
        .show(
            NotificationKind::Success,
            "Task deleted",
            &format!("\"{}\" was deleted.", task.title),
        )
        .await;

    Ok(Json(json!({ "deleted": id })))
}

/// Claim an unassigned task. Membership status is checked at claim time only;
/// a later termination is handled by the cascade, not here.
async fn claim_task(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Task>, AppError> {
    if user.member.status != MemberStatus::Active {
        return Err(AppError::Forbidden(
            "only active members can claim tasks".into(),
        ));
    }
    let (before, previous) = fetch_task(state.store.as_ref(), &id).await?;
    if let Some(owner) = before.assignee_id {
        return Err(AppError::Validation(format!(
            "task is already claimed by {owner}"
        )));
    }

    let mut patch = Document::new();
    patch.insert("assigneeId".into(), json!(user.member.id));
    state.store.update(collections::TASKS, &id, patch).await?;
    let (task, current) = fetch_task(state.store.as_ref(), &id).await?;

    state
        .audit
        .log_update(&user.actor(), collections::TASKS, &id, &previous, &current, None)
        .await;
    Ok(Json(task))
}

async fn unclaim_task(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Task>, AppError> {
    let (before, previous) = fetch_task(state.store.as_ref(), &id).await?;
    let owner = before
        .assignee_id
        .ok_or_else(|| AppError::Validation("task is not claimed".into()))?;
    if owner != user.member.id && !user.is_admin() {
        return Err(AppError::Forbidden(
            "only the assignee or an Admin can unclaim a task".into(),
        ));
    }

    let mut patch = Document::new();
    patch.insert("assigneeId".into(), Value::Null);
    state.store.update(collections::TASKS, &id, patch).await?;
    let (task, current) = fetch_task(state.store.as_ref(), &id).await?;

    state
        .audit
        .log_update(&user.actor(), collections::TASKS, &id, &previous, &current, None)
        .await;
    Ok(Json(task))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_with_display_labels() {
        assert_eq!(
            serde_json::to_value(TaskStatus::NotStarted).expect("serialize"),
            json!("Not Started")
        );
        assert_eq!(
            serde_json::to_value(TaskStatus::IncompleteOverdue).expect("serialize"),
            json!("Incomplete - Overdue")
        );
    }

    #[test]
    fn update_request_distinguishes_clearing_from_omitting_goal() {
        let req: UpdateTaskRequest =
            serde_json::from_value(json!({ "goalId": null })).expect("null");
        assert_eq!(req.goal_id, Some(None));

        let req: UpdateTaskRequest =
            serde_json::from_value(json!({ "title": "t" })).expect("absent");
        assert_eq!(req.goal_id, None);

        let req: UpdateTaskRequest =
            serde_json::from_value(json!({ "goalId": "g1" })).expect("value");
        assert_eq!(req.goal_id, Some(Some("g1".to_string())));
    }

    #[test]
    fn task_document_uses_camel_case_fields() {
        let task = Task {
            id: "t1".into(),
            title: "Call patient".into(),
            description: String::new(),
            assignee_id: None,
            goal_id: None,
            due_date: Utc::now(),
            status: TaskStatus::NotStarted,
            priority: TaskPriority::Medium,
            action_steps: vec![],
            completed_by: None,
            completed_date: None,
            created_date: None,
        };
        let doc = to_document(&task).expect("doc");
        assert!(doc.contains_key("assigneeId"));
        assert!(doc.contains_key("dueDate"));
        assert!(doc.contains_key("actionSteps"));
    }
}
