//! Shared calendar events, optionally linked to a task or goal.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::shared::error::AppError;
use crate::shared::state::AppState;
use crate::store::{collections, from_document, to_document, Document, DocumentStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: Option<bool>,
    pub task_id: Option<String>,
    pub goal_id: Option<String>,
    pub assignee_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub all_day: Option<bool>,
    /// Nullable: an explicit `null` unassigns the event.
    #[serde(default, deserialize_with = "crate::shared::patch::clearable")]
    pub assignee_id: Option<Option<String>>,
}

/// Optional window narrowing for event listings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_events).post(create_event))
        .route("/{id}", get(get_event).put(update_event).delete(delete_event))
}

async fn fetch_event(
    store: &dyn DocumentStore,
    id: &str,
) -> Result<(CalendarEvent, Document), AppError> {
    let doc = store
        .get(collections::CALENDAR_EVENTS, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("calendar event {id}")))?;
    Ok((from_document(doc.clone())?, doc))
}

async fn list_events(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Query(window): Query<EventWindow>,
) -> Result<Json<Vec<CalendarEvent>>, AppError> {
    let docs = state.store.list(collections::CALENDAR_EVENTS, &[]).await?;
    let mut events = docs
        .into_iter()
        .map(from_document)
        .collect::<Result<Vec<CalendarEvent>, _>>()?;
    if let Some(from) = window.from {
        events.retain(|e| e.end >= from);
    }
    if let Some(to) = window.to {
        events.retain(|e| e.start <= to);
    }
    events.sort_by(|a, b| a.start.cmp(&b.start));
    Ok(Json(events))
}

async fn get_event(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<CalendarEvent>, AppError> {
    let (event, _) = fetch_event(state.store.as_ref(), &id).await?;
    Ok(Json(event))
}

async fn create_event(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(payload): Json<CreateEventRequest>,
) -> Result<Json<CalendarEvent>, AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::Validation("event title is required".into()));
    }
    if payload.end < payload.start {
        return Err(AppError::Validation("event cannot end before it starts".into()));
    }

    let event = CalendarEvent {
        id: Uuid::new_v4().to_string(),
        title: payload.title,
        description: payload.description.unwrap_or_default(),
        start: payload.start,
        end: payload.end,
        all_day: payload.all_day.unwrap_or(false),
        task_id: payload.task_id,
        goal_id: payload.goal_id,
        assignee_id: payload.assignee_id,
    };
    let doc = to_document(&event)?;
    state
        .store
        .set(collections::CALENDAR_EVENTS, &event.id, doc.clone())
        .await?;

    state
        .audit
        .log_create(&user.actor(), collections::CALENDAR_EVENTS, &event.id, &doc, None)
        .await;

    Ok(Json(event))
}

async fn update_event(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateEventRequest>,
) -> Result<Json<CalendarEvent>, AppError> {
    let (before, previous) = fetch_event(state.store.as_ref(), &id).await?;

    let start = payload.start.unwrap_or(before.start);
    let end = payload.end.unwrap_or(before.end);
    if end < start {
        return Err(AppError::Validation("event cannot end before it starts".into()));
    }

    let mut patch = Document::new();
    if let Some(title) = payload.title {
        patch.insert("title".into(), json!(title));
    }
    if let Some(description) = payload.description {
        patch.insert("description".into(), json!(description));
    }
    if let Some(start) = payload.start {
        patch.insert("start".into(), json!(start));
    }
    if let Some(end) = payload.end {
        patch.insert("end".into(), json!(end));
    }
    if let Some(all_day) = payload.all_day {
        patch.insert("allDay".into(), json!(all_day));
    }
    if let Some(assignee_id) = payload.assignee_id {
        patch.insert("assigneeId".into(), json!(assignee_id));
    }
    if patch.is_empty() {
        return Err(AppError::Validation("no fields to update".into()));
    }

    state.store.update(collections::CALENDAR_EVENTS, &id, patch).await?;
    let (event, current) = fetch_event(state.store.as_ref(), &id).await?;

    state
        .audit
        .log_update(&user.actor(), collections::CALENDAR_EVENTS, &id, &previous, &current, None)
        .await;

    Ok(Json(event))
}

async fn delete_event(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (_, previous) = fetch_event(state.store.as_ref(), &id).await?;

    state.store.delete(collections::CALENDAR_EVENTS, &id).await?;
    state
        .audit
        .log_delete(&user.actor(), collections::CALENDAR_EVENTS, &id, &previous, None)
        .await;

    Ok(Json(json!({ "deleted": id })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_with_camel_case_and_defaults() {
        let event: CalendarEvent = serde_json::from_value(json!({
            "id": "e1",
            "title": "Standup",
            "start": "2026-03-02T15:00:00Z",
            "end": "2026-03-02T15:15:00Z"
        }))
        .expect("deserialize");
        assert!(!event.all_day);
        assert_eq!(event.description, "");

        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["allDay"], json!(false));
        assert!(value.get("taskId").is_none());
    }
}
