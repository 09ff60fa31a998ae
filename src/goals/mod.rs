pub mod health;

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::notify::NotificationKind;
use crate::shared::error::AppError;
use crate::shared::state::AppState;
use crate::store::{collections, from_document, to_document, Document, DocumentStore};

use health::{classify, expected_progress, GoalHealth};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    Weekly,
    Monthly,
    Quarterly,
    #[serde(rename = "bi-annual")]
    BiAnnual,
    Yearly,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Active,
    Completed,
    Paused,
    Cancelled,
}

/// Longer-horizon objective that tasks can link to via `goalId`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub goal_type: GoalType,
    pub status: GoalStatus,
    /// Recorded completion, 0..=100.
    pub progress: i64,
    pub created_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A goal plus the derived fields the client renders next to it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalView {
    #[serde(flatten)]
    pub goal: Goal,
    pub expected_progress: i64,
    pub health: GoalHealth,
}

impl GoalView {
    fn now(goal: Goal) -> Self {
        let now = Utc::now();
        let expected = expected_progress(goal.created_date, goal.target_date, now);
        let health = classify(goal.progress, goal.created_date, goal.target_date, now);
        Self {
            goal,
            expected_progress: expected,
            health,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGoalRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub goal_type: GoalType,
    pub target_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGoalRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub goal_type: Option<GoalType>,
    pub status: Option<GoalStatus>,
    pub progress: Option<i64>,
    /// Nullable: an explicit `null` removes the target date.
    #[serde(default, deserialize_with = "crate::shared::patch::clearable")]
    pub target_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "crate::shared::patch::clearable")]
    pub notes: Option<Option<String>>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_goals).post(create_goal))
        .route("/{id}", get(get_goal).put(update_goal).delete(delete_goal))
}

async fn fetch_goal(store: &dyn DocumentStore, id: &str) -> Result<(Goal, Document), AppError> {
    let doc = store
        .get(collections::GOALS, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("goal {id}")))?;
    Ok((from_document(doc.clone())?, doc))
}

async fn list_goals(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
) -> Result<Json<Vec<GoalView>>, AppError> {
    let docs = state.store.list(collections::GOALS, &[]).await?;
    let mut goals = docs
        .into_iter()
        .map(from_document)
        .collect::<Result<Vec<Goal>, _>>()?;
    goals.sort_by(|a, b| a.target_date.cmp(&b.target_date));
    Ok(Json(goals.into_iter().map(GoalView::now).collect()))
}

async fn get_goal(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<GoalView>, AppError> {
    let (goal, _) = fetch_goal(state.store.as_ref(), &id).await?;
    Ok(Json(GoalView::now(goal)))
}

async fn create_goal(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(payload): Json<CreateGoalRequest>,
) -> Result<Json<GoalView>, AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::Validation("goal title is required".into()));
    }

    let goal = Goal {
        id: Uuid::new_v4().to_string(),
        title: payload.title,
        description: payload.description.unwrap_or_default(),
        goal_type: payload.goal_type,
        status: GoalStatus::Active,
        progress: 0,
        created_date: Utc::now(),
        target_date: payload.target_date,
        notes: payload.notes,
    };
    let doc = to_document(&goal)?;
    state.store.set(collections::GOALS, &goal.id, doc.clone()).await?;

    state
        .audit
        .log_create(&user.actor(), collections::GOALS, &goal.id, &doc, None)
        .await;
    state
        .notifications
        .show(
            NotificationKind::Success,
            "Goal created",
            &format!("\"{}\" was created.", goal.title),
        )
        .await;

    Ok(Json(GoalView::now(goal)))
}

async fn update_goal(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateGoalRequest>,
) -> Result<Json<GoalView>, AppError> {
    let (_, previous) = fetch_goal(state.store.as_ref(), &id).await?;

    let mut patch = Document::new();
    if let Some(title) = payload.title {
        patch.insert("title".into(), json!(title));
    }
    if let Some(description) = payload.description {
        patch.insert("description".into(), json!(description));
    }
    if let Some(progress) = payload.progress {
        if !(0..=100).contains(&progress) {
            return Err(AppError::Validation(
                "progress must be between 0 and 100".into(),
            ));
        }
        patch.insert("progress".into(), json!(progress));
    }
    if let Some(goal_type) = payload.goal_type {
        patch.insert("type".into(), json!(goal_type));
    }
    if let Some(status) = payload.status {
        patch.insert("status".into(), json!(status));
    }
    if let Some(target_date) = payload.target_date {
        patch.insert("targetDate".into(), json!(target_date));
    }
    if let Some(notes) = payload.notes {
        patch.insert("notes".into(), json!(notes));
    }
    if patch.is_empty() {
        return Err(AppError::Validation("no fields to update".into()));
    }

    state.store.update(collections::GOALS, &id, patch).await?;
    let (goal, current) = fetch_goal(state.store.as_ref(), &id).await?;

    state
        .audit
        .log_update(&user.actor(), collections::GOALS, &id, &previous, &current, None)
        .await;

    Ok(Json(GoalView::now(goal)))
}

async fn delete_goal(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (goal, previous) = fetch_goal(state.store.as_ref(), &id).await?;

    state.store.delete(collections::GOALS, &id).await?;
    state
        .audit
        .log_delete(&user.actor(), collections::GOALS, &id, &previous, None)
        .await;
    state
        .notifications
        .show(
            NotificationKind::Success,
            "Goal deleted",
            &format!("\"{}\" was deleted.", goal.title),
        )
        .await;

    Ok(Json(json!({ "deleted": id })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goal_view_flattens_and_annotates() {
        let goal = Goal {
            id: "g1".into(),
            title: "Grow referrals".into(),
            description: String::new(),
            goal_type: GoalType::Quarterly,
            status: GoalStatus::Active,
            progress: 40,
            created_date: Utc::now() - chrono::Duration::days(50),
            target_date: Some(Utc::now() + chrono::Duration::days(50)),
            notes: None,
        };
        let view = GoalView::now(goal);
        let value = serde_json::to_value(&view).expect("serialize");
        assert_eq!(value["title"], json!("Grow referrals"));
        assert_eq!(value["type"], json!("quarterly"));
        assert_eq!(value["status"], json!("active"));
        assert_eq!(value["expectedProgress"], json!(50));
        assert_eq!(value["health"], json!("At Risk"));
    }

    #[test]
    fn explicit_null_clears_nullable_goal_fields() {
        let req: UpdateGoalRequest =
            serde_json::from_value(json!({ "targetDate": null, "notes": null }))
                .expect("deserialize");
        assert_eq!(req.target_date, Some(None));
        assert_eq!(req.notes, Some(None));

        // Omitted fields stay untouched.
        let req: UpdateGoalRequest =
            serde_json::from_value(json!({ "progress": 10 })).expect("deserialize");
        assert_eq!(req.target_date, None);
        assert_eq!(req.notes, None);
    }

    #[test]
    fn goal_type_labels() {
        assert_eq!(
            serde_json::to_value(GoalType::BiAnnual).expect("serialize"),
            json!("bi-annual")
        );
        assert_eq!(
            serde_json::to_value(GoalType::Weekly).expect("serialize"),
            json!("weekly")
        );
    }
}
