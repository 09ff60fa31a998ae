//! In-process toast notifications.
//!
//! The center holds a bounded queue of notifications; each one is removed
//! automatically after its TTL elapses, or earlier by an explicit dismiss.
//! The bound and TTL come from configuration, not hard-coded here.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::shared::error::AppError;
use crate::shared::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

#[derive(Clone)]
pub struct NotificationCenter {
    queue: Arc<RwLock<VecDeque<Notification>>>,
    max_visible: usize,
    ttl: Duration,
}

impl NotificationCenter {
    pub fn new(max_visible: usize, ttl: Duration) -> Self {
        Self {
            queue: Arc::new(RwLock::new(VecDeque::new())),
            max_visible,
            ttl,
        }
    }

    /// Enqueue a toast. When the queue is at capacity the oldest entry is
    /// evicted. The returned id can be used to dismiss early.
    pub async fn show(&self, kind: NotificationKind, title: &str, message: &str) -> String {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            kind,
            title: title.to_string(),
            message: message.to_string(),
            created_at: Utc::now(),
            read: false,
        };
        let id = notification.id.clone();

        {
            let mut queue = self.queue.write().await;
            while queue.len() >= self.max_visible {
                queue.pop_front();
            }
            queue.push_back(notification);
        }

        let center = self.clone();
        let expiring = id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(center.ttl).await;
            center.dismiss(&expiring).await;
        });

        id
    }

    pub async fn list(&self) -> Vec<Notification> {
        self.queue.read().await.iter().cloned().collect()
    }

    /// Remove a notification. Dismissing an already-expired id is a no-op.
    pub async fn dismiss(&self, id: &str) -> bool {
        let mut queue = self.queue.write().await;
        let before = queue.len();
        queue.retain(|n| n.id != id);
        queue.len() != before
    }

    pub async fn mark_read(&self, id: &str) -> bool {
        let mut queue = self.queue.write().await;
        match queue.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.read = true;
                true
            }
            None => false,
        }
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/{id}/dismiss", post(dismiss_notification))
        .route("/{id}/read", post(read_notification))
}

async fn list_notifications(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
) -> Json<Vec<Notification>> {
    Json(state.notifications.list().await)
}

async fn dismiss_notification(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state.notifications.dismiss(&id).await {
        return Err(AppError::NotFound(format!("notification {id}")));
    }
    Ok(Json(json!({ "dismissed": id })))
}

async fn read_notification(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state.notifications.mark_read(&id).await {
        return Err(AppError::NotFound(format!("notification {id}")));
    }
    Ok(Json(json!({ "read": id })))
}
