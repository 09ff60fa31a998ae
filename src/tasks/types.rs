//! Types for the tasks module.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    #[serde(rename = "Incomplete - Overdue")]
    IncompleteOverdue,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionStep {
    pub text: String,
    pub completed: bool,
}

/// Unit of assignable work. `assignee_id == None` means the task sits in the
/// unclaimed pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub assignee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_id: Option<String>,
    pub due_date: DateTime<Utc>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub action_steps: Vec<ActionStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub assignee_id: Option<String>,
    pub goal_id: Option<String>,
    pub due_date: DateTime<Utc>,
    pub priority: Option<TaskPriority>,
    pub action_steps: Option<Vec<ActionStep>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Nullable: an explicit `null` unlinks the task from its goal.
    #[serde(default, deserialize_with = "crate::shared::patch::clearable")]
    pub goal_id: Option<Option<String>>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub action_steps: Option<Vec<ActionStep>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskFilters {
    pub status: Option<TaskStatus>,
    pub assignee_id: Option<String>,
    pub goal_id: Option<String>,
}
