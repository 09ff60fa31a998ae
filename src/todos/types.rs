//! Types for the to-do queue and the list/item checklists.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Work category a queue entry belongs to. Stored with snake_case labels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToDoCategory {
    ConsultReport,
    CarePlanInitial,
    ChartReview,
    ReturnCall,
    PatientEngagement,
    NewLeadFollowUp,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToDoStatus {
    Pending,
    InProgress,
    Completed,
}

/// Entry in the unified work queue, independent of the task board.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToDo {
    pub id: String,
    pub title: String,
    pub category: ToDoCategory,
    pub status: ToDoStatus,
    pub assignee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Personal,
    Shared,
    Department,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ListSettings {
    pub color: Option<String>,
    pub show_completed: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ItemPriority {
    Low,
    Medium,
    High,
}

/// A named checklist. `shared_with` is only meaningful for shared lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToDoList {
    pub id: String,
    pub name: String,
    pub kind: ListKind,
    pub owner_id: String,
    #[serde(default)]
    pub shared_with: Vec<String>,
    #[serde(default)]
    pub settings: ListSettings,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub archived: bool,
    pub created_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToDoItem {
    pub id: String,
    pub list_id: String,
    pub text: String,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<ItemPriority>,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub created_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateToDoRequest {
    pub title: String,
    pub category: ToDoCategory,
    pub assignee_id: Option<String>,
    pub patient_id: Option<String>,
    pub patient_name: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateToDoRequest {
    pub title: Option<String>,
    pub category: Option<ToDoCategory>,
    pub status: Option<ToDoStatus>,
    /// Nullable fields: an explicit `null` clears them.
    #[serde(default, deserialize_with = "crate::shared::patch::clearable")]
    pub assignee_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::shared::patch::clearable")]
    pub patient_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::shared::patch::clearable")]
    pub patient_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::shared::patch::clearable")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListRequest {
    pub name: String,
    pub kind: ListKind,
    pub shared_with: Option<Vec<String>>,
    pub settings: Option<ListSettings>,
    pub order: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateListRequest {
    pub name: Option<String>,
    pub shared_with: Option<Vec<String>>,
    pub settings: Option<ListSettings>,
    pub order: Option<i64>,
    pub archived: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub text: String,
    pub priority: Option<ItemPriority>,
    pub order: Option<i64>,
    pub tags: Option<Vec<String>>,
    pub assigned_to: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    pub text: Option<String>,
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "crate::shared::patch::clearable")]
    pub priority: Option<Option<ItemPriority>>,
    pub order: Option<i64>,
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "crate::shared::patch::clearable")]
    pub assigned_to: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::shared::patch::clearable")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToDoFilters {
    pub category: Option<ToDoCategory>,
    pub status: Option<ToDoStatus>,
    pub assignee_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn categories_use_snake_case_labels() {
        assert_eq!(
            serde_json::to_value(ToDoCategory::NewLeadFollowUp).expect("serialize"),
            json!("new_lead_follow_up")
        );
        assert_eq!(
            serde_json::to_value(ToDoCategory::ConsultReport).expect("serialize"),
            json!("consult_report")
        );
        assert_eq!(
            serde_json::to_value(ToDoStatus::InProgress).expect("serialize"),
            json!("in_progress")
        );
    }

    #[test]
    fn list_settings_default_when_absent() {
        let list: ToDoList = serde_json::from_value(json!({
            "id": "l1",
            "name": "Front desk",
            "kind": "department",
            "ownerId": "u1",
            "createdDate": "2026-01-10T00:00:00Z"
        }))
        .expect("deserialize");
        assert!(list.shared_with.is_empty());
        assert_eq!(list.settings, ListSettings::default());
        assert_eq!(list.order, 0);
        assert!(!list.archived);
    }
}
