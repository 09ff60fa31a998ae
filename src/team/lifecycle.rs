//! Member termination cascade and reactivation.
//!
//! Terminating a member must never leave "terminated but tasks still assigned"
//! observable, so the member status flip and every open-task release go into
//! one atomic batch. The audit record for the cascade is written separately by
//! the caller and is deliberately *not* part of that batch.

use chrono::Utc;
use serde_json::{json, Value};

use crate::store::{collections, document_id, BatchWrite, Document, DocumentStore, Filter, StoreError};

/// Outcome of a termination cascade.
#[derive(Debug, Clone)]
pub struct CascadeResult {
    pub released_task_ids: Vec<String>,
}

impl CascadeResult {
    pub fn released_count(&self) -> usize {
        self.released_task_ids.len()
    }
}

/// Flip `member_id` to terminated and release every task still assigned to
/// them (any status other than Completed): `assigneeId := null`,
/// `status := "Not Started"`.
///
/// Authorization is the caller's responsibility; the cascade performs no role
/// check itself. On batch failure the error propagates and nothing is applied,
/// so re-invoking after a failure finds the same still-assigned tasks.
pub async fn terminate_member(
    store: &dyn DocumentStore,
    member_id: &str,
    terminated_by: &str,
    reason: Option<&str>,
) -> Result<CascadeResult, StoreError> {
    let open_tasks = store
        .list(
            collections::TASKS,
            &[
                Filter::eq("assigneeId", json!(member_id)),
                Filter::ne("status", json!("Completed")),
            ],
        )
        .await?;

    let mut member_patch = Document::new();
    member_patch.insert("status".into(), json!("terminated"));
    member_patch.insert("terminatedDate".into(), json!(Utc::now()));
    member_patch.insert("terminatedBy".into(), json!(terminated_by));
    if let Some(reason) = reason {
        member_patch.insert("terminationReason".into(), json!(reason));
    }

    if open_tasks.is_empty() {
        store
            .update(collections::TEAM, member_id, member_patch)
            .await?;
        return Ok(CascadeResult {
            released_task_ids: Vec::new(),
        });
    }

    let mut released_task_ids = Vec::with_capacity(open_tasks.len());
    let mut writes = vec![BatchWrite::new(collections::TEAM, member_id, member_patch)];
    for task in &open_tasks {
        let task_id = document_id(task)?.to_string();
        let mut release = Document::new();
        release.insert("assigneeId".into(), Value::Null);
        release.insert("status".into(), json!("Not Started"));
        writes.push(BatchWrite::new(collections::TASKS, task_id.clone(), release));
        released_task_ids.push(task_id);
    }

    store.atomic_batch(writes).await?;
    Ok(CascadeResult { released_task_ids })
}

/// Reactivation is a single status update with no cascade: released tasks stay
/// in the open pool and must be reclaimed individually. Stale termination
/// metadata (`terminatedDate`, `terminatedBy`, `terminationReason`) is left on
/// the record as history.
pub async fn reactivate_member(
    store: &dyn DocumentStore,
    member_id: &str,
) -> Result<(), StoreError> {
    let mut patch = Document::new();
    patch.insert("status".into(), json!("active"));
    store.update(collections::TEAM, member_id, patch).await
}
