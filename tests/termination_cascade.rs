//! End-to-end behavior of member termination and reactivation against the
//! in-memory store.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use teamdesk::store::{
    collections, from_document, to_document, BatchWrite, Document, DocumentStore, Filter,
    MemoryStore, StoreError,
};
use teamdesk::tasks::types::{Task, TaskPriority, TaskStatus};
use teamdesk::team::lifecycle::{reactivate_member, terminate_member};
use teamdesk::team::types::{MemberStatus, Role, TeamMember};

fn member(id: &str) -> TeamMember {
    TeamMember {
        id: id.into(),
        name: "Dana".into(),
        email: format!("{id}@example.com"),
        phone: None,
        role: Role::Staff,
        status: MemberStatus::Active,
        is_system_account: None,
        terminated_date: None,
        terminated_by: None,
        termination_reason: None,
        created_date: None,
    }
}

fn task(id: &str, assignee: Option<&str>, status: TaskStatus) -> Task {
    Task {
        id: id.into(),
        title: format!("task {id}"),
        description: String::new(),
        assignee_id: assignee.map(str::to_string),
        goal_id: None,
        due_date: chrono::Utc::now(),
        status,
        priority: TaskPriority::Medium,
        action_steps: vec![],
        completed_by: None,
        completed_date: None,
        created_date: None,
    }
}

async fn seed(store: &MemoryStore) {
    store
        .set(collections::TEAM, "u1", to_document(&member("u1")).unwrap())
        .await
        .unwrap();
    for t in [
        task("t1", Some("u1"), TaskStatus::NotStarted),
        task("t2", Some("u1"), TaskStatus::InProgress),
        task("t3", Some("u1"), TaskStatus::Completed),
        task("t4", Some("u2"), TaskStatus::InProgress),
        task("t5", None, TaskStatus::NotStarted),
    ] {
        store
            .set(collections::TASKS, &t.id, to_document(&t).unwrap())
            .await
            .unwrap();
    }
}

async fn load_task(store: &dyn DocumentStore, id: &str) -> Task {
    from_document(store.get(collections::TASKS, id).await.unwrap().unwrap()).unwrap()
}

async fn load_member(store: &dyn DocumentStore, id: &str) -> TeamMember {
    from_document(store.get(collections::TEAM, id).await.unwrap().unwrap()).unwrap()
}

#[tokio::test]
async fn cascade_releases_exactly_the_open_tasks() {
    let store = MemoryStore::new();
    seed(&store).await;

    let result = terminate_member(&store, "u1", "admin-1", Some("policy violation"))
        .await
        .expect("terminate");

    let mut released = result.released_task_ids.clone();
    released.sort();
    assert_eq!(released, vec!["t1".to_string(), "t2".to_string()]);
    assert_eq!(result.released_count(), 2);

    // Released tasks go back to the pool with a reset status.
    for id in ["t1", "t2"] {
        let task = load_task(&store, id).await;
        assert_eq!(task.assignee_id, None);
        assert_eq!(task.status, TaskStatus::NotStarted);
    }

    // The completed task keeps its assignee and status.
    let t3 = load_task(&store, "t3").await;
    assert_eq!(t3.assignee_id.as_deref(), Some("u1"));
    assert_eq!(t3.status, TaskStatus::Completed);

    // Other members' tasks and the unassigned pool are untouched.
    let t4 = load_task(&store, "t4").await;
    assert_eq!(t4.assignee_id.as_deref(), Some("u2"));
    let t5 = load_task(&store, "t5").await;
    assert_eq!(t5.assignee_id, None);

    let u1 = load_member(&store, "u1").await;
    assert_eq!(u1.status, MemberStatus::Terminated);
    assert_eq!(u1.terminated_by.as_deref(), Some("admin-1"));
    assert_eq!(u1.termination_reason.as_deref(), Some("policy violation"));
    assert!(u1.terminated_date.is_some());
}

#[tokio::test]
async fn termination_without_open_tasks_still_flips_status() {
    let store = MemoryStore::new();
    store
        .set(collections::TEAM, "u1", to_document(&member("u1")).unwrap())
        .await
        .unwrap();
    let t = task("t1", Some("u1"), TaskStatus::Completed);
    store
        .set(collections::TASKS, "t1", to_document(&t).unwrap())
        .await
        .unwrap();

    let result = terminate_member(&store, "u1", "admin-1", None)
        .await
        .expect("terminate");
    assert_eq!(result.released_count(), 0);

    let u1 = load_member(&store, "u1").await;
    assert_eq!(u1.status, MemberStatus::Terminated);
    assert_eq!(u1.termination_reason, None);
}

/// Delegates everything to an inner store but refuses atomic batches,
/// simulating a backend outage at commit time.
struct BatchFailingStore {
    inner: MemoryStore,
}

#[async_trait]
impl DocumentStore for BatchFailingStore {
    async fn list(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, StoreError> {
        self.inner.list(collection, filters).await
    }
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get(collection, id).await
    }
    async fn add(&self, collection: &str, data: Document) -> Result<String, StoreError> {
        self.inner.add(collection, data).await
    }
    async fn set(&self, collection: &str, id: &str, data: Document) -> Result<(), StoreError> {
        self.inner.set(collection, id, data).await
    }
    async fn update(&self, collection: &str, id: &str, partial: Document) -> Result<(), StoreError> {
        self.inner.update(collection, id, partial).await
    }
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.inner.delete(collection, id).await
    }
    async fn atomic_batch(&self, _writes: Vec<BatchWrite>) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("batch commit refused".into()))
    }
    fn subscribe(&self, collection: &str) -> broadcast::Receiver<Vec<Document>> {
        self.inner.subscribe(collection)
    }
}

#[tokio::test]
async fn failed_batch_leaves_everything_assigned() {
    let store = BatchFailingStore {
        inner: MemoryStore::new(),
    };
    seed(&store.inner).await;

    let err = terminate_member(&store, "u1", "admin-1", None)
        .await
        .expect_err("batch must fail");
    assert!(matches!(err, StoreError::Unavailable(_)));

    // Nothing was applied: the member is still active and keeps every task.
    let u1 = load_member(&store, "u1").await;
    assert_eq!(u1.status, MemberStatus::Active);
    for id in ["t1", "t2"] {
        let task = load_task(&store, id).await;
        assert_eq!(task.assignee_id.as_deref(), Some("u1"));
    }

    // A retry against a healthy store finds the same open set.
    let result = terminate_member(&store.inner, "u1", "admin-1", None)
        .await
        .expect("retry");
    assert_eq!(result.released_count(), 2);
}

#[tokio::test]
async fn reactivation_keeps_stale_termination_metadata() {
    let store = MemoryStore::new();
    seed(&store).await;

    terminate_member(&store, "u1", "admin-1", Some("seasonal layoff"))
        .await
        .expect("terminate");
    reactivate_member(&store, "u1").await.expect("reactivate");

    let u1 = load_member(&store, "u1").await;
    assert_eq!(u1.status, MemberStatus::Active);
    // Reactivation is a bare status flip; the termination fields survive as
    // history on the record.
    assert!(u1.terminated_date.is_some());
    assert_eq!(u1.terminated_by.as_deref(), Some("admin-1"));
    assert_eq!(u1.termination_reason.as_deref(), Some("seasonal layoff"));

    // Previously released tasks stay in the pool.
    let t1 = load_task(&store, "t1").await;
    assert_eq!(t1.assignee_id, None);
    assert_eq!(t1.status, TaskStatus::NotStarted);
}

#[tokio::test]
async fn cascade_publishes_snapshots_for_touched_collections() {
    let store = MemoryStore::new();
    seed(&store).await;

    let mut team_rx = store.subscribe(collections::TEAM);
    let mut tasks_rx = store.subscribe(collections::TASKS);

    terminate_member(&store, "u1", "admin-1", None)
        .await
        .expect("terminate");

    let team_snapshot = team_rx.recv().await.expect("team snapshot");
    let member: TeamMember = from_document(team_snapshot[0].clone()).unwrap();
    assert_eq!(member.status, MemberStatus::Terminated);

    let tasks_snapshot = tasks_rx.recv().await.expect("tasks snapshot");
    let released: Vec<&Document> = tasks_snapshot
        .iter()
        .filter(|d| d.get("assigneeId") == Some(&Value::Null))
        .collect();
    assert!(released.len() >= 2);
    for doc in released {
        if doc.get("id").and_then(Value::as_str) == Some("t5") {
            continue;
        }
        assert_eq!(doc.get("status"), Some(&json!("Not Started")));
    }
}
