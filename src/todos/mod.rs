pub mod types;

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::shared::error::AppError;
use crate::shared::state::AppState;
use crate::store::{collections, from_document, to_document, Document, DocumentStore, Filter};

use types::{
    CreateItemRequest, CreateListRequest, CreateToDoRequest, ToDo, ToDoFilters, ToDoItem,
    ToDoList, ToDoStatus, UpdateItemRequest, UpdateListRequest, UpdateToDoRequest,
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_todos).post(create_todo))
        .route("/{id}", get(get_todo).put(update_todo).delete(delete_todo))
        .route("/lists", get(list_lists).post(create_list))
        .route("/lists/{id}", get(get_list).put(update_list).delete(delete_list))
        .route("/lists/{id}/items", get(list_items).post(create_item))
        .route("/items/{id}", get(get_item).put(update_item).delete(delete_item))
}

async fn fetch_todo(store: &dyn DocumentStore, id: &str) -> Result<(ToDo, Document), AppError> {
    let doc = store
        .get(collections::TODOS, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("to-do {id}")))?;
    Ok((from_document(doc.clone())?, doc))
}

async fn fetch_list(store: &dyn DocumentStore, id: &str) -> Result<(ToDoList, Document), AppError> {
    let doc = store
        .get(collections::TODO_LISTS, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("to-do list {id}")))?;
    Ok((from_document(doc.clone())?, doc))
}

async fn fetch_item(store: &dyn DocumentStore, id: &str) -> Result<(ToDoItem, Document), AppError> {
    let doc = store
        .get(collections::TODO_ITEMS, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("to-do item {id}")))?;
    Ok((from_document(doc.clone())?, doc))
}

async fn list_todos(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Query(filters): Query<ToDoFilters>,
) -> Result<Json<Vec<ToDo>>, AppError> {
    let mut store_filters = Vec::new();
    if let Some(category) = filters.category {
        store_filters.push(Filter::eq("category", json!(category)));
    }
    if let Some(status) = filters.status {
        store_filters.push(Filter::eq("status", json!(status)));
    }
    if let Some(ref assignee_id) = filters.assignee_id {
        store_filters.push(Filter::eq("assigneeId", json!(assignee_id)));
    }

    let docs = state.store.list(collections::TODOS, &store_filters).await?;
    let mut todos = docs
        .into_iter()
        .map(from_document)
        .collect::<Result<Vec<ToDo>, _>>()?;
    // Pending work surfaces oldest first; completed entries sink to the end.
    todos.sort_by(|a, b| {
        let rank = |t: &ToDo| matches!(t.status, ToDoStatus::Completed) as u8;
        rank(a).cmp(&rank(b)).then(a.created_date.cmp(&b.created_date))
    });
    Ok(Json(todos))
}

async fn get_todo(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ToDo>, AppError> {
    let (todo, _) = fetch_todo(state.store.as_ref(), &id).await?;
    Ok(Json(todo))
}

async fn create_todo(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(payload): Json<CreateToDoRequest>,
) -> Result<Json<ToDo>, AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::Validation("to-do title is required".into()));
    }

    let todo = ToDo {
        id: Uuid::new_v4().to_string(),
        title: payload.title,
        category: payload.category,
        status: ToDoStatus::Pending,
        assignee_id: payload.assignee_id,
        patient_id: payload.patient_id,
        patient_name: payload.patient_name,
        due_date: payload.due_date,
        created_by: user.member.id.clone(),
        created_date: Utc::now(),
        completed_date: None,
    };
    let doc = to_document(&todo)?;
    state.store.set(collections::TODOS, &todo.id, doc.clone()).await?;

    state
        .audit
        .log_create(&user.actor(), collections::TODOS, &todo.id, &doc, None)
        .await;

    Ok(Json(todo))
}

async fn update_todo(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateToDoRequest>,
) -> Result<Json<ToDo>, AppError> {
    let (before, previous) = fetch_todo(state.store.as_ref(), &id).await?;

    let mut patch = Document::new();
    if let Some(title) = payload.title {
        patch.insert("title".into(), json!(title));
    }
    if let Some(category) = payload.category {
        patch.insert("category".into(), json!(category));
    }
    if let Some(assignee_id) = payload.assignee_id {
        patch.insert("assigneeId".into(), json!(assignee_id));
    }
    if let Some(patient_id) = payload.patient_id {
        patch.insert("patientId".into(), json!(patient_id));
    }
    if let Some(patient_name) = payload.patient_name {
        patch.insert("patientName".into(), json!(patient_name));
    }
    if let Some(due_date) = payload.due_date {
        patch.insert("dueDate".into(), json!(due_date));
    }
    if let Some(status) = payload.status {
        patch.insert("status".into(), json!(status));
        if status == ToDoStatus::Completed && before.status != ToDoStatus::Completed {
            patch.insert("completedDate".into(), json!(Utc::now()));
        } else if status != ToDoStatus::Completed && before.status == ToDoStatus::Completed {
            patch.insert("completedDate".into(), Value::Null);
        }
    }
    if patch.is_empty() {
        return Err(AppError::Validation("no fields to update".into()));
    }

    state.store.update(collections::TODOS, &id, patch).await?;
    let (todo, current) = fetch_todo(state.store.as_ref(), &id).await?;

    state
        .audit
        .log_update(&user.actor(), collections::TODOS, &id, &previous, &current, None)
        .await;

    Ok(Json(todo))
}

async fn delete_todo(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (_, previous) = fetch_todo(state.store.as_ref(), &id).await?;

    state.store.delete(collections::TODOS, &id).await?;
    state
        .audit
        .log_delete(&user.actor(), collections::TODOS, &id, &previous, None)
        .await;

    Ok(Json(json!({ "deleted": id })))
}

/// Lists visible to the caller: their own, anything shared with them, and
/// every department list.
async fn list_lists(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<Vec<ToDoList>>, AppError> {
    let docs = state.store.list(collections::TODO_LISTS, &[]).await?;
    let mut lists = docs
        .into_iter()
        .map(from_document)
        .collect::<Result<Vec<ToDoList>, _>>()?;
    lists.retain(|l| {
        !l.archived
            && (l.owner_id == user.member.id
                || l.shared_with.contains(&user.member.id)
                || l.kind == types::ListKind::Department)
    });
    lists.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
    Ok(Json(lists))
}

async fn get_list(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ToDoList>, AppError> {
    let (list, _) = fetch_list(state.store.as_ref(), &id).await?;
    Ok(Json(list))
}

async fn create_list(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(payload): Json<CreateListRequest>,
) -> Result<Json<ToDoList>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("list name is required".into()));
    }

    let list = ToDoList {
        id: Uuid::new_v4().to_string(),
        name: payload.name,
        kind: payload.kind,
        owner_id: user.member.id.clone(),
        shared_with: payload.shared_with.unwrap_or_default(),
        settings: payload.settings.unwrap_or_default(),
        order: payload.order.unwrap_or_default(),
        archived: false,
        created_date: Utc::now(),
    };
    let doc = to_document(&list)?;
    state
        .store
        .set(collections::TODO_LISTS, &list.id, doc.clone())
        .await?;

    state
        .audit
        .log_create(&user.actor(), collections::TODO_LISTS, &list.id, &doc, None)
        .await;

    Ok(Json(list))
}

async fn update_list(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateListRequest>,
) -> Result<Json<ToDoList>, AppError> {
    let (list, previous) = fetch_list(state.store.as_ref(), &id).await?;
    if list.owner_id != user.member.id && !user.is_admin() {
        return Err(AppError::Forbidden(
            "only the list owner or an Admin can modify a list".into(),
        ));
    }

    let mut patch = Document::new();
    if let Some(name) = payload.name {
        patch.insert("name".into(), json!(name));
    }
    if let Some(shared_with) = payload.shared_with {
        patch.insert("sharedWith".into(), json!(shared_with));
    }
    if let Some(settings) = payload.settings {
        patch.insert("settings".into(), json!(settings));
    }
    if let Some(order) = payload.order {
        patch.insert("order".into(), json!(order));
    }
    if let Some(archived) = payload.archived {
        patch.insert("archived".into(), json!(archived));
    }
    if patch.is_empty() {
        return Err(AppError::Validation("no fields to update".into()));
    }

    state.store.update(collections::TODO_LISTS, &id, patch).await?;
    let (list, current) = fetch_list(state.store.as_ref(), &id).await?;

    state
        .audit
        .log_update(&user.actor(), collections::TODO_LISTS, &id, &previous, &current, None)
        .await;

    Ok(Json(list))
}

/// Deleting a list also removes its items, then records one bulk entry for the
/// removal set.
async fn delete_list(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (list, previous) = fetch_list(state.store.as_ref(), &id).await?;
    if list.owner_id != user.member.id && !user.is_admin() {
        return Err(AppError::Forbidden(
            "only the list owner or an Admin can delete a list".into(),
        ));
    }

    let items = state
        .store
        .list(collections::TODO_ITEMS, &[Filter::eq("listId", json!(id))])
        .await?;
    let item_ids: Vec<String> = items
        .iter()
        .map(|d| crate::store::document_id(d).map(str::to_string))
        .collect::<Result<_, _>>()?;

    state.store.delete(collections::TODO_LISTS, &id).await?;
    for item_id in &item_ids {
        state.store.delete(collections::TODO_ITEMS, item_id).await?;
    }

    state
        .audit
        .log_delete(&user.actor(), collections::TODO_LISTS, &id, &previous, None)
        .await;
    if !item_ids.is_empty() {
        state
            .audit
            .log_bulk_operation(
                &user.actor(),
                "delete_list_items",
                collections::TODO_ITEMS,
                &item_ids,
                json!({ "listId": id }),
                None,
            )
            .await;
    }

    Ok(Json(json!({ "deleted": id, "deletedItems": item_ids.len() })))
}

async fn list_items(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<ToDoItem>>, AppError> {
    fetch_list(state.store.as_ref(), &id).await?;
    let docs = state
        .store
        .list(collections::TODO_ITEMS, &[Filter::eq("listId", json!(id))])
        .await?;
    let mut items = docs
        .into_iter()
        .map(from_document)
        .collect::<Result<Vec<ToDoItem>, _>>()?;
    items.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.created_date.cmp(&b.created_date)));
    Ok(Json(items))
}

async fn get_item(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ToDoItem>, AppError> {
    let (item, _) = fetch_item(state.store.as_ref(), &id).await?;
    Ok(Json(item))
}

async fn create_item(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<CreateItemRequest>,
) -> Result<Json<ToDoItem>, AppError> {
    fetch_list(state.store.as_ref(), &id).await?;
    if payload.text.trim().is_empty() {
        return Err(AppError::Validation("item text is required".into()));
    }

    let item = ToDoItem {
        id: Uuid::new_v4().to_string(),
        list_id: id,
        text: payload.text,
        completed: false,
        priority: payload.priority,
        order: payload.order.unwrap_or_default(),
        tags: payload.tags.unwrap_or_default(),
        assigned_to: payload.assigned_to,
        due_date: payload.due_date,
        created_date: Utc::now(),
        completed_date: None,
    };
    let doc = to_document(&item)?;
    state
        .store
        .set(collections::TODO_ITEMS, &item.id, doc.clone())
        .await?;

    state
        .audit
        .log_create(&user.actor(), collections::TODO_ITEMS, &item.id, &doc, None)
        .await;

    Ok(Json(item))
}

async fn update_item(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Json<ToDoItem>, AppError> {
    let (before, previous) = fetch_item(state.store.as_ref(), &id).await?;

    let mut patch = Document::new();
    if let Some(text) = payload.text {
        patch.insert("text".into(), json!(text));
    }
    if let Some(priority) = payload.priority {
        patch.insert("priority".into(), json!(priority));
    }
    if let Some(order) = payload.order {
        patch.insert("order".into(), json!(order));
    }
    if let Some(tags) = payload.tags {
        patch.insert("tags".into(), json!(tags));
    }
    if let Some(assigned_to) = payload.assigned_to {
        patch.insert("assignedTo".into(), json!(assigned_to));
    }
    if let Some(due_date) = payload.due_date {
        patch.insert("dueDate".into(), json!(due_date));
    }
    if let Some(completed) = payload.completed {
        patch.insert("completed".into(), json!(completed));
        if completed && !before.completed {
            patch.insert("completedDate".into(), json!(Utc::now()));
        } else if !completed && before.completed {
            patch.insert("completedDate".into(), Value::Null);
        }
    }
    if patch.is_empty() {
        return Err(AppError::Validation("no fields to update".into()));
    }

    state.store.update(collections::TODO_ITEMS, &id, patch).await?;
    let (item, current) = fetch_item(state.store.as_ref(), &id).await?;

    state
        .audit
        .log_update(&user.actor(), collections::TODO_ITEMS, &id, &previous, &current, None)
        .await;

    Ok(Json(item))
}

async fn delete_item(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (_, previous) = fetch_item(state.store.as_ref(), &id).await?;

    state.store.delete(collections::TODO_ITEMS, &id).await?;
    state
        .audit
        .log_delete(&user.actor(), collections::TODO_ITEMS, &id, &previous, None)
        .await;

    Ok(Json(json!({ "deleted": id })))
}
