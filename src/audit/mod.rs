//! Audit log writer.
//!
//! Every mutation of a persisted collection is recorded as an immutable
//! `AuditLog` document. Writes are best effort by design: a failed audit write
//! is reported on the operational log and swallowed, so the primary business
//! operation can never fail or roll back because of it. A subscriber may
//! therefore observe an entity mutation before its audit record exists, or
//! never see the record at all.

pub mod diff;
pub mod export;
pub mod query;
pub mod routes;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::store::{collections, to_document, Document, DocumentStore};

/// The identity a mutation is attributed to. Threaded explicitly through every
/// logging call; there is no process-wide "current user".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Login,
    Logout,
    AccessDenied,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Login => "LOGIN",
            Self::Logout => "LOGOUT",
            Self::AccessDenied => "ACCESS_DENIED",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_values: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_values: Option<Value>,
}

/// Immutable record of one logged mutation. Never updated or deleted by the
/// application once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub user_email: String,
    pub user_name: String,
    pub action: AuditAction,
    pub collection_name: String,
    pub doc_id: String,
    pub changes: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AuditMetadata>,
}

/// Doc id used for bulk-operation summary entries.
pub const BULK_OPERATION_DOC_ID: &str = "BULK_OPERATION";

/// Descriptor recorded when no interactive client environment is present.
pub const SERVER_USER_AGENT: &str = "Server/Build Environment";

#[derive(Clone)]
pub struct AuditWriter {
    store: Arc<dyn DocumentStore>,
    session_id: String,
}

impl AuditWriter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            session_id: generate_session_id(),
        }
    }

    /// Session identifier attached to every record written by this instance.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn log_create(
        &self,
        actor: &Actor,
        collection: &str,
        doc_id: &str,
        new_data: &Document,
        metadata: Option<AuditMetadata>,
    ) {
        let changes = serde_json::json!({
            "operation": "CREATE",
            "newData": diff::sanitize(new_data),
        });
        self.write(actor, AuditAction::Create, collection, doc_id, changes, metadata)
            .await;
    }

    /// Logs an update as a field-level change map. A diff that comes back
    /// empty suppresses the write entirely.
    pub async fn log_update(
        &self,
        actor: &Actor,
        collection: &str,
        doc_id: &str,
        previous_data: &Document,
        new_data: &Document,
        metadata: Option<AuditMetadata>,
    ) {
        let changes = diff::diff(previous_data, new_data);
        if changes.is_empty() {
            return;
        }

        let fields_changed: Vec<&String> = changes.keys().collect();
        let payload = serde_json::json!({
            "operation": "UPDATE",
            "fieldsChanged": fields_changed,
            "changes": changes,
        });

        let mut metadata = metadata.unwrap_or_default();
        metadata.previous_values = Some(Value::Object(diff::sanitize(previous_data)));
        metadata.new_values = Some(Value::Object(diff::sanitize(new_data)));

        self.write(actor, AuditAction::Update, collection, doc_id, payload, Some(metadata))
            .await;
    }

    pub async fn log_delete(
        &self,
        actor: &Actor,
        collection: &str,
        doc_id: &str,
        deleted_data: &Document,
        metadata: Option<AuditMetadata>,
    ) {
        let changes = serde_json::json!({
            "operation": "DELETE",
            "deletedData": diff::sanitize(deleted_data),
        });
        self.write(actor, AuditAction::Delete, collection, doc_id, changes, metadata)
            .await;
    }

    /// Session events: LOGIN, LOGOUT and ACCESS_DENIED.
    pub async fn log_auth(
        &self,
        actor: &Actor,
        action: AuditAction,
        details: Value,
        metadata: Option<AuditMetadata>,
    ) {
        let changes = serde_json::json!({
            "operation": action.as_str(),
            "details": details,
        });
        self.write(actor, action, "auth", &actor.id, changes, metadata)
            .await;
    }

    /// Summary entry for a multi-document operation such as the termination
    /// cascade's task release.
    pub async fn log_bulk_operation(
        &self,
        actor: &Actor,
        operation: &str,
        collection: &str,
        affected_doc_ids: &[String],
        details: Value,
        metadata: Option<AuditMetadata>,
    ) {
        let changes = serde_json::json!({
            "operation": format!("BULK_{}", operation.to_uppercase()),
            "affectedDocuments": affected_doc_ids,
            "documentCount": affected_doc_ids.len(),
            "details": details,
        });
        self.write(
            actor,
            AuditAction::Update,
            collection,
            BULK_OPERATION_DOC_ID,
            changes,
            metadata,
        )
        .await;
    }

    async fn write(
        &self,
        actor: &Actor,
        action: AuditAction,
        collection: &str,
        doc_id: &str,
        changes: Value,
        metadata: Option<AuditMetadata>,
    ) {
        let mut metadata = metadata.unwrap_or_default();
        if metadata.user_agent.is_none() {
            metadata.user_agent = Some(SERVER_USER_AGENT.to_string());
        }
        if metadata.session_id.is_none() {
            metadata.session_id = Some(self.session_id.clone());
        }

        let entry = AuditLog {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            user_id: actor.id.clone(),
            user_email: actor.email.clone(),
            user_name: actor.name.clone(),
            action,
            collection_name: collection.to_string(),
            doc_id: doc_id.to_string(),
            changes,
            metadata: Some(metadata),
        };

        let doc = match to_document(&entry) {
            Ok(doc) => doc,
            Err(err) => {
                warn!("failed to serialize audit log entry: {err}");
                return;
            }
        };

        // Fire and forget: the caller never observes an audit-write failure.
        if let Err(err) = self.store.add(collections::AUDIT_LOGS, doc).await {
            warn!(
                action = action.as_str(),
                collection, doc_id, "failed to persist audit log: {err}"
            );
        }
    }
}

fn generate_session_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();
    format!(
        "session_{}_{}",
        Utc::now().timestamp_millis(),
        suffix.to_lowercase()
    )
}
