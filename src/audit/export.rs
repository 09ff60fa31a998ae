//! CSV export of filtered audit-log rows.

use crate::shared::error::AppError;

use super::AuditLog;

/// Render audit entries as CSV with the columns the audit screen exports:
/// Timestamp (ISO-8601), User (`Name (email)`), Action, Collection,
/// Document ID and the JSON-serialized change payload.
pub fn to_csv(entries: &[AuditLog]) -> Result<String, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record([
            "Timestamp",
            "User",
            "Action",
            "Collection",
            "Document ID",
            "Changes",
        ])
        .map_err(|e| AppError::Internal(format!("csv write failed: {e}")))?;

    for entry in entries {
        let changes = serde_json::to_string(&entry.changes)
            .map_err(|e| AppError::Internal(format!("changes serialization failed: {e}")))?;
        writer
            .write_record([
                entry.timestamp.to_rfc3339(),
                format!("{} ({})", entry.user_name, entry.user_email),
                entry.action.as_str().to_string(),
                entry.collection_name.clone(),
                entry.doc_id.clone(),
                changes,
            ])
            .map_err(|e| AppError::Internal(format!("csv write failed: {e}")))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("csv flush failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("csv not utf-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditAction;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn exports_header_and_quoted_changes() {
        let entry = AuditLog {
            id: "a1".into(),
            timestamp: Utc::now(),
            user_id: "u1".into(),
            user_email: "dana@example.com".into(),
            user_name: "Dana".into(),
            action: AuditAction::Update,
            collection_name: "tasks".into(),
            doc_id: "t1".into(),
            changes: json!({"operation": "UPDATE", "changes": {"status": {"from": "a", "to": "b"}}}),
            metadata: None,
        };

        let csv = to_csv(&[entry]).expect("export");
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Timestamp,User,Action,Collection,Document ID,Changes")
        );
        let row = lines.next().expect("data row");
        assert!(row.contains("Dana (dana@example.com)"));
        assert!(row.contains("UPDATE"));
        // Embedded JSON quotes must be CSV-escaped by doubling.
        assert!(row.contains("\"\"operation\"\""));
    }

    #[test]
    fn empty_export_is_just_the_header() {
        let csv = to_csv(&[]).expect("export");
        assert_eq!(csv.trim(), "Timestamp,User,Action,Collection,Document ID,Changes");
    }
}
