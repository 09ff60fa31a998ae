//! Filtering, pagination and summary statistics over stored audit records.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{collections, from_document, DocumentStore, StoreError};

use super::{AuditAction, AuditLog};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditFilter {
    pub action: Option<AuditAction>,
    pub collection: Option<String>,
    pub user_id: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Case-insensitive free-text match over user name, email, collection and
    /// document id.
    pub search: Option<String>,
}

impl AuditFilter {
    pub fn matches(&self, entry: &AuditLog) -> bool {
        if let Some(action) = self.action {
            if entry.action != action {
                return false;
            }
        }
        if let Some(ref collection) = self.collection {
            if &entry.collection_name != collection {
                return false;
            }
        }
        if let Some(ref user_id) = self.user_id {
            if &entry.user_id != user_id {
                return false;
            }
        }
        if let Some(start) = self.start {
            if entry.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if entry.timestamp > end {
                return false;
            }
        }
        if let Some(ref term) = self.search {
            let term = term.to_lowercase();
            let hit = entry.user_name.to_lowercase().contains(&term)
                || entry.user_email.to_lowercase().contains(&term)
                || entry.collection_name.to_lowercase().contains(&term)
                || entry.doc_id.to_lowercase().contains(&term);
            if !hit {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditPage {
    pub entries: Vec<AuditLog>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditStats {
    pub total: usize,
    pub today: usize,
    pub this_week: usize,
    pub by_action: HashMap<String, usize>,
}

/// Fetch all audit records matching `filter`, newest first.
pub async fn query(
    store: &dyn DocumentStore,
    filter: &AuditFilter,
) -> Result<Vec<AuditLog>, StoreError> {
    let docs = store.list(collections::AUDIT_LOGS, &[]).await?;
    let mut entries: Vec<AuditLog> = docs
        .into_iter()
        .map(from_document)
        .collect::<Result<_, _>>()?;
    entries.retain(|e| filter.matches(e));
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(entries)
}

pub fn paginate(entries: Vec<AuditLog>, page: usize, per_page: usize) -> AuditPage {
    let per_page = per_page.max(1);
    let page = page.max(1);
    let total = entries.len();
    let total_pages = total.div_ceil(per_page);
    // Saturating math: an absurd page number yields an empty page, not a panic.
    let start = page.saturating_sub(1).saturating_mul(per_page);
    let entries: Vec<AuditLog> = entries.into_iter().skip(start).take(per_page).collect();

    AuditPage {
        entries,
        page,
        per_page,
        total,
        total_pages,
    }
}

pub fn stats(entries: &[AuditLog]) -> AuditStats {
    let now = Utc::now();
    // "Today" is the current calendar day, not a rolling 24-hour window.
    let start_of_day = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    let week_ago = now - Duration::days(7);

    let mut by_action: HashMap<String, usize> = HashMap::new();
    for entry in entries {
        *by_action.entry(entry.action.as_str().to_string()).or_insert(0) += 1;
    }

    AuditStats {
        total: entries.len(),
        today: entries.iter().filter(|e| e.timestamp >= start_of_day).count(),
        this_week: entries.iter().filter(|e| e.timestamp >= week_ago).count(),
        by_action,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(action: AuditAction, collection: &str, user: &str) -> AuditLog {
        AuditLog {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            user_id: user.to_string(),
            user_email: format!("{user}@example.com"),
            user_name: user.to_string(),
            action,
            collection_name: collection.to_string(),
            doc_id: "d1".into(),
            changes: json!({}),
            metadata: None,
        }
    }

    #[test]
    fn filter_by_action_and_collection() {
        let filter = AuditFilter {
            action: Some(AuditAction::Update),
            collection: Some("tasks".into()),
            ..Default::default()
        };

        assert!(filter.matches(&entry(AuditAction::Update, "tasks", "u1")));
        assert!(!filter.matches(&entry(AuditAction::Create, "tasks", "u1")));
        assert!(!filter.matches(&entry(AuditAction::Update, "team", "u1")));
    }

    #[test]
    fn search_matches_email_case_insensitively() {
        let filter = AuditFilter {
            search: Some("DANA".into()),
            ..Default::default()
        };
        assert!(filter.matches(&entry(AuditAction::Create, "tasks", "dana")));
        assert!(!filter.matches(&entry(AuditAction::Create, "tasks", "sam")));
    }

    #[test]
    fn pagination_math() {
        let entries: Vec<AuditLog> = (0..25)
            .map(|_| entry(AuditAction::Create, "tasks", "u1"))
            .collect();

        let page = paginate(entries, 3, 10);
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.entries.len(), 5);
    }

    #[test]
    fn pagination_tolerates_out_of_range_pages() {
        // A hostile page number must clamp to an empty page, not overflow.
        let page = paginate(Vec::new(), usize::MAX, 50);
        assert_eq!(page.total, 0);
        assert!(page.entries.is_empty());

        let entries: Vec<AuditLog> = (0..5)
            .map(|_| entry(AuditAction::Create, "tasks", "u1"))
            .collect();
        let page = paginate(entries, usize::MAX, 50);
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 1);
        assert!(page.entries.is_empty());
    }

    #[test]
    fn today_counts_the_calendar_day_not_a_rolling_window() {
        let start_of_day = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();

        // Late yesterday evening: inside the last 24 hours around midnight,
        // but not today.
        let mut yesterday = entry(AuditAction::Create, "tasks", "u1");
        yesterday.timestamp = start_of_day - Duration::hours(2);
        let current = entry(AuditAction::Update, "tasks", "u1");

        let stats = stats(&[yesterday, current]);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.today, 1);
        assert_eq!(stats.this_week, 2);
    }

    #[test]
    fn stats_count_by_action() {
        let entries = vec![
            entry(AuditAction::Create, "tasks", "u1"),
            entry(AuditAction::Update, "tasks", "u1"),
            entry(AuditAction::Update, "team", "u2"),
        ];

        let stats = stats(&entries);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.today, 3);
        assert_eq!(stats.by_action.get("UPDATE"), Some(&2));
        assert_eq!(stats.by_action.get("CREATE"), Some(&1));
    }
}
