use std::sync::Arc;

use crate::audit::AuditWriter;
use crate::auth::SessionManager;
use crate::notify::NotificationCenter;
use crate::shared::config::AppConfig;
use crate::store::DocumentStore;

pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn DocumentStore>,
    pub audit: AuditWriter,
    pub notifications: NotificationCenter,
    pub sessions: SessionManager,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn DocumentStore>) -> Self {
        let audit = AuditWriter::new(Arc::clone(&store));
        let notifications = NotificationCenter::new(
            config.notifications.max_visible,
            config.notifications.ttl(),
        );
        Self {
            config,
            store,
            audit,
            notifications,
            sessions: SessionManager::new(),
        }
    }
}
