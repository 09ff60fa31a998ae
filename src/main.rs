use std::env;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use teamdesk::auth::set_credential;
use teamdesk::shared::config::AppConfig;
use teamdesk::shared::state::AppState;
use teamdesk::store::{collections, to_document, DocumentStore, MemoryStore};
use teamdesk::team::types::{MemberStatus, Role, TeamMember};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState::new(config.clone(), store));

    bootstrap_admin(&state).await?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {addr}");
    axum::serve(listener, teamdesk::build_router(state)).await?;
    Ok(())
}

/// Seed an initial Admin account from the environment when the team collection
/// is empty, so a fresh deployment can sign in at all.
async fn bootstrap_admin(state: &AppState) -> anyhow::Result<()> {
    let (Ok(email), Ok(password)) = (env::var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD")) else {
        return Ok(());
    };
    if !state.store.list(collections::TEAM, &[]).await?.is_empty() {
        return Ok(());
    }

    let member = TeamMember {
        id: uuid::Uuid::new_v4().to_string(),
        name: env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrator".into()),
        email: email.clone(),
        phone: None,
        role: Role::Admin,
        status: MemberStatus::Active,
        is_system_account: Some(true),
        terminated_date: None,
        terminated_by: None,
        termination_reason: None,
        created_date: Some(chrono::Utc::now()),
    };
    state
        .store
        .set(collections::TEAM, &member.id, to_document(&member)?)
        .await?;
    set_credential(state.store.as_ref(), &member.id, &password)
        .await
        .map_err(|e| anyhow::anyhow!("failed to store bootstrap credential: {e}"))?;

    info!(email, "bootstrapped initial Admin account");
    Ok(())
}
