//! Sign-in/sign-out, bearer-token sessions and actor resolution.
//!
//! An authenticated identity maps to its `TeamMember` profile by exact
//! document-id lookup only. Session events are recorded through the audit
//! writer (LOGIN, LOGOUT, ACCESS_DENIED).

use std::collections::HashMap;
use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts, HeaderMap};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::audit::{Actor, AuditAction, AuditMetadata};
use crate::shared::error::AppError;
use crate::shared::state::AppState;
use crate::store::{collections, from_document, to_document, DocumentStore, Filter};
use crate::team::types::{MemberStatus, Role, TeamMember};

/// Stored credential, kept separate from the team profile. The hash field name
/// intentionally trips the audit redaction filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub id: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub member_id: String,
    pub actor: Actor,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Default)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, member: &TeamMember) -> Session {
        let session = Session {
            token: Uuid::new_v4().simple().to_string(),
            member_id: member.id.clone(),
            actor: actor_for(member),
            created_at: Utc::now(),
        };
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.token.clone(), session.clone());
        session
    }

    pub async fn resolve(&self, token: &str) -> Option<Session> {
        self.sessions.read().await.get(token).cloned()
    }

    pub async fn revoke(&self, token: &str) -> Option<Session> {
        self.sessions.write().await.remove(token)
    }
}

pub fn actor_for(member: &TeamMember) -> Actor {
    Actor {
        id: member.id.clone(),
        email: member.email.clone(),
        name: member.name.clone(),
    }
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
        .is_ok()
}

pub async fn set_credential(
    store: &dyn DocumentStore,
    member_id: &str,
    password: &str,
) -> Result<(), AppError> {
    let credential = Credential {
        id: member_id.to_string(),
        password_hash: hash_password(password)?,
    };
    store
        .set(collections::CREDENTIALS, member_id, to_document(&credential)?)
        .await?;
    Ok(())
}

/// Exact document-id lookup of the profile for an auth subject. No fallback
/// queries by secondary uid field or email.
pub async fn resolve_profile(
    store: &dyn DocumentStore,
    subject_id: &str,
) -> Result<Option<TeamMember>, AppError> {
    let doc = store.get(collections::TEAM, subject_id).await?;
    Ok(doc.map(from_document).transpose()?)
}

/// Translate a known auth failure code into user-facing text; unknown codes
/// fall through unchanged.
pub fn friendly_auth_message(code: &str) -> String {
    match code {
        "invalid-credential" | "wrong-password" => "Invalid email or password.".into(),
        "user-not-found" => "No account exists for that email address.".into(),
        "user-disabled" => "This account has been deactivated.".into(),
        "too-many-requests" => "Too many attempts. Please try again later.".into(),
        other => other.to_string(),
    }
}

/// The authenticated caller, resolved from the bearer token and the member's
/// current profile.
pub struct CurrentUser {
    pub member: TeamMember,
    pub session: Session,
}

impl CurrentUser {
    pub fn actor(&self) -> Actor {
        actor_for(&self.member)
    }

    pub fn is_admin(&self) -> bool {
        self.member.role == Role::Admin
    }
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;
        let session = state
            .sessions
            .resolve(&token)
            .await
            .ok_or_else(|| AppError::Unauthorized("invalid or expired session".into()))?;
        let member = resolve_profile(state.store.as_ref(), &session.member_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("profile not found for session".into()))?;
        Ok(Self { member, session })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Admin gate for protected operations. A refused caller is recorded as an
/// ACCESS_DENIED audit event.
pub async fn ensure_admin(
    state: &AppState,
    user: &CurrentUser,
    operation: &str,
) -> Result<(), AppError> {
    if user.is_admin() {
        return Ok(());
    }
    state
        .audit
        .log_auth(
            &user.actor(),
            AuditAction::AccessDenied,
            json!({ "operation": operation, "requiredRole": "Admin" }),
            None,
        )
        .await;
    Err(AppError::Forbidden(format!(
        "Admin role required for {operation}"
    )))
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub token: String,
    pub member: TeamMember,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sign-in", post(sign_in))
        .route("/sign-out", post(sign_out))
        .route("/me", get(me))
}

async fn sign_in(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<SignInRequest>,
) -> Result<Json<SignInResponse>, AppError> {
    let members = state
        .store
        .list(collections::TEAM, &[Filter::eq("email", json!(payload.email))])
        .await?;
    let member: TeamMember = match members.into_iter().next() {
        Some(doc) => from_document(doc)?,
        None => {
            return Err(AppError::Unauthorized(friendly_auth_message(
                "user-not-found",
            )))
        }
    };

    if member.status == MemberStatus::Terminated {
        return Err(AppError::Unauthorized(friendly_auth_message("user-disabled")));
    }

    let credential: Credential = match state.store.get(collections::CREDENTIALS, &member.id).await? {
        Some(doc) => from_document(doc)?,
        None => {
            return Err(AppError::Unauthorized(friendly_auth_message(
                "invalid-credential",
            )))
        }
    };
    if !verify_password(&payload.password, &credential.password_hash) {
        return Err(AppError::Unauthorized(friendly_auth_message(
            "invalid-credential",
        )));
    }

    let session = state.sessions.create(&member).await;
    state
        .audit
        .log_auth(
            &session.actor,
            AuditAction::Login,
            json!({ "method": "password" }),
            Some(AuditMetadata {
                user_agent: user_agent(&headers),
                session_id: Some(session.token.clone()),
                ..Default::default()
            }),
        )
        .await;

    Ok(Json(SignInResponse {
        token: session.token.clone(),
        member,
    }))
}

async fn sign_out(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;
    if let Some(session) = state.sessions.revoke(&token).await {
        state
            .audit
            .log_auth(&session.actor, AuditAction::Logout, json!({}), None)
            .await;
    }
    Ok(Json(json!({ "signedOut": true })))
}

async fn me(user: CurrentUser) -> Json<TeamMember> {
    Json(user.member)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_roundtrip() {
        let hash = hash_password("hunter2").expect("hash");
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn friendly_messages_cover_known_codes() {
        assert_eq!(
            friendly_auth_message("invalid-credential"),
            "Invalid email or password."
        );
        assert_eq!(
            friendly_auth_message("user-disabled"),
            "This account has been deactivated."
        );
        // Unknown codes pass through untouched.
        assert_eq!(friendly_auth_message("weird-code"), "weird-code");
    }

    #[tokio::test]
    async fn sessions_create_resolve_revoke() {
        let manager = SessionManager::new();
        let member = TeamMember {
            id: "u1".into(),
            name: "Dana".into(),
            email: "dana@example.com".into(),
            phone: None,
            role: Role::Staff,
            status: MemberStatus::Active,
            is_system_account: None,
            terminated_date: None,
            terminated_by: None,
            termination_reason: None,
            created_date: None,
        };

        let session = manager.create(&member).await;
        let resolved = manager.resolve(&session.token).await.expect("resolve");
        assert_eq!(resolved.member_id, "u1");
        assert_eq!(resolved.actor.email, "dana@example.com");

        manager.revoke(&session.token).await;
        assert!(manager.resolve(&session.token).await.is_none());
    }

    #[tokio::test]
    async fn profile_resolution_is_exact_id_only() {
        use crate::store::MemoryStore;

        let store = MemoryStore::new();
        let member = TeamMember {
            id: "subject-1".into(),
            name: "Dana".into(),
            email: "dana@example.com".into(),
            phone: None,
            role: Role::Admin,
            status: MemberStatus::Active,
            is_system_account: None,
            terminated_date: None,
            terminated_by: None,
            termination_reason: None,
            created_date: None,
        };
        store
            .set(collections::TEAM, "subject-1", to_document(&member).expect("doc"))
            .await
            .expect("set");

        let found = resolve_profile(&store, "subject-1").await.expect("resolve");
        assert!(found.is_some());

        // No fallback by email: an unknown subject id resolves to nothing even
        // though a profile with that email exists.
        let missed = resolve_profile(&store, "dana@example.com")
            .await
            .expect("resolve");
        assert!(missed.is_none());
    }
}
