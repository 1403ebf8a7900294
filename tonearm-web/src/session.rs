// Tonearm - Content management and storefront backend for hi-fi brands
// Copyright (C) 2025 Tonearm Project Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Server-side sessions keyed by an http-only cookie.
//!
//! The cookie only carries an opaque id; the provider tokens and the sign-in
//! stage stay in memory on the server.

use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tonearm_core::AdminUser;
use tonearm_db::{AuthSession, TotpEnrollment};

pub const SESSION_COOKIE: &str = "session_id";

/// How far through sign-in a session is
#[derive(Debug, Clone, PartialEq)]
pub enum AuthStage {
    /// Password accepted, waiting for a TOTP code against this challenge
    MfaPending {
        factor_id: String,
        challenge_id: String,
    },
    /// Fully signed in and confirmed as an admin
    Complete,
}

#[derive(Debug, Clone)]
pub struct SessionData {
    pub id: String,
    pub auth: AuthSession,
    pub stage: AuthStage,
    pub admin: Option<AdminUser>,
    pub expires_at: DateTime<Utc>,
    /// One-shot message shown on the next admin page
    pub flash: Option<String>,
    /// Authenticator setup waiting for its first code
    pub enrollment: Option<TotpEnrollment>,
}

impl SessionData {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionData>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn create(&self, auth: AuthSession, stage: AuthStage, admin: Option<AdminUser>) -> SessionData {
        let session = SessionData {
            id: uuid::Uuid::new_v4().simple().to_string(),
            auth,
            stage,
            admin,
            expires_at: Utc::now() + self.ttl,
            flash: None,
            enrollment: None,
        };
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        session
    }

    /// Live session by id; expired ones are dropped on sight
    pub async fn get(&self, id: &str) -> Option<SessionData> {
        let session = self.sessions.read().await.get(id).cloned()?;
        if session.is_expired() {
            self.sessions.write().await.remove(id);
            return None;
        }
        Some(session)
    }

    /// Apply `change` to a live session and return the updated copy
    pub async fn update<F>(&self, id: &str, change: F) -> Option<SessionData>
    where
        F: FnOnce(&mut SessionData),
    {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id).filter(|s| !s.is_expired())?;
        change(session);
        Some(session.clone())
    }

    pub async fn complete(&self, id: &str, auth: AuthSession, admin: AdminUser) -> Option<SessionData> {
        self.update(id, |session| {
            session.auth = auth;
            session.admin = Some(admin);
            session.stage = AuthStage::Complete;
            session.enrollment = None;
        })
        .await
    }

    pub async fn set_flash(&self, id: &str, message: impl Into<String>) {
        let message = message.into();
        self.update(id, |session| session.flash = Some(message)).await;
    }

    pub async fn take_flash(&self, id: &str) -> Option<String> {
        let mut sessions = self.sessions.write().await;
        sessions.get_mut(id).and_then(|session| session.flash.take())
    }

    pub async fn remove(&self, id: &str) -> Option<SessionData> {
        self.sessions.write().await.remove(id)
    }

    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        before - sessions.len()
    }

    pub async fn clear(&self) {
        self.sessions.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

pub fn session_cookie(id: &str) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonearm_db::{AssuranceLevel, AuthUser};

    fn auth_session() -> AuthSession {
        AuthSession {
            access_token: "token".into(),
            refresh_token: None,
            expires_at: None,
            user: AuthUser {
                id: "u1".into(),
                email: Some("admin@example.com".into()),
            },
            aal: AssuranceLevel::Aal1,
        }
    }

    #[tokio::test]
    async fn test_create_get_remove() {
        let store = SessionStore::new(Duration::hours(1));
        let session = store.create(auth_session(), AuthStage::Complete, None).await;
        assert_eq!(session.id.len(), 32);

        let found = store.get(&session.id).await.unwrap();
        assert_eq!(found.stage, AuthStage::Complete);

        assert!(store.remove(&session.id).await.is_some());
        assert!(store.get(&session.id).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_not_returned() {
        let store = SessionStore::new(Duration::seconds(-1));
        let session = store.create(auth_session(), AuthStage::Complete, None).await;
        assert!(store.get(&session.id).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_complete_moves_out_of_mfa_pending() {
        let store = SessionStore::new(Duration::hours(1));
        let pending = AuthStage::MfaPending {
            factor_id: "f1".into(),
            challenge_id: "c1".into(),
        };
        let session = store.create(auth_session(), pending, None).await;

        let mut upgraded = auth_session();
        upgraded.aal = AssuranceLevel::Aal2;
        let admin = AdminUser::new("u1".into(), "admin@example.com".into());
        let done = store.complete(&session.id, upgraded, admin).await.unwrap();
        assert_eq!(done.stage, AuthStage::Complete);
        assert_eq!(done.auth.aal, AssuranceLevel::Aal2);
        assert!(done.admin.is_some());
    }

    #[tokio::test]
    async fn test_flash_is_taken_once() {
        let store = SessionStore::new(Duration::hours(1));
        let session = store.create(auth_session(), AuthStage::Complete, None).await;
        store.set_flash(&session.id, "Saved").await;
        assert_eq!(store.take_flash(&session.id).await.as_deref(), Some("Saved"));
        assert_eq!(store.take_flash(&session.id).await, None);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let live = SessionStore::new(Duration::hours(1));
        live.create(auth_session(), AuthStage::Complete, None).await;
        assert_eq!(live.purge_expired().await, 0);
        assert_eq!(live.len().await, 1);
    }

    #[test]
    fn test_session_cookie_is_http_only() {
        let cookie = session_cookie("abc");
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }
}
