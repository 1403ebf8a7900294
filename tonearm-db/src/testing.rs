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

//! Recording fakes for sequencing tests, shared with downstream crates
//! through the `testing` feature.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{PlatformError, PlatformResult};
use crate::platform::{
    AssuranceLevel, AuthProvider, AuthSession, AuthUser, Challenge, Factor, FactorStatus,
    ObjectStorage, Query, TableClient, TotpEnrollment,
};

/// The one code `MemoryAuth` accepts
pub const VALID_CODE: &str = "123456";

/// Ordered log of platform calls such as `delete:dealers` or `remove:images`
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, call: impl Into<String>) {
        if let Ok(mut calls) = self.0.lock() {
            calls.push(call.into());
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut calls) = self.0.lock() {
            calls.clear();
        }
    }

    pub fn contains(&self, call: &str) -> bool {
        self.calls().iter().any(|c| c == call)
    }
}

/// Wraps a real table client, logging each call and optionally failing updates
#[derive(Clone)]
pub struct RecordingTables {
    inner: Arc<dyn TableClient>,
    log: CallLog,
    fail_updates: Arc<AtomicBool>,
}

impl RecordingTables {
    pub fn new(inner: Arc<dyn TableClient>, log: CallLog) -> Self {
        Self {
            inner,
            log,
            fail_updates: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TableClient for RecordingTables {
    async fn select(&self, table: &str, query: &Query) -> PlatformResult<Vec<Value>> {
        self.log.push(format!("select:{}", table));
        self.inner.select(table, query).await
    }

    async fn count(&self, table: &str, query: &Query) -> PlatformResult<u64> {
        self.log.push(format!("count:{}", table));
        self.inner.count(table, query).await
    }

    async fn insert(&self, table: &str, row: Value) -> PlatformResult<Value> {
        self.log.push(format!("insert:{}", table));
        self.inner.insert(table, row).await
    }

    async fn update(&self, table: &str, query: &Query, patch: Value) -> PlatformResult<Vec<Value>> {
        self.log.push(format!("update:{}", table));
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(PlatformError::api(503, None, "Service unavailable"));
        }
        self.inner.update(table, query, patch).await
    }

    async fn delete(&self, table: &str, query: &Query) -> PlatformResult<u64> {
        self.log.push(format!("delete:{}", table));
        self.inner.delete(table, query).await
    }
}

/// Storage that keeps nothing, logging uploads and removes
#[derive(Clone, Default)]
pub struct RecordingStorage {
    log: CallLog,
    fail_removes: Arc<AtomicBool>,
}

impl RecordingStorage {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            fail_removes: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStorage for RecordingStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        _data: Vec<u8>,
        _content_type: &str,
    ) -> PlatformResult<()> {
        self.log.push(format!("upload:{}/{}", bucket, path));
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("https://storage.test/storage/v1/object/public/{}/{}", bucket, path)
    }

    async fn remove(&self, bucket: &str, _paths: &[String]) -> PlatformResult<()> {
        self.log.push(format!("remove:{}", bucket));
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(PlatformError::api(500, None, "Storage unavailable"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct MemoryUser {
    password: String,
    user: AuthUser,
}

/// In-memory auth provider; every TOTP code except `VALID_CODE` is wrong
#[derive(Clone, Default)]
pub struct MemoryAuth {
    users: Arc<Mutex<HashMap<String, MemoryUser>>>,
    factors: Arc<Mutex<HashMap<String, Vec<Factor>>>>,
    next_id: Arc<AtomicUsize>,
    log: CallLog,
}

impl MemoryAuth {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn add_user(&self, email: &str, password: &str) -> AuthUser {
        let user = AuthUser {
            id: format!("user-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
            email: Some(email.to_string()),
        };
        if let Ok(mut users) = self.users.lock() {
            users.insert(
                email.to_string(),
                MemoryUser {
                    password: password.to_string(),
                    user: user.clone(),
                },
            );
        }
        user
    }

    pub fn add_factor(&self, user_id: &str, status: FactorStatus) -> String {
        let id = format!("factor-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        if let Ok(mut factors) = self.factors.lock() {
            factors.entry(user_id.to_string()).or_default().push(Factor {
                id: id.clone(),
                factor_type: "totp".to_string(),
                status,
                friendly_name: None,
            });
        }
        id
    }

    fn session_for(&self, user: AuthUser, aal: AssuranceLevel) -> AuthSession {
        AuthSession {
            access_token: format!("token-{}", user.id),
            refresh_token: Some(format!("refresh-{}", user.id)),
            expires_at: None,
            user,
            aal,
        }
    }

    fn user_factors(&self, user_id: &str) -> Vec<Factor> {
        self.factors
            .lock()
            .ok()
            .and_then(|factors| factors.get(user_id).cloned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> PlatformResult<AuthSession> {
        self.log.push("auth:sign_in");
        let user = self
            .users
            .lock()
            .ok()
            .and_then(|users| users.get(email).cloned())
            .filter(|entry| entry.password == password)
            .ok_or_else(|| PlatformError::api(400, None, "Invalid login credentials"))?;
        Ok(self.session_for(user.user, AssuranceLevel::Aal1))
    }

    async fn sign_out(&self, _session: &AuthSession) -> PlatformResult<()> {
        self.log.push("auth:sign_out");
        Ok(())
    }

    async fn refresh(&self, session: &AuthSession) -> PlatformResult<AuthSession> {
        self.log.push("auth:refresh");
        if session.refresh_token.is_none() {
            return Err(PlatformError::api(401, None, "Invalid refresh token"));
        }
        let mut fresh = self.session_for(session.user.clone(), session.aal);
        fresh.expires_at = Some(Utc::now() + chrono::Duration::hours(1));
        Ok(fresh)
    }

    async fn get_user(&self, access_token: &str) -> PlatformResult<AuthUser> {
        self.log.push("auth:get_user");
        let user_id = access_token.trim_start_matches("token-");
        self.users
            .lock()
            .ok()
            .and_then(|users| users.values().find(|u| u.user.id == user_id).cloned())
            .map(|entry| entry.user)
            .ok_or_else(|| PlatformError::api(401, None, "Invalid token"))
    }

    async fn list_factors(&self, session: &AuthSession) -> PlatformResult<Vec<Factor>> {
        self.log.push("auth:list_factors");
        Ok(self.user_factors(&session.user.id))
    }

    async fn challenge(&self, session: &AuthSession, factor_id: &str) -> PlatformResult<Challenge> {
        self.log.push("auth:challenge");
        if !self
            .user_factors(&session.user.id)
            .iter()
            .any(|f| f.id == factor_id)
        {
            return Err(PlatformError::api(404, None, "Factor not found"));
        }
        Ok(Challenge {
            id: format!("challenge-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
            expires_at: None,
        })
    }

    async fn verify(
        &self,
        session: &AuthSession,
        factor_id: &str,
        _challenge_id: &str,
        code: &str,
    ) -> PlatformResult<AuthSession> {
        self.log.push("auth:verify");
        if code != VALID_CODE {
            return Err(PlatformError::api(422, Some("mfa_verification_failed"), "Invalid TOTP code entered"));
        }
        if let Ok(mut factors) = self.factors.lock() {
            if let Some(factor) = factors
                .get_mut(&session.user.id)
                .and_then(|list| list.iter_mut().find(|f| f.id == factor_id))
            {
                factor.status = FactorStatus::Verified;
            }
        }
        Ok(self.session_for(session.user.clone(), AssuranceLevel::Aal2))
    }

    async fn enroll_totp(
        &self,
        session: &AuthSession,
        _friendly_name: &str,
    ) -> PlatformResult<TotpEnrollment> {
        self.log.push("auth:enroll");
        let factor_id = self.add_factor(&session.user.id, FactorStatus::Unverified);
        Ok(TotpEnrollment {
            factor_id,
            secret: "JBSWY3DPEHPK3PXP".to_string(),
            qr_code: "data:image/png;base64,AAAA".to_string(),
            uri: "otpauth://totp/Tonearm:test?secret=JBSWY3DPEHPK3PXP".to_string(),
        })
    }

    async fn unenroll(&self, session: &AuthSession, factor_id: &str) -> PlatformResult<()> {
        self.log.push("auth:unenroll");
        if let Ok(mut factors) = self.factors.lock() {
            if let Some(list) = factors.get_mut(&session.user.id) {
                list.retain(|f| f.id != factor_id);
            }
        }
        Ok(())
    }
}
