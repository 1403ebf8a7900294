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

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tonearm_core::AdminUser;

use super::RecordRepository;
use crate::error::{PlatformError, PlatformResult};
use crate::platform::{Query, TableClient};

/// The admin allowlist keyed by auth-provider user id
#[derive(Clone)]
pub struct AdminUserRepository {
    records: RecordRepository<AdminUser>,
}

impl AdminUserRepository {
    pub fn new(tables: Arc<dyn TableClient>) -> Self {
        Self {
            records: RecordRepository::new(tables),
        }
    }

    /// The row that lets `user_id` into the admin area, if any
    pub async fn find_active(&self, user_id: &str) -> PlatformResult<Option<AdminUser>> {
        self.records
            .find_one(Query::new().eq("user_id", user_id).eq("is_active", true))
            .await
    }

    pub async fn find_by_user_id(&self, user_id: &str) -> PlatformResult<Option<AdminUser>> {
        self.records
            .find_one(Query::new().eq("user_id", user_id))
            .await
    }

    pub async fn find_by_email(&self, email: &str) -> PlatformResult<Option<AdminUser>> {
        self.records
            .find_one(Query::new().eq("email", email.trim().to_lowercase()))
            .await
    }

    pub async fn list(&self) -> PlatformResult<Vec<AdminUser>> {
        self.records.list(&Query::new().order("email", true)).await
    }

    pub async fn count_active(&self) -> PlatformResult<u64> {
        self.records
            .count(&Query::new().eq("is_active", true))
            .await
    }

    /// Add or reactivate the allowlist entry for a user
    pub async fn grant(&self, user_id: &str, email: &str) -> PlatformResult<AdminUser> {
        if let Some(existing) = self.find_by_user_id(user_id).await? {
            let id = existing.id.ok_or_else(|| PlatformError::NotFound("admin_users".to_string()))?;
            self.records.set_field(id, "is_active", Value::Bool(true)).await?;
            return Ok(AdminUser {
                is_active: true,
                ..existing
            });
        }
        self.records
            .create(&AdminUser::new(user_id.to_string(), email.trim().to_lowercase()))
            .await
    }

    pub async fn deactivate(&self, user_id: &str) -> PlatformResult<()> {
        let admin = self
            .find_by_user_id(user_id)
            .await?
            .and_then(|admin| admin.id)
            .ok_or_else(|| PlatformError::NotFound("admin_users".to_string()))?;
        self.records.set_field(admin, "is_active", Value::Bool(false)).await
    }

    pub async fn remove(&self, user_id: &str) -> PlatformResult<()> {
        let admin = self
            .find_by_user_id(user_id)
            .await?
            .and_then(|admin| admin.id)
            .ok_or_else(|| PlatformError::NotFound("admin_users".to_string()))?;
        self.records.delete(admin).await
    }

    /// Record a successful second-factor check
    pub async fn stamp_mfa_verified(&self, user_id: &str) -> PlatformResult<()> {
        self.set_field_by_user(user_id, "mfa_verified_at", serde_json::json!(Utc::now()))
            .await
    }

    pub async fn set_mfa_enabled(&self, user_id: &str, enabled: bool) -> PlatformResult<()> {
        self.set_field_by_user(user_id, "mfa_enabled", Value::Bool(enabled))
            .await
    }

    async fn set_field_by_user(&self, user_id: &str, field: &str, value: Value) -> PlatformResult<()> {
        let admin = self
            .find_by_user_id(user_id)
            .await?
            .and_then(|admin| admin.id);
        match admin {
            Some(id) => self.records.set_field(id, field, value).await,
            // Stamping is bookkeeping; a user without a row fails the admin gate anyway
            None => {
                tracing::debug!(user_id = %user_id, "No admin row to stamp");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::{init_database, SqliteTables};

    async fn repo() -> AdminUserRepository {
        let pool = init_database("sqlite::memory:").await.unwrap();
        AdminUserRepository::new(Arc::new(SqliteTables::new(pool)))
    }

    #[tokio::test]
    async fn test_find_active_only_returns_active_rows() {
        let repo = repo().await;
        assert!(repo.find_active("u1").await.unwrap().is_none());

        repo.grant("u1", "Admin@Example.com").await.unwrap();
        let admin = repo.find_active("u1").await.unwrap().unwrap();
        assert_eq!(admin.email, "admin@example.com");

        repo.deactivate("u1").await.unwrap();
        assert!(repo.find_active("u1").await.unwrap().is_none());
        assert!(repo.find_by_user_id("u1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_grant_reactivates_existing_row() {
        let repo = repo().await;
        repo.grant("u1", "a@b.c").await.unwrap();
        repo.deactivate("u1").await.unwrap();
        repo.grant("u1", "a@b.c").await.unwrap();

        assert_eq!(repo.list().await.unwrap().len(), 1);
        assert_eq!(repo.count_active().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mfa_stamps() {
        let repo = repo().await;
        repo.grant("u1", "a@b.c").await.unwrap();

        repo.set_mfa_enabled("u1", true).await.unwrap();
        repo.stamp_mfa_verified("u1").await.unwrap();
        let admin = repo.find_active("u1").await.unwrap().unwrap();
        assert!(admin.mfa_enabled);
        assert!(admin.mfa_verified_at.is_some());

        // Unknown users are ignored
        repo.stamp_mfa_verified("ghost").await.unwrap();
    }

    #[tokio::test]
    async fn test_disabling_mfa_keeps_verified_stamp() {
        let repo = repo().await;
        repo.grant("u1", "a@b.c").await.unwrap();
        repo.set_mfa_enabled("u1", true).await.unwrap();
        repo.stamp_mfa_verified("u1").await.unwrap();

        repo.set_mfa_enabled("u1", false).await.unwrap();
        let admin = repo.find_active("u1").await.unwrap().unwrap();
        assert!(!admin.mfa_enabled);
        assert!(admin.mfa_verified_at.is_some());
    }

    #[tokio::test]
    async fn test_remove() {
        let repo = repo().await;
        repo.grant("u1", "a@b.c").await.unwrap();
        repo.remove("u1").await.unwrap();
        assert!(repo.find_by_user_id("u1").await.unwrap().is_none());
        assert!(matches!(repo.remove("u1").await, Err(PlatformError::NotFound(_))));
    }
}
