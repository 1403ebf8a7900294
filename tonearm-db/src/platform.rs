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

//! Contracts of the hosted services the CMS runs on: a table service with a
//! small query builder, object storage and an auth provider with TOTP MFA.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::error::{PlatformError, PlatformResult};

static COLUMN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("Failed to compile column regex"));

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    /// Case-insensitive match, `%` is the wildcard
    ILike(String, String),
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(column, _) | Filter::ILike(column, _) => column,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Filters, ordering and paging for a table call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.into()));
        self
    }

    pub fn ilike(mut self, column: &str, pattern: &str) -> Self {
        self.filters
            .push(Filter::ILike(column.to_string(), pattern.to_string()));
        self
    }

    /// Substring search on one column
    pub fn search(self, column: &str, term: &str) -> Self {
        let escaped = term.replace('%', "").replace('_', " ");
        self.ilike(column, &format!("%{}%", escaped.trim()))
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn range(mut self, offset: usize, limit: usize) -> Self {
        self.offset = Some(offset);
        self.limit = Some(limit);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Same filters without ordering or paging, as used for counts
    pub fn filters_only(&self) -> Self {
        Self {
            filters: self.filters.clone(),
            ..Self::default()
        }
    }

    /// Reject column names that could not be a plain identifier
    pub fn check_columns(&self) -> PlatformResult<()> {
        let columns = self
            .filters
            .iter()
            .map(Filter::column)
            .chain(self.order.iter().map(|order| order.column.as_str()));
        for column in columns {
            if !is_valid_column(column) {
                return Err(PlatformError::Validation(format!(
                    "Invalid column name: {}",
                    column
                )));
            }
        }
        Ok(())
    }
}

pub fn is_valid_column(name: &str) -> bool {
    COLUMN_REGEX.is_match(name)
}

#[async_trait]
pub trait TableClient: Send + Sync {
    async fn select(&self, table: &str, query: &Query) -> PlatformResult<Vec<Value>>;

    async fn count(&self, table: &str, query: &Query) -> PlatformResult<u64>;

    /// Insert one row and return it as stored
    async fn insert(&self, table: &str, row: Value) -> PlatformResult<Value>;

    /// Merge `patch` into every matching row and return the updated rows
    async fn update(&self, table: &str, query: &Query, patch: Value) -> PlatformResult<Vec<Value>>;

    /// Delete every matching row and return how many went
    async fn delete(&self, table: &str, query: &Query) -> PlatformResult<u64>;
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> PlatformResult<()>;

    fn public_url(&self, bucket: &str, path: &str) -> String;

    async fn remove(&self, bucket: &str, paths: &[String]) -> PlatformResult<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// `aal1` after a password, `aal2` after a second factor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssuranceLevel {
    Aal1,
    Aal2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: AuthUser,
    pub aal: AssuranceLevel,
}

/// Renew access tokens this close to their expiry
const REFRESH_MARGIN_SECS: i64 = 60;

impl AuthSession {
    /// The access token has expired or is about to
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|at| at <= now + Duration::seconds(REFRESH_MARGIN_SECS))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FactorStatus {
    Verified,
    Unverified,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Factor {
    pub id: String,
    pub factor_type: String,
    pub status: FactorStatus,
    #[serde(default)]
    pub friendly_name: Option<String>,
}

impl Factor {
    pub fn is_verified_totp(&self) -> bool {
        self.factor_type == "totp" && self.status == FactorStatus::Verified
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Challenge {
    pub id: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Material shown to the admin while setting up an authenticator app
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TotpEnrollment {
    pub factor_id: String,
    pub secret: String,
    /// `data:image/...` URL or inline SVG, renderable as an `<img src>`
    pub qr_code: String,
    pub uri: String,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> PlatformResult<AuthSession>;

    async fn sign_out(&self, session: &AuthSession) -> PlatformResult<()>;

    /// Exchange the session for a new one with a fresh access token
    async fn refresh(&self, session: &AuthSession) -> PlatformResult<AuthSession>;

    async fn get_user(&self, access_token: &str) -> PlatformResult<AuthUser>;

    async fn list_factors(&self, session: &AuthSession) -> PlatformResult<Vec<Factor>>;

    async fn challenge(&self, session: &AuthSession, factor_id: &str) -> PlatformResult<Challenge>;

    /// Verify a code against a challenge; returns the upgraded session
    async fn verify(
        &self,
        session: &AuthSession,
        factor_id: &str,
        challenge_id: &str,
        code: &str,
    ) -> PlatformResult<AuthSession>;

    async fn enroll_totp(
        &self,
        session: &AuthSession,
        friendly_name: &str,
    ) -> PlatformResult<TotpEnrollment>;

    async fn unenroll(&self, session: &AuthSession, factor_id: &str) -> PlatformResult<()>;
}

/// The three services bundled for the application context
#[derive(Clone)]
pub struct Platform {
    pub tables: Arc<dyn TableClient>,
    pub storage: Arc<dyn ObjectStorage>,
    pub auth: Arc<dyn AuthProvider>,
}

impl Platform {
    pub fn new(
        tables: Arc<dyn TableClient>,
        storage: Arc<dyn ObjectStorage>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        Self {
            tables,
            storage,
            auth,
        }
    }
}
