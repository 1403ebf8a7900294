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

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tonearm_core::Record;
use tonearm_db::{
    local, supabase, AdminUserRepository, Platform, RecordRepository, SiteConfigRepository,
    StorageJanitor, VisitLogRepository,
};

use crate::autoreload_templates::TemplateEngine;
use crate::config::{Backend, Config};
use crate::mfa::AuthFlow;
use crate::rate_limit::{create_login_rate_limiter, SharedRateLimiter};
use crate::session::SessionStore;
use crate::templates::init_templates;

/// Application context shared by every handler.
///
/// Built once by `init` and torn down by `dispose`; nothing else holds
/// process-wide state.
#[derive(Clone)]
pub struct AppState {
    pub platform: Platform,
    pub templates: TemplateEngine,
    pub config: Config,
    pub sessions: SessionStore,
    pub login_rate_limiter: SharedRateLimiter,
    /// Present for the local backend only
    pub pool: Option<SqlitePool>,
}

impl AppState {
    pub fn new(
        platform: Platform,
        templates: TemplateEngine,
        config: Config,
        pool: Option<SqlitePool>,
    ) -> Self {
        Self {
            sessions: SessionStore::new(config.session_ttl()),
            login_rate_limiter: create_login_rate_limiter(config.login_rate_limit),
            platform,
            templates,
            config,
            pool,
        }
    }

    /// Connect the configured backend and load templates
    pub async fn init(config: Config) -> Result<Self> {
        let (platform, pool) = match config.backend {
            Backend::Local => {
                let pool = local::init_database(&config.database_url)
                    .await
                    .context("Failed to initialize database")?;
                tokio::fs::create_dir_all(&config.storage_dir)
                    .await
                    .with_context(|| format!("Failed to create {}", config.storage_dir))?;
                let platform = local::platform(
                    pool.clone(),
                    &config.storage_dir,
                    &config.public_base_url,
                    &config.mfa_issuer,
                    config.session_ttl(),
                );
                tracing::info!(database = %config.database_url, storage = %config.storage_dir, "Using local backend");
                (platform, Some(pool))
            }
            Backend::Supabase => {
                let url = config.supabase_url.as_deref().unwrap_or_default();
                let platform = supabase::connect(
                    url,
                    config.supabase_anon_key.as_deref().unwrap_or_default(),
                    config.supabase_service_key.as_deref(),
                    config.request_timeout_secs,
                )
                .context("Failed to configure hosted backend")?;
                tracing::info!(url, "Using hosted backend");
                (platform, None)
            }
        };

        let templates = init_templates(&config.templates_dir, config.development_mode)
            .context("Failed to initialize templates")?;

        Ok(Self::new(platform, templates, config, pool))
    }

    /// Drop every session and close the database
    pub async fn dispose(self) {
        self.sessions.clear().await;
        if let Some(pool) = self.pool {
            pool.close().await;
        }
        tracing::info!("Application state disposed");
    }

    pub fn flow(&self) -> AuthFlow {
        AuthFlow::new(&self.platform)
    }

    pub fn janitor(&self) -> StorageJanitor {
        StorageJanitor::new(self.platform.storage.clone())
    }

    pub fn repo<T: Record>(&self) -> RecordRepository<T> {
        RecordRepository::new(self.platform.tables.clone())
    }

    pub fn admins(&self) -> AdminUserRepository {
        AdminUserRepository::new(self.platform.tables.clone())
    }

    pub fn site_config(&self) -> SiteConfigRepository {
        SiteConfigRepository::new(self.platform.tables.clone())
    }

    pub fn visits(&self) -> VisitLogRepository {
        VisitLogRepository::new(self.platform.tables.clone())
    }
}
