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

use std::sync::Arc;
use tempfile::TempDir;
use tonearm_core::AdminUser;
use tonearm_db::local::{init_database, SqliteTables};
use tonearm_db::testing::{CallLog, MemoryAuth, RecordingStorage, RecordingTables};
use tonearm_db::{AdminUserRepository, AuthUser, Platform};

use crate::config::Config;
use crate::session::{AuthStage, SESSION_COOKIE};
use crate::templates::init_templates;
use crate::AppState;

/// App state over in-memory SQLite and recording fakes
pub struct TestApp {
    pub state: AppState,
    pub log: CallLog,
    pub tables: RecordingTables,
    pub storage: RecordingStorage,
    pub auth: MemoryAuth,
    _templates_dir: TempDir,
}

pub async fn create_test_app() -> Result<TestApp, anyhow::Error> {
    let pool = init_database("sqlite::memory:").await?;
    let log = CallLog::default();
    let tables = RecordingTables::new(Arc::new(SqliteTables::new(pool.clone())), log.clone());
    let storage = RecordingStorage::new(log.clone());
    let auth = MemoryAuth::new(log.clone());
    let platform = Platform::new(
        Arc::new(tables.clone()),
        Arc::new(storage.clone()),
        Arc::new(auth.clone()),
    );

    let templates_dir = TempDir::new()?;
    let config = Config {
        templates_dir: templates_dir.path().to_string_lossy().into_owned(),
        page_size: 10,
        ..Config::default()
    };
    let templates = init_templates(&config.templates_dir, false)?;

    Ok(TestApp {
        state: AppState::new(platform, templates, config, Some(pool)),
        log,
        tables,
        storage,
        auth,
        _templates_dir: templates_dir,
    })
}

impl TestApp {
    /// Auth user plus an active admin row
    pub async fn add_admin(&self, email: &str, password: &str) -> Result<(AuthUser, AdminUser), anyhow::Error> {
        let user = self.auth.add_user(email, password);
        let admin = AdminUserRepository::new(self.state.platform.tables.clone())
            .grant(&user.id, email)
            .await?;
        Ok((user, admin))
    }

    /// Session cookie for a fully signed-in admin
    pub async fn admin_cookie(&self, email: &str) -> Result<String, anyhow::Error> {
        let password = "correct horse battery";
        let (_, admin) = self.add_admin(email, password).await?;
        let auth = self
            .state
            .platform
            .auth
            .sign_in_with_password(email, password)
            .await?;
        let session = self
            .state
            .sessions
            .create(auth, AuthStage::Complete, Some(admin))
            .await;
        self.log.clear();
        Ok(format!("{}={}", SESSION_COOKIE, session.id))
    }
}
