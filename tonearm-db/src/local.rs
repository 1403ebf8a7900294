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

//! Self-hosted backends: JSON rows in SQLite, files on disk and a small
//! password + TOTP auth service. Used for development and single-box deploys.

mod auth;
mod init;
mod storage;
mod tables;

pub use auth::LocalAuth;
pub use init::init_database;
pub use storage::FsStorage;
pub use tables::SqliteTables;

use chrono::Duration;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;

use crate::platform::Platform;

/// Build a platform over one SQLite pool and a storage directory
pub fn platform(
    pool: SqlitePool,
    storage_dir: impl Into<PathBuf>,
    public_base_url: &str,
    mfa_issuer: &str,
    session_ttl: Duration,
) -> Platform {
    Platform::new(
        Arc::new(SqliteTables::new(pool.clone())),
        Arc::new(FsStorage::new(storage_dir, public_base_url)),
        Arc::new(LocalAuth::new(pool, mfa_issuer, session_ttl)),
    )
}
