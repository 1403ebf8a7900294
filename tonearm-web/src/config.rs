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

use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where tables, storage and auth live
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// SQLite database and a storage directory on this machine
    Local,
    /// A hosted project reached over its REST APIs
    Supabase,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub backend: Backend,
    pub database_url: String,
    pub storage_dir: String,
    /// Origin used to build public URLs for locally stored files
    pub public_base_url: String,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub supabase_service_key: Option<String>,
    pub templates_dir: String,
    pub development_mode: bool,
    pub max_upload_size: usize,
    pub session_ttl_hours: i64,
    pub request_timeout_secs: u64,
    pub mfa_issuer: String,
    pub page_size: usize,
    /// Sign-in and MFA submissions allowed per minute
    pub login_rate_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            backend: Backend::Local,
            database_url: "sqlite:data/tonearm.db".to_string(),
            storage_dir: "data/storage".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
            supabase_url: None,
            supabase_anon_key: None,
            supabase_service_key: None,
            templates_dir: "templates".to_string(),
            development_mode: false,
            // Video uploads go up to 1 GB; leave room for the multipart envelope
            max_upload_size: 1024 * 1024 * 1024 + 1024 * 1024,
            session_ttl_hours: 12,
            request_timeout_secs: 30,
            mfa_issuer: "Tonearm".to_string(),
            page_size: 25,
            login_rate_limit: 10,
        }
    }
}

impl Config {
    /// Defaults, then `tonearm.toml`, then `TONEARM_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_figment(
            Figment::from(Serialized::defaults(Config::default()))
                .merge(Toml::file("tonearm.toml"))
                .merge(Env::prefixed("TONEARM_")),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            bail!("page_size must be at least 1");
        }
        if self.session_ttl_hours <= 0 {
            bail!("session_ttl_hours must be positive");
        }
        if self.backend == Backend::Supabase {
            if self.supabase_url.as_deref().map_or(true, str::is_empty) {
                bail!("supabase_url is required when backend = \"supabase\"");
            }
            if self.supabase_anon_key.as_deref().map_or(true, str::is_empty) {
                bail!("supabase_anon_key is required when backend = \"supabase\"");
            }
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
