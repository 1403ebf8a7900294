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

//! Clients for the hosted platform: PostgREST tables, storage buckets and
//! GoTrue auth, all sharing one HTTP client.

mod auth;
mod client;
mod rest;
mod storage;

pub use auth::SupabaseAuth;
pub use client::SupabaseClient;
pub use rest::SupabaseTables;
pub use storage::SupabaseStorage;

use std::sync::Arc;

use crate::error::PlatformResult;
use crate::platform::Platform;

/// Build a platform backed entirely by one hosted project
pub fn connect(
    base_url: &str,
    anon_key: &str,
    service_key: Option<&str>,
    timeout_secs: u64,
) -> PlatformResult<Platform> {
    let client = SupabaseClient::new(base_url, anon_key, service_key, timeout_secs)?;
    Ok(Platform::new(
        Arc::new(SupabaseTables::new(client.clone())),
        Arc::new(SupabaseStorage::new(client.clone())),
        Arc::new(SupabaseAuth::new(client)),
    ))
}
