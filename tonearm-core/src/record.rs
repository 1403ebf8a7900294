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

use serde::{de::DeserializeOwned, Serialize};

use crate::utils::storage_url::extract_storage_urls_from_html;

/// A row stored in a named table of the content store.
///
/// Serialization is the wire shape: `id` and server-assigned timestamps are
/// skipped when absent so inserts let the table service fill them in.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Table the rows live in.
    const TABLE: &'static str;

    fn id(&self) -> Option<i64>;

    /// Public storage URLs this row references, in field order.
    ///
    /// Used when the row is deleted to clean up the objects behind it.
    fn storage_urls(&self) -> Vec<String> {
        Vec::new()
    }

    /// Local validation run before any write reaches the table service.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Rows displayed in a manual order driven by `sort_order`.
pub trait Sortable: Record {
    fn sort_order(&self) -> i32;
    fn set_sort_order(&mut self, sort_order: i32);
}

/// Collects file-bearing fields that are set and non-empty.
pub(crate) fn collect_urls<'a>(fields: impl IntoIterator<Item = &'a Option<String>>) -> Vec<String> {
    fields
        .into_iter()
        .filter_map(|field| field.as_deref())
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

/// File-bearing fields followed by images embedded in an HTML body.
pub(crate) fn collect_urls_with_html<'a>(
    fields: impl IntoIterator<Item = &'a Option<String>>,
    html: Option<&str>,
) -> Vec<String> {
    let mut urls = collect_urls(fields);
    if let Some(html) = html {
        urls.extend(extract_storage_urls_from_html(html));
    }
    urls
}

/// Shared check for required text fields.
pub(crate) fn require(value: &str, label: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", label));
    }
    Ok(())
}
