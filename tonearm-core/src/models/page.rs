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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{require, Record};
use crate::utils::storage_url::extract_storage_urls_from_html;
use crate::utils::slug::{generate_slug_from_title, is_valid_slug};

/// Free-form content page such as "About" or "Warranty"
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    pub slug: String,
    /// HTML body
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Page {
    pub fn new(title: String, content: String) -> Self {
        let slug = generate_slug_from_title(&title);
        Self {
            id: None,
            title,
            slug,
            content,
            meta_description: None,
            is_published: false,
            created_at: None,
            updated_at: None,
        }
    }
}

impl Record for Page {
    const TABLE: &'static str = "pages";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn storage_urls(&self) -> Vec<String> {
        extract_storage_urls_from_html(&self.content)
    }

    fn validate(&self) -> Result<(), String> {
        require(&self.title, "Title")?;
        if !is_valid_slug(&self.slug) {
            return Err("Slug may only contain lowercase letters, digits and hyphens".to_string());
        }
        Ok(())
    }
}
