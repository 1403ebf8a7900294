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

use crate::record::{collect_urls_with_html, require, Record};
use crate::utils::slug::{generate_slug_from_title, is_valid_slug};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsArticle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    /// HTML body
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl NewsArticle {
    pub fn new(title: String, content: String) -> Self {
        let slug = generate_slug_from_title(&title);
        Self {
            id: None,
            title,
            slug,
            excerpt: None,
            content,
            cover_image: None,
            author: None,
            published_at: None,
            is_published: false,
            created_at: None,
            updated_at: None,
        }
    }

    /// Publishing without an explicit date stamps the current time
    pub fn publish(&mut self) {
        self.is_published = true;
        if self.published_at.is_none() {
            self.published_at = Some(Utc::now());
        }
    }
}

impl Record for NewsArticle {
    const TABLE: &'static str = "news";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn storage_urls(&self) -> Vec<String> {
        collect_urls_with_html([&self.cover_image], Some(&self.content))
    }

    fn validate(&self) -> Result<(), String> {
        require(&self.title, "Title")?;
        require(&self.content, "Content")?;
        if !is_valid_slug(&self.slug) {
            return Err("Slug may only contain lowercase letters, digits and hyphens".to_string());
        }
        Ok(())
    }
}
