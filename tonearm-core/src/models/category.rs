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

use crate::record::{collect_urls, require, Record, Sortable};
use crate::utils::slug::{generate_slug_from_title, is_valid_slug};

/// Product line shown as `/products/{slug}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Category {
    pub fn new(name: String) -> Self {
        let slug = generate_slug_from_title(&name);
        Self {
            id: None,
            name,
            slug,
            description: None,
            image_url: None,
            sort_order: 0,
            is_active: true,
            created_at: None,
        }
    }
}

impl Record for Category {
    const TABLE: &'static str = "categories";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn storage_urls(&self) -> Vec<String> {
        collect_urls([&self.image_url])
    }

    fn validate(&self) -> Result<(), String> {
        require(&self.name, "Name")?;
        if !is_valid_slug(&self.slug) {
            return Err("Slug may only contain lowercase letters, digits and hyphens".to_string());
        }
        Ok(())
    }
}

impl Sortable for Category {
    fn sort_order(&self) -> i32 {
        self.sort_order
    }

    fn set_sort_order(&mut self, sort_order: i32) {
        self.sort_order = sort_order;
    }
}

pub(crate) fn default_true() -> bool {
    true
}
