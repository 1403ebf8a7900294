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

use super::category::default_true;

/// Manuals, firmware and brochures offered on `/downloads`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Download {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub file_url: String,
    #[serde(default)]
    pub file_size: Option<i64>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Download {
    pub fn new(title: String, file_url: String) -> Self {
        Self {
            id: None,
            title,
            description: None,
            category: None,
            file_url,
            file_size: None,
            version: None,
            thumbnail_url: None,
            product_id: None,
            sort_order: 0,
            is_active: true,
            created_at: None,
        }
    }

    /// Human readable size such as `2.4 MB`
    pub fn display_size(&self) -> Option<String> {
        let bytes = self.file_size? as f64;
        let units = ["B", "KB", "MB", "GB"];
        let mut value = bytes;
        let mut unit = 0;
        while value >= 1024.0 && unit < units.len() - 1 {
            value /= 1024.0;
            unit += 1;
        }
        if unit == 0 {
            Some(format!("{} {}", bytes as i64, units[0]))
        } else {
            Some(format!("{:.1} {}", value, units[unit]))
        }
    }
}

impl Record for Download {
    const TABLE: &'static str = "downloads";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn storage_urls(&self) -> Vec<String> {
        let file = Some(self.file_url.clone());
        collect_urls([&file, &self.thumbnail_url])
    }

    fn validate(&self) -> Result<(), String> {
        require(&self.title, "Title")?;
        require(&self.file_url, "File")?;
        Ok(())
    }
}

impl Sortable for Download {
    fn sort_order(&self) -> i32 {
        self.sort_order
    }

    fn set_sort_order(&mut self, sort_order: i32) {
        self.sort_order = sort_order;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_size() {
        let mut download = Download::new("Manual".to_string(), "x".to_string());
        assert_eq!(download.display_size(), None);
        download.file_size = Some(512);
        assert_eq!(download.display_size().as_deref(), Some("512 B"));
        download.file_size = Some(2_516_582);
        assert_eq!(download.display_size().as_deref(), Some("2.4 MB"));
    }

    #[test]
    fn test_validate_requires_file() {
        let download = Download::new("Manual".to_string(), String::new());
        assert_eq!(download.validate(), Err("File is required".to_string()));
    }
}
