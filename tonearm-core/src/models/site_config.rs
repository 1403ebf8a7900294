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
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::Record;

static CONFIG_KEY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("Failed to compile config key regex"));

/// Well-known keys the storefront reads
pub mod keys {
    pub const SITE_NAME: &str = "site_name";
    pub const CONTACT: &str = "contact";
    pub const SOCIAL_LINKS: &str = "social_links";
    pub const SEO: &str = "seo";
    pub const ANNOUNCEMENT: &str = "announcement";
}

/// One key of site-wide settings with an arbitrary JSON value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub key: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SiteConfig {
    pub fn new(key: String, value: Value) -> Self {
        Self {
            id: None,
            key,
            value,
            description: None,
            updated_at: None,
        }
    }

    /// Parse the raw JSON typed into the settings textarea
    pub fn parse_value(raw: &str) -> Result<Value, String> {
        if raw.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(raw).map_err(|e| format!("Invalid JSON: {}", e))
    }

    /// Value pretty-printed for editing
    pub fn value_as_text(&self) -> String {
        serde_json::to_string_pretty(&self.value).unwrap_or_else(|_| self.value.to_string())
    }
}

impl Record for SiteConfig {
    const TABLE: &'static str = "site_config";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn validate(&self) -> Result<(), String> {
        if !CONFIG_KEY_REGEX.is_match(&self.key) {
            return Err(
                "Key must start with a letter and contain only lowercase letters, digits and underscores"
                    .to_string(),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_value() {
        assert_eq!(SiteConfig::parse_value(r#"{"a": [1, 2]}"#), Ok(json!({"a": [1, 2]})));
        assert_eq!(SiteConfig::parse_value("  "), Ok(Value::Null));
        assert!(SiteConfig::parse_value("{oops")
            .unwrap_err()
            .starts_with("Invalid JSON"));
    }

    #[test]
    fn test_validate_key() {
        assert!(SiteConfig::new("contact".into(), Value::Null).validate().is_ok());
        assert!(SiteConfig::new("social_links".into(), Value::Null).validate().is_ok());
        assert!(SiteConfig::new("Bad Key".into(), Value::Null).validate().is_err());
        assert!(SiteConfig::new("".into(), Value::Null).validate().is_err());
    }

    #[test]
    fn test_value_as_text_round_trips() {
        let config = SiteConfig::new("seo".into(), json!({"title": "Tonearm"}));
        assert_eq!(SiteConfig::parse_value(&config.value_as_text()), Ok(config.value));
    }
}
