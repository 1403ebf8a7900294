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

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;

/// Submitted form fields with the coercions the admin screens need.
///
/// Every accessor trims input and treats blank fields as absent.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
}

impl FormData {
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }

    pub fn raw(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.raw(name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    /// Text fields like HTML bodies where surrounding whitespace is kept
    pub fn body(&self, name: &str) -> String {
        self.raw(name).unwrap_or_default().to_string()
    }

    pub fn required(&self, name: &str, label: &str) -> Result<String, String> {
        self.text(name)
            .ok_or_else(|| format!("{} is required", label))
    }

    pub fn int(&self, name: &str) -> Result<Option<i64>, String> {
        self.text(name)
            .map(|value| {
                value
                    .parse::<i64>()
                    .map_err(|_| format!("{} must be a whole number", name))
            })
            .transpose()
    }

    pub fn int_or(&self, name: &str, default: i64) -> Result<i64, String> {
        Ok(self.int(name)?.unwrap_or(default))
    }

    pub fn float(&self, name: &str) -> Result<Option<f64>, String> {
        self.text(name)
            .map(|value| {
                value
                    .replace(',', ".")
                    .parse::<f64>()
                    .ok()
                    .filter(|number| number.is_finite())
                    .ok_or_else(|| format!("{} must be a number", name))
            })
            .transpose()
    }

    /// Checkbox semantics: unchecked boxes are simply not submitted
    pub fn flag(&self, name: &str) -> bool {
        matches!(
            self.text(name).map(|value| value.to_lowercase()).as_deref(),
            Some("on" | "true" | "1" | "yes")
        )
    }

    /// One entry per non-blank line
    pub fn lines(&self, name: &str) -> Vec<String> {
        self.raw(name)
            .unwrap_or_default()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn json(&self, name: &str) -> Result<Option<Value>, String> {
        self.text(name)
            .map(|value| {
                serde_json::from_str::<Value>(&value)
                    .map_err(|e| format!("{} is not valid JSON: {}", name, e))
            })
            .transpose()
    }

    /// Accepts `datetime-local` input values, plain dates and RFC 3339
    pub fn datetime(&self, name: &str) -> Result<Option<DateTime<Utc>>, String> {
        let Some(value) = self.text(name) else {
            return Ok(None);
        };

        if let Ok(parsed) = DateTime::parse_from_rfc3339(&value) {
            return Ok(Some(parsed.with_timezone(&Utc)));
        }
        for format in ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
            if let Ok(parsed) = NaiveDateTime::parse_from_str(&value, format) {
                return Ok(Some(parsed.and_utc()));
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(&value, "%Y-%m-%d") {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                return Ok(Some(midnight.and_utc()));
            }
        }

        Err(format!("{} is not a valid date", name))
    }
}

impl From<HashMap<String, String>> for FormData {
    fn from(fields: HashMap<String, String>) -> Self {
        Self::new(fields)
    }
}

impl<const N: usize> From<[(&str, &str); N]> for FormData {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Self::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}
