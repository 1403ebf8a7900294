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

use crate::record::{collect_urls, require, Record, Sortable};

use super::category::default_true;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9]([a-zA-Z0-9._%+-]*[a-zA-Z0-9])?@[a-zA-Z0-9]([a-zA-Z0-9.-]*[a-zA-Z0-9])?\.[a-zA-Z]{2,}$")
        .expect("Failed to compile email regex")
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dealer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub country: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Dealer {
    pub fn new(name: String, country: String) -> Self {
        Self {
            id: None,
            name,
            country,
            region: None,
            city: None,
            address: None,
            phone: None,
            email: None,
            website: None,
            description: None,
            logo_url: None,
            cover_image: None,
            latitude: None,
            longitude: None,
            sort_order: 0,
            is_active: true,
            created_at: None,
        }
    }
}

impl Record for Dealer {
    const TABLE: &'static str = "dealers";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn storage_urls(&self) -> Vec<String> {
        collect_urls([&self.logo_url, &self.cover_image])
    }

    fn validate(&self) -> Result<(), String> {
        require(&self.name, "Name")?;
        require(&self.country, "Country")?;
        if let Some(email) = self.email.as_deref() {
            if !EMAIL_REGEX.is_match(email) {
                return Err("Invalid email format".to_string());
            }
        }
        if let Some(lat) = self.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err("Latitude must be between -90 and 90".to_string());
            }
        }
        if let Some(lng) = self.longitude {
            if !(-180.0..=180.0).contains(&lng) {
                return Err("Longitude must be between -180 and 180".to_string());
            }
        }
        Ok(())
    }
}

impl Sortable for Dealer {
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
    fn test_storage_urls_logo_and_cover() {
        let mut dealer = Dealer::new("Hifi House".to_string(), "NL".to_string());
        dealer.logo_url = Some("https://x.co/storage/v1/object/public/images/dealers/logos/a.png".into());
        dealer.cover_image = Some("".into());
        assert_eq!(dealer.storage_urls().len(), 1);
    }

    #[test]
    fn test_validate() {
        let mut dealer = Dealer::new("Hifi House".to_string(), "".to_string());
        assert_eq!(dealer.validate(), Err("Country is required".to_string()));
        dealer.country = "NL".to_string();
        dealer.email = Some("not-an-email".to_string());
        assert_eq!(dealer.validate(), Err("Invalid email format".to_string()));
        dealer.email = Some("shop@hifihouse.nl".to_string());
        dealer.latitude = Some(123.0);
        assert!(dealer.validate().is_err());
        dealer.latitude = Some(52.37);
        assert!(dealer.validate().is_ok());
    }
}
