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

use serde::{Deserialize, Serialize};

use crate::record::{collect_urls, Record, Sortable};

use super::category::default_true;

/// Hero slide on the home page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CarouselSlide {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub mobile_image_url: Option<String>,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub button_text: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl CarouselSlide {
    pub fn new(image_url: String) -> Self {
        Self {
            id: None,
            title: None,
            subtitle: None,
            image_url,
            mobile_image_url: None,
            link_url: None,
            button_text: None,
            sort_order: 0,
            is_active: true,
        }
    }
}

impl Record for CarouselSlide {
    const TABLE: &'static str = "carousel_slides";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn storage_urls(&self) -> Vec<String> {
        let image = Some(self.image_url.clone());
        collect_urls([&image, &self.mobile_image_url])
    }

    fn validate(&self) -> Result<(), String> {
        if self.image_url.trim().is_empty() {
            return Err("An image is required for every slide".to_string());
        }
        if self.button_text.is_some() && self.link_url.is_none() {
            return Err("A button needs a link".to_string());
        }
        Ok(())
    }
}

impl Sortable for CarouselSlide {
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
    fn test_validate_requires_image() {
        assert!(CarouselSlide::new(String::new()).validate().is_err());
        assert!(CarouselSlide::new("https://x/a.png".into()).validate().is_ok());
    }

    #[test]
    fn test_button_needs_link() {
        let mut slide = CarouselSlide::new("https://x/a.png".into());
        slide.button_text = Some("Shop".into());
        assert!(slide.validate().is_err());
        slide.link_url = Some("/products/amplifiers".into());
        assert!(slide.validate().is_ok());
    }
}
