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
use serde_json::Value;

use crate::record::{collect_urls_with_html, require, Record, Sortable};
use crate::utils::slug::{generate_slug_from_title, is_valid_slug};

use super::category::default_true;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub category_id: Option<i64>,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub model_number: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    /// Rich HTML body, may embed uploaded images
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub manual_url: Option<String>,
    /// Free-form spec sheet, e.g. `{"Output power": "2 x 120 W"}`
    #[serde(default)]
    pub specifications: Value,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    pub fn new(name: String) -> Self {
        let slug = generate_slug_from_title(&name);
        Self {
            id: None,
            category_id: None,
            name,
            slug,
            model_number: None,
            short_description: None,
            description: None,
            price: None,
            image_url: None,
            gallery: Vec::new(),
            manual_url: None,
            specifications: Value::Null,
            sort_order: 0,
            is_active: true,
            is_featured: false,
            created_at: None,
            updated_at: None,
        }
    }

    /// Specification rows in key order, for rendering as a table
    pub fn specification_rows(&self) -> Vec<(String, String)> {
        match &self.specifications {
            Value::Object(map) => map
                .iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (key.clone(), value)
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl Record for Product {
    const TABLE: &'static str = "products";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn storage_urls(&self) -> Vec<String> {
        let gallery: Vec<Option<String>> = self.gallery.iter().cloned().map(Some).collect();
        collect_urls_with_html(
            [&self.image_url]
                .into_iter()
                .chain(gallery.iter())
                .chain([&self.manual_url]),
            self.description.as_deref(),
        )
    }

    fn validate(&self) -> Result<(), String> {
        require(&self.name, "Name")?;
        if !is_valid_slug(&self.slug) {
            return Err("Slug may only contain lowercase letters, digits and hyphens".to_string());
        }
        if let Some(price) = self.price {
            if price < 0.0 {
                return Err("Price cannot be negative".to_string());
            }
        }
        if !matches!(self.specifications, Value::Null | Value::Object(_)) {
            return Err("Specifications must be a JSON object".to_string());
        }
        Ok(())
    }
}

impl Sortable for Product {
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
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const STORAGE: &str = "https://x.supabase.co/storage/v1/object/public";

    #[test]
    fn test_new_product_generates_slug() {
        let product = Product::new("TA-2000 Integrated Amplifier".to_string());
        assert_eq!(product.slug, "ta-2000-integrated-amplifier");
        assert!(product.is_active);
        assert!(product.validate().is_ok());
    }

    #[test]
    fn test_storage_urls_cover_every_file_field() {
        let mut product = Product::new("Deck".to_string());
        product.image_url = Some(format!("{}/images/products/a.png", STORAGE));
        product.gallery = vec![format!("{}/images/products/b.png", STORAGE)];
        product.manual_url = Some(format!("{}/downloads/manuals/m.pdf", STORAGE));
        product.description = Some(format!(r#"<p><img src="{}/general/c.png"></p>"#, STORAGE));

        assert_eq!(
            product.storage_urls(),
            vec![
                format!("{}/images/products/a.png", STORAGE),
                format!("{}/images/products/b.png", STORAGE),
                format!("{}/downloads/manuals/m.pdf", STORAGE),
                format!("{}/general/c.png", STORAGE),
            ]
        );
    }

    #[test]
    fn test_validate() {
        let mut product = Product::new("Deck".to_string());
        product.price = Some(-1.0);
        assert_eq!(product.validate(), Err("Price cannot be negative".to_string()));

        let mut product = Product::new("Deck".to_string());
        product.specifications = json!(["not", "an", "object"]);
        assert!(product.validate().is_err());

        let mut product = Product::new(" ".to_string());
        product.slug = "x".to_string();
        assert_eq!(product.validate(), Err("Name is required".to_string()));
    }

    #[test]
    fn test_deserializes_sparse_row() {
        let product: Product = serde_json::from_value(json!({
            "id": 4,
            "name": "Phono",
            "slug": "phono",
            "created_at": "2025-01-02T03:04:05.123456+00:00"
        }))
        .unwrap();
        assert_eq!(product.id, Some(4));
        assert!(product.is_active);
        assert!(product.gallery.is_empty());
        assert!(product.created_at.is_some());
    }

    #[test]
    fn test_insert_shape_omits_id() {
        let value = serde_json::to_value(Product::new("Deck".to_string())).unwrap();
        assert!(value.get("id").is_none());
        assert!(value.get("created_at").is_none());
    }

    #[test]
    fn test_specification_rows() {
        let mut product = Product::new("Deck".to_string());
        product.specifications = json!({"Weight": "12 kg", "Channels": 2});
        let rows = product.specification_rows();
        assert!(rows.contains(&("Weight".to_string(), "12 kg".to_string())));
        assert!(rows.contains(&("Channels".to_string(), "2".to_string())));
    }
}
