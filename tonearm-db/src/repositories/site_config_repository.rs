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

use serde_json::{Map, Value};
use std::sync::Arc;
use tonearm_core::SiteConfig;

use super::RecordRepository;
use crate::error::PlatformResult;
use crate::platform::{Query, TableClient};

#[derive(Clone)]
pub struct SiteConfigRepository {
    records: RecordRepository<SiteConfig>,
}

impl SiteConfigRepository {
    pub fn new(tables: Arc<dyn TableClient>) -> Self {
        Self {
            records: RecordRepository::new(tables),
        }
    }

    pub async fn get(&self, key: &str) -> PlatformResult<Option<SiteConfig>> {
        self.records.find_one(Query::new().eq("key", key)).await
    }

    pub async fn get_value(&self, key: &str) -> PlatformResult<Option<Value>> {
        Ok(self.get(key).await?.map(|entry| entry.value))
    }

    pub async fn all(&self) -> PlatformResult<Vec<SiteConfig>> {
        self.records.list(&Query::new().order("key", true)).await
    }

    /// Every key folded into one object, as handed to templates
    pub async fn as_map(&self) -> PlatformResult<Map<String, Value>> {
        Ok(self
            .all()
            .await?
            .into_iter()
            .map(|entry| (entry.key, entry.value))
            .collect())
    }

    /// Insert the key or replace its value
    pub async fn set(&self, key: &str, value: Value) -> PlatformResult<SiteConfig> {
        match self.get(key).await? {
            Some(mut existing) => {
                existing.value = value;
                match existing.id {
                    Some(id) => self.records.update(id, &existing).await,
                    None => self.records.create(&existing).await,
                }
            }
            None => {
                self.records
                    .create(&SiteConfig::new(key.to_string(), value))
                    .await
            }
        }
    }

    pub async fn delete(&self, key: &str) -> PlatformResult<bool> {
        match self.get(key).await?.and_then(|entry| entry.id) {
            Some(id) => {
                self.records.delete(id).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlatformError;
    use crate::local::{init_database, SqliteTables};
    use serde_json::json;

    async fn repo() -> SiteConfigRepository {
        let pool = init_database("sqlite::memory:").await.unwrap();
        SiteConfigRepository::new(Arc::new(SqliteTables::new(pool)))
    }

    #[tokio::test]
    async fn test_set_is_an_upsert() {
        let repo = repo().await;
        repo.set("site_name", json!("Tonearm Audio")).await.unwrap();
        repo.set("site_name", json!("Tonearm Hi-Fi")).await.unwrap();

        assert_eq!(repo.all().await.unwrap().len(), 1);
        assert_eq!(
            repo.get_value("site_name").await.unwrap(),
            Some(json!("Tonearm Hi-Fi"))
        );
    }

    #[tokio::test]
    async fn test_as_map() {
        let repo = repo().await;
        repo.set("contact", json!({"email": "info@example.com"})).await.unwrap();
        repo.set("site_name", json!("Tonearm")).await.unwrap();

        let map = repo.as_map().await.unwrap();
        assert_eq!(map["contact"]["email"], json!("info@example.com"));
        assert_eq!(map["site_name"], json!("Tonearm"));
    }

    #[tokio::test]
    async fn test_invalid_key_is_rejected_locally() {
        let repo = repo().await;
        let err = repo.set("Bad Key", json!(1)).await.unwrap_err();
        assert!(matches!(err, PlatformError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = repo().await;
        repo.set("seo", json!({})).await.unwrap();
        assert!(repo.delete("seo").await.unwrap());
        assert!(!repo.delete("seo").await.unwrap());
    }
}
