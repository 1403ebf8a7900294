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

//! Removal of storage objects referenced by rows that are being deleted or
//! whose files were replaced.
//!
//! Cleanup is best effort. The row operation always happens first and is
//! never undone because a storage call failed.

use std::collections::BTreeSet;
use std::sync::Arc;
use tonearm_core::utils::storage_url::{extract_storage_urls_from_html, group_by_bucket};
use tonearm_core::Record;

use crate::error::PlatformResult;
use crate::platform::ObjectStorage;
use crate::repositories::RecordRepository;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanupReport {
    /// Objects removed, as `bucket/path`
    pub removed: Vec<String>,
    /// Buckets whose remove call failed, with the error message
    pub failed: Vec<(String, String)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Clone)]
pub struct StorageJanitor {
    storage: Arc<dyn ObjectStorage>,
}

impl StorageJanitor {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    /// Remove the objects behind `urls`, one call per bucket.
    ///
    /// URLs that do not point into storage are skipped. Failures are logged
    /// and reported, never returned as errors.
    pub async fn remove_urls<I, S>(&self, urls: I) -> CleanupReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = CleanupReport::default();
        for (bucket, paths) in group_by_bucket(urls) {
            match self.storage.remove(&bucket, &paths).await {
                Ok(()) => {
                    report
                        .removed
                        .extend(paths.iter().map(|path| format!("{}/{}", bucket, path)));
                }
                Err(e) => {
                    tracing::warn!(bucket = %bucket, count = paths.len(), error = %e, "Failed to remove storage objects");
                    report.failed.push((bucket, e.to_string()));
                }
            }
        }
        report
    }

    /// Remove every storage image embedded in an HTML body
    pub async fn remove_html_references(&self, html: &str) -> CleanupReport {
        self.remove_urls(extract_storage_urls_from_html(html)).await
    }

    /// Remove files the old version of a row referenced and the new one no longer does
    pub async fn cleanup_replaced_files<T: Record>(&self, old: &T, new: &T) -> CleanupReport {
        let kept: BTreeSet<String> = new.storage_urls().into_iter().collect();
        let dropped: Vec<String> = old
            .storage_urls()
            .into_iter()
            .filter(|url| !kept.contains(url))
            .collect();
        self.remove_urls(dropped).await
    }
}

/// Delete a row, then the storage objects it referenced.
///
/// The row delete is authoritative: its error is returned and no storage is
/// touched. Storage failures afterwards only show up in the report.
// Objects are not reference counted. A file shared with another row is
// removed here as well.
pub async fn delete_with_storage<T: Record>(
    repo: &RecordRepository<T>,
    janitor: &StorageJanitor,
    record: &T,
) -> PlatformResult<CleanupReport> {
    let id = record
        .id()
        .ok_or_else(|| crate::error::PlatformError::Validation("Record has no id".to_string()))?;
    repo.delete(id).await?;

    let report = janitor.remove_urls(record.storage_urls()).await;
    tracing::info!(
        table = T::TABLE,
        id,
        removed = report.removed.len(),
        failed = report.failed.len(),
        "Deleted record"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Query, TableClient};
    use crate::testing::{CallLog, RecordingStorage, RecordingTables};
    use crate::local::{init_database, SqliteTables};
    use pretty_assertions::assert_eq;
    use tonearm_core::models::{Dealer, Product};

    const BASE: &str = "https://x.supabase.co/storage/v1/object/public";

    async fn fixture() -> (RecordingTables, RecordingStorage, CallLog) {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let log = CallLog::default();
        let tables = RecordingTables::new(Arc::new(SqliteTables::new(pool)), log.clone());
        let storage = RecordingStorage::new(log.clone());
        (tables, storage, log)
    }

    fn dealer() -> Dealer {
        let mut dealer = Dealer::new("Hifi Corner".into(), "France".into());
        dealer.logo_url = Some(format!("{}/images/dealers/logo.png", BASE));
        dealer.cover_image = Some(format!("{}/images/dealers/cover.jpg", BASE));
        dealer
    }

    #[tokio::test]
    async fn test_dealer_delete_removes_row_then_one_call_per_bucket() {
        let (tables, storage, log) = fixture().await;
        let tables = Arc::new(tables);
        let repo = RecordRepository::<Dealer>::new(tables.clone());
        let janitor = StorageJanitor::new(Arc::new(storage));

        let created = repo.create(&dealer()).await.unwrap();
        log.clear();

        let report = delete_with_storage(&repo, &janitor, &created).await.unwrap();
        assert_eq!(
            log.calls(),
            vec!["delete:dealers".to_string(), "remove:images".to_string()]
        );
        assert_eq!(
            report.removed,
            vec!["images/dealers/logo.png".to_string(), "images/dealers/cover.jpg".to_string()]
        );
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_storage_failure_does_not_restore_row() {
        let (tables, storage, log) = fixture().await;
        let tables = Arc::new(tables);
        let repo = RecordRepository::<Dealer>::new(tables.clone());
        storage.fail_removes(true);
        let janitor = StorageJanitor::new(Arc::new(storage));

        let created = repo.create(&dealer()).await.unwrap();
        log.clear();

        let report = delete_with_storage(&repo, &janitor, &created).await.unwrap();
        assert!(!report.is_clean());
        assert_eq!(report.failed[0].0, "images");
        assert_eq!(tables.count("dealers", &Query::new()).await.unwrap(), 0);
        assert_eq!(log.calls()[0], "delete:dealers");
    }

    #[tokio::test]
    async fn test_failed_row_delete_touches_no_storage() {
        let (tables, storage, log) = fixture().await;
        let repo = RecordRepository::<Dealer>::new(Arc::new(tables));
        let janitor = StorageJanitor::new(Arc::new(storage));

        let mut ghost = dealer();
        ghost.id = Some(42);
        assert!(delete_with_storage(&repo, &janitor, &ghost).await.is_err());
        assert_eq!(log.calls(), vec!["delete:dealers".to_string()]);
    }

    #[tokio::test]
    async fn test_product_cleanup_groups_buckets() {
        let (_, storage, log) = fixture().await;
        let janitor = StorageJanitor::new(Arc::new(storage));

        let mut product = Product::new("MC275".into());
        product.image_url = Some(format!("{}/images/products/main.jpg", BASE));
        product.gallery = vec![format!("{}/images/products/g1.jpg", BASE)];
        product.manual_url = Some(format!("{}/downloads/manuals/mc275.pdf", BASE));
        product.description = Some(format!(
            r#"<p><img src="{0}/images/products/inline.png"><img src="{0}/images/products/inline.png"></p>"#,
            BASE
        ));

        let report = janitor.remove_urls(product.storage_urls()).await;
        assert_eq!(
            log.calls(),
            vec!["remove:downloads".to_string(), "remove:images".to_string()]
        );
        assert_eq!(report.removed.len(), 4);
    }

    #[tokio::test]
    async fn test_cleanup_replaced_files() {
        let (_, storage, log) = fixture().await;
        let janitor = StorageJanitor::new(Arc::new(storage));

        let old = dealer();
        let mut new = old.clone();
        new.logo_url = Some(format!("{}/images/dealers/new-logo.png", BASE));

        let report = janitor.cleanup_replaced_files(&old, &new).await;
        assert_eq!(report.removed, vec!["images/dealers/logo.png".to_string()]);
        assert_eq!(log.calls(), vec!["remove:images".to_string()]);

        log.clear();
        let report = janitor.cleanup_replaced_files(&new, &new).await;
        assert!(report.removed.is_empty());
        assert!(log.calls().is_empty());
    }

    #[tokio::test]
    async fn test_non_storage_urls_are_ignored() {
        let (_, storage, log) = fixture().await;
        let janitor = StorageJanitor::new(Arc::new(storage));
        let report = janitor
            .remove_urls(["https://cdn.example.com/logo.png", ""])
            .await;
        assert!(report.removed.is_empty());
        assert!(log.calls().is_empty());
    }
}
