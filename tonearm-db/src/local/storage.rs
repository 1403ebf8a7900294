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

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::error::{PlatformError, PlatformResult};
use crate::platform::ObjectStorage;
use tonearm_core::utils::storage_url::PUBLIC_OBJECT_PREFIX;

/// Buckets as directories under `root`; the web server exposes `root` at
/// the same public URL prefix the hosted storage uses.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
    public_base_url: String,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an object to a file path, refusing anything outside the root
    pub fn object_path(&self, bucket: &str, path: &str) -> PlatformResult<PathBuf> {
        let relative = Path::new(bucket).join(path);
        let safe = !bucket.is_empty()
            && !path.is_empty()
            && !bucket.contains('/')
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !safe {
            return Err(PlatformError::Validation(format!(
                "Invalid object path: {}/{}",
                bucket, path
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStorage for FsStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> PlatformResult<()> {
        let target = self.object_path(bucket, path)?;
        if tokio::fs::try_exists(&target).await? {
            return Err(PlatformError::api(409, Some("Duplicate"), "The resource already exists"));
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, data).await?;
        tracing::debug!(bucket = %bucket, path = %path, "Stored object");
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        let encoded = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}{}{}/{}",
            self.public_base_url, PUBLIC_OBJECT_PREFIX, bucket, encoded
        )
    }

    /// Remove every valid path in the batch; invalid ones are logged and
    /// skipped, and the first I/O failure is reported after the rest ran
    async fn remove(&self, bucket: &str, paths: &[String]) -> PlatformResult<()> {
        let mut first_error = None;
        for path in paths {
            let target = match self.object_path(bucket, path) {
                Ok(target) => target,
                Err(e) => {
                    tracing::warn!(bucket = %bucket, path = %path, error = %e, "Skipping invalid object path");
                    continue;
                }
            };
            match tokio::fs::remove_file(&target).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    tracing::debug!(path = %target.display(), "Object already gone");
                }
                Err(e) => {
                    tracing::warn!(path = %target.display(), error = %e, "Failed to remove object");
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonearm_core::utils::parse_storage_url;

    fn storage(dir: &tempfile::TempDir) -> FsStorage {
        FsStorage::new(dir.path(), "http://localhost:3000/")
    }

    #[tokio::test]
    async fn test_upload_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);

        storage
            .upload("images", "products/a.jpg", vec![0xFF, 0xD8, 0xFF], "image/jpeg")
            .await
            .unwrap();
        let file = dir.path().join("images/products/a.jpg");
        assert_eq!(std::fs::read(&file).unwrap(), vec![0xFF, 0xD8, 0xFF]);

        storage
            .remove("images", &["products/a.jpg".to_string(), "products/missing.jpg".to_string()])
            .await
            .unwrap();
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn test_remove_skips_invalid_paths() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);
        storage.upload("images", "a.png", vec![1], "image/png").await.unwrap();
        storage.upload("images", "b.png", vec![2], "image/png").await.unwrap();

        storage
            .remove(
                "images",
                &["a.png".to_string(), "../../etc/passwd".to_string(), "b.png".to_string()],
            )
            .await
            .unwrap();
        assert!(!dir.path().join("images/a.png").exists());
        assert!(!dir.path().join("images/b.png").exists());
    }

    #[tokio::test]
    async fn test_upload_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);
        storage.upload("general", "x.txt", b"one".to_vec(), "text/plain").await.unwrap();
        let err = storage
            .upload("general", "x.txt", b"two".to_vec(), "text/plain")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "The resource already exists");
        assert_eq!(std::fs::read(dir.path().join("general/x.txt")).unwrap(), b"one");
    }

    #[test]
    fn test_object_path_rejects_escape() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);
        assert!(storage.object_path("images", "../../etc/passwd").is_err());
        assert!(storage.object_path("images", "/etc/passwd").is_err());
        assert!(storage.object_path("", "a.png").is_err());
        assert!(storage.object_path("images", "a/b.png").is_ok());
    }

    #[test]
    fn test_public_url_round_trips_through_parser() {
        let dir = tempfile::tempdir().unwrap();
        let url = storage(&dir).public_url("downloads", "manuals/owner manual.pdf");
        assert_eq!(
            url,
            "http://localhost:3000/storage/v1/object/public/downloads/manuals/owner%20manual.pdf"
        );
        let object = parse_storage_url(&url).unwrap();
        assert_eq!(object.bucket, "downloads");
        assert_eq!(object.path, "manuals/owner manual.pdf");
    }
}
