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
use reqwest::Method;
use serde_json::json;

use super::client::{check, SupabaseClient};
use crate::error::{PlatformError, PlatformResult};
use crate::platform::ObjectStorage;

#[derive(Debug, Clone)]
pub struct SupabaseStorage {
    client: SupabaseClient,
}

impl SupabaseStorage {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn check_bucket(bucket: &str) -> PlatformResult<()> {
    let valid = !bucket.is_empty()
        && bucket != "."
        && bucket != ".."
        && bucket
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid {
        return Err(PlatformError::Validation(format!("Invalid bucket: {}", bucket)));
    }
    Ok(())
}

fn is_valid_path(path: &str) -> bool {
    !path.is_empty() && !path.split('/').any(|s| s.is_empty() || s == "." || s == "..")
}

fn check_object(bucket: &str, path: &str) -> PlatformResult<()> {
    check_bucket(bucket)?;
    if !is_valid_path(path) {
        return Err(PlatformError::Validation(format!("Invalid object path: {}", path)));
    }
    Ok(())
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> PlatformResult<()> {
        check_object(bucket, path)?;
        let response = self
            .client
            .service(
                Method::POST,
                &format!("/storage/v1/object/{}/{}", bucket, encode_path(path)),
            )
            .header("content-type", content_type)
            .header("cache-control", "max-age=3600")
            .header("x-upsert", "false")
            .body(data)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.client.base_url(),
            bucket,
            encode_path(path)
        )
    }

    /// Batch delete; invalid paths are logged and left out of the request
    async fn remove(&self, bucket: &str, paths: &[String]) -> PlatformResult<()> {
        check_bucket(bucket)?;
        let paths: Vec<&String> = paths
            .iter()
            .filter(|path| {
                let valid = is_valid_path(path);
                if !valid {
                    tracing::warn!(bucket, path = %path, "Skipping invalid object path");
                }
                valid
            })
            .collect();
        if paths.is_empty() {
            return Ok(());
        }
        let response = self
            .client
            .service(Method::DELETE, &format!("/storage/v1/object/{}", bucket))
            .json(&json!({ "prefixes": paths }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn storage(server: &mockito::ServerGuard) -> SupabaseStorage {
        SupabaseStorage::new(SupabaseClient::new(&server.url(), "anon", None, 5).unwrap())
    }

    #[tokio::test]
    async fn test_public_url_encodes_segments() {
        let server = mockito::Server::new_async().await;
        let url = storage(&server).public_url("images", "products/1700000000-abc123.jpg");
        assert_eq!(
            url,
            format!(
                "{}/storage/v1/object/public/images/products/1700000000-abc123.jpg",
                server.url()
            )
        );
        let url = storage(&server).public_url("downloads", "manuals/owner manual.pdf");
        assert!(url.ends_with("/downloads/manuals/owner%20manual.pdf"));
    }

    #[tokio::test]
    async fn test_upload_does_not_overwrite() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/storage/v1/object/images/products/a.png")
            .match_header("x-upsert", "false")
            .match_header("content-type", "image/png")
            .with_status(200)
            .with_body(r#"{"Key":"images/products/a.png"}"#)
            .create_async()
            .await;

        storage(&server)
            .upload("images", "products/a.png", vec![0x89, b'P', b'N', b'G'], "image/png")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_rejects_traversal() {
        let server = mockito::Server::new_async().await;
        let result = storage(&server)
            .upload("images", "../secrets.txt", vec![1], "text/plain")
            .await;
        assert!(matches!(result, Err(PlatformError::Validation(_))));
    }

    #[tokio::test]
    async fn test_remove_sends_prefixes_in_one_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/storage/v1/object/images")
            .match_body(Matcher::Json(json!({"prefixes": ["a.png", "b.png"]})))
            .with_status(200)
            .with_body("[]")
            .expect(1)
            .create_async()
            .await;

        storage(&server)
            .remove("images", &["a.png".to_string(), "b.png".to_string()])
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_remove_rejects_bad_bucket_before_any_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let storage = storage(&server);
        for bucket in ["..", "", "images/../auth", "a b"] {
            let result = storage.remove(bucket, &["a.png".to_string()]).await;
            assert!(matches!(result, Err(PlatformError::Validation(_))), "{}", bucket);
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_remove_skips_invalid_paths() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/storage/v1/object/images")
            .match_body(Matcher::Json(json!({"prefixes": ["a.png"]})))
            .with_status(200)
            .with_body("[]")
            .expect(1)
            .create_async()
            .await;

        storage(&server)
            .remove("images", &["../secrets.txt".to_string(), "a.png".to_string()])
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_remove_nothing_is_a_no_op() {
        let server = mockito::Server::new_async().await;
        storage(&server).remove("images", &[]).await.unwrap();
    }
}
