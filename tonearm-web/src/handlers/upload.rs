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

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tonearm_core::utils::UploadTarget;

use crate::{auth::AdminSession, error::AppError, AppState};

/// A file part pulled out of a multipart form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    fn mime(&self) -> String {
        self.content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase()
    }
}

/// Split a multipart body into text fields and non-empty file parts
pub async fn read_multipart(
    mut multipart: Multipart,
) -> Result<(std::collections::HashMap<String, String>, Vec<UploadedFile>), AppError> {
    let mut fields = std::collections::HashMap::new();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("Invalid form data: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(filename) => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::bad_request(format!("Failed to read upload: {}", e)))?;
                // Browsers submit an empty part for untouched file inputs
                if !filename.is_empty() && !data.is_empty() {
                    files.push(UploadedFile {
                        field: name,
                        filename,
                        content_type,
                        data: data.to_vec(),
                    });
                }
            }
            None => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::bad_request(format!("Invalid form data: {}", e)))?;
                fields.insert(name, value);
            }
        }
    }

    Ok((fields, files))
}

/// Size, type and content checks; nothing is sent anywhere
pub fn check_upload(target: UploadTarget, file: &UploadedFile) -> Result<(), String> {
    target.validate(&file.filename, &file.content_type, file.data.len() as u64)?;
    target.validate_content(&file.data)
}

/// Upload into the target's bucket and return the public URL
pub async fn store_upload(state: &AppState, target: UploadTarget, file: &UploadedFile) -> Result<String, String> {
    check_upload(target, file)?;

    let bucket = target.bucket();
    let path = target.object_path(&file.filename);
    state
        .platform
        .storage
        .upload(bucket, &path, file.data.clone(), &file.mime())
        .await
        .map_err(|e| {
            tracing::error!(bucket, path = %path, error = %e, "Upload failed");
            e.user_message()
        })?;

    tracing::info!(bucket, path = %path, size = file.data.len(), "Stored upload");
    Ok(state.platform.storage.public_url(bucket, &path))
}

/// `POST /Manage/upload/{target}` with a single `file` part; answers `{"url": ...}`
pub async fn upload_handler(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(target): Path<String>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let target: UploadTarget = target.parse().map_err(AppError::not_found)?;
    let (_, files) = read_multipart(multipart).await?;
    let Some(file) = files.into_iter().find(|f| f.field == "file") else {
        return Ok(upload_error("No file was uploaded"));
    };

    match store_upload(&state, target, &file).await {
        Ok(url) => Ok(Json(json!({ "url": url })).into_response()),
        Err(message) => Ok(upload_error(&message)),
    }
}

fn upload_error(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn file(filename: &str, content_type: &str, data: &[u8]) -> UploadedFile {
        UploadedFile {
            field: "file".into(),
            filename: filename.into(),
            content_type: content_type.into(),
            data: data.to_vec(),
        }
    }

    #[test]
    fn test_check_upload_accepts_png() {
        assert!(check_upload(UploadTarget::CarouselImage, &file("slide.png", "image/png", PNG)).is_ok());
    }

    #[test]
    fn test_check_upload_rejects_mismatched_content() {
        let err = check_upload(
            UploadTarget::CarouselImage,
            &file("slide.png", "image/png", b"not an image at all"),
        )
        .unwrap_err();
        assert!(err.contains("not a recognised image"));
    }

    #[test]
    fn test_check_upload_rejects_wrong_type() {
        assert!(check_upload(UploadTarget::DownloadFile, &file("tool.exe", "application/octet-stream", b"MZ")).is_err());
    }

    #[test]
    fn test_mime_strips_parameters() {
        assert_eq!(file("a.pdf", "Application/PDF; charset=binary", b"%PDF").mime(), "application/pdf");
    }
}
