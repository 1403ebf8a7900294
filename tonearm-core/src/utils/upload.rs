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
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

const MB: u64 = 1024 * 1024;

/// Magic bytes for common image formats
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const GIF_MAGIC: &[u8] = b"GIF";
const WEBP_MAGIC: &[u8] = b"RIFF";
const SVG_MAGIC: &[u8] = b"<svg";
const SVG_MAGIC_ALT: &[u8] = b"<?xml";

const RASTER_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];
const LOGO_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "image/svg+xml",
];
const DOCUMENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/zip",
    "application/x-zip-compressed",
    "application/octet-stream",
    "text/plain",
];
const VIDEO_TYPES: &[&str] = &["video/mp4", "video/webm", "video/quicktime"];

/// Executable extensions never accepted, whatever the declared MIME type
const DANGEROUS_EXTENSIONS: &[&str] = &[
    "exe", "bat", "cmd", "com", "scr", "vbs", "js", "jar", "msi", "sh", "bash", "ps1", "php",
    "asp", "aspx", "jsp", "cgi", "htm", "html", "hta", "htaccess",
];

/// Supported image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
    Svg,
}

impl ImageFormat {
    /// Detect format from file content
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.len() < 8 {
            return None;
        }

        if data.starts_with(JPEG_MAGIC) {
            Some(ImageFormat::Jpeg)
        } else if data.starts_with(PNG_MAGIC) {
            Some(ImageFormat::Png)
        } else if data.starts_with(GIF_MAGIC) {
            Some(ImageFormat::Gif)
        } else if data.starts_with(WEBP_MAGIC) && data.len() > 12 && &data[8..12] == b"WEBP" {
            Some(ImageFormat::Webp)
        } else if data.starts_with(SVG_MAGIC) || data.starts_with(SVG_MAGIC_ALT) {
            Some(ImageFormat::Svg)
        } else {
            None
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Svg => "image/svg+xml",
        }
    }
}

/// Form field a file is uploaded for. Each one maps to a bucket, a folder
/// inside it, a size cap and a MIME allowlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadTarget {
    CarouselImage,
    CategoryImage,
    ProductImage,
    ProductManual,
    NewsCover,
    NewsInline,
    PageInline,
    DealerLogo,
    DealerCover,
    DownloadFile,
    DownloadThumbnail,
    FeaturedImage,
    Video,
    VideoPoster,
}

impl UploadTarget {
    pub const ALL: [UploadTarget; 14] = [
        UploadTarget::CarouselImage,
        UploadTarget::CategoryImage,
        UploadTarget::ProductImage,
        UploadTarget::ProductManual,
        UploadTarget::NewsCover,
        UploadTarget::NewsInline,
        UploadTarget::PageInline,
        UploadTarget::DealerLogo,
        UploadTarget::DealerCover,
        UploadTarget::DownloadFile,
        UploadTarget::DownloadThumbnail,
        UploadTarget::FeaturedImage,
        UploadTarget::Video,
        UploadTarget::VideoPoster,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadTarget::CarouselImage => "carousel-image",
            UploadTarget::CategoryImage => "category-image",
            UploadTarget::ProductImage => "product-image",
            UploadTarget::ProductManual => "product-manual",
            UploadTarget::NewsCover => "news-cover",
            UploadTarget::NewsInline => "news-inline",
            UploadTarget::PageInline => "page-inline",
            UploadTarget::DealerLogo => "dealer-logo",
            UploadTarget::DealerCover => "dealer-cover",
            UploadTarget::DownloadFile => "download-file",
            UploadTarget::DownloadThumbnail => "download-thumbnail",
            UploadTarget::FeaturedImage => "featured-image",
            UploadTarget::Video => "video",
            UploadTarget::VideoPoster => "video-poster",
        }
    }

    pub fn bucket(&self) -> &'static str {
        match self {
            UploadTarget::CarouselImage => "carousel",
            UploadTarget::CategoryImage
            | UploadTarget::ProductImage
            | UploadTarget::DealerLogo
            | UploadTarget::DealerCover
            | UploadTarget::FeaturedImage => "images",
            UploadTarget::ProductManual
            | UploadTarget::DownloadFile
            | UploadTarget::DownloadThumbnail => "downloads",
            UploadTarget::NewsCover | UploadTarget::NewsInline => "news",
            UploadTarget::PageInline => "general",
            UploadTarget::Video | UploadTarget::VideoPoster => "videos",
        }
    }

    /// Folder inside the bucket, empty for the bucket root
    pub fn folder(&self) -> &'static str {
        match self {
            UploadTarget::CarouselImage => "",
            UploadTarget::CategoryImage => "categories",
            UploadTarget::ProductImage => "products",
            UploadTarget::ProductManual => "manuals",
            UploadTarget::NewsCover => "covers",
            UploadTarget::NewsInline => "inline",
            UploadTarget::PageInline => "pages",
            UploadTarget::DealerLogo => "dealers/logos",
            UploadTarget::DealerCover => "dealers/covers",
            UploadTarget::DownloadFile => "files",
            UploadTarget::DownloadThumbnail => "thumbnails",
            UploadTarget::FeaturedImage => "featured",
            UploadTarget::Video => "",
            UploadTarget::VideoPoster => "posters",
        }
    }

    pub fn max_bytes(&self) -> u64 {
        match self {
            UploadTarget::CarouselImage | UploadTarget::PageInline | UploadTarget::NewsInline => {
                10 * MB
            }
            UploadTarget::CategoryImage
            | UploadTarget::ProductImage
            | UploadTarget::NewsCover
            | UploadTarget::DealerLogo
            | UploadTarget::DealerCover
            | UploadTarget::DownloadThumbnail
            | UploadTarget::FeaturedImage
            | UploadTarget::VideoPoster => 5 * MB,
            UploadTarget::ProductManual | UploadTarget::DownloadFile => 100 * MB,
            UploadTarget::Video => 1024 * MB,
        }
    }

    pub fn allowed_mime_types(&self) -> &'static [&'static str] {
        match self {
            UploadTarget::DealerLogo => LOGO_IMAGE_TYPES,
            UploadTarget::ProductManual | UploadTarget::DownloadFile => DOCUMENT_TYPES,
            UploadTarget::Video => VIDEO_TYPES,
            _ => RASTER_IMAGE_TYPES,
        }
    }

    /// Whether the content itself must look like an image
    pub fn expects_image(&self) -> bool {
        !matches!(
            self,
            UploadTarget::ProductManual | UploadTarget::DownloadFile | UploadTarget::Video
        )
    }

    /// Validate a file before it is sent to object storage
    pub fn validate(&self, filename: &str, content_type: &str, size: u64) -> Result<(), String> {
        if size == 0 {
            return Err("File is empty".to_string());
        }

        if size > self.max_bytes() {
            return Err(format!(
                "File is too large (maximum {} MB)",
                self.max_bytes() / MB
            ));
        }

        if is_dangerous_filename(filename) {
            return Err("This file type is not allowed".to_string());
        }

        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        if !self.allowed_mime_types().contains(&mime.as_str()) {
            return Err(format!("Unsupported file type: {}", content_type));
        }

        Ok(())
    }

    /// Validate the leading bytes of image uploads against known formats
    pub fn validate_content(&self, data: &[u8]) -> Result<(), String> {
        if !self.expects_image() {
            return Ok(());
        }
        match ImageFormat::detect(data) {
            Some(format) if self.allowed_mime_types().contains(&format.mime_type()) => Ok(()),
            Some(_) => Err("Unsupported image format".to_string()),
            None => Err("File content is not a recognised image".to_string()),
        }
    }

    /// Object path for a new upload: `<folder>/<uuid>.<ext>`
    pub fn object_path(&self, original_name: &str) -> String {
        let filename = generate_unique_filename(original_name);
        if self.folder().is_empty() {
            filename
        } else {
            format!("{}/{}", self.folder(), filename)
        }
    }
}

impl fmt::Display for UploadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UploadTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|target| target.as_str() == s)
            .ok_or_else(|| format!("Unknown upload target: {}", s))
    }
}

/// Generate a unique filename while preserving the original extension
pub fn generate_unique_filename(original_name: &str) -> String {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string());

    format!("{}.{}", Uuid::new_v4(), extension)
}

/// Check every extension so `manual.pdf.exe` and `photo.php.jpg` are both caught
pub fn is_dangerous_filename(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    lower
        .split('.')
        .skip(1)
        .any(|part| DANGEROUS_EXTENSIONS.contains(&part))
}
