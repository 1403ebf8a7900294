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

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Path prefix of publicly readable objects in the storage service
pub const PUBLIC_OBJECT_PREFIX: &str = "/storage/v1/object/public/";

static STORAGE_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/storage/v1/object/public/([^/?#]+)/([^?#]+)")
        .expect("Failed to compile storage URL regex")
});

static HTML_STORAGE_SRC_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"src="([^"]*storage[^"]*)""#).expect("Failed to compile storage src regex")
});

/// An object addressed by bucket and path inside that bucket
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct StorageObject {
    pub bucket: String,
    pub path: String,
}

/// Split a public object URL into its bucket and percent-decoded path.
///
/// Returns `None` for anything that is not a public object URL.
pub fn parse_storage_url(url: &str) -> Option<StorageObject> {
    let captures = STORAGE_URL_REGEX.captures(url)?;
    let bucket = captures.get(1)?.as_str();
    let raw_path = captures.get(2)?.as_str();

    let path = urlencoding::decode(raw_path).ok()?.into_owned();
    if bucket.is_empty() || path.is_empty() {
        return None;
    }

    Some(StorageObject {
        bucket: bucket.to_string(),
        path,
    })
}

/// Every `src="...storage..."` value in an HTML body, in document order.
///
/// Duplicates are kept. This is a heuristic scan, not an HTML parser.
pub fn extract_storage_urls_from_html(html: &str) -> Vec<String> {
    HTML_STORAGE_SRC_REGEX
        .captures_iter(html)
        .filter_map(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Group URLs by bucket, skipping anything that does not parse.
///
/// Paths keep first-seen order and repeated paths collapse to one entry.
pub fn group_by_bucket<I, S>(urls: I) -> BTreeMap<String, Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for url in urls {
        if let Some(object) = parse_storage_url(url.as_ref()) {
            let paths = grouped.entry(object.bucket).or_default();
            if !paths.contains(&object.path) {
                paths.push(object.path);
            }
        }
    }
    grouped
}
