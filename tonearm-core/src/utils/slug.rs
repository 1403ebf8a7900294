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

static SLUG_SEPARATOR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("Failed to compile slug regex"));

static VALID_SLUG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("Failed to compile slug check regex")
});

const MAX_SLUG_LEN: usize = 100;

/// Generate a URL-friendly slug from a product name or article title
pub fn generate_slug_from_title(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    let mut slug = SLUG_SEPARATOR_REGEX
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string();

    if slug.is_empty() {
        slug = "untitled".to_string();
    }

    if slug.len() > MAX_SLUG_LEN {
        slug = slug
            .chars()
            .take(MAX_SLUG_LEN)
            .collect::<String>()
            .trim_end_matches('-')
            .to_string();
    }

    slug
}

/// Slugs are lowercase ASCII words joined by single hyphens
pub fn is_valid_slug(slug: &str) -> bool {
    slug.len() <= MAX_SLUG_LEN && VALID_SLUG_REGEX.is_match(slug)
}

/// Use the submitted slug when present, otherwise derive one from the title
pub fn slug_or_generated(slug: Option<String>, title: &str) -> String {
    match slug {
        Some(slug) if !slug.trim().is_empty() => slug.trim().to_lowercase(),
        _ => generate_slug_from_title(title),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_slug_basic() {
        assert_eq!(generate_slug_from_title("Reference Turntable"), "reference-turntable");
        assert_eq!(generate_slug_from_title("Amplifiers"), "amplifiers");
    }

    #[test]
    fn test_generate_slug_model_numbers() {
        assert_eq!(generate_slug_from_title("TA-2000 MkII"), "ta-2000-mkii");
        assert_eq!(generate_slug_from_title("Phono Stage (v2.1)"), "phono-stage-v2-1");
    }

    #[test]
    fn test_generate_slug_edge_cases() {
        assert_eq!(generate_slug_from_title(""), "untitled");
        assert_eq!(generate_slug_from_title("   "), "untitled");
        assert_eq!(generate_slug_from_title("!!!"), "untitled");
    }

    #[test]
    fn test_generate_slug_unicode() {
        assert_eq!(generate_slug_from_title("Café René"), "caf-ren");
        assert_eq!(generate_slug_from_title("Über uns"), "ber-uns");
    }

    #[test]
    fn test_generate_slug_long_title() {
        let long_title = "word ".repeat(40);
        let slug = generate_slug_from_title(&long_title);
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn test_is_valid_slug() {
        assert!(is_valid_slug("ta-2000"));
        assert!(is_valid_slug("news"));
        assert!(!is_valid_slug("Bad Slug"));
        assert!(!is_valid_slug("-leading"));
        assert!(!is_valid_slug("double--dash"));
        assert!(!is_valid_slug(""));
    }

    #[test]
    fn test_slug_or_generated() {
        assert_eq!(slug_or_generated(Some("Custom".into()), "Ignored"), "custom");
        assert_eq!(slug_or_generated(Some("  ".into()), "Hello World"), "hello-world");
        assert_eq!(slug_or_generated(None, "Hello World"), "hello-world");
    }
}
