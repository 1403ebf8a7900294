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

use thiserror::Error;

/// Postgres error code for unique constraint violations
pub const UNIQUE_VIOLATION: &str = "23505";

/// Everything a table, storage or auth call can fail with.
///
/// Callers show `user_message()` to the admin and let them resubmit.
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

impl PlatformError {
    pub fn api(status: u16, code: Option<&str>, message: impl Into<String>) -> Self {
        PlatformError::Api {
            status,
            code: code.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            PlatformError::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        self.code() == Some(UNIQUE_VIOLATION)
    }

    /// Message shown verbatim in the admin error banner
    pub fn user_message(&self) -> String {
        if self.is_unique_violation() {
            return "A record with this slug already exists".to_string();
        }
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_gets_friendly_message() {
        let err = PlatformError::api(
            409,
            Some("23505"),
            "duplicate key value violates unique constraint \"products_slug_key\"",
        );
        assert!(err.is_unique_violation());
        assert_eq!(err.user_message(), "A record with this slug already exists");
    }

    #[test]
    fn test_other_errors_are_shown_verbatim() {
        let err = PlatformError::api(400, Some("22P02"), "invalid input syntax for type integer");
        assert!(!err.is_unique_violation());
        assert_eq!(err.user_message(), "invalid input syntax for type integer");

        let err = PlatformError::Validation("Name is required".to_string());
        assert_eq!(err.user_message(), "Name is required");
        assert_eq!(err.code(), None);
    }
}
