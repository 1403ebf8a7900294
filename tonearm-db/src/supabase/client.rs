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

use reqwest::{Client, RequestBuilder, Response, Url};
use serde_json::Value;
use std::time::Duration;

use crate::error::{PlatformError, PlatformResult};

#[derive(Debug, Clone)]
pub struct SupabaseClient {
    http: Client,
    base_url: Url,
    anon_key: String,
    service_key: Option<String>,
}

impl SupabaseClient {
    pub fn new(
        base_url: &str,
        anon_key: &str,
        service_key: Option<&str>,
        timeout_secs: u64,
    ) -> PlatformResult<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            PlatformError::Validation(format!("Invalid platform URL {}: {}", base_url, e))
        })?;
        if anon_key.is_empty() {
            return Err(PlatformError::Validation(
                "The platform anon key is not configured".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url,
            anon_key: anon_key.to_string(),
            service_key: service_key.filter(|k| !k.is_empty()).map(str::to_string),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Request authorised as the project itself (service key when present)
    pub fn service(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let key = self.service_key.as_deref().unwrap_or(&self.anon_key);
        self.http
            .request(method, self.endpoint(path))
            .header("apikey", key)
            .bearer_auth(key)
    }

    /// Request with the anon key only, used before a user is signed in
    pub fn public(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.endpoint(path))
            .header("apikey", &self.anon_key)
    }

    /// Request on behalf of a signed-in user
    pub fn user(&self, method: reqwest::Method, path: &str, access_token: &str) -> RequestBuilder {
        self.public(method, path).bearer_auth(access_token)
    }
}

/// Pass successful responses through and turn error bodies into `PlatformError::Api`
pub async fn check(response: Response) -> PlatformResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::debug!(status = %status, body = %body, "Platform call failed");
    Err(api_error(status.as_u16(), &body))
}

/// The three services report errors with different field names
pub fn api_error(status: u16, body: &str) -> PlatformError {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);

    let message = ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|key| parsed.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("Request failed with status {}", status)
            } else {
                body.trim().to_string()
            }
        });

    let code = ["code", "error_code"].iter().find_map(|key| match parsed.get(*key) {
        Some(Value::String(code)) => Some(code.clone()),
        _ => None,
    });

    PlatformError::Api {
        status,
        code,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgrest_error() {
        let err = api_error(
            409,
            r#"{"code":"23505","details":null,"hint":null,"message":"duplicate key value violates unique constraint"}"#,
        );
        assert!(err.is_unique_violation());
        assert_eq!(err.to_string(), "duplicate key value violates unique constraint");
    }

    #[test]
    fn test_gotrue_error() {
        let err = api_error(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(err.to_string(), "Invalid login credentials");

        let err = api_error(422, r#"{"code":422,"error_code":"mfa_verification_failed","msg":"Invalid TOTP code entered"}"#);
        assert_eq!(err.to_string(), "Invalid TOTP code entered");
        assert_eq!(err.code(), Some("mfa_verification_failed"));
    }

    #[test]
    fn test_non_json_error() {
        assert_eq!(api_error(502, "Bad Gateway").to_string(), "Bad Gateway");
        assert_eq!(
            api_error(500, "").to_string(),
            "Request failed with status 500"
        );
    }

    #[test]
    fn test_new_rejects_bad_config() {
        assert!(SupabaseClient::new("not a url", "key", None, 5).is_err());
        assert!(SupabaseClient::new("https://x.supabase.co", "", None, 5).is_err());

        let client = SupabaseClient::new("https://x.supabase.co/", "key", Some(""), 5).unwrap();
        assert_eq!(client.endpoint("/rest/v1/faqs"), "https://x.supabase.co/rest/v1/faqs");
    }
}
