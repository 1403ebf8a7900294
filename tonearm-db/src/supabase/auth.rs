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
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};

use super::client::{check, SupabaseClient};
use crate::error::{PlatformError, PlatformResult};
use crate::platform::{
    AssuranceLevel, AuthProvider, AuthSession, AuthUser, Challenge, Factor, TotpEnrollment,
};

/// GoTrue endpoints under `/auth/v1`
#[derive(Debug, Clone)]
pub struct SupabaseAuth {
    client: SupabaseClient,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: AuthUser,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    factors: Option<Vec<Factor>>,
}

#[derive(Debug, Deserialize)]
struct ChallengeResponse {
    id: String,
    #[serde(default)]
    expires_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct EnrollResponse {
    id: String,
    totp: TotpPayload,
}

#[derive(Debug, Deserialize)]
struct TotpPayload {
    qr_code: String,
    secret: String,
    uri: String,
}

impl SupabaseAuth {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    async fn current_user(&self, access_token: &str) -> PlatformResult<UserResponse> {
        let response = self
            .client
            .user(Method::GET, "/auth/v1/user", access_token)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }
}

fn from_timestamp(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| DateTime::from_timestamp(s, 0))
}

/// Read the `aal` claim from an access token without verifying it
pub fn assurance_level(access_token: &str) -> AssuranceLevel {
    access_token
        .split('.')
        .nth(1)
        .and_then(|payload| URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok())
        .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok())
        .and_then(|claims| claims.get("aal").cloned())
        .and_then(|aal| serde_json::from_value(aal).ok())
        .unwrap_or(AssuranceLevel::Aal1)
}

/// The provider returns the QR code as raw SVG; make it usable as an image source
fn qr_image_source(qr_code: &str) -> String {
    if qr_code.trim_start().starts_with('<') {
        format!("data:image/svg+xml;base64,{}", STANDARD.encode(qr_code))
    } else {
        qr_code.to_string()
    }
}

impl From<TokenResponse> for AuthSession {
    fn from(token: TokenResponse) -> Self {
        let expires_at = from_timestamp(token.expires_at).or_else(|| {
            token
                .expires_in
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs))
        });
        AuthSession {
            aal: assurance_level(&token.access_token),
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
            user: token.user,
        }
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> PlatformResult<AuthSession> {
        let response = self
            .client
            .public(Method::POST, "/auth/v1/token?grant_type=password")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let token: TokenResponse = check(response).await?.json().await?;
        Ok(token.into())
    }

    async fn sign_out(&self, session: &AuthSession) -> PlatformResult<()> {
        let response = self
            .client
            .user(Method::POST, "/auth/v1/logout", &session.access_token)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn refresh(&self, session: &AuthSession) -> PlatformResult<AuthSession> {
        let Some(refresh_token) = session.refresh_token.as_deref() else {
            return Err(PlatformError::api(
                401,
                Some("session_expired"),
                "Your session has expired, please sign in again",
            ));
        };
        let response = self
            .client
            .public(Method::POST, "/auth/v1/token?grant_type=refresh_token")
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        let token: TokenResponse = check(response).await?.json().await?;
        tracing::debug!(user_id = %token.user.id, "Access token refreshed");
        Ok(token.into())
    }

    async fn get_user(&self, access_token: &str) -> PlatformResult<AuthUser> {
        let user = self.current_user(access_token).await?;
        Ok(AuthUser {
            id: user.id,
            email: user.email,
        })
    }

    async fn list_factors(&self, session: &AuthSession) -> PlatformResult<Vec<Factor>> {
        let user = self.current_user(&session.access_token).await?;
        Ok(user.factors.unwrap_or_default())
    }

    async fn challenge(&self, session: &AuthSession, factor_id: &str) -> PlatformResult<Challenge> {
        let response = self
            .client
            .user(
                Method::POST,
                &format!("/auth/v1/factors/{}/challenge", urlencoding::encode(factor_id)),
                &session.access_token,
            )
            .send()
            .await?;
        let challenge: ChallengeResponse = check(response).await?.json().await?;
        Ok(Challenge {
            id: challenge.id,
            expires_at: from_timestamp(challenge.expires_at),
        })
    }

    async fn verify(
        &self,
        session: &AuthSession,
        factor_id: &str,
        challenge_id: &str,
        code: &str,
    ) -> PlatformResult<AuthSession> {
        let response = self
            .client
            .user(
                Method::POST,
                &format!("/auth/v1/factors/{}/verify", urlencoding::encode(factor_id)),
                &session.access_token,
            )
            .json(&json!({ "challenge_id": challenge_id, "code": code }))
            .send()
            .await?;
        let token: TokenResponse = check(response).await?.json().await?;
        Ok(token.into())
    }

    async fn enroll_totp(
        &self,
        session: &AuthSession,
        friendly_name: &str,
    ) -> PlatformResult<TotpEnrollment> {
        let response = self
            .client
            .user(Method::POST, "/auth/v1/factors", &session.access_token)
            .json(&json!({ "factor_type": "totp", "friendly_name": friendly_name }))
            .send()
            .await?;
        let enrolled: EnrollResponse = check(response).await?.json().await?;
        if enrolled.totp.secret.is_empty() {
            return Err(PlatformError::api(500, None, "Enrollment returned no secret"));
        }
        Ok(TotpEnrollment {
            factor_id: enrolled.id,
            qr_code: qr_image_source(&enrolled.totp.qr_code),
            secret: enrolled.totp.secret,
            uri: enrolled.totp.uri,
        })
    }

    async fn unenroll(&self, session: &AuthSession, factor_id: &str) -> PlatformResult<()> {
        let response = self
            .client
            .user(
                Method::DELETE,
                &format!("/auth/v1/factors/{}", urlencoding::encode(factor_id)),
                &session.access_token,
            )
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}
