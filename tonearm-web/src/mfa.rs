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

//! Password sign-in with an optional TOTP second step, and the admin gate
//! every route into `/Manage` depends on.
//!
//! Provider failures and a failed admin gate sign the session out before the
//! error is returned. Local validation failures (blank fields, malformed
//! codes) never reach the provider and leave the session alone.

use chrono::Utc;
use std::sync::Arc;
use tonearm_core::AdminUser;
use tonearm_db::{AdminUserRepository, AuthProvider, AuthSession, Platform, PlatformError, TotpEnrollment};

pub const NOT_AN_ADMIN: &str = "This is not an admin account";
pub const INVALID_CODE: &str = "Enter the 6-digit code from your authenticator app";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct AuthFlowError {
    pub message: String,
    /// The provider session was ended and must not be reused
    pub signed_out: bool,
}

impl AuthFlowError {
    fn local(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            signed_out: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SignInOutcome {
    /// A verified TOTP factor exists; access waits for `verify_mfa`
    MfaRequired {
        session: AuthSession,
        factor_id: String,
        challenge_id: String,
    },
    SignedIn {
        session: AuthSession,
        admin: AdminUser,
    },
}

/// Exactly six ASCII digits
pub fn is_valid_code(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Clone)]
pub struct AuthFlow {
    auth: Arc<dyn AuthProvider>,
    admins: AdminUserRepository,
}

impl AuthFlow {
    pub fn new(platform: &Platform) -> Self {
        Self {
            auth: platform.auth.clone(),
            admins: AdminUserRepository::new(platform.tables.clone()),
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignInOutcome, AuthFlowError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthFlowError::local("Email and password are required"));
        }

        let session = self
            .auth
            .sign_in_with_password(email, password)
            .await
            .map_err(|e| {
                tracing::info!(error = %e, "Password sign-in rejected");
                AuthFlowError::local(e.user_message())
            })?;

        let factors = match self.auth.list_factors(&session).await {
            Ok(factors) => factors,
            Err(e) => return Err(self.fail(&session, e).await),
        };

        if let Some(factor) = factors.iter().find(|f| f.is_verified_totp()) {
            let challenge = match self.auth.challenge(&session, &factor.id).await {
                Ok(challenge) => challenge,
                Err(e) => return Err(self.fail(&session, e).await),
            };
            tracing::debug!(user_id = %session.user.id, "Second factor required");
            return Ok(SignInOutcome::MfaRequired {
                factor_id: factor.id.clone(),
                challenge_id: challenge.id,
                session,
            });
        }

        let admin = self.check_admin(&session).await?;
        Ok(SignInOutcome::SignedIn { session, admin })
    }

    /// Submit a code against the challenge issued at sign-in
    pub async fn verify_mfa(
        &self,
        session: &AuthSession,
        factor_id: &str,
        challenge_id: &str,
        code: &str,
    ) -> Result<(AuthSession, AdminUser), AuthFlowError> {
        let code = code.trim();
        if !is_valid_code(code) {
            return Err(AuthFlowError::local(INVALID_CODE));
        }

        let upgraded = match self.auth.verify(session, factor_id, challenge_id, code).await {
            Ok(upgraded) => upgraded,
            Err(e) => return Err(self.fail(session, e).await),
        };

        if let Err(e) = self.admins.stamp_mfa_verified(&upgraded.user.id).await {
            return Err(self.fail(&upgraded, e).await);
        }

        let admin = self.check_admin(&upgraded).await?;
        Ok((upgraded, admin))
    }

    pub async fn enroll_mfa(
        &self,
        session: &AuthSession,
        friendly_name: &str,
    ) -> Result<TotpEnrollment, AuthFlowError> {
        match self.auth.enroll_totp(session, friendly_name).await {
            Ok(enrollment) => Ok(enrollment),
            Err(e) => Err(self.fail(session, e).await),
        }
    }

    /// Confirm a new factor with a first code from the authenticator app
    pub async fn verify_mfa_enrollment(
        &self,
        session: &AuthSession,
        factor_id: &str,
        code: &str,
    ) -> Result<(AuthSession, AdminUser), AuthFlowError> {
        let code = code.trim();
        if !is_valid_code(code) {
            return Err(AuthFlowError::local(INVALID_CODE));
        }

        let challenge = match self.auth.challenge(session, factor_id).await {
            Ok(challenge) => challenge,
            Err(e) => return Err(self.fail(session, e).await),
        };
        let upgraded = match self.auth.verify(session, factor_id, &challenge.id, code).await {
            Ok(upgraded) => upgraded,
            Err(e) => return Err(self.fail(session, e).await),
        };

        let user_id = &upgraded.user.id;
        if let Err(e) = self.admins.set_mfa_enabled(user_id, true).await {
            return Err(self.fail(&upgraded, e).await);
        }
        if let Err(e) = self.admins.stamp_mfa_verified(user_id).await {
            return Err(self.fail(&upgraded, e).await);
        }

        let admin = self.check_admin(&upgraded).await?;
        tracing::info!(user_id = %user_id, "Authenticator app enrolled");
        Ok((upgraded, admin))
    }

    pub async fn unenroll_mfa(&self, session: &AuthSession, factor_id: &str) -> Result<(), AuthFlowError> {
        if let Err(e) = self.auth.unenroll(session, factor_id).await {
            return Err(self.fail(session, e).await);
        }

        let remaining = match self.auth.list_factors(session).await {
            Ok(factors) => factors,
            Err(e) => return Err(self.fail(session, e).await),
        };
        if !remaining.iter().any(|f| f.is_verified_totp()) {
            if let Err(e) = self.admins.set_mfa_enabled(&session.user.id, false).await {
                return Err(self.fail(session, e).await);
            }
        }
        Ok(())
    }

    /// Renew the provider session when its access token has run out.
    /// `None` means the current one is still good.
    pub async fn refresh_if_expired(&self, session: &AuthSession) -> Result<Option<AuthSession>, AuthFlowError> {
        if !session.needs_refresh(Utc::now()) {
            return Ok(None);
        }
        match self.auth.refresh(session).await {
            Ok(fresh) => {
                tracing::debug!(user_id = %fresh.user.id, "Provider session refreshed");
                Ok(Some(fresh))
            }
            Err(e) => Err(self.fail(session, e).await),
        }
    }

    /// The admin gate: an active `admin_users` row for the session's user
    pub async fn check_admin(&self, session: &AuthSession) -> Result<AdminUser, AuthFlowError> {
        match self.admins.find_active(&session.user.id).await {
            Ok(Some(admin)) => Ok(admin),
            Ok(None) => {
                tracing::warn!(user_id = %session.user.id, "Sign-in by a non-admin account");
                self.sign_out(session).await;
                Err(AuthFlowError {
                    message: NOT_AN_ADMIN.to_string(),
                    signed_out: true,
                })
            }
            Err(e) => Err(self.fail(session, e).await),
        }
    }

    /// End the provider session; failures are logged only
    pub async fn sign_out(&self, session: &AuthSession) {
        if let Err(e) = self.auth.sign_out(session).await {
            tracing::warn!(user_id = %session.user.id, error = %e, "Provider sign-out failed");
        }
    }

    pub async fn list_factors(&self, session: &AuthSession) -> Result<Vec<tonearm_db::Factor>, AuthFlowError> {
        match self.auth.list_factors(session).await {
            Ok(factors) => Ok(factors),
            Err(e) => Err(self.fail(session, e).await),
        }
    }

    async fn fail(&self, session: &AuthSession, error: PlatformError) -> AuthFlowError {
        tracing::error!(user_id = %session.user.id, error = %error, "Auth provider call failed");
        self.sign_out(session).await;
        AuthFlowError {
            message: error.user_message(),
            signed_out: true,
        }
    }
}
