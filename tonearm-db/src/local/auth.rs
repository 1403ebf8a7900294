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

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{Row, SqlitePool};
use totp_rs::{Algorithm, Secret, TOTP};
use uuid::Uuid;

use crate::error::{PlatformError, PlatformResult};
use crate::platform::{
    AssuranceLevel, AuthProvider, AuthSession, AuthUser, Challenge, Factor, FactorStatus,
    TotpEnrollment,
};

const CHALLENGE_TTL_MINUTES: i64 = 5;

/// Password and TOTP auth kept in the local database
#[derive(Debug, Clone)]
pub struct LocalAuth {
    pool: SqlitePool,
    issuer: String,
    session_ttl: Duration,
}

fn invalid_credentials() -> PlatformError {
    PlatformError::api(400, Some("invalid_credentials"), "Invalid login credentials")
}

fn session_expired() -> PlatformError {
    PlatformError::api(401, Some("session_not_found"), "Session not found or expired")
}

fn aal_text(aal: AssuranceLevel) -> &'static str {
    match aal {
        AssuranceLevel::Aal1 => "aal1",
        AssuranceLevel::Aal2 => "aal2",
    }
}

fn parse_time(raw: &str) -> PlatformResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| PlatformError::Validation(format!("Invalid stored timestamp: {}", e)))
}

fn decode_secret(secret: &str) -> PlatformResult<Vec<u8>> {
    Secret::Encoded(secret.to_string())
        .to_bytes()
        .map_err(|e| PlatformError::Validation(format!("Invalid TOTP secret: {:?}", e)))
}

pub fn hash_password(password: &str) -> PlatformResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PlatformError::Validation(format!("Failed to hash password: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

impl LocalAuth {
    pub fn new(pool: SqlitePool, issuer: &str, session_ttl: Duration) -> Self {
        Self {
            pool,
            issuer: issuer.to_string(),
            session_ttl,
        }
    }

    /// Create a user that can sign in with a password
    pub async fn create_user(&self, email: &str, password: &str) -> PlatformResult<AuthUser> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(PlatformError::Validation("A valid email is required".to_string()));
        }
        if password.len() < 8 {
            return Err(PlatformError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        let exists = sqlx::query("SELECT 1 FROM auth_users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?
            .is_some();
        if exists {
            return Err(PlatformError::api(
                422,
                Some("email_exists"),
                "A user with this email address has already been registered",
            ));
        }

        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO auth_users (id, email, password_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&email)
        .bind(hash_password(password)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(AuthUser {
            id,
            email: Some(email),
        })
    }

    pub async fn find_user_by_email(&self, email: &str) -> PlatformResult<Option<AuthUser>> {
        let row = sqlx::query("SELECT id, email FROM auth_users WHERE email = ?")
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| {
            Ok(AuthUser {
                id: row.try_get("id")?,
                email: row.try_get("email")?,
            })
        })
        .transpose()
    }

    /// Resolve a session token that has not expired
    async fn live_session(&self, token: &str) -> PlatformResult<AuthSession> {
        let row = sqlx::query(
            "SELECT s.user_id, s.aal, s.expires_at, u.email
             FROM auth_sessions s JOIN auth_users u ON u.id = s.user_id
             WHERE s.token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(session_expired)?;

        let expires_at = parse_time(&row.try_get::<String, _>("expires_at")?)?;
        if expires_at <= Utc::now() {
            sqlx::query("DELETE FROM auth_sessions WHERE token = ?")
                .bind(token)
                .execute(&self.pool)
                .await?;
            return Err(session_expired());
        }

        let aal = match row.try_get::<String, _>("aal")?.as_str() {
            "aal2" => AssuranceLevel::Aal2,
            _ => AssuranceLevel::Aal1,
        };
        Ok(AuthSession {
            access_token: token.to_string(),
            refresh_token: None,
            expires_at: Some(expires_at),
            user: AuthUser {
                id: row.try_get("user_id")?,
                email: row.try_get("email")?,
            },
            aal,
        })
    }

    async fn factor_secret(&self, user_id: &str, factor_id: &str) -> PlatformResult<(String, FactorStatus)> {
        let row = sqlx::query("SELECT secret, status FROM auth_factors WHERE id = ? AND user_id = ?")
            .bind(factor_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| PlatformError::NotFound("Factor".to_string()))?;
        let status = match row.try_get::<String, _>("status")?.as_str() {
            "verified" => FactorStatus::Verified,
            _ => FactorStatus::Unverified,
        };
        Ok((row.try_get("secret")?, status))
    }

    fn totp(&self, bytes: Vec<u8>, account: &str) -> PlatformResult<TOTP> {
        TOTP::new(
            Algorithm::SHA1,
            6,
            1,
            30,
            bytes,
            Some(self.issuer.clone()),
            account.to_string(),
        )
        .map_err(|e| PlatformError::Validation(format!("Invalid TOTP parameters: {}", e)))
    }
}

#[async_trait]
impl AuthProvider for LocalAuth {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> PlatformResult<AuthSession> {
        let row = sqlx::query("SELECT id, email, password_hash FROM auth_users WHERE email = ?")
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(invalid_credentials)?;

        let hash: String = row.try_get("password_hash")?;
        if !verify_password(password, &hash) {
            return Err(invalid_credentials());
        }

        let token = Uuid::new_v4().simple().to_string();
        let expires_at = Utc::now() + self.session_ttl;
        let user = AuthUser {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
        };
        sqlx::query("INSERT INTO auth_sessions (token, user_id, aal, expires_at) VALUES (?, ?, 'aal1', ?)")
            .bind(&token)
            .bind(&user.id)
            .bind(expires_at.to_rfc3339())
            .execute(&self.pool)
            .await?;

        tracing::debug!(user_id = %user.id, "Password sign-in");
        Ok(AuthSession {
            access_token: token,
            refresh_token: None,
            expires_at: Some(expires_at),
            user,
            aal: AssuranceLevel::Aal1,
        })
    }

    async fn sign_out(&self, session: &AuthSession) -> PlatformResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE token = ?")
            .bind(&session.access_token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Push a live session's expiry out by another full TTL
    async fn refresh(&self, session: &AuthSession) -> PlatformResult<AuthSession> {
        let mut live = self.live_session(&session.access_token).await?;
        let expires_at = Utc::now() + self.session_ttl;
        sqlx::query("UPDATE auth_sessions SET expires_at = ? WHERE token = ?")
            .bind(expires_at.to_rfc3339())
            .bind(&live.access_token)
            .execute(&self.pool)
            .await?;
        live.expires_at = Some(expires_at);
        Ok(live)
    }

    async fn get_user(&self, access_token: &str) -> PlatformResult<AuthUser> {
        Ok(self.live_session(access_token).await?.user)
    }

    async fn list_factors(&self, session: &AuthSession) -> PlatformResult<Vec<Factor>> {
        let user = self.live_session(&session.access_token).await?.user;
        let rows = sqlx::query(
            "SELECT id, status, friendly_name FROM auth_factors WHERE user_id = ? ORDER BY created_at",
        )
        .bind(&user.id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let status = match row.try_get::<String, _>("status")?.as_str() {
                    "verified" => FactorStatus::Verified,
                    _ => FactorStatus::Unverified,
                };
                Ok(Factor {
                    id: row.try_get("id")?,
                    factor_type: "totp".to_string(),
                    status,
                    friendly_name: row.try_get("friendly_name")?,
                })
            })
            .collect()
    }

    async fn challenge(&self, session: &AuthSession, factor_id: &str) -> PlatformResult<Challenge> {
        let user = self.live_session(&session.access_token).await?.user;
        self.factor_secret(&user.id, factor_id).await?;

        let id = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + Duration::minutes(CHALLENGE_TTL_MINUTES);
        sqlx::query("INSERT INTO auth_challenges (id, factor_id, expires_at) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(factor_id)
            .bind(expires_at.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(Challenge {
            id,
            expires_at: Some(expires_at),
        })
    }

    async fn verify(
        &self,
        session: &AuthSession,
        factor_id: &str,
        challenge_id: &str,
        code: &str,
    ) -> PlatformResult<AuthSession> {
        let live = self.live_session(&session.access_token).await?;
        let (secret, _) = self.factor_secret(&live.user.id, factor_id).await?;

        let row = sqlx::query("SELECT expires_at, used FROM auth_challenges WHERE id = ? AND factor_id = ?")
            .bind(challenge_id)
            .bind(factor_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| PlatformError::api(404, Some("mfa_factor_not_found"), "Challenge not found"))?;

        let used: i64 = row.try_get("used")?;
        let expires_at = parse_time(&row.try_get::<String, _>("expires_at")?)?;
        if used != 0 || expires_at <= Utc::now() {
            return Err(PlatformError::api(
                422,
                Some("mfa_challenge_expired"),
                "MFA challenge has expired, verify against another challenge",
            ));
        }

        let account = live.user.email.clone().unwrap_or_else(|| live.user.id.clone());
        let valid = self
            .totp(decode_secret(&secret)?, &account)?
            .check_current(code)
            .unwrap_or(false);
        if !valid {
            return Err(PlatformError::api(
                422,
                Some("mfa_verification_failed"),
                "Invalid TOTP code entered",
            ));
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE auth_challenges SET used = 1 WHERE id = ?")
            .bind(challenge_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE auth_factors SET status = 'verified' WHERE id = ?")
            .bind(factor_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE auth_sessions SET aal = ? WHERE token = ?")
            .bind(aal_text(AssuranceLevel::Aal2))
            .bind(&session.access_token)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(AuthSession {
            aal: AssuranceLevel::Aal2,
            ..live
        })
    }

    async fn enroll_totp(
        &self,
        session: &AuthSession,
        friendly_name: &str,
    ) -> PlatformResult<TotpEnrollment> {
        let user = self.live_session(&session.access_token).await?.user;

        let bytes = Secret::generate_secret()
            .to_bytes()
            .map_err(|e| PlatformError::Validation(format!("Secret generation failed: {:?}", e)))?;
        let account = user.email.clone().unwrap_or_else(|| user.id.clone());
        let totp = self.totp(bytes, &account)?;
        let secret = totp.get_secret_base32();
        let qr = totp
            .get_qr_base64()
            .map_err(|e| PlatformError::Validation(format!("QR generation failed: {}", e)))?;

        let factor_id = Uuid::new_v4().to_string();
        let friendly_name = Some(friendly_name.trim()).filter(|name| !name.is_empty());
        sqlx::query(
            "INSERT INTO auth_factors (id, user_id, secret, status, friendly_name, created_at)
             VALUES (?, ?, ?, 'unverified', ?, ?)",
        )
        .bind(&factor_id)
        .bind(&user.id)
        .bind(&secret)
        .bind(friendly_name)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(TotpEnrollment {
            factor_id,
            secret,
            qr_code: format!("data:image/png;base64,{}", qr),
            uri: totp.get_url(),
        })
    }

    async fn unenroll(&self, session: &AuthSession, factor_id: &str) -> PlatformResult<()> {
        let live = self.live_session(&session.access_token).await?;
        let (_, status) = self.factor_secret(&live.user.id, factor_id).await?;
        if status == FactorStatus::Verified && live.aal != AssuranceLevel::Aal2 {
            return Err(PlatformError::api(
                403,
                Some("insufficient_aal"),
                "AAL2 required to unenroll a verified factor",
            ));
        }

        sqlx::query("DELETE FROM auth_factors WHERE id = ? AND user_id = ?")
            .bind(factor_id)
            .bind(&live.user.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::init_database;

    async fn auth() -> LocalAuth {
        let pool = init_database("sqlite::memory:").await.unwrap();
        LocalAuth::new(pool, "Tonearm", Duration::hours(1))
    }

    fn current_code(secret: &str) -> String {
        let bytes = Secret::Encoded(secret.to_string()).to_bytes().unwrap();
        TOTP::new(Algorithm::SHA1, 6, 1, 30, bytes, Some("Tonearm".into()), "x".into())
            .unwrap()
            .generate_current()
            .unwrap()
    }

    fn flip_digits(code: &str) -> String {
        code.chars()
            .map(|c| char::from_digit((c.to_digit(10).unwrap() + 5) % 10, 10).unwrap())
            .collect()
    }

    #[test]
    fn test_hash_password() {
        let hash1 = hash_password("password123").unwrap();
        let hash2 = hash_password("password123").unwrap();
        assert_ne!(hash1, hash2);
        assert!(hash1.starts_with("$argon2"));
        assert!(verify_password("password123", &hash1));
        assert!(!verify_password("wrong", &hash1));
        assert!(!verify_password("password123", "not a hash"));
    }

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let auth = auth().await;
        let user = auth.create_user("Admin@Example.com", "correct horse").await.unwrap();
        assert_eq!(user.email.as_deref(), Some("admin@example.com"));

        let session = auth
            .sign_in_with_password("admin@example.com", "correct horse")
            .await
            .unwrap();
        assert_eq!(session.aal, AssuranceLevel::Aal1);
        assert_eq!(auth.get_user(&session.access_token).await.unwrap().id, user.id);

        auth.sign_out(&session).await.unwrap();
        assert!(auth.get_user(&session.access_token).await.is_err());
    }

    #[tokio::test]
    async fn test_refresh_extends_live_session() {
        let auth = auth().await;
        auth.create_user("admin@example.com", "correct horse").await.unwrap();
        let session = auth
            .sign_in_with_password("admin@example.com", "correct horse")
            .await
            .unwrap();
        sqlx::query("UPDATE auth_sessions SET expires_at = ? WHERE token = ?")
            .bind((Utc::now() + Duration::seconds(10)).to_rfc3339())
            .bind(&session.access_token)
            .execute(&auth.pool)
            .await
            .unwrap();

        let refreshed = auth.refresh(&session).await.unwrap();
        assert_eq!(refreshed.access_token, session.access_token);
        assert!(!refreshed.needs_refresh(Utc::now()));
        let stored = auth.live_session(&session.access_token).await.unwrap();
        assert!(stored.expires_at.unwrap() > Utc::now() + Duration::minutes(30));

        auth.sign_out(&session).await.unwrap();
        assert!(auth.refresh(&session).await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_credentials() {
        let auth = auth().await;
        auth.create_user("admin@example.com", "correct horse").await.unwrap();

        let wrong_password = auth
            .sign_in_with_password("admin@example.com", "battery staple")
            .await
            .unwrap_err();
        let unknown_user = auth
            .sign_in_with_password("nobody@example.com", "correct horse")
            .await
            .unwrap_err();
        assert_eq!(wrong_password.to_string(), "Invalid login credentials");
        assert_eq!(unknown_user.to_string(), "Invalid login credentials");
    }

    #[tokio::test]
    async fn test_create_user_validation() {
        let auth = auth().await;
        assert!(auth.create_user("not-an-email", "long enough").await.is_err());
        assert!(auth.create_user("a@b.c", "short").await.is_err());
        auth.create_user("a@b.c", "long enough").await.unwrap();
        assert!(auth.create_user("A@B.C", "long enough").await.is_err());
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let auth = LocalAuth::new(pool, "Tonearm", Duration::seconds(-1));
        auth.create_user("a@b.c", "long enough").await.unwrap();
        let session = auth.sign_in_with_password("a@b.c", "long enough").await.unwrap();
        assert!(auth.get_user(&session.access_token).await.is_err());
    }

    #[tokio::test]
    async fn test_enroll_challenge_verify_unenroll() {
        let auth = auth().await;
        auth.create_user("a@b.c", "long enough").await.unwrap();
        let session = auth.sign_in_with_password("a@b.c", "long enough").await.unwrap();

        let enrollment = auth.enroll_totp(&session, "Phone").await.unwrap();
        assert!(enrollment.qr_code.starts_with("data:image/png;base64,"));
        assert!(enrollment.uri.starts_with("otpauth://totp/"));

        let factors = auth.list_factors(&session).await.unwrap();
        assert_eq!(factors.len(), 1);
        assert!(!factors[0].is_verified_totp());

        let challenge = auth.challenge(&session, &enrollment.factor_id).await.unwrap();
        let code = current_code(&enrollment.secret);
        let wrong = auth
            .verify(&session, &enrollment.factor_id, &challenge.id, &flip_digits(&code))
            .await
            .unwrap_err();
        assert_eq!(wrong.code(), Some("mfa_verification_failed"));

        let verified = auth
            .verify(&session, &enrollment.factor_id, &challenge.id, &code)
            .await
            .unwrap();
        assert_eq!(verified.aal, AssuranceLevel::Aal2);
        assert!(auth.list_factors(&session).await.unwrap()[0].is_verified_totp());

        // Challenges are single use
        let reused = auth
            .verify(
                &session,
                &enrollment.factor_id,
                &challenge.id,
                &current_code(&enrollment.secret),
            )
            .await
            .unwrap_err();
        assert_eq!(reused.code(), Some("mfa_challenge_expired"));

        auth.unenroll(&verified, &enrollment.factor_id).await.unwrap();
        assert!(auth.list_factors(&session).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unenroll_verified_factor_requires_aal2() {
        let auth = auth().await;
        auth.create_user("a@b.c", "long enough").await.unwrap();
        let first = auth.sign_in_with_password("a@b.c", "long enough").await.unwrap();
        let enrollment = auth.enroll_totp(&first, "").await.unwrap();
        let challenge = auth.challenge(&first, &enrollment.factor_id).await.unwrap();
        auth.verify(
            &first,
            &enrollment.factor_id,
            &challenge.id,
            &current_code(&enrollment.secret),
        )
        .await
        .unwrap();

        let second = auth.sign_in_with_password("a@b.c", "long enough").await.unwrap();
        let err = auth.unenroll(&second, &enrollment.factor_id).await.unwrap_err();
        assert_eq!(err.code(), Some("insufficient_aal"));
    }

    #[tokio::test]
    async fn test_factors_are_per_user() {
        let auth = auth().await;
        auth.create_user("a@b.c", "long enough").await.unwrap();
        auth.create_user("d@e.f", "long enough").await.unwrap();
        let alice = auth.sign_in_with_password("a@b.c", "long enough").await.unwrap();
        let dave = auth.sign_in_with_password("d@e.f", "long enough").await.unwrap();

        let enrollment = auth.enroll_totp(&alice, "Phone").await.unwrap();
        assert!(auth.challenge(&dave, &enrollment.factor_id).await.is_err());
        assert!(auth.list_factors(&dave).await.unwrap().is_empty());
    }
}
