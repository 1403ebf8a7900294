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
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::{num::NonZeroU32, sync::Arc};

pub type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

pub const SIGN_IN_PATH: &str = "/Auth/SignIn";
pub const MFA_PATH: &str = "/Auth/Mfa";

/// Create a rate limiter for sign-in and MFA attempts
pub fn create_login_rate_limiter(max_attempts: u32) -> SharedRateLimiter {
    // Zero falls back to one attempt per minute
    let quota = Quota::per_minute(NonZeroU32::new(max_attempts).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Throttles credential and code submissions; every other request passes through
pub async fn login_rate_limit_middleware(
    State(limiter): State<SharedRateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let path = request.uri().path();
    if request.method() == Method::POST && (path == SIGN_IN_PATH || path == MFA_PATH) {
        if limiter.check().is_err() {
            tracing::warn!(path, "Rate limit exceeded for sign-in");
            return Err(StatusCode::TOO_MANY_REQUESTS);
        }
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_login_rate_limiter() {
        let limiter = create_login_rate_limiter(5);

        for _ in 0..5 {
            assert!(limiter.check().is_ok());
        }

        assert!(limiter.check().is_err());
    }

    #[test]
    fn test_create_login_rate_limiter_with_zero() {
        let limiter = create_login_rate_limiter(0);

        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }
}
