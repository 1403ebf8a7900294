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
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use tonearm_core::AdminUser;

use crate::rate_limit::{MFA_PATH, SIGN_IN_PATH};
use crate::session::{removal_cookie, AuthStage, SessionData, SESSION_COOKIE};
use crate::AppState;

/// A fully signed-in admin, extracted from the session cookie.
///
/// The admin gate runs again on every request so a deactivated account loses
/// access without waiting for its session to expire. An expired provider
/// token is refreshed first and stored back into the session.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub session: SessionData,
    pub admin: AdminUser,
}

/// Sign-in page carrying a message to show above the form
pub fn sign_in_redirect(message: Option<&str>) -> Redirect {
    match message {
        Some(message) => Redirect::to(&format!(
            "{}?message={}",
            SIGN_IN_PATH,
            urlencoding::encode(message)
        )),
        None => Redirect::to(SIGN_IN_PATH),
    }
}

/// Forget a session whose provider side has ended and send the browser back
/// to sign-in with `message`
pub async fn end_session(state: &AppState, id: &str, message: Option<&str>) -> Response {
    state.sessions.remove(id).await;
    let jar = CookieJar::new().add(removal_cookie());
    (jar, sign_in_redirect(message)).into_response()
}

pub fn session_id(parts: &Parts) -> Option<String> {
    CookieJar::from_headers(&parts.headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|id| !id.is_empty())
}

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(id) = session_id(parts) else {
            return Err(sign_in_redirect(None).into_response());
        };
        let Some(session) = state.sessions.get(&id).await else {
            let jar = CookieJar::new().add(removal_cookie());
            return Err((jar, sign_in_redirect(None)).into_response());
        };

        if matches!(session.stage, AuthStage::MfaPending { .. }) {
            return Err(Redirect::to(MFA_PATH).into_response());
        }

        let session = match state.flow().refresh_if_expired(&session.auth).await {
            Ok(None) => session,
            Ok(Some(fresh)) => match state.sessions.update(&id, |s| s.auth = fresh).await {
                Some(updated) => updated,
                None => return Err(sign_in_redirect(None).into_response()),
            },
            Err(e) => return Err(end_session(state, &id, Some(&e.message)).await),
        };

        match state.flow().check_admin(&session.auth).await {
            Ok(admin) => Ok(AdminSession { session, admin }),
            Err(e) => Err(end_session(state, &id, Some(&e.message)).await),
        }
    }
}
