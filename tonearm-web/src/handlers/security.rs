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
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;

use super::{admin_context, render};
use crate::{
    auth::{end_session, AdminSession},
    error::AppError,
    mfa::AuthFlowError,
    AppState,
};

pub const SECURITY_PATH: &str = "/Manage/Security";

#[derive(Debug, Deserialize)]
pub struct EnrollForm {
    #[serde(default)]
    pub friendly_name: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEnrollmentForm {
    pub factor_id: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct UnenrollForm {
    pub factor_id: String,
}

async fn render_security(state: &AppState, admin: &AdminSession, error: Option<&str>) -> Result<Response, AppError> {
    let factors = match state.flow().list_factors(&admin.session.auth).await {
        Ok(factors) => factors,
        Err(e) => return Ok(flow_failure(state, admin, e).await),
    };
    let session = state.sessions.get(&admin.session.id).await;
    let enrollment = session.as_ref().and_then(|s| s.enrollment.clone());

    let mut context = admin_context(admin, "security");
    context.insert("factors", &factors);
    context.insert("has_verified_factor", &factors.iter().any(|f| f.is_verified_totp()));
    context.insert("enrollment", &enrollment);
    if let Some(error) = error {
        context.insert("error", error);
    }
    if let Some(flash) = state.sessions.take_flash(&admin.session.id).await {
        context.insert("flash", &flash);
    }
    Ok(render(state, "admin/security.html", &context)?.into_response())
}

/// Provider errors end the session; local ones are shown on the page
async fn flow_failure(state: &AppState, admin: &AdminSession, error: AuthFlowError) -> Response {
    if error.signed_out {
        return end_session(state, &admin.session.id, Some(&error.message)).await;
    }
    match render_security_plain(state, admin, &error.message) {
        Ok(page) => page.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Error page without another provider round trip
fn render_security_plain(state: &AppState, admin: &AdminSession, error: &str) -> Result<Html<String>, AppError> {
    let mut context = admin_context(admin, "security");
    context.insert("factors", &Vec::<tonearm_db::Factor>::new());
    context.insert("has_verified_factor", &admin.admin.mfa_enabled);
    context.insert("enrollment", &admin.session.enrollment);
    context.insert("error", error);
    render(state, "admin/security.html", &context)
}

pub async fn security_page(State(state): State<AppState>, admin: AdminSession) -> Result<Response, AppError> {
    render_security(&state, &admin, None).await
}

/// Start authenticator setup: keeps the secret and QR code in the session
/// until the first code confirms them
pub async fn start_enrollment(
    State(state): State<AppState>,
    admin: AdminSession,
    Form(form): Form<EnrollForm>,
) -> Result<Response, AppError> {
    let friendly_name = match form.friendly_name.trim() {
        "" => "Authenticator app",
        name => name,
    };
    match state.flow().enroll_mfa(&admin.session.auth, friendly_name).await {
        Ok(enrollment) => {
            tracing::info!(admin = %admin.admin.email, factor_id = %enrollment.factor_id, "Authenticator enrollment started");
            state
                .sessions
                .update(&admin.session.id, |session| session.enrollment = Some(enrollment))
                .await;
            Ok(Redirect::to(SECURITY_PATH).into_response())
        }
        Err(e) => Ok(flow_failure(&state, &admin, e).await),
    }
}

pub async fn verify_enrollment(
    State(state): State<AppState>,
    admin: AdminSession,
    Form(form): Form<VerifyEnrollmentForm>,
) -> Result<Response, AppError> {
    match state
        .flow()
        .verify_mfa_enrollment(&admin.session.auth, &form.factor_id, &form.code)
        .await
    {
        Ok((upgraded, admin_user)) => {
            state.sessions.complete(&admin.session.id, upgraded, admin_user).await;
            state
                .sessions
                .set_flash(&admin.session.id, "Two-factor authentication is now enabled")
                .await;
            Ok(Redirect::to(SECURITY_PATH).into_response())
        }
        Err(e) if e.signed_out => Ok(flow_failure(&state, &admin, e).await),
        Err(e) => render_security(&state, &admin, Some(&e.message)).await,
    }
}

pub async fn unenroll(
    State(state): State<AppState>,
    admin: AdminSession,
    Form(form): Form<UnenrollForm>,
) -> Result<Response, AppError> {
    match state.flow().unenroll_mfa(&admin.session.auth, &form.factor_id).await {
        Ok(()) => {
            tracing::info!(admin = %admin.admin.email, factor_id = %form.factor_id, "Authenticator removed");
            state
                .sessions
                .update(&admin.session.id, |session| {
                    if session
                        .enrollment
                        .as_ref()
                        .is_some_and(|pending| pending.factor_id == form.factor_id)
                    {
                        session.enrollment = None;
                    }
                })
                .await;
            state
                .sessions
                .set_flash(&admin.session.id, "Authenticator removed")
                .await;
            Ok(Redirect::to(SECURITY_PATH).into_response())
        }
        Err(e) => Ok(flow_failure(&state, &admin, e).await),
    }
}
