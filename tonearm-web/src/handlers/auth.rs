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
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use tera::Context;

use super::render;
use crate::{
    auth::{end_session, sign_in_redirect},
    error::AppError,
    mfa::SignInOutcome,
    rate_limit::MFA_PATH,
    session::{removal_cookie, session_cookie, AuthStage, SessionData, SESSION_COOKIE},
    AppState,
};

pub const MANAGE_PATH: &str = "/Manage";

#[derive(Debug, Default, Deserialize)]
pub struct MessageParams {
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignInForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct MfaForm {
    #[serde(default)]
    pub code: String,
}

async fn current_session(state: &AppState, jar: &CookieJar) -> Option<SessionData> {
    let id = jar.get(SESSION_COOKIE)?.value().to_string();
    state.sessions.get(&id).await
}

fn render_sign_in(state: &AppState, email: &str, error: Option<&str>) -> Result<Html<String>, AppError> {
    let mut context = Context::new();
    context.insert("email", email);
    if let Some(error) = error {
        context.insert("error", error);
    }
    render(state, "auth/signin.html", &context)
}

fn render_mfa(state: &AppState, error: Option<&str>) -> Result<Html<String>, AppError> {
    let mut context = Context::new();
    if let Some(error) = error {
        context.insert("error", error);
    }
    render(state, "auth/mfa.html", &context)
}

pub async fn sign_in_form(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<MessageParams>,
) -> Result<Response, AppError> {
    if let Some(session) = current_session(&state, &jar).await {
        return Ok(match session.stage {
            AuthStage::Complete => Redirect::to(MANAGE_PATH).into_response(),
            AuthStage::MfaPending { .. } => Redirect::to(MFA_PATH).into_response(),
        });
    }
    Ok(render_sign_in(&state, "", params.message.as_deref())?.into_response())
}

pub async fn sign_in_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SignInForm>,
) -> Result<Response, AppError> {
    // A new sign-in replaces whatever session the browser had
    if let Some(previous) = current_session(&state, &jar).await {
        state.sessions.remove(&previous.id).await;
    }

    match state.flow().sign_in(&form.email, &form.password).await {
        Ok(SignInOutcome::MfaRequired {
            session,
            factor_id,
            challenge_id,
        }) => {
            let stage = AuthStage::MfaPending {
                factor_id,
                challenge_id,
            };
            let created = state.sessions.create(session, stage, None).await;
            let jar = jar.add(session_cookie(&created.id));
            Ok((jar, Redirect::to(MFA_PATH)).into_response())
        }
        Ok(SignInOutcome::SignedIn { session, admin }) => {
            tracing::info!(admin = %admin.email, "Admin signed in");
            let created = state
                .sessions
                .create(session, AuthStage::Complete, Some(admin))
                .await;
            let jar = jar.add(session_cookie(&created.id));
            Ok((jar, Redirect::to(MANAGE_PATH)).into_response())
        }
        Err(e) => {
            let jar = jar.add(removal_cookie());
            Ok((jar, render_sign_in(&state, form.email.trim(), Some(&e.message))?).into_response())
        }
    }
}

pub async fn mfa_form(State(state): State<AppState>, jar: CookieJar) -> Result<Response, AppError> {
    match current_session(&state, &jar).await.map(|s| s.stage) {
        Some(AuthStage::MfaPending { .. }) => Ok(render_mfa(&state, None)?.into_response()),
        Some(AuthStage::Complete) => Ok(Redirect::to(MANAGE_PATH).into_response()),
        None => Ok(sign_in_redirect(None).into_response()),
    }
}

pub async fn mfa_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<MfaForm>,
) -> Result<Response, AppError> {
    let Some(session) = current_session(&state, &jar).await else {
        return Ok(sign_in_redirect(None).into_response());
    };
    let AuthStage::MfaPending {
        factor_id,
        challenge_id,
    } = &session.stage
    else {
        return Ok(Redirect::to(MANAGE_PATH).into_response());
    };

    match state
        .flow()
        .verify_mfa(&session.auth, factor_id, challenge_id, &form.code)
        .await
    {
        Ok((upgraded, admin)) => {
            tracing::info!(admin = %admin.email, "Admin signed in with second factor");
            state.sessions.complete(&session.id, upgraded, admin).await;
            Ok(Redirect::to(MANAGE_PATH).into_response())
        }
        Err(e) if e.signed_out => Ok(end_session(&state, &session.id, Some(&e.message)).await),
        Err(e) => Ok(render_mfa(&state, Some(&e.message))?.into_response()),
    }
}

/// Ends the provider session as well as the local one
pub async fn sign_out(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Some(session) = current_session(&state, &jar).await {
        state.flow().sign_out(&session.auth).await;
        tracing::info!(user_id = %session.auth.user.id, "Signed out");
        return end_session(&state, &session.id, None).await;
    }
    (jar.add(removal_cookie()), sign_in_redirect(None)).into_response()
}
