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
use serde::{Deserialize, Serialize};
use tonearm_core::SiteConfig;

use super::{admin_context, render};
use crate::{auth::AdminSession, error::AppError, AppState};

pub const SETTINGS_PATH: &str = "/Manage/Settings";

#[derive(Debug, Serialize)]
struct SettingRow {
    key: String,
    value: String,
    description: Option<String>,
}

/// A rejected save, shown next to the key it was for
struct SettingError<'a> {
    key: &'a str,
    raw: &'a str,
    message: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct SettingForm {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteSettingForm {
    pub key: String,
}

async fn render_settings(
    state: &AppState,
    admin: &AdminSession,
    error: Option<SettingError<'_>>,
    flash: Option<String>,
) -> Result<Html<String>, AppError> {
    let entries = state.site_config().all().await?;
    let mut rows: Vec<SettingRow> = entries
        .iter()
        .map(|entry| SettingRow {
            key: entry.key.clone(),
            value: entry.value_as_text(),
            description: entry.description.clone(),
        })
        .collect();

    let mut context = admin_context(admin, "settings");
    if let Some(error) = &error {
        // Keep the rejected text in its textarea
        match rows.iter_mut().find(|row| row.key == error.key) {
            Some(row) => row.value = error.raw.to_string(),
            None => {
                context.insert("new_key", error.key);
                context.insert("new_value", error.raw);
            }
        }
        context.insert("error_key", error.key);
        context.insert("error", error.message);
    }
    context.insert("settings", &rows);
    if let Some(flash) = flash {
        context.insert("flash", &flash);
    }
    render(state, "admin/settings.html", &context)
}

pub async fn settings_page(
    State(state): State<AppState>,
    admin: AdminSession,
) -> Result<Html<String>, AppError> {
    let flash = state.sessions.take_flash(&admin.session.id).await;
    render_settings(&state, &admin, None, flash).await
}

/// Save one key; malformed JSON is rejected before anything is written
pub async fn save_setting(
    State(state): State<AppState>,
    admin: AdminSession,
    Form(form): Form<SettingForm>,
) -> Result<Response, AppError> {
    let key = form.key.trim();
    let result = match SiteConfig::parse_value(&form.value) {
        Ok(value) => state
            .site_config()
            .set(key, value)
            .await
            .map_err(|e| e.user_message()),
        Err(message) => Err(message),
    };

    match result {
        Ok(_) => {
            tracing::info!(key, admin = %admin.admin.email, "Saved site setting");
            state
                .sessions
                .set_flash(&admin.session.id, format!("Saved {}", key))
                .await;
            Ok(Redirect::to(SETTINGS_PATH).into_response())
        }
        Err(message) => {
            let error = SettingError {
                key,
                raw: &form.value,
                message: &message,
            };
            Ok(render_settings(&state, &admin, Some(error), None)
                .await?
                .into_response())
        }
    }
}

pub async fn delete_setting(
    State(state): State<AppState>,
    admin: AdminSession,
    Form(form): Form<DeleteSettingForm>,
) -> Result<Response, AppError> {
    let message = match state.site_config().delete(form.key.trim()).await {
        Ok(true) => format!("Deleted {}", form.key.trim()),
        Ok(false) => format!("{} does not exist", form.key.trim()),
        Err(e) => e.user_message(),
    };
    state.sessions.set_flash(&admin.session.id, message).await;
    Ok(Redirect::to(SETTINGS_PATH).into_response())
}
