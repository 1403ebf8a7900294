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

pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod public;
pub mod resources;
pub mod security;
pub mod settings;
pub mod upload;

pub use auth::{mfa_form, mfa_submit, sign_in_form, sign_in_submit, sign_out};
pub use dashboard::dashboard_handler;
pub use public::{
    category_page, dealers_page, downloads_page, health, home_page, news_detail, news_list,
    product_page, robots_txt, static_page, support_page,
};
pub use security::{security_page, start_enrollment, unenroll, verify_enrollment};
pub use settings::{delete_setting, save_setting, settings_page};
pub use upload::upload_handler;

use axum::response::Html;
use tera::Context;

use crate::{auth::AdminSession, error::AppError, AppState};

/// Context every admin page starts from
pub fn admin_context(admin: &AdminSession, section: &str) -> Context {
    let mut context = Context::new();
    context.insert("admin_email", &admin.admin.email);
    context.insert("admin_label", admin.admin.label());
    context.insert("mfa_enabled", &admin.admin.mfa_enabled);
    context.insert("nav", resources::NAV);
    context.insert("section", section);
    context
}

pub fn render(state: &AppState, template: &str, context: &Context) -> Result<Html<String>, AppError> {
    Ok(Html(state.templates.render(template, context)?))
}
