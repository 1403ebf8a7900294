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

use axum::{extract::State, response::Html};
use futures::future::try_join_all;
use serde::Serialize;
use tonearm_db::Query;

use super::resources::NAV;
use super::{admin_context, render};
use crate::{auth::AdminSession, error::AppError, AppState};

const RECENT_VISITS: usize = 20;

#[derive(Debug, Serialize)]
struct ResourceCount {
    slug: &'static str,
    title: &'static str,
    count: u64,
}

/// `/Manage`: row counts per content type and the latest storefront visits
pub async fn dashboard_handler(
    State(state): State<AppState>,
    admin: AdminSession,
) -> Result<Html<String>, AppError> {
    let query = Query::new();
    let tables = state.platform.tables.clone();
    let visits = state.visits();

    let (counts, recent, total_visits) = tokio::try_join!(
        try_join_all(NAV.iter().map(|item| tables.count(item.table, &query))),
        visits.recent(RECENT_VISITS),
        visits.count(),
    )?;

    let resources: Vec<ResourceCount> = NAV
        .iter()
        .zip(counts)
        .map(|(item, count)| ResourceCount {
            slug: item.slug,
            title: item.title,
            count,
        })
        .collect();

    let mut context = admin_context(&admin, "dashboard");
    context.insert("resources", &resources);
    context.insert("recent_visits", &recent);
    context.insert("total_visits", &total_visits);
    if let Some(flash) = state.sessions.take_flash(&admin.session.id).await {
        context.insert("flash", &flash);
    }
    render(&state, "admin/dashboard.html", &context)
}
