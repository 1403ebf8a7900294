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
    http::{header, HeaderMap, Method, Request},
    middleware::Next,
    response::Response,
};
use tonearm_core::VisitLog;

use crate::AppState;

fn header_str<'a>(headers: &'a HeaderMap, name: header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Record successful storefront page views.
///
/// Only `GET` requests answered with a 2xx are logged. A failed insert is
/// logged and never affects the response.
pub async fn visit_logging_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let visit = VisitLog::new(
        request.uri().path(),
        header_str(request.headers(), header::REFERER),
        header_str(request.headers(), header::USER_AGENT),
    );

    let response = next.run(request).await;
    if response.status().is_success() {
        if let Err(e) = state.visits().record(&visit).await {
            tracing::warn!(path = %visit.path, error = %e, "Failed to record visit");
        }
    }
    response
}
