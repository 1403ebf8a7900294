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

//! Generic CRUD screens under `/Manage/{slug}`.
//!
//! Every content type implements `AdminResource`; the handlers here list,
//! create, edit, toggle, reorder and delete any of them the same way.

use axum::{
    extract::{Multipart, Path, Query as UrlQuery, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tera::Context;
use tonearm_core::sort_order::MoveDirection;
use tonearm_core::tentative::apply_tentatively;
use tonearm_core::utils::{FormData, UploadTarget};
use tonearm_core::{Category, Product, Record, Sortable};
use tonearm_db::{delete_with_storage, Paginated, PlatformError, Query};

use super::upload::{check_upload, read_multipart, store_upload, UploadedFile};
use super::{admin_context, render};
use crate::{auth::AdminSession, error::AppError, AppState};

/// Suffix of the file input that belongs to a URL field, e.g. `image_url__upload`
pub const UPLOAD_SUFFIX: &str = "__upload";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Textarea,
    /// Rich text body stored as HTML
    Html,
    Number,
    Decimal,
    Checkbox,
    Select,
    Datetime,
    /// One value per line, stored as a list
    Lines,
    Json,
    Url,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub help: Option<&'static str>,
    /// Upload target whose file input fills this field
    pub upload: Option<&'static str>,
    pub options: Vec<SelectOption>,
    pub value: String,
    pub checked: bool,
}

impl FormField {
    pub fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: false,
            help: None,
            upload: None,
            options: Vec::new(),
            value: String::new(),
            checked: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }

    pub fn upload(mut self, target: UploadTarget) -> Self {
        self.upload = Some(target.as_str());
        self
    }

    pub fn options(mut self, options: &[SelectOption]) -> Self {
        self.options = options.to_vec();
        self
    }

    pub fn value(mut self, value: impl ToString) -> Self {
        self.value = value.to_string();
        self
    }

    pub fn maybe(self, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.value(value),
            None => self,
        }
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    fn upload_target(&self) -> Option<UploadTarget> {
        self.upload.and_then(|target| target.parse().ok())
    }
}

/// Where a resource's select options come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionSource {
    None,
    Categories,
    Products,
}

pub trait AdminResource: Record {
    /// Path segment under `/Manage`
    const SLUG: &'static str;
    const TITLE: &'static str;
    const SINGULAR: &'static str;
    const SEARCH_COLUMN: Option<&'static str> = None;
    /// Boolean columns shown as one-click toggles: `(column, label)`
    const TOGGLES: &'static [(&'static str, &'static str)] = &[];
    const SORTABLE: bool = false;
    const OPTIONS: OptionSource = OptionSource::None;

    fn list_order(query: Query) -> Query {
        if Self::SORTABLE {
            query.order("sort_order", true).order("id", true)
        } else {
            query.order("id", false)
        }
    }

    /// Form fields, filled from `record` when editing
    fn form_fields(record: Option<&Self>, options: &[SelectOption]) -> Vec<FormField>;

    /// Build a record from submitted fields; `existing` is the row being edited
    fn from_form(form: &FormData, existing: Option<&Self>) -> Result<Self, String>;

    fn label(&self) -> String;

    fn details(&self) -> Option<String> {
        None
    }

    fn thumbnail(&self) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FlagState {
    pub field: &'static str,
    pub label: &'static str,
    pub value: bool,
}

/// One line of a list screen
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ListRow {
    pub id: i64,
    pub label: String,
    pub details: Option<String>,
    pub thumbnail: Option<String>,
    pub flags: Vec<FlagState>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ListParams {
    pub page: Option<usize>,
    pub q: Option<String>,
}

impl ListParams {
    fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    fn search(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    fn query_string(&self) -> String {
        let mut parts = vec![format!("page={}", self.page())];
        if let Some(q) = self.search() {
            parts.push(format!("q={}", urlencoding::encode(q)));
        }
        parts.join("&")
    }
}

/// Read a column through the record's wire shape
fn column<T: Record>(record: &T, name: &str) -> Option<Value> {
    serde_json::to_value(record)
        .ok()
        .and_then(|mut row| row.get_mut(name).map(Value::take))
}

pub fn list_row<T: AdminResource>(record: &T) -> Option<ListRow> {
    Some(ListRow {
        id: record.id()?,
        label: record.label(),
        details: record.details(),
        thumbnail: record.thumbnail().map(str::to_string),
        flags: T::TOGGLES
            .iter()
            .map(|&(field, label)| FlagState {
                field,
                label,
                value: column(record, field).and_then(|v| v.as_bool()).unwrap_or(false),
            })
            .collect(),
    })
}

fn base_path<T: AdminResource>() -> String {
    format!("/Manage/{}", T::SLUG)
}

async fn load_page<T: AdminResource>(state: &AppState, params: &ListParams) -> Result<Paginated<T>, AppError> {
    let mut query = Query::new();
    if let (Some(column), Some(term)) = (T::SEARCH_COLUMN, params.search()) {
        query = query.search(column, term);
    }
    Ok(state
        .repo::<T>()
        .paginate(T::list_order(query), params.page(), state.config.page_size)
        .await?)
}

fn render_list<T: AdminResource>(
    state: &AppState,
    admin: &AdminSession,
    page: &Paginated<T>,
    rows: &[ListRow],
    params: &ListParams,
    flash: Option<&str>,
    error: Option<&str>,
) -> Result<Html<String>, AppError> {
    let mut context = admin_context(admin, T::SLUG);
    context.insert("title", T::TITLE);
    context.insert("singular", T::SINGULAR);
    context.insert("base_path", &base_path::<T>());
    context.insert("rows", rows);
    context.insert("sortable", &T::SORTABLE);
    context.insert("searchable", &T::SEARCH_COLUMN.is_some());
    context.insert("q", params.search().unwrap_or_default());
    context.insert("query_string", &params.query_string());
    context.insert("page", &page.page);
    context.insert("total", &page.total);
    context.insert("total_pages", &page.total_pages());
    context.insert("has_previous", &page.has_previous());
    context.insert("has_next", &page.has_next());
    if let Some(flash) = flash {
        context.insert("flash", flash);
    }
    if let Some(error) = error {
        context.insert("error", error);
    }
    render(state, "admin/list.html", &context)
}

pub async fn list<T: AdminResource>(
    State(state): State<AppState>,
    admin: AdminSession,
    UrlQuery(params): UrlQuery<ListParams>,
) -> Result<Html<String>, AppError> {
    let page = load_page::<T>(&state, &params).await?;
    let rows: Vec<ListRow> = page.items.iter().filter_map(list_row).collect();
    let flash = state.sessions.take_flash(&admin.session.id).await;
    render_list(&state, &admin, &page, &rows, &params, flash.as_deref(), None)
}

async fn load_options<T: AdminResource>(state: &AppState) -> Result<Vec<SelectOption>, AppError> {
    let options = match T::OPTIONS {
        OptionSource::None => Vec::new(),
        OptionSource::Categories => state
            .repo::<Category>()
            .list_sorted(Query::new())
            .await?
            .into_iter()
            .filter_map(|c| {
                Some(SelectOption {
                    value: c.id?.to_string(),
                    label: c.name,
                })
            })
            .collect(),
        OptionSource::Products => state
            .repo::<Product>()
            .list(&Query::new().order("name", true))
            .await?
            .into_iter()
            .filter_map(|p| {
                Some(SelectOption {
                    value: p.id?.to_string(),
                    label: p.name,
                })
            })
            .collect(),
    };
    Ok(options)
}

/// Put the submitted values back so a rejected form keeps what was typed
fn refill(fields: &mut [FormField], form: &FormData) {
    for field in fields.iter_mut() {
        match field.kind {
            FieldKind::Checkbox => field.checked = form.flag(field.name),
            _ => field.value = form.raw(field.name).unwrap_or_default().to_string(),
        }
    }
}

fn render_form<T: AdminResource>(
    state: &AppState,
    admin: &AdminSession,
    fields: &[FormField],
    record_id: Option<i64>,
    error: Option<&str>,
) -> Result<Html<String>, AppError> {
    let mut context: Context = admin_context(admin, T::SLUG);
    let base = base_path::<T>();
    context.insert("title", T::TITLE);
    context.insert("singular", T::SINGULAR);
    context.insert("base_path", &base);
    context.insert("fields", fields);
    context.insert("record_id", &record_id);
    context.insert(
        "action",
        &match record_id {
            Some(id) => format!("{}/{}/edit", base, id),
            None => format!("{}/new", base),
        },
    );
    if let Some(error) = error {
        context.insert("error", error);
    }
    render(state, "admin/form.html", &context)
}

pub async fn new_form<T: AdminResource>(
    State(state): State<AppState>,
    admin: AdminSession,
) -> Result<Html<String>, AppError> {
    let options = load_options::<T>(&state).await?;
    let fields = T::form_fields(None, &options);
    render_form::<T>(&state, &admin, &fields, None, None)
}

pub async fn edit_form<T: AdminResource>(
    State(state): State<AppState>,
    admin: AdminSession,
    Path(id): Path<i64>,
) -> Result<Html<String>, AppError> {
    let record = state
        .repo::<T>()
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{} not found", T::SINGULAR)))?;
    let options = load_options::<T>(&state).await?;
    let fields = T::form_fields(Some(&record), &options);
    render_form::<T>(&state, &admin, &fields, Some(id), None)
}

/// A submitted form after its files went to storage
struct Submission {
    form: FormData,
    uploaded: Vec<String>,
}

/// Validate every attached file, upload them and write their URLs into
/// the fields they belong to. Nothing is uploaded unless all files pass.
async fn accept_submission(
    state: &AppState,
    fields: &[FormField],
    mut values: HashMap<String, String>,
    files: Vec<UploadedFile>,
) -> Result<Submission, (FormData, String)> {
    let mut planned = Vec::new();
    for file in files {
        let Some(field) = file
            .field
            .strip_suffix(UPLOAD_SUFFIX)
            .and_then(|name| fields.iter().find(|f| f.name == name))
        else {
            continue;
        };
        let Some(target) = field.upload_target() else {
            continue;
        };
        if let Err(message) = check_upload(target, &file) {
            return Err((FormData::new(values), format!("{}: {}", field.label, message)));
        }
        planned.push((field.name, field.kind, target, file));
    }

    let mut uploaded = Vec::new();
    for (name, kind, target, file) in planned {
        match store_upload(state, target, &file).await {
            Ok(url) => {
                let entry = values.entry(name.to_string()).or_default();
                if kind == FieldKind::Lines && !entry.trim().is_empty() {
                    entry.push('\n');
                    entry.push_str(&url);
                } else {
                    *entry = url.clone();
                }
                uploaded.push(url);
            }
            Err(message) => {
                state.janitor().remove_urls(&uploaded).await;
                return Err((FormData::new(values), message));
            }
        }
    }

    Ok(Submission {
        form: FormData::new(values),
        uploaded,
    })
}

/// Blank `sort_order` on create means "after the last row"
async fn default_position<T: AdminResource>(state: &AppState, values: &mut HashMap<String, String>) -> Result<(), AppError> {
    if !T::SORTABLE || values.get("sort_order").is_some_and(|v| !v.trim().is_empty()) {
        return Ok(());
    }
    let last = state
        .repo::<T>()
        .list(&Query::new().order("sort_order", false).limit(1))
        .await?;
    let next = last
        .first()
        .and_then(|record| column(record, "sort_order"))
        .and_then(|v| v.as_i64())
        .map_or(0, |position| position + 1);
    values.insert("sort_order".to_string(), next.to_string());
    Ok(())
}

fn failure_message(err: &PlatformError) -> String {
    tracing::warn!(error = %err, "Write rejected");
    err.user_message()
}

pub async fn create<T: AdminResource>(
    State(state): State<AppState>,
    admin: AdminSession,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let (mut values, files) = read_multipart(multipart).await?;
    let options = load_options::<T>(&state).await?;
    let mut fields = T::form_fields(None, &options);
    default_position::<T>(&state, &mut values).await?;

    let submission = match accept_submission(&state, &fields, values, files).await {
        Ok(submission) => submission,
        Err((form, message)) => {
            refill(&mut fields, &form);
            return Ok(render_form::<T>(&state, &admin, &fields, None, Some(&message))?.into_response());
        }
    };

    let result = match T::from_form(&submission.form, None) {
        Ok(record) => state.repo::<T>().create(&record).await.map_err(|e| failure_message(&e)),
        Err(message) => Err(message),
    };

    match result {
        Ok(created) => {
            tracing::info!(table = T::TABLE, id = ?created.id(), admin = %admin.admin.email, "Created record");
            state
                .sessions
                .set_flash(&admin.session.id, format!("{} created", T::SINGULAR))
                .await;
            Ok(Redirect::to(&base_path::<T>()).into_response())
        }
        Err(message) => {
            state.janitor().remove_urls(&submission.uploaded).await;
            refill(&mut fields, &submission.form);
            Ok(render_form::<T>(&state, &admin, &fields, None, Some(&message))?.into_response())
        }
    }
}

pub async fn update<T: AdminResource>(
    State(state): State<AppState>,
    admin: AdminSession,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let repo = state.repo::<T>();
    let existing = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{} not found", T::SINGULAR)))?;

    let (values, files) = read_multipart(multipart).await?;
    let options = load_options::<T>(&state).await?;
    let mut fields = T::form_fields(Some(&existing), &options);

    let submission = match accept_submission(&state, &fields, values, files).await {
        Ok(submission) => submission,
        Err((form, message)) => {
            refill(&mut fields, &form);
            return Ok(render_form::<T>(&state, &admin, &fields, Some(id), Some(&message))?.into_response());
        }
    };

    let result = match T::from_form(&submission.form, Some(&existing)) {
        Ok(record) => repo.update(id, &record).await.map_err(|e| failure_message(&e)),
        Err(message) => Err(message),
    };

    match result {
        Ok(updated) => {
            state.janitor().cleanup_replaced_files(&existing, &updated).await;
            tracing::info!(table = T::TABLE, id, admin = %admin.admin.email, "Updated record");
            state
                .sessions
                .set_flash(&admin.session.id, format!("{} saved", T::SINGULAR))
                .await;
            Ok(Redirect::to(&base_path::<T>()).into_response())
        }
        Err(message) => {
            state.janitor().remove_urls(&submission.uploaded).await;
            refill(&mut fields, &submission.form);
            Ok(render_form::<T>(&state, &admin, &fields, Some(id), Some(&message))?.into_response())
        }
    }
}

/// Flip one boolean column.
///
/// The flag is flipped in the loaded list first; if the single-field update
/// fails the list is rendered again with the old value and the error.
pub async fn toggle<T: AdminResource>(
    State(state): State<AppState>,
    admin: AdminSession,
    Path((id, field)): Path<(i64, String)>,
    UrlQuery(params): UrlQuery<ListParams>,
) -> Result<Response, AppError> {
    let Some(&(field, _)) = T::TOGGLES.iter().find(|(name, _)| *name == field) else {
        return Err(AppError::bad_request(format!("{} cannot be toggled", field)));
    };

    let page = load_page::<T>(&state, &params).await?;
    let mut rows: Vec<ListRow> = page.items.iter().filter_map(list_row).collect();
    let Some(row) = rows.iter_mut().find(|row| row.id == id) else {
        return Err(AppError::not_found(format!("{} not found", T::SINGULAR)));
    };

    let repo = state.repo::<T>();
    let result = apply_tentatively(
        row,
        |row| {
            for flag in row.flags.iter_mut().filter(|flag| flag.field == field) {
                flag.value = !flag.value;
            }
        },
        |row| async move {
            let value = row
                .flags
                .iter()
                .find(|flag| flag.field == field)
                .is_some_and(|flag| flag.value);
            repo.set_field(id, field, Value::Bool(value)).await
        },
    )
    .await;

    match result {
        Ok(()) => {
            tracing::debug!(table = T::TABLE, id, field, "Toggled flag");
            Ok(Redirect::to(&format!("{}?{}", base_path::<T>(), params.query_string())).into_response())
        }
        Err(e) => {
            let message = failure_message(&e);
            Ok(render_list(&state, &admin, &page, &rows, &params, None, Some(&message))?.into_response())
        }
    }
}

pub async fn delete<T: AdminResource>(
    State(state): State<AppState>,
    admin: AdminSession,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let repo = state.repo::<T>();
    let record = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{} not found", T::SINGULAR)))?;

    let message = match delete_with_storage(&repo, &state.janitor(), &record).await {
        Ok(report) if report.is_clean() => format!("{} deleted", T::SINGULAR),
        Ok(_) => format!("{} deleted; some files could not be removed", T::SINGULAR),
        Err(e) => failure_message(&e),
    };
    tracing::info!(table = T::TABLE, id, admin = %admin.admin.email, "Delete requested");
    state.sessions.set_flash(&admin.session.id, message).await;
    Ok(Redirect::to(&base_path::<T>()).into_response())
}

pub async fn move_record<T: AdminResource + Sortable>(
    State(state): State<AppState>,
    admin: AdminSession,
    Path((id, direction)): Path<(i64, String)>,
    UrlQuery(params): UrlQuery<ListParams>,
) -> Result<Response, AppError> {
    let direction: MoveDirection = direction.parse().map_err(AppError::bad_request)?;
    if let Err(e) = state.repo::<T>().move_record(id, direction).await {
        let message = failure_message(&e);
        state.sessions.set_flash(&admin.session.id, message).await;
    }
    Ok(Redirect::to(&format!("{}?{}", base_path::<T>(), params.query_string())).into_response())
}

pub fn resource_routes<T: AdminResource>() -> Router<AppState> {
    let base = base_path::<T>();
    Router::new()
        .route(&base, get(list::<T>))
        .route(&format!("{}/new", base), get(new_form::<T>).post(create::<T>))
        .route(&format!("{}/{{id}}/edit", base), get(edit_form::<T>).post(update::<T>))
        .route(&format!("{}/{{id}}/toggle/{{field}}", base), post(toggle::<T>))
        .route(&format!("{}/{{id}}/delete", base), post(delete::<T>))
}

pub fn sortable_routes<T: AdminResource + Sortable>() -> Router<AppState> {
    resource_routes::<T>().route(
        &format!("{}/{{id}}/move/{{direction}}", base_path::<T>()),
        post(move_record::<T>),
    )
}
