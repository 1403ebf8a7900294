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

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use super::client::{check, SupabaseClient};
use crate::error::{PlatformError, PlatformResult};
use crate::platform::{Filter, Query, TableClient};

/// Tables served over PostgREST at `/rest/v1/{table}`
#[derive(Debug, Clone)]
pub struct SupabaseTables {
    client: SupabaseClient,
}

impl SupabaseTables {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    fn path(table: &str) -> PlatformResult<String> {
        if !crate::platform::is_valid_column(table) {
            return Err(PlatformError::Validation(format!(
                "Invalid table name: {}",
                table
            )));
        }
        Ok(format!("/rest/v1/{}", table))
    }

    fn refuse_unfiltered(query: &Query, action: &str) -> PlatformResult<()> {
        if query.filters.is_empty() {
            return Err(PlatformError::Validation(format!(
                "Refusing to {} every row of a table",
                action
            )));
        }
        Ok(())
    }
}

/// Render a query as PostgREST URL parameters
pub fn query_params(query: &Query) -> PlatformResult<Vec<(String, String)>> {
    query.check_columns()?;

    let mut params = Vec::new();
    for filter in &query.filters {
        match filter {
            Filter::Eq(column, value) => {
                let rendered = match value {
                    Value::Null => "is.null".to_string(),
                    Value::String(s) => format!("eq.{}", s),
                    other => format!("eq.{}", other),
                };
                params.push((column.clone(), rendered));
            }
            Filter::ILike(column, pattern) => {
                params.push((column.clone(), format!("ilike.{}", pattern)));
            }
        }
    }

    if !query.order.is_empty() {
        let order = query
            .order
            .iter()
            .map(|o| format!("{}.{}", o.column, if o.ascending { "asc" } else { "desc" }))
            .collect::<Vec<_>>()
            .join(",");
        params.push(("order".to_string(), order));
    }
    if let Some(offset) = query.offset {
        params.push(("offset".to_string(), offset.to_string()));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    Ok(params)
}

/// Total from a `Content-Range: 0-9/42` header
fn parse_content_range(header: &str) -> Option<u64> {
    header.rsplit('/').next()?.trim().parse().ok()
}

#[async_trait]
impl TableClient for SupabaseTables {
    async fn select(&self, table: &str, query: &Query) -> PlatformResult<Vec<Value>> {
        let mut params = query_params(query)?;
        params.insert(0, ("select".to_string(), "*".to_string()));

        let response = self
            .client
            .service(Method::GET, &Self::path(table)?)
            .query(&params)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn count(&self, table: &str, query: &Query) -> PlatformResult<u64> {
        let params = query_params(&query.filters_only())?;
        let response = self
            .client
            .service(Method::HEAD, &Self::path(table)?)
            .query(&params)
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let response = check(response).await?;

        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| PlatformError::api(500, None, "Missing row count in response"))
    }

    async fn insert(&self, table: &str, row: Value) -> PlatformResult<Value> {
        let response = self
            .client
            .service(Method::POST, &Self::path(table)?)
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        let rows: Vec<Value> = check(response).await?.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| PlatformError::api(500, None, "Insert returned no row"))
    }

    async fn update(&self, table: &str, query: &Query, patch: Value) -> PlatformResult<Vec<Value>> {
        Self::refuse_unfiltered(query, "update")?;
        let response = self
            .client
            .service(Method::PATCH, &Self::path(table)?)
            .query(&query_params(&query.filters_only())?)
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn delete(&self, table: &str, query: &Query) -> PlatformResult<u64> {
        Self::refuse_unfiltered(query, "delete")?;
        let response = self
            .client
            .service(Method::DELETE, &Self::path(table)?)
            .query(&query_params(&query.filters_only())?)
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let rows: Vec<Value> = check(response).await?.json().await?;
        Ok(rows.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn tables(server: &mockito::ServerGuard) -> SupabaseTables {
        SupabaseTables::new(SupabaseClient::new(&server.url(), "anon", Some("service"), 5).unwrap())
    }

    #[test]
    fn test_query_params() {
        let query = Query::new()
            .eq("is_active", true)
            .eq("slug", "mc-275")
            .eq("category_id", Value::Null)
            .ilike("name", "%amp%")
            .order("sort_order", true)
            .order("created_at", false)
            .range(10, 5);
        let params = query_params(&query).unwrap();
        assert_eq!(
            params,
            vec![
                ("is_active".to_string(), "eq.true".to_string()),
                ("slug".to_string(), "eq.mc-275".to_string()),
                ("category_id".to_string(), "is.null".to_string()),
                ("name".to_string(), "ilike.%amp%".to_string()),
                ("order".to_string(), "sort_order.asc,created_at.desc".to_string()),
                ("offset".to_string(), "10".to_string()),
                ("limit".to_string(), "5".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range("0-9/42"), Some(42));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-9/*"), None);
    }

    #[tokio::test]
    async fn test_select_sends_filters_and_keys() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/faqs")
            .match_header("apikey", "service")
            .match_header("authorization", "Bearer service")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("select".into(), "*".into()),
                Matcher::UrlEncoded("is_active".into(), "eq.true".into()),
                Matcher::UrlEncoded("order".into(), "sort_order.asc".into()),
            ]))
            .with_status(200)
            .with_body(r#"[{"id":1,"question":"Q","answer":"A"}]"#)
            .create_async()
            .await;

        let rows = tables(&server)
            .select("faqs", &Query::new().eq("is_active", true).order("sort_order", true))
            .await
            .unwrap();
        assert_eq!(rows, vec![json!({"id":1,"question":"Q","answer":"A"})]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_count_reads_content_range() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("HEAD", "/rest/v1/products")
            .match_header("prefer", "count=exact")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-range", "0-24/57")
            .create_async()
            .await;

        let total = tables(&server)
            .count("products", &Query::new().range(0, 25))
            .await
            .unwrap();
        assert_eq!(total, 57);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_insert_unique_violation() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/rest/v1/categories")
            .with_status(409)
            .with_body(r#"{"code":"23505","message":"duplicate key value violates unique constraint \"categories_slug_key\""}"#)
            .create_async()
            .await;

        let err = tables(&server)
            .insert("categories", json!({"name":"Amps","slug":"amps"}))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "A record with this slug already exists");
    }

    #[tokio::test]
    async fn test_update_and_delete_require_filters() {
        let server = mockito::Server::new_async().await;
        let tables = tables(&server);
        assert!(matches!(
            tables.update("faqs", &Query::new(), json!({"is_active": false})).await,
            Err(PlatformError::Validation(_))
        ));
        assert!(matches!(
            tables.delete("faqs", &Query::new()).await,
            Err(PlatformError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_returns_row_count() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/rest/v1/dealers")
            .match_query(Matcher::UrlEncoded("id".into(), "eq.4".into()))
            .with_status(200)
            .with_body(r#"[{"id":4}]"#)
            .create_async()
            .await;

        let deleted = tables(&server)
            .delete("dealers", &Query::new().eq("id", 4))
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        mock.assert_async().await;
    }
}
