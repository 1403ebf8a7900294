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
use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::error::{PlatformError, PlatformResult, UNIQUE_VIOLATION};
use crate::platform::{Filter, Query, TableClient};

/// Columns that must be unique within a table when present
const UNIQUE_COLUMNS: &[&str] = &["slug", "key", "user_id"];

/// Table service over a single `records` table of JSON documents
#[derive(Debug, Clone)]
pub struct SqliteTables {
    pool: SqlitePool,
}

#[derive(Debug, Clone, PartialEq)]
enum SqlArg {
    Int(i64),
    Real(f64),
    Text(String),
}

impl SqlArg {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Bool(b) => SqlArg::Int(i64::from(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SqlArg::Int(i),
                None => SqlArg::Real(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => SqlArg::Text(s.clone()),
            other => SqlArg::Text(other.to_string()),
        }
    }
}

fn bind_all<'q>(
    mut query: sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    args: &[SqlArg],
) -> sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    for arg in args {
        query = match arg {
            SqlArg::Int(i) => query.bind(*i),
            SqlArg::Real(f) => query.bind(*f),
            SqlArg::Text(s) => query.bind(s.clone()),
        };
    }
    query
}

fn json_path(column: &str) -> String {
    format!("json_extract(data, '$.{}')", column)
}

/// WHERE clause for a query; column names are checked before interpolation
fn where_clause(table: &str, query: &Query) -> PlatformResult<(String, Vec<SqlArg>)> {
    query.check_columns()?;

    let mut sql = String::from(" WHERE tbl = ?");
    let mut args = vec![SqlArg::Text(table.to_string())];

    for filter in &query.filters {
        match filter {
            Filter::Eq(column, Value::Null) => {
                sql.push_str(&format!(" AND {} IS NULL", json_path(column)));
            }
            Filter::Eq(column, value) => {
                sql.push_str(&format!(" AND {} = ?", json_path(column)));
                args.push(SqlArg::from_value(value));
            }
            Filter::ILike(column, pattern) => {
                sql.push_str(&format!(" AND LOWER({}) LIKE LOWER(?)", json_path(column)));
                args.push(SqlArg::Text(pattern.clone()));
            }
        }
    }
    Ok((sql, args))
}

fn order_and_paging(query: &Query) -> String {
    let mut sql = String::from(" ORDER BY ");
    for order in &query.order {
        sql.push_str(&format!(
            "{} {}, ",
            json_path(&order.column),
            if order.ascending { "ASC" } else { "DESC" }
        ));
    }
    sql.push_str("id ASC");

    match (query.limit, query.offset) {
        (Some(limit), offset) => {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset.unwrap_or(0)))
        }
        (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
        (None, None) => {}
    }
    sql
}

fn unique_violation(table: &str, column: &str) -> PlatformError {
    PlatformError::api(
        409,
        Some(UNIQUE_VIOLATION),
        format!(
            "duplicate key value violates unique constraint \"{}_{}_key\"",
            table, column
        ),
    )
}

fn parse_row(data: &str) -> PlatformResult<Map<String, Value>> {
    match serde_json::from_str(data)? {
        Value::Object(map) => Ok(map),
        _ => Err(PlatformError::Validation("Stored row is not an object".to_string())),
    }
}

impl SqliteTables {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn check_unique(
        tx: &mut Transaction<'_, Sqlite>,
        table: &str,
        row: &Map<String, Value>,
        own_id: Option<i64>,
    ) -> PlatformResult<()> {
        for column in UNIQUE_COLUMNS {
            let Some(value) = row.get(*column).filter(|v| !v.is_null()) else {
                continue;
            };
            let sql = format!(
                "SELECT COUNT(*) FROM records WHERE tbl = ? AND {} = ? AND id != ?",
                json_path(column)
            );
            let query = bind_all(
                sqlx::query(&sql),
                &[
                    SqlArg::Text(table.to_string()),
                    SqlArg::from_value(value),
                    SqlArg::Int(own_id.unwrap_or(-1)),
                ],
            );
            let taken: i64 = query.fetch_one(&mut **tx).await?.try_get(0)?;
            if taken > 0 {
                return Err(unique_violation(table, column));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TableClient for SqliteTables {
    async fn select(&self, table: &str, query: &Query) -> PlatformResult<Vec<Value>> {
        let (where_sql, args) = where_clause(table, query)?;
        let sql = format!(
            "SELECT data FROM records{}{}",
            where_sql,
            order_and_paging(query)
        );

        let rows = bind_all(sqlx::query(&sql), &args)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let data: String = row.try_get("data")?;
                Ok(Value::Object(parse_row(&data)?))
            })
            .collect()
    }

    async fn count(&self, table: &str, query: &Query) -> PlatformResult<u64> {
        let (where_sql, args) = where_clause(table, &query.filters_only())?;
        let sql = format!("SELECT COUNT(*) FROM records{}", where_sql);
        let count: i64 = bind_all(sqlx::query(&sql), &args)
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?;
        Ok(count as u64)
    }

    async fn insert(&self, table: &str, row: Value) -> PlatformResult<Value> {
        let Value::Object(mut row) = row else {
            return Err(PlatformError::Validation("Row must be a JSON object".to_string()));
        };

        let mut tx = self.pool.begin().await?;
        Self::check_unique(&mut tx, table, &row, None).await?;

        let next_id: i64 =
            sqlx::query("SELECT COALESCE(MAX(id), 0) + 1 FROM records WHERE tbl = ?")
                .bind(table)
                .fetch_one(&mut *tx)
                .await?
                .try_get(0)?;

        let now = Value::String(Utc::now().to_rfc3339());
        row.insert("id".to_string(), Value::from(next_id));
        for stamp in ["created_at", "updated_at"] {
            if row.get(stamp).map_or(true, Value::is_null) {
                row.insert(stamp.to_string(), now.clone());
            }
        }

        let row = Value::Object(row);
        sqlx::query("INSERT INTO records (tbl, id, data) VALUES (?, ?, ?)")
            .bind(table)
            .bind(next_id)
            .bind(row.to_string())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(row)
    }

    async fn update(&self, table: &str, query: &Query, patch: Value) -> PlatformResult<Vec<Value>> {
        let Value::Object(patch) = patch else {
            return Err(PlatformError::Validation("Patch must be a JSON object".to_string()));
        };
        if query.filters.is_empty() {
            return Err(PlatformError::Validation(
                "Refusing to update every row of a table".to_string(),
            ));
        }

        let (where_sql, args) = where_clause(table, &query.filters_only())?;
        let sql = format!("SELECT id, data FROM records{}", where_sql);

        let mut tx = self.pool.begin().await?;
        let rows = bind_all(sqlx::query(&sql), &args).fetch_all(&mut *tx).await?;

        let mut updated = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id")?;
            let data: String = row.try_get("data")?;
            let mut current = parse_row(&data)?;

            for (key, value) in &patch {
                if key != "id" {
                    current.insert(key.clone(), value.clone());
                }
            }
            if !patch.contains_key("updated_at") && current.contains_key("updated_at") {
                current.insert(
                    "updated_at".to_string(),
                    Value::String(Utc::now().to_rfc3339()),
                );
            }

            Self::check_unique(&mut tx, table, &current, Some(id)).await?;

            let current = Value::Object(current);
            sqlx::query("UPDATE records SET data = ? WHERE tbl = ? AND id = ?")
                .bind(current.to_string())
                .bind(table)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            updated.push(current);
        }
        tx.commit().await?;

        Ok(updated)
    }

    async fn delete(&self, table: &str, query: &Query) -> PlatformResult<u64> {
        if query.filters.is_empty() {
            return Err(PlatformError::Validation(
                "Refusing to delete every row of a table".to_string(),
            ));
        }
        let (where_sql, args) = where_clause(table, &query.filters_only())?;
        let sql = format!("DELETE FROM records{}", where_sql);
        let result = bind_all(sqlx::query(&sql), &args)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::init_database;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn tables() -> SqliteTables {
        SqliteTables::new(init_database("sqlite::memory:").await.unwrap())
    }

    #[tokio::test]
    async fn test_insert_assigns_ids_and_timestamps() {
        let tables = tables().await;
        let first = tables
            .insert("faqs", json!({"question": "Q1", "answer": "A1"}))
            .await
            .unwrap();
        let second = tables
            .insert("faqs", json!({"question": "Q2", "answer": "A2"}))
            .await
            .unwrap();
        let other = tables
            .insert("categories", json!({"name": "Amps", "slug": "amps"}))
            .await
            .unwrap();

        assert_eq!(first["id"], json!(1));
        assert_eq!(second["id"], json!(2));
        assert_eq!(other["id"], json!(1));
        assert!(first["created_at"].is_string());
    }

    #[tokio::test]
    async fn test_select_filters_orders_and_pages() {
        let tables = tables().await;
        for (name, order, active) in [("C", 3, true), ("A", 1, true), ("B", 2, false), ("D", 4, true)] {
            tables
                .insert(
                    "categories",
                    json!({"name": name, "slug": name.to_lowercase(), "sort_order": order, "is_active": active}),
                )
                .await
                .unwrap();
        }

        let rows = tables
            .select(
                "categories",
                &Query::new().eq("is_active", true).order("sort_order", true),
            )
            .await
            .unwrap();
        let names: Vec<_> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["A", "C", "D"]);

        let page = tables
            .select("categories", &Query::new().order("sort_order", false).range(1, 2))
            .await
            .unwrap();
        let names: Vec<_> = page.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["C", "B"]);

        let count = tables
            .count("categories", &Query::new().eq("is_active", true).range(0, 1))
            .await
            .unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_ilike_is_case_insensitive() {
        let tables = tables().await;
        tables
            .insert("products", json!({"name": "MC275 Power Amplifier", "slug": "mc275"}))
            .await
            .unwrap();
        tables
            .insert("products", json!({"name": "Turntable", "slug": "tt"}))
            .await
            .unwrap();

        let rows = tables
            .select("products", &Query::new().search("name", "AMPLIFIER"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["slug"], json!("mc275"));
    }

    #[tokio::test]
    async fn test_null_filter() {
        let tables = tables().await;
        tables
            .insert("products", json!({"slug": "a", "category_id": null}))
            .await
            .unwrap();
        tables
            .insert("products", json!({"slug": "b", "category_id": 2}))
            .await
            .unwrap();
        let rows = tables
            .select("products", &Query::new().eq("category_id", Value::Null))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["slug"], json!("a"));
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_unique_violation() {
        let tables = tables().await;
        tables
            .insert("news", json!({"title": "Launch", "slug": "launch"}))
            .await
            .unwrap();
        let err = tables
            .insert("news", json!({"title": "Launch again", "slug": "launch"}))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
        assert_eq!(err.user_message(), "A record with this slug already exists");

        // Same slug in another table is fine
        tables
            .insert("pages", json!({"title": "Launch", "slug": "launch"}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_merges_patch() {
        let tables = tables().await;
        tables
            .insert("dealers", json!({"name": "Hifi Shop", "is_active": true, "sort_order": 1}))
            .await
            .unwrap();

        let updated = tables
            .update("dealers", &Query::new().eq("id", 1), json!({"is_active": false}))
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["name"], json!("Hifi Shop"));
        assert_eq!(updated[0]["is_active"], json!(false));

        let rows = tables
            .select("dealers", &Query::new().eq("is_active", false))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_update_keeps_own_slug() {
        let tables = tables().await;
        tables
            .insert("pages", json!({"title": "About", "slug": "about"}))
            .await
            .unwrap();
        tables
            .insert("pages", json!({"title": "Contact", "slug": "contact"}))
            .await
            .unwrap();

        tables
            .update("pages", &Query::new().eq("id", 1), json!({"title": "About us", "slug": "about"}))
            .await
            .unwrap();

        let err = tables
            .update("pages", &Query::new().eq("id", 2), json!({"slug": "about"}))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_delete() {
        let tables = tables().await;
        tables.insert("faqs", json!({"question": "Q"})).await.unwrap();
        tables.insert("faqs", json!({"question": "R"})).await.unwrap();

        assert_eq!(tables.delete("faqs", &Query::new().eq("id", 1)).await.unwrap(), 1);
        assert_eq!(tables.delete("faqs", &Query::new().eq("id", 1)).await.unwrap(), 0);
        assert!(tables.delete("faqs", &Query::new()).await.is_err());
        assert_eq!(tables.count("faqs", &Query::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rejects_bad_columns() {
        let tables = tables().await;
        let result = tables
            .select("faqs", &Query::new().eq("x') OR 1=1 --", 1))
            .await;
        assert!(matches!(result, Err(PlatformError::Validation(_))));
    }
}
