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

use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tonearm_core::sort_order::{plan_move, MoveDirection, SortSwap};
use tonearm_core::{Record, Sortable};

use crate::error::{PlatformError, PlatformResult};
use crate::platform::{Query, TableClient};

/// One page of a listing plus the total matching rows
#[derive(Debug, Clone, PartialEq)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: usize,
    pub per_page: usize,
}

impl<T> Paginated<T> {
    pub fn total_pages(&self) -> usize {
        if self.per_page == 0 {
            return 1;
        }
        (self.total as usize).div_ceil(self.per_page).max(1)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }
}

/// Typed access to the table behind a `Record`
pub struct RecordRepository<T: Record> {
    tables: Arc<dyn TableClient>,
    _marker: PhantomData<T>,
}

impl<T: Record> Clone for RecordRepository<T> {
    fn clone(&self) -> Self {
        Self {
            tables: self.tables.clone(),
            _marker: PhantomData,
        }
    }
}

fn decode<T: Record>(row: Value) -> PlatformResult<T> {
    Ok(serde_json::from_value(row)?)
}

fn by_id(id: i64) -> Query {
    Query::new().eq("id", id)
}

impl<T: Record> RecordRepository<T> {
    pub fn new(tables: Arc<dyn TableClient>) -> Self {
        Self {
            tables,
            _marker: PhantomData,
        }
    }

    pub async fn list(&self, query: &Query) -> PlatformResult<Vec<T>> {
        self.tables
            .select(T::TABLE, query)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    /// Fetch page `page` (1-based) of `query` together with the total count.
    /// Pages past the end clamp to the last one.
    pub async fn paginate(&self, query: Query, page: usize, per_page: usize) -> PlatformResult<Paginated<T>> {
        let total = self.count(&query).await?;
        let mut paginated = Paginated {
            items: Vec::new(),
            total,
            page: 1,
            per_page,
        };
        paginated.page = page.clamp(1, paginated.total_pages());
        let offset = (paginated.page - 1).saturating_mul(per_page);
        paginated.items = self.list(&query.range(offset, per_page)).await?;
        Ok(paginated)
    }

    pub async fn count(&self, query: &Query) -> PlatformResult<u64> {
        self.tables.count(T::TABLE, query).await
    }

    pub async fn find_by_id(&self, id: i64) -> PlatformResult<Option<T>> {
        self.find_one(by_id(id)).await
    }

    pub async fn find_one(&self, query: Query) -> PlatformResult<Option<T>> {
        Ok(self.list(&query.limit(1)).await?.into_iter().next())
    }

    /// Exactly one row or `NotFound`
    pub async fn single(&self, query: Query) -> PlatformResult<T> {
        self.find_one(query)
            .await?
            .ok_or_else(|| PlatformError::NotFound(T::TABLE.to_string()))
    }

    /// Validate locally, then insert
    pub async fn create(&self, record: &T) -> PlatformResult<T> {
        record.validate().map_err(PlatformError::Validation)?;
        let row = serde_json::to_value(record)?;
        let inserted = self.tables.insert(T::TABLE, row).await?;
        tracing::debug!(table = T::TABLE, "Created record");
        decode(inserted)
    }

    /// Validate locally, then overwrite every field of the row `id`
    pub async fn update(&self, id: i64, record: &T) -> PlatformResult<T> {
        record.validate().map_err(PlatformError::Validation)?;
        let mut row = serde_json::to_value(record)?;
        if let Value::Object(map) = &mut row {
            map.remove("id");
            map.remove("created_at");
        }
        self.tables
            .update(T::TABLE, &by_id(id), row)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PlatformError::NotFound(T::TABLE.to_string()))
            .and_then(decode)
    }

    /// Single-field update, as issued by toggles and reordering
    pub async fn set_field(&self, id: i64, field: &str, value: Value) -> PlatformResult<()> {
        let updated = self
            .tables
            .update(T::TABLE, &by_id(id), serde_json::json!({ field: value }))
            .await?;
        if updated.is_empty() {
            return Err(PlatformError::NotFound(T::TABLE.to_string()));
        }
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> PlatformResult<()> {
        let deleted = self.tables.delete(T::TABLE, &by_id(id)).await?;
        if deleted == 0 {
            return Err(PlatformError::NotFound(T::TABLE.to_string()));
        }
        tracing::debug!(table = T::TABLE, id, "Deleted record");
        Ok(())
    }
}

impl<T: Sortable> RecordRepository<T> {
    pub async fn list_sorted(&self, query: Query) -> PlatformResult<Vec<T>> {
        self.list(&query.order("sort_order", true).order("id", true))
            .await
    }

    /// Swap `sort_order` with the neighbour in `direction`.
    ///
    /// Returns the applied swap, or `None` when the row is already at the edge.
    pub async fn move_record(&self, id: i64, direction: MoveDirection) -> PlatformResult<Option<SortSwap>> {
        let items = self.list_sorted(Query::new()).await?;
        if !items.iter().any(|item| item.id() == Some(id)) {
            return Err(PlatformError::NotFound(T::TABLE.to_string()));
        }
        let Some(swap) = plan_move(&items, id, direction) else {
            return Ok(None);
        };

        self.set_field(swap.moved.0, "sort_order", Value::from(swap.moved.1))
            .await?;
        self.set_field(swap.neighbour.0, "sort_order", Value::from(swap.neighbour.1))
            .await?;
        Ok(Some(swap))
    }

    /// Next free position at the end of the list
    pub async fn next_sort_order(&self) -> PlatformResult<i32> {
        let last = self
            .list(&Query::new().order("sort_order", false).limit(1))
            .await?;
        Ok(last.first().map_or(0, |item| item.sort_order() + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::{init_database, SqliteTables};
    use pretty_assertions::assert_eq;
    use tonearm_core::models::{CarouselSlide, Category, Faq};

    async fn repo<T: Record>() -> RecordRepository<T> {
        let pool = init_database("sqlite::memory:").await.unwrap();
        RecordRepository::new(Arc::new(SqliteTables::new(pool)))
    }

    async fn seed_faqs(repo: &RecordRepository<Faq>, orders: &[i32]) -> Vec<Faq> {
        let mut created = Vec::new();
        for (i, order) in orders.iter().enumerate() {
            let mut faq = Faq::new(format!("Q{}", i + 1), "A".to_string());
            faq.sort_order = *order;
            created.push(repo.create(&faq).await.unwrap());
        }
        created
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = repo::<Category>().await;
        let created = repo
            .create(&Category::new("Amplifiers".into()))
            .await
            .unwrap();
        let id = created.id.unwrap();

        let found = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.name, "Amplifiers");
        assert!(repo.find_by_id(id + 1).await.unwrap().is_none());

        let single = repo
            .single(Query::new().eq("slug", "amplifiers"))
            .await
            .unwrap();
        assert_eq!(single.id, Some(id));
        assert!(matches!(
            repo.single(Query::new().eq("slug", "missing")).await,
            Err(PlatformError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_validates_before_insert() {
        let repo = repo::<CarouselSlide>().await;
        let slide = CarouselSlide::new(String::new());
        let err = repo.create(&slide).await.unwrap_err();
        assert!(matches!(err, PlatformError::Validation(_)));
        assert_eq!(repo.count(&Query::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_and_set_field() {
        let repo = repo::<Category>().await;
        let mut category = repo
            .create(&Category::new("Amps".into()))
            .await
            .unwrap();
        let id = category.id.unwrap();

        category.name = "Amplifiers".into();
        let updated = repo.update(id, &category).await.unwrap();
        assert_eq!(updated.name, "Amplifiers");

        repo.set_field(id, "is_active", Value::Bool(false)).await.unwrap();
        assert!(!repo.find_by_id(id).await.unwrap().unwrap().is_active);

        assert!(matches!(
            repo.set_field(999, "is_active", Value::Bool(true)).await,
            Err(PlatformError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_paginate() {
        let repo = repo::<Faq>().await;
        seed_faqs(&repo, &[0, 1, 2, 3, 4]).await;

        let page = repo
            .paginate(Query::new().order("sort_order", true), 2, 2)
            .await
            .unwrap();
        let questions: Vec<_> = page.items.iter().map(|f| f.question.as_str()).collect();
        assert_eq!(questions, vec!["Q3", "Q4"]);
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_previous());
        assert!(page.has_next());
    }

    #[tokio::test]
    async fn test_paginate_clamps_page_past_the_end() {
        let repo = repo::<Faq>().await;
        seed_faqs(&repo, &[0, 1, 2, 3, 4]).await;

        let page = repo
            .paginate(Query::new().order("sort_order", true), usize::MAX, 2)
            .await
            .unwrap();
        assert_eq!(page.page, 3);
        let questions: Vec<_> = page.items.iter().map(|f| f.question.as_str()).collect();
        assert_eq!(questions, vec!["Q5"]);
        assert!(!page.has_next());

        let empty = self::repo::<Category>()
            .await
            .paginate(Query::new(), usize::MAX, 10)
            .await
            .unwrap();
        assert_eq!(empty.page, 1);
        assert!(empty.items.is_empty());
    }

    #[tokio::test]
    async fn test_move_swaps_only_two_rows() {
        let repo = repo::<Faq>().await;
        let faqs = seed_faqs(&repo, &[10, 20, 20, 40]).await;
        let third = faqs[2].id.unwrap();

        let swap = repo.move_record(third, MoveDirection::Up).await.unwrap();
        assert!(swap.is_some());

        let orders: Vec<_> = repo
            .list_sorted(Query::new())
            .await
            .unwrap()
            .iter()
            .map(|f| (f.question.clone(), f.sort_order))
            .collect();
        // Equal values stay equal; nothing is renumbered
        assert_eq!(
            orders,
            vec![
                ("Q1".to_string(), 10),
                ("Q2".to_string(), 20),
                ("Q3".to_string(), 20),
                ("Q4".to_string(), 40),
            ]
        );

        let first = faqs[0].id.unwrap();
        assert_eq!(repo.move_record(first, MoveDirection::Up).await.unwrap(), None);

        repo.move_record(first, MoveDirection::Down).await.unwrap();
        let sorted = repo.list_sorted(Query::new()).await.unwrap();
        assert_eq!(sorted[0].question, "Q2");
        assert_eq!(sorted[0].sort_order, 10);
        assert_eq!(sorted[1].sort_order, 20);
    }

    #[tokio::test]
    async fn test_next_sort_order() {
        let repo = repo::<Faq>().await;
        assert_eq!(repo.next_sort_order().await.unwrap(), 0);
        seed_faqs(&repo, &[3, 7]).await;
        assert_eq!(repo.next_sort_order().await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = repo::<Faq>().await;
        let faqs = seed_faqs(&repo, &[0]).await;
        let id = faqs[0].id.unwrap();
        repo.delete(id).await.unwrap();
        assert!(matches!(repo.delete(id).await, Err(PlatformError::NotFound(_))));
    }
}
