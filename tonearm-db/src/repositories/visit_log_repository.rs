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

use std::sync::Arc;
use tonearm_core::VisitLog;

use super::RecordRepository;
use crate::error::PlatformResult;
use crate::platform::{Query, TableClient};

#[derive(Clone)]
pub struct VisitLogRepository {
    records: RecordRepository<VisitLog>,
}

impl VisitLogRepository {
    pub fn new(tables: Arc<dyn TableClient>) -> Self {
        Self {
            records: RecordRepository::new(tables),
        }
    }

    pub async fn record(&self, visit: &VisitLog) -> PlatformResult<()> {
        self.records.create(visit).await?;
        Ok(())
    }

    pub async fn recent(&self, limit: usize) -> PlatformResult<Vec<VisitLog>> {
        self.records
            .list(&Query::new().order("visited_at", false).order("id", false).limit(limit))
            .await
    }

    pub async fn count(&self) -> PlatformResult<u64> {
        self.records.count(&Query::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::{init_database, SqliteTables};

    #[tokio::test]
    async fn test_record_and_recent() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let repo = VisitLogRepository::new(Arc::new(SqliteTables::new(pool)));

        for path in ["/", "/news", "/dealers"] {
            repo.record(&VisitLog::new(path, None, Some("test-agent")))
                .await
                .unwrap();
        }

        let recent = repo.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].path, "/dealers");
        assert_eq!(repo.count().await.unwrap(), 3);
    }
}
