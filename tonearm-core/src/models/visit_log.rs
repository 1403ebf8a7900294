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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::Record;

const MAX_FIELD_LEN: usize = 512;

/// One public page view
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisitLog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub path: String,
    #[serde(default)]
    pub referrer: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    pub visited_at: DateTime<Utc>,
}

impl VisitLog {
    pub fn new(path: &str, referrer: Option<&str>, user_agent: Option<&str>) -> Self {
        Self {
            id: None,
            path: truncate(path),
            referrer: referrer.map(truncate),
            user_agent: user_agent.map(truncate),
            visited_at: Utc::now(),
        }
    }
}

fn truncate(value: &str) -> String {
    value.chars().take(MAX_FIELD_LEN).collect()
}

impl Record for VisitLog {
    const TABLE: &'static str = "visit_logs";

    fn id(&self) -> Option<i64> {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_truncates_long_headers() {
        let agent = "x".repeat(2000);
        let log = VisitLog::new("/news", None, Some(&agent));
        assert_eq!(log.user_agent.map(|a| a.len()), Some(MAX_FIELD_LEN));
        assert_eq!(log.path, "/news");
    }
}
