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

pub mod admin_user_repository;
pub mod record_repository;
pub mod site_config_repository;
pub mod visit_log_repository;

pub use admin_user_repository::AdminUserRepository;
pub use record_repository::{Paginated, RecordRepository};
pub use site_config_repository::SiteConfigRepository;
pub use visit_log_repository::VisitLogRepository;
