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

pub mod admin_user;
pub mod carousel_slide;
pub mod category;
pub mod dealer;
pub mod download;
pub mod faq;
pub mod featured_item;
pub mod footer_link;
pub mod home_video;
pub mod news_article;
pub mod page;
pub mod product;
pub mod site_config;
pub mod visit_log;

pub use admin_user::*;
pub use carousel_slide::*;
pub use category::*;
pub use dealer::*;
pub use download::*;
pub use faq::*;
pub use featured_item::*;
pub use footer_link::*;
pub use home_video::*;
pub use news_article::*;
pub use page::*;
pub use product::*;
pub use site_config::*;
pub use visit_log::*;
