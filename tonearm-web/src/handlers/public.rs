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

//! Storefront pages. Each handler loads the shared layout data and its own
//! rows together, then renders.

use axum::{
    extract::{Path, Query as UrlQuery, State},
    http::header,
    response::{Html, IntoResponse},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tera::Context;
use tonearm_core::{
    CarouselSlide, Category, Dealer, Download, Faq, FeaturedItem, FooterLink, HomeVideo,
    NewsArticle, Page, Product,
};
use tonearm_db::{PlatformResult, Query};

use super::render;
use crate::{error::AppError, AppState};

const LATEST_NEWS: usize = 3;
const NEWS_PER_PAGE: usize = 10;

/// Navigation, footer and settings every storefront page shows
#[derive(Debug, Serialize)]
struct Layout {
    site: Map<String, Value>,
    categories: Vec<Category>,
    footer_links: Vec<FooterLink>,
}

async fn load_layout(state: &AppState) -> PlatformResult<Layout> {
    let (config, categories, footer_links) = (
        state.site_config(),
        state.repo::<Category>(),
        state.repo::<FooterLink>(),
    );
    let (site, categories, footer_links) = tokio::try_join!(
        config.as_map(),
        categories.list_sorted(active()),
        footer_links.list_sorted(active()),
    )?;
    Ok(Layout {
        site,
        categories,
        footer_links,
    })
}

fn active() -> Query {
    Query::new().eq("is_active", true)
}

fn published() -> Query {
    Query::new().eq("is_published", true)
}

fn page_context(layout: &Layout) -> Context {
    let mut context = Context::new();
    context.insert("site", &layout.site);
    context.insert("nav_categories", &layout.categories);
    context.insert("footer_links", &layout.footer_links);
    context
}

/// Rows sharing a heading, in first-seen order
#[derive(Debug, Serialize, PartialEq)]
struct Group<T> {
    name: String,
    items: Vec<T>,
}

fn group_by<T>(items: Vec<T>, key: impl Fn(&T) -> String) -> Vec<Group<T>> {
    let mut groups: Vec<Group<T>> = Vec::new();
    for item in items {
        let name = key(&item);
        match groups.iter_mut().find(|group| group.name == name) {
            Some(group) => group.items.push(item),
            None => groups.push(Group {
                name,
                items: vec![item],
            }),
        }
    }
    groups
}

#[derive(Debug, Serialize)]
struct DownloadView {
    #[serde(flatten)]
    download: Download,
    size: Option<String>,
}

impl From<Download> for DownloadView {
    fn from(download: Download) -> Self {
        Self {
            size: download.display_size(),
            download,
        }
    }
}

pub async fn home_page(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let slides = state.repo::<CarouselSlide>();
    let featured = state.repo::<FeaturedItem>();
    let videos = state.repo::<HomeVideo>();
    let products = state.repo::<Product>();
    let news = state.repo::<NewsArticle>();
    let latest = published().order("published_at", false).limit(LATEST_NEWS);
    let (layout, slides, featured, videos, products, news) = tokio::try_join!(
        load_layout(&state),
        slides.list_sorted(active()),
        featured.list_sorted(active()),
        videos.list_sorted(active()),
        products.list_sorted(active().eq("is_featured", true)),
        news.list(&latest),
    )?;

    let mut context = page_context(&layout);
    context.insert("slides", &slides);
    context.insert("featured", &featured);
    context.insert("videos", &videos);
    context.insert("products", &products);
    context.insert("news", &news);
    render(&state, "public/home.html", &context)
}

pub async fn category_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Html<String>, AppError> {
    let categories = state.repo::<Category>();
    let (layout, category) = tokio::try_join!(
        load_layout(&state),
        categories.find_one(active().eq("slug", slug.as_str())),
    )?;
    let category = category.ok_or_else(|| AppError::not_found("Category not found"))?;
    let category_id = category.id.unwrap_or_default();
    let products = state
        .repo::<Product>()
        .list_sorted(active().eq("category_id", category_id))
        .await?;

    let mut context = page_context(&layout);
    context.insert("category", &category);
    context.insert("products", &products);
    render(&state, "public/category.html", &context)
}

pub async fn product_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Html<String>, AppError> {
    let products = state.repo::<Product>();
    let (layout, product) = tokio::try_join!(
        load_layout(&state),
        products.find_one(active().eq("slug", slug.as_str())),
    )?;
    let product = product.ok_or_else(|| AppError::not_found("Product not found"))?;
    let downloads = match product.id {
        Some(id) => {
            state
                .repo::<Download>()
                .list_sorted(active().eq("product_id", id))
                .await?
        }
        None => Vec::new(),
    };
    let category = product
        .category_id
        .and_then(|id| layout.categories.iter().find(|c| c.id == Some(id)));

    let mut context = page_context(&layout);
    context.insert("product", &product);
    context.insert("category", &category);
    context.insert("specifications", &product.specification_rows());
    context.insert(
        "downloads",
        &downloads.into_iter().map(DownloadView::from).collect::<Vec<_>>(),
    );
    render(&state, "public/product.html", &context)
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<usize>,
}

pub async fn news_list(
    State(state): State<AppState>,
    UrlQuery(params): UrlQuery<PageParams>,
) -> Result<Html<String>, AppError> {
    let articles = state.repo::<NewsArticle>();
    let (layout, page) = tokio::try_join!(
        load_layout(&state),
        articles.paginate(
            published().order("published_at", false).order("id", false),
            params.page.unwrap_or(1),
            NEWS_PER_PAGE,
        ),
    )?;

    let mut context = page_context(&layout);
    context.insert("articles", &page.items);
    context.insert("page", &page.page);
    context.insert("total_pages", &page.total_pages());
    context.insert("has_previous", &page.has_previous());
    context.insert("has_next", &page.has_next());
    render(&state, "public/news_list.html", &context)
}

pub async fn news_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Html<String>, AppError> {
    let articles = state.repo::<NewsArticle>();
    let (layout, article) = tokio::try_join!(
        load_layout(&state),
        articles.find_one(published().eq("slug", slug.as_str())),
    )?;
    let article = article.ok_or_else(|| AppError::not_found("Article not found"))?;

    let mut context = page_context(&layout);
    context.insert("article", &article);
    render(&state, "public/news_detail.html", &context)
}

pub async fn downloads_page(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let repo = state.repo::<Download>();
    let (layout, downloads) = tokio::try_join!(load_layout(&state), repo.list_sorted(active()))?;

    let groups = group_by(
        downloads.into_iter().map(DownloadView::from).collect(),
        |view| view.download.category.clone().unwrap_or_else(|| "General".to_string()),
    );

    let mut context = page_context(&layout);
    context.insert("groups", &groups);
    render(&state, "public/downloads.html", &context)
}

pub async fn dealers_page(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let repo = state.repo::<Dealer>();
    let (layout, dealers) = tokio::try_join!(load_layout(&state), repo.list_sorted(active()))?;

    let mut context = page_context(&layout);
    context.insert("countries", &group_by(dealers, |dealer| dealer.country.clone()));
    render(&state, "public/dealers.html", &context)
}

pub async fn support_page(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let repo = state.repo::<Faq>();
    let (layout, faqs) = tokio::try_join!(load_layout(&state), repo.list_sorted(active()))?;

    let mut context = page_context(&layout);
    context.insert(
        "faq_groups",
        &group_by(faqs, |faq| faq.category.clone().unwrap_or_else(|| "General".to_string())),
    );
    render(&state, "public/support.html", &context)
}

pub async fn static_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Html<String>, AppError> {
    let pages = state.repo::<Page>();
    let (layout, page) = tokio::try_join!(
        load_layout(&state),
        pages.find_one(published().eq("slug", slug.as_str())),
    )?;
    let page = page.ok_or_else(|| AppError::not_found("Page not found"))?;

    let mut context = page_context(&layout);
    context.insert("page", &page);
    render(&state, "public/page.html", &context)
}

pub async fn robots_txt() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "User-agent: *\nDisallow: /Manage\nDisallow: /Auth\n",
    )
}

pub async fn health() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_group_by_keeps_first_seen_order() {
        let groups = group_by(vec!["Norway", "Japan", "Norway"], |c| c.to_string());
        assert_eq!(
            groups,
            vec![
                Group {
                    name: "Norway".to_string(),
                    items: vec!["Norway", "Norway"]
                },
                Group {
                    name: "Japan".to_string(),
                    items: vec!["Japan"]
                },
            ]
        );
    }

    #[test]
    fn test_download_view_carries_size() {
        let mut download = Download::new("Manual".into(), "https://x/m.pdf".into());
        download.file_size = Some(2 * 1024 * 1024);
        let view = DownloadView::from(download);
        assert_eq!(view.size.as_deref(), Some("2.0 MB"));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["title"], "Manual");
    }
}
