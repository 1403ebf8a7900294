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

//! Form layout and form parsing for each content type on the admin screens.

use serde::Serialize;
use tonearm_core::utils::slug::slug_or_generated;
use tonearm_core::utils::{FormData, UploadTarget};
use tonearm_core::{
    CarouselSlide, Category, Dealer, Download, Faq, FeaturedItem, FooterLink, HomeVideo,
    NewsArticle, Page, Product,
};
use tonearm_db::Query;

use super::admin::{AdminResource, FieldKind, FormField, OptionSource, SelectOption};

const ACTIVE: &[(&str, &str)] = &[("is_active", "Active")];
const PUBLISHED: &[(&str, &str)] = &[("is_published", "Published")];

/// One entry of the admin menu
#[derive(Debug, Clone, Copy, Serialize)]
pub struct NavItem {
    pub slug: &'static str,
    pub title: &'static str,
    pub table: &'static str,
}

const fn nav<T: AdminResource>() -> NavItem {
    NavItem {
        slug: T::SLUG,
        title: T::TITLE,
        table: T::TABLE,
    }
}

/// Admin menu in display order
pub const NAV: &[NavItem] = &[
    nav::<Product>(),
    nav::<Category>(),
    nav::<NewsArticle>(),
    nav::<Page>(),
    nav::<Dealer>(),
    nav::<Download>(),
    nav::<Faq>(),
    nav::<CarouselSlide>(),
    nav::<FeaturedItem>(),
    nav::<HomeVideo>(),
    nav::<FooterLink>(),
];

fn position(form: &FormData) -> Result<i32, String> {
    let value = form.int_or("sort_order", 0)?;
    i32::try_from(value).map_err(|_| "Position is out of range".to_string())
}

fn position_field(sort_order: Option<i32>) -> FormField {
    FormField::new("sort_order", "Position", FieldKind::Number)
        .maybe(sort_order)
        .help("Leave blank to add at the end")
}

fn active_field(is_active: Option<bool>) -> FormField {
    FormField::new("is_active", "Active", FieldKind::Checkbox).checked(is_active.unwrap_or(true))
}

impl AdminResource for Category {
    const SLUG: &'static str = "categories";
    const TITLE: &'static str = "Categories";
    const SINGULAR: &'static str = "Category";
    const SEARCH_COLUMN: Option<&'static str> = Some("name");
    const TOGGLES: &'static [(&'static str, &'static str)] = ACTIVE;
    const SORTABLE: bool = true;

    fn form_fields(record: Option<&Self>, _options: &[SelectOption]) -> Vec<FormField> {
        vec![
            FormField::new("name", "Name", FieldKind::Text)
                .required()
                .maybe(record.map(|r| &r.name)),
            FormField::new("slug", "Slug", FieldKind::Text)
                .maybe(record.map(|r| &r.slug))
                .help("Generated from the name when left blank"),
            FormField::new("description", "Description", FieldKind::Textarea)
                .maybe(record.and_then(|r| r.description.as_ref())),
            FormField::new("image_url", "Image", FieldKind::Url)
                .maybe(record.and_then(|r| r.image_url.as_ref()))
                .upload(UploadTarget::CategoryImage),
            position_field(record.map(|r| r.sort_order)),
            active_field(record.map(|r| r.is_active)),
        ]
    }

    fn from_form(form: &FormData, existing: Option<&Self>) -> Result<Self, String> {
        let name = form.required("name", "Name")?;
        Ok(Category {
            id: existing.and_then(|e| e.id),
            slug: slug_or_generated(form.text("slug"), &name),
            name,
            description: form.text("description"),
            image_url: form.text("image_url"),
            sort_order: position(form)?,
            is_active: form.flag("is_active"),
            created_at: existing.and_then(|e| e.created_at),
        })
    }

    fn label(&self) -> String {
        self.name.clone()
    }

    fn details(&self) -> Option<String> {
        Some(format!("/{}", self.slug))
    }

    fn thumbnail(&self) -> Option<&str> {
        self.image_url.as_deref()
    }
}

impl AdminResource for Product {
    const SLUG: &'static str = "products";
    const TITLE: &'static str = "Products";
    const SINGULAR: &'static str = "Product";
    const SEARCH_COLUMN: Option<&'static str> = Some("name");
    const TOGGLES: &'static [(&'static str, &'static str)] =
        &[("is_active", "Active"), ("is_featured", "Featured")];
    const SORTABLE: bool = true;
    const OPTIONS: OptionSource = OptionSource::Categories;

    fn form_fields(record: Option<&Self>, options: &[SelectOption]) -> Vec<FormField> {
        let specifications = record
            .filter(|r| !r.specifications.is_null())
            .and_then(|r| serde_json::to_string_pretty(&r.specifications).ok());
        vec![
            FormField::new("name", "Name", FieldKind::Text)
                .required()
                .maybe(record.map(|r| &r.name)),
            FormField::new("slug", "Slug", FieldKind::Text)
                .maybe(record.map(|r| &r.slug))
                .help("Generated from the name when left blank"),
            FormField::new("category_id", "Category", FieldKind::Select)
                .options(options)
                .maybe(record.and_then(|r| r.category_id)),
            FormField::new("model_number", "Model number", FieldKind::Text)
                .maybe(record.and_then(|r| r.model_number.as_ref())),
            FormField::new("short_description", "Short description", FieldKind::Textarea)
                .maybe(record.and_then(|r| r.short_description.as_ref())),
            FormField::new("description", "Description", FieldKind::Html)
                .maybe(record.and_then(|r| r.description.as_ref())),
            FormField::new("price", "Price", FieldKind::Decimal).maybe(record.and_then(|r| r.price)),
            FormField::new("image_url", "Main image", FieldKind::Url)
                .maybe(record.and_then(|r| r.image_url.as_ref()))
                .upload(UploadTarget::ProductImage),
            FormField::new("gallery", "Gallery", FieldKind::Lines)
                .maybe(record.map(|r| r.gallery.join("\n")))
                .upload(UploadTarget::ProductImage)
                .help("One image URL per line"),
            FormField::new("manual_url", "Manual", FieldKind::Url)
                .maybe(record.and_then(|r| r.manual_url.as_ref()))
                .upload(UploadTarget::ProductManual),
            FormField::new("specifications", "Specifications", FieldKind::Json)
                .maybe(specifications)
                .help(r#"JSON object, e.g. {"Output power": "2 x 120 W"}"#),
            position_field(record.map(|r| r.sort_order)),
            active_field(record.map(|r| r.is_active)),
            FormField::new("is_featured", "Featured", FieldKind::Checkbox)
                .checked(record.is_some_and(|r| r.is_featured)),
        ]
    }

    fn from_form(form: &FormData, existing: Option<&Self>) -> Result<Self, String> {
        let name = form.required("name", "Name")?;
        Ok(Product {
            id: existing.and_then(|e| e.id),
            category_id: form.int("category_id")?,
            slug: slug_or_generated(form.text("slug"), &name),
            name,
            model_number: form.text("model_number"),
            short_description: form.text("short_description"),
            description: form.text("description"),
            price: form.float("price")?,
            image_url: form.text("image_url"),
            gallery: form.lines("gallery"),
            manual_url: form.text("manual_url"),
            specifications: form.json("specifications")?.unwrap_or_default(),
            sort_order: position(form)?,
            is_active: form.flag("is_active"),
            is_featured: form.flag("is_featured"),
            created_at: existing.and_then(|e| e.created_at),
            updated_at: existing.and_then(|e| e.updated_at),
        })
    }

    fn label(&self) -> String {
        self.name.clone()
    }

    fn details(&self) -> Option<String> {
        self.model_number.clone()
    }

    fn thumbnail(&self) -> Option<&str> {
        self.image_url.as_deref()
    }
}

impl AdminResource for NewsArticle {
    const SLUG: &'static str = "news";
    const TITLE: &'static str = "News";
    const SINGULAR: &'static str = "Article";
    const SEARCH_COLUMN: Option<&'static str> = Some("title");
    const TOGGLES: &'static [(&'static str, &'static str)] = PUBLISHED;

    fn list_order(query: Query) -> Query {
        query.order("published_at", false).order("id", false)
    }

    fn form_fields(record: Option<&Self>, _options: &[SelectOption]) -> Vec<FormField> {
        vec![
            FormField::new("title", "Title", FieldKind::Text)
                .required()
                .maybe(record.map(|r| &r.title)),
            FormField::new("slug", "Slug", FieldKind::Text)
                .maybe(record.map(|r| &r.slug))
                .help("Generated from the title when left blank"),
            FormField::new("excerpt", "Excerpt", FieldKind::Textarea)
                .maybe(record.and_then(|r| r.excerpt.as_ref())),
            FormField::new("content", "Content", FieldKind::Html)
                .maybe(record.map(|r| &r.content))
                .upload(UploadTarget::NewsInline),
            FormField::new("cover_image", "Cover image", FieldKind::Url)
                .maybe(record.and_then(|r| r.cover_image.as_ref()))
                .upload(UploadTarget::NewsCover),
            FormField::new("author", "Author", FieldKind::Text)
                .maybe(record.and_then(|r| r.author.as_ref())),
            FormField::new("published_at", "Publication date", FieldKind::Datetime)
                .maybe(record.and_then(|r| r.published_at).map(|d| d.format("%Y-%m-%dT%H:%M"))),
            FormField::new("is_published", "Published", FieldKind::Checkbox)
                .checked(record.is_some_and(|r| r.is_published)),
        ]
    }

    fn from_form(form: &FormData, existing: Option<&Self>) -> Result<Self, String> {
        let title = form.required("title", "Title")?;
        let mut article = NewsArticle {
            id: existing.and_then(|e| e.id),
            slug: slug_or_generated(form.text("slug"), &title),
            title,
            excerpt: form.text("excerpt"),
            content: form.body("content"),
            cover_image: form.text("cover_image"),
            author: form.text("author"),
            published_at: form.datetime("published_at")?,
            is_published: false,
            created_at: existing.and_then(|e| e.created_at),
            updated_at: existing.and_then(|e| e.updated_at),
        };
        if form.flag("is_published") {
            article.publish();
        }
        Ok(article)
    }

    fn label(&self) -> String {
        self.title.clone()
    }

    fn details(&self) -> Option<String> {
        self.published_at.map(|d| d.format("%Y-%m-%d").to_string())
    }

    fn thumbnail(&self) -> Option<&str> {
        self.cover_image.as_deref()
    }
}

impl AdminResource for Page {
    const SLUG: &'static str = "pages";
    const TITLE: &'static str = "Pages";
    const SINGULAR: &'static str = "Page";
    const SEARCH_COLUMN: Option<&'static str> = Some("title");
    const TOGGLES: &'static [(&'static str, &'static str)] = PUBLISHED;

    fn list_order(query: Query) -> Query {
        query.order("title", true)
    }

    fn form_fields(record: Option<&Self>, _options: &[SelectOption]) -> Vec<FormField> {
        vec![
            FormField::new("title", "Title", FieldKind::Text)
                .required()
                .maybe(record.map(|r| &r.title)),
            FormField::new("slug", "Slug", FieldKind::Text)
                .maybe(record.map(|r| &r.slug))
                .help("The page is served at /pages/<slug>"),
            FormField::new("meta_description", "Meta description", FieldKind::Textarea)
                .maybe(record.and_then(|r| r.meta_description.as_ref())),
            FormField::new("content", "Content", FieldKind::Html)
                .maybe(record.map(|r| &r.content))
                .upload(UploadTarget::PageInline),
            FormField::new("is_published", "Published", FieldKind::Checkbox)
                .checked(record.is_some_and(|r| r.is_published)),
        ]
    }

    fn from_form(form: &FormData, existing: Option<&Self>) -> Result<Self, String> {
        let title = form.required("title", "Title")?;
        Ok(Page {
            id: existing.and_then(|e| e.id),
            slug: slug_or_generated(form.text("slug"), &title),
            title,
            content: form.body("content"),
            meta_description: form.text("meta_description"),
            is_published: form.flag("is_published"),
            created_at: existing.and_then(|e| e.created_at),
            updated_at: existing.and_then(|e| e.updated_at),
        })
    }

    fn label(&self) -> String {
        self.title.clone()
    }

    fn details(&self) -> Option<String> {
        Some(format!("/pages/{}", self.slug))
    }
}

impl AdminResource for Dealer {
    const SLUG: &'static str = "dealers";
    const TITLE: &'static str = "Dealers";
    const SINGULAR: &'static str = "Dealer";
    const SEARCH_COLUMN: Option<&'static str> = Some("name");
    const TOGGLES: &'static [(&'static str, &'static str)] = ACTIVE;
    const SORTABLE: bool = true;

    fn form_fields(record: Option<&Self>, _options: &[SelectOption]) -> Vec<FormField> {
        vec![
            FormField::new("name", "Name", FieldKind::Text)
                .required()
                .maybe(record.map(|r| &r.name)),
            FormField::new("country", "Country", FieldKind::Text)
                .required()
                .maybe(record.map(|r| &r.country)),
            FormField::new("region", "Region", FieldKind::Text)
                .maybe(record.and_then(|r| r.region.as_ref())),
            FormField::new("city", "City", FieldKind::Text).maybe(record.and_then(|r| r.city.as_ref())),
            FormField::new("address", "Address", FieldKind::Textarea)
                .maybe(record.and_then(|r| r.address.as_ref())),
            FormField::new("phone", "Phone", FieldKind::Text).maybe(record.and_then(|r| r.phone.as_ref())),
            FormField::new("email", "Email", FieldKind::Text).maybe(record.and_then(|r| r.email.as_ref())),
            FormField::new("website", "Website", FieldKind::Url)
                .maybe(record.and_then(|r| r.website.as_ref())),
            FormField::new("description", "Description", FieldKind::Textarea)
                .maybe(record.and_then(|r| r.description.as_ref())),
            FormField::new("logo_url", "Logo", FieldKind::Url)
                .maybe(record.and_then(|r| r.logo_url.as_ref()))
                .upload(UploadTarget::DealerLogo),
            FormField::new("cover_image", "Cover image", FieldKind::Url)
                .maybe(record.and_then(|r| r.cover_image.as_ref()))
                .upload(UploadTarget::DealerCover),
            FormField::new("latitude", "Latitude", FieldKind::Decimal)
                .maybe(record.and_then(|r| r.latitude)),
            FormField::new("longitude", "Longitude", FieldKind::Decimal)
                .maybe(record.and_then(|r| r.longitude)),
            position_field(record.map(|r| r.sort_order)),
            active_field(record.map(|r| r.is_active)),
        ]
    }

    fn from_form(form: &FormData, existing: Option<&Self>) -> Result<Self, String> {
        Ok(Dealer {
            id: existing.and_then(|e| e.id),
            name: form.required("name", "Name")?,
            country: form.required("country", "Country")?,
            region: form.text("region"),
            city: form.text("city"),
            address: form.text("address"),
            phone: form.text("phone"),
            email: form.text("email"),
            website: form.text("website"),
            description: form.text("description"),
            logo_url: form.text("logo_url"),
            cover_image: form.text("cover_image"),
            latitude: form.float("latitude")?,
            longitude: form.float("longitude")?,
            sort_order: position(form)?,
            is_active: form.flag("is_active"),
            created_at: existing.and_then(|e| e.created_at),
        })
    }

    fn label(&self) -> String {
        self.name.clone()
    }

    fn details(&self) -> Option<String> {
        Some(match &self.city {
            Some(city) => format!("{}, {}", city, self.country),
            None => self.country.clone(),
        })
    }

    fn thumbnail(&self) -> Option<&str> {
        self.logo_url.as_deref()
    }
}

impl AdminResource for Download {
    const SLUG: &'static str = "downloads";
    const TITLE: &'static str = "Downloads";
    const SINGULAR: &'static str = "Download";
    const SEARCH_COLUMN: Option<&'static str> = Some("title");
    const TOGGLES: &'static [(&'static str, &'static str)] = ACTIVE;
    const SORTABLE: bool = true;
    const OPTIONS: OptionSource = OptionSource::Products;

    fn form_fields(record: Option<&Self>, options: &[SelectOption]) -> Vec<FormField> {
        vec![
            FormField::new("title", "Title", FieldKind::Text)
                .required()
                .maybe(record.map(|r| &r.title)),
            FormField::new("description", "Description", FieldKind::Textarea)
                .maybe(record.and_then(|r| r.description.as_ref())),
            FormField::new("category", "Category", FieldKind::Text)
                .maybe(record.and_then(|r| r.category.as_ref()))
                .help("Grouping on the downloads page, e.g. Manuals"),
            FormField::new("file_url", "File", FieldKind::Url)
                .required()
                .maybe(record.map(|r| &r.file_url))
                .upload(UploadTarget::DownloadFile),
            FormField::new("file_size", "File size (bytes)", FieldKind::Number)
                .maybe(record.and_then(|r| r.file_size))
                .help("Filled in automatically for uploaded files"),
            FormField::new("version", "Version", FieldKind::Text)
                .maybe(record.and_then(|r| r.version.as_ref())),
            FormField::new("thumbnail_url", "Thumbnail", FieldKind::Url)
                .maybe(record.and_then(|r| r.thumbnail_url.as_ref()))
                .upload(UploadTarget::DownloadThumbnail),
            FormField::new("product_id", "Product", FieldKind::Select)
                .options(options)
                .maybe(record.and_then(|r| r.product_id)),
            position_field(record.map(|r| r.sort_order)),
            active_field(record.map(|r| r.is_active)),
        ]
    }

    fn from_form(form: &FormData, existing: Option<&Self>) -> Result<Self, String> {
        Ok(Download {
            id: existing.and_then(|e| e.id),
            title: form.required("title", "Title")?,
            description: form.text("description"),
            category: form.text("category"),
            file_url: form.text("file_url").unwrap_or_default(),
            file_size: form.int("file_size")?,
            version: form.text("version"),
            thumbnail_url: form.text("thumbnail_url"),
            product_id: form.int("product_id")?,
            sort_order: position(form)?,
            is_active: form.flag("is_active"),
            created_at: existing.and_then(|e| e.created_at),
        })
    }

    fn label(&self) -> String {
        self.title.clone()
    }

    fn details(&self) -> Option<String> {
        self.display_size()
    }

    fn thumbnail(&self) -> Option<&str> {
        self.thumbnail_url.as_deref()
    }
}

impl AdminResource for Faq {
    const SLUG: &'static str = "faqs";
    const TITLE: &'static str = "FAQs";
    const SINGULAR: &'static str = "FAQ";
    const SEARCH_COLUMN: Option<&'static str> = Some("question");
    const TOGGLES: &'static [(&'static str, &'static str)] = ACTIVE;
    const SORTABLE: bool = true;

    fn form_fields(record: Option<&Self>, _options: &[SelectOption]) -> Vec<FormField> {
        vec![
            FormField::new("question", "Question", FieldKind::Text)
                .required()
                .maybe(record.map(|r| &r.question)),
            FormField::new("answer", "Answer", FieldKind::Textarea)
                .required()
                .maybe(record.map(|r| &r.answer)),
            FormField::new("category", "Category", FieldKind::Text)
                .maybe(record.and_then(|r| r.category.as_ref())),
            position_field(record.map(|r| r.sort_order)),
            active_field(record.map(|r| r.is_active)),
        ]
    }

    fn from_form(form: &FormData, existing: Option<&Self>) -> Result<Self, String> {
        Ok(Faq {
            id: existing.and_then(|e| e.id),
            question: form.required("question", "Question")?,
            answer: form.required("answer", "Answer")?,
            category: form.text("category"),
            sort_order: position(form)?,
            is_active: form.flag("is_active"),
        })
    }

    fn label(&self) -> String {
        self.question.clone()
    }

    fn details(&self) -> Option<String> {
        self.category.clone()
    }
}

impl AdminResource for CarouselSlide {
    const SLUG: &'static str = "carousel";
    const TITLE: &'static str = "Carousel";
    const SINGULAR: &'static str = "Slide";
    const TOGGLES: &'static [(&'static str, &'static str)] = ACTIVE;
    const SORTABLE: bool = true;

    fn form_fields(record: Option<&Self>, _options: &[SelectOption]) -> Vec<FormField> {
        vec![
            FormField::new("title", "Title", FieldKind::Text)
                .maybe(record.and_then(|r| r.title.as_ref())),
            FormField::new("subtitle", "Subtitle", FieldKind::Text)
                .maybe(record.and_then(|r| r.subtitle.as_ref())),
            FormField::new("image_url", "Image", FieldKind::Url)
                .required()
                .maybe(record.map(|r| &r.image_url))
                .upload(UploadTarget::CarouselImage),
            FormField::new("mobile_image_url", "Mobile image", FieldKind::Url)
                .maybe(record.and_then(|r| r.mobile_image_url.as_ref()))
                .upload(UploadTarget::CarouselImage),
            FormField::new("link_url", "Link", FieldKind::Url)
                .maybe(record.and_then(|r| r.link_url.as_ref())),
            FormField::new("button_text", "Button text", FieldKind::Text)
                .maybe(record.and_then(|r| r.button_text.as_ref())),
            position_field(record.map(|r| r.sort_order)),
            active_field(record.map(|r| r.is_active)),
        ]
    }

    fn from_form(form: &FormData, existing: Option<&Self>) -> Result<Self, String> {
        Ok(CarouselSlide {
            id: existing.and_then(|e| e.id),
            title: form.text("title"),
            subtitle: form.text("subtitle"),
            image_url: form.text("image_url").unwrap_or_default(),
            mobile_image_url: form.text("mobile_image_url"),
            link_url: form.text("link_url"),
            button_text: form.text("button_text"),
            sort_order: position(form)?,
            is_active: form.flag("is_active"),
        })
    }

    fn label(&self) -> String {
        self.title.clone().unwrap_or_else(|| "Untitled slide".to_string())
    }

    fn details(&self) -> Option<String> {
        self.subtitle.clone()
    }

    fn thumbnail(&self) -> Option<&str> {
        Some(self.image_url.as_str()).filter(|url| !url.is_empty())
    }
}

impl AdminResource for FeaturedItem {
    const SLUG: &'static str = "featured";
    const TITLE: &'static str = "Featured";
    const SINGULAR: &'static str = "Featured item";
    const TOGGLES: &'static [(&'static str, &'static str)] = ACTIVE;
    const SORTABLE: bool = true;

    fn form_fields(record: Option<&Self>, _options: &[SelectOption]) -> Vec<FormField> {
        vec![
            FormField::new("title", "Title", FieldKind::Text)
                .required()
                .maybe(record.map(|r| &r.title)),
            FormField::new("description", "Description", FieldKind::Textarea)
                .maybe(record.and_then(|r| r.description.as_ref())),
            FormField::new("image_url", "Image", FieldKind::Url)
                .maybe(record.and_then(|r| r.image_url.as_ref()))
                .upload(UploadTarget::FeaturedImage),
            FormField::new("link_url", "Link", FieldKind::Url)
                .maybe(record.and_then(|r| r.link_url.as_ref())),
            position_field(record.map(|r| r.sort_order)),
            active_field(record.map(|r| r.is_active)),
        ]
    }

    fn from_form(form: &FormData, existing: Option<&Self>) -> Result<Self, String> {
        Ok(FeaturedItem {
            id: existing.and_then(|e| e.id),
            title: form.required("title", "Title")?,
            description: form.text("description"),
            image_url: form.text("image_url"),
            link_url: form.text("link_url"),
            sort_order: position(form)?,
            is_active: form.flag("is_active"),
        })
    }

    fn label(&self) -> String {
        self.title.clone()
    }

    fn thumbnail(&self) -> Option<&str> {
        self.image_url.as_deref()
    }
}

impl AdminResource for HomeVideo {
    const SLUG: &'static str = "videos";
    const TITLE: &'static str = "Home videos";
    const SINGULAR: &'static str = "Video";
    const TOGGLES: &'static [(&'static str, &'static str)] = ACTIVE;
    const SORTABLE: bool = true;

    fn form_fields(record: Option<&Self>, _options: &[SelectOption]) -> Vec<FormField> {
        vec![
            FormField::new("title", "Title", FieldKind::Text)
                .required()
                .maybe(record.map(|r| &r.title)),
            FormField::new("video_url", "Video", FieldKind::Url)
                .required()
                .maybe(record.map(|r| &r.video_url))
                .upload(UploadTarget::Video),
            FormField::new("poster_url", "Poster", FieldKind::Url)
                .maybe(record.and_then(|r| r.poster_url.as_ref()))
                .upload(UploadTarget::VideoPoster),
            FormField::new("description", "Description", FieldKind::Textarea)
                .maybe(record.and_then(|r| r.description.as_ref())),
            position_field(record.map(|r| r.sort_order)),
            active_field(record.map(|r| r.is_active)),
        ]
    }

    fn from_form(form: &FormData, existing: Option<&Self>) -> Result<Self, String> {
        Ok(HomeVideo {
            id: existing.and_then(|e| e.id),
            title: form.required("title", "Title")?,
            video_url: form.text("video_url").unwrap_or_default(),
            poster_url: form.text("poster_url"),
            description: form.text("description"),
            sort_order: position(form)?,
            is_active: form.flag("is_active"),
        })
    }

    fn label(&self) -> String {
        self.title.clone()
    }

    fn thumbnail(&self) -> Option<&str> {
        self.poster_url.as_deref()
    }
}

impl AdminResource for FooterLink {
    const SLUG: &'static str = "footer-links";
    const TITLE: &'static str = "Footer links";
    const SINGULAR: &'static str = "Footer link";
    const SEARCH_COLUMN: Option<&'static str> = Some("label");
    const TOGGLES: &'static [(&'static str, &'static str)] = ACTIVE;
    const SORTABLE: bool = true;

    fn form_fields(record: Option<&Self>, _options: &[SelectOption]) -> Vec<FormField> {
        vec![
            FormField::new("label", "Label", FieldKind::Text)
                .required()
                .maybe(record.map(|r| &r.label)),
            FormField::new("url", "URL", FieldKind::Url)
                .required()
                .maybe(record.map(|r| &r.url)),
            FormField::new("section", "Section", FieldKind::Text)
                .maybe(record.and_then(|r| r.section.as_ref()))
                .help("Footer column heading"),
            FormField::new("open_in_new_tab", "Open in new tab", FieldKind::Checkbox)
                .checked(record.is_some_and(|r| r.open_in_new_tab)),
            position_field(record.map(|r| r.sort_order)),
            active_field(record.map(|r| r.is_active)),
        ]
    }

    fn from_form(form: &FormData, existing: Option<&Self>) -> Result<Self, String> {
        Ok(FooterLink {
            id: existing.and_then(|e| e.id),
            label: form.required("label", "Label")?,
            url: form.required("url", "URL")?,
            section: form.text("section"),
            open_in_new_tab: form.flag("open_in_new_tab"),
            sort_order: position(form)?,
            is_active: form.flag("is_active"),
        })
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    fn details(&self) -> Option<String> {
        Some(self.url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tonearm_core::Record;

    fn form(pairs: &[(&str, &str)]) -> FormData {
        FormData::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        )
    }

    #[test]
    fn test_category_slug_generated_from_name() {
        let category = Category::from_form(&form(&[("name", "Phono Stages"), ("is_active", "on")]), None).unwrap();
        assert_eq!(category.slug, "phono-stages");
        assert!(category.is_active);
        assert_eq!(category.sort_order, 0);
    }

    #[test]
    fn test_product_coerces_numbers_and_lists() {
        let product = Product::from_form(
            &form(&[
                ("name", "Reference One"),
                ("category_id", "3"),
                ("price", "4999,50"),
                ("gallery", "https://a/1.jpg\n\n https://a/2.jpg "),
                ("specifications", r#"{"Weight": "12 kg"}"#),
                ("sort_order", "4"),
            ]),
            None,
        )
        .unwrap();
        assert_eq!(product.category_id, Some(3));
        assert_eq!(product.price, Some(4999.5));
        assert_eq!(product.gallery, vec!["https://a/1.jpg", "https://a/2.jpg"]);
        assert_eq!(product.sort_order, 4);
        assert!(!product.is_active);
        assert!(product.validate().is_ok());
    }

    #[test]
    fn test_product_rejects_bad_numbers() {
        let err = Product::from_form(&form(&[("name", "X"), ("price", "cheap")]), None).unwrap_err();
        assert!(err.contains("price"));
    }

    #[test]
    fn test_carousel_without_image_fails_validation() {
        let slide = CarouselSlide::from_form(&form(&[("title", "Hero")]), None).unwrap();
        assert!(slide.validate().is_err());
    }

    #[test]
    fn test_edit_keeps_identity() {
        let mut existing = Dealer::new("Old".into(), "Japan".into());
        existing.id = Some(9);
        let dealer = Dealer::from_form(&form(&[("name", "New"), ("country", "Japan")]), Some(&existing)).unwrap();
        assert_eq!(dealer.id, Some(9));
        assert_eq!(dealer.name, "New");
    }

    #[test]
    fn test_news_publish_stamps_date() {
        let article = NewsArticle::from_form(
            &form(&[("title", "Launch"), ("content", "<p>Hi</p>"), ("is_published", "on")]),
            None,
        )
        .unwrap();
        assert!(article.is_published);
        assert!(article.published_at.is_some());
    }

    #[test]
    fn test_form_fields_prefill() {
        let mut faq = Faq::new("Warranty?".into(), "Five years".into());
        faq.sort_order = 2;
        let fields = Faq::form_fields(Some(&faq), &[]);
        let question = fields.iter().find(|f| f.name == "question").unwrap();
        assert_eq!(question.value, "Warranty?");
        let position = fields.iter().find(|f| f.name == "sort_order").unwrap();
        assert_eq!(position.value, "2");
    }

    #[test]
    fn test_nav_slugs_are_unique() {
        let mut slugs: Vec<_> = NAV.iter().map(|item| item.slug).collect();
        slugs.sort();
        slugs.dedup();
        assert_eq!(slugs.len(), NAV.len());
    }
}
