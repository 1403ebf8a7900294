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

use anyhow::{Context, Result};
use std::path::Path;

use crate::autoreload_templates::TemplateEngine;

pub fn init_templates(templates_dir: &str, development_mode: bool) -> Result<TemplateEngine> {
    std::fs::create_dir_all(templates_dir).context("Failed to create templates directory")?;

    create_default_templates(templates_dir)?;

    TemplateEngine::new(templates_dir, development_mode)
}

/// Write any built-in template that is missing; edited copies are kept
fn create_default_templates(templates_dir: &str) -> Result<()> {
    let base_dir = Path::new(templates_dir);

    for (name, body) in DEFAULT_TEMPLATES {
        let path = base_dir.join(name);
        if path.exists() {
            continue;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, body).with_context(|| format!("Failed to create template {}", name))?;
        tracing::debug!(template = name, "Created default template");
    }

    Ok(())
}

const DEFAULT_TEMPLATES: &[(&str, &str)] = &[
    ("base.html", BASE),
    ("public/home.html", HOME),
    ("public/category.html", CATEGORY),
    ("public/product.html", PRODUCT),
    ("public/news_list.html", NEWS_LIST),
    ("public/news_detail.html", NEWS_DETAIL),
    ("public/downloads.html", DOWNLOADS),
    ("public/dealers.html", DEALERS),
    ("public/support.html", SUPPORT),
    ("public/page.html", PAGE),
    ("admin/layout.html", ADMIN_LAYOUT),
    ("auth/signin.html", SIGN_IN),
    ("auth/mfa.html", MFA),
    ("admin/dashboard.html", DASHBOARD),
    ("admin/list.html", LIST),
    ("admin/form.html", FORM),
    ("admin/settings.html", SETTINGS),
    ("admin/security.html", SECURITY),
];

const BASE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{% block title %}{{ site.site_name | default(value="Tonearm") }}{% endblock %}</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            line-height: 1.6;
            max-width: 1100px;
            margin: 0 auto;
            padding: 20px;
            color: #222;
        }
        header nav {
            border-bottom: 1px solid #eee;
            padding-bottom: 10px;
            margin-bottom: 20px;
        }
        header nav a {
            margin-right: 15px;
            text-decoration: none;
            color: #111;
        }
        .grid {
            display: grid;
            grid-template-columns: repeat(auto-fill, minmax(240px, 1fr));
            gap: 20px;
        }
        .grid img, .slide img {
            max-width: 100%;
        }
        footer {
            margin-top: 40px;
            padding-top: 20px;
            border-top: 1px solid #eee;
            font-size: 0.9em;
            color: #666;
        }
    </style>
    {% block head %}{% endblock %}
</head>
<body>
    <header>
        <nav>
            <a href="/"><strong>{{ site.site_name | default(value="Tonearm") }}</strong></a>
            {% for category in nav_categories %}
            <a href="/products/{{ category.slug }}">{{ category.name }}</a>
            {% endfor %}
            <a href="/news">News</a>
            <a href="/downloads">Downloads</a>
            <a href="/dealers">Dealers</a>
            <a href="/support">Support</a>
        </nav>
    </header>

    <main>
        {% block content %}{% endblock %}
    </main>

    <footer>
        {% for link in footer_links %}
        <a href="{{ link.url }}"{% if link.open_in_new_tab %} target="_blank" rel="noopener"{% endif %}>{{ link.label }}</a>
        {% endfor %}
        {% if site.contact_email %}<p>{{ site.contact_email }}</p>{% endif %}
    </footer>
</body>
</html>"#;

const HOME: &str = r#"{% extends "base.html" %}

{% block content %}
{% if slides %}
<section class="carousel">
    {% for slide in slides %}
    <div class="slide">
        <picture>
            {% if slide.mobile_image_url %}<source media="(max-width: 700px)" srcset="{{ slide.mobile_image_url }}">{% endif %}
            <img src="{{ slide.image_url }}" alt="{{ slide.title | default(value="") }}">
        </picture>
        {% if slide.title %}<h2>{{ slide.title }}</h2>{% endif %}
        {% if slide.subtitle %}<p>{{ slide.subtitle }}</p>{% endif %}
        {% if slide.link_url %}<a href="{{ slide.link_url }}">{{ slide.button_text | default(value="Discover") }}</a>{% endif %}
    </div>
    {% endfor %}
</section>
{% endif %}

{% if featured %}
<section class="grid">
    {% for item in featured %}
    <article>
        {% if item.image_url %}<img src="{{ item.image_url }}" alt="{{ item.title }}">{% endif %}
        <h3>{% if item.link_url %}<a href="{{ item.link_url }}">{{ item.title }}</a>{% else %}{{ item.title }}{% endif %}</h3>
        {% if item.description %}<p>{{ item.description }}</p>{% endif %}
    </article>
    {% endfor %}
</section>
{% endif %}

{% if products %}
<h2>Featured products</h2>
<section class="grid">
    {% for product in products %}
    <article>
        {% if product.image_url %}<img src="{{ product.image_url }}" alt="{{ product.name }}">{% endif %}
        <h3><a href="/product/{{ product.slug }}">{{ product.name }}</a></h3>
        {% if product.short_description %}<p>{{ product.short_description }}</p>{% endif %}
    </article>
    {% endfor %}
</section>
{% endif %}

{% for video in videos %}
<section class="video">
    <h2>{{ video.title }}</h2>
    <video controls preload="metadata" src="{{ video.video_url }}"{% if video.poster_url %} poster="{{ video.poster_url }}"{% endif %}></video>
    {% if video.description %}<p>{{ video.description }}</p>{% endif %}
</section>
{% endfor %}

{% if news %}
<h2>Latest news</h2>
<ul>
    {% for article in news %}
    <li><a href="/news/{{ article.slug }}">{{ article.title }}</a></li>
    {% endfor %}
</ul>
{% endif %}
{% endblock %}"#;

const CATEGORY: &str = r#"{% extends "base.html" %}

{% block title %}{{ category.name }} - {{ super() }}{% endblock %}

{% block content %}
<h1>{{ category.name }}</h1>
{% if category.description %}<p>{{ category.description }}</p>{% endif %}

<section class="grid">
    {% for product in products %}
    <article>
        {% if product.image_url %}<img src="{{ product.image_url }}" alt="{{ product.name }}">{% endif %}
        <h3><a href="/product/{{ product.slug }}">{{ product.name }}</a></h3>
        {% if product.model_number %}<p>{{ product.model_number }}</p>{% endif %}
        {% if product.price %}<p>{{ product.price | price }}</p>{% endif %}
    </article>
    {% else %}
    <p>No products in this category yet.</p>
    {% endfor %}
</section>
{% endblock %}"#;

const PRODUCT: &str = r#"{% extends "base.html" %}

{% block title %}{{ product.name }} - {{ super() }}{% endblock %}

{% block content %}
{% if category %}<p><a href="/products/{{ category.slug }}">{{ category.name }}</a></p>{% endif %}
<h1>{{ product.name }}</h1>
{% if product.model_number %}<p>{{ product.model_number }}</p>{% endif %}
{% if product.image_url %}<img src="{{ product.image_url }}" alt="{{ product.name }}">{% endif %}
{% for image in product.gallery %}<img src="{{ image }}" alt="">{% endfor %}
{% if product.price %}<p class="price">{{ product.price | price }}</p>{% endif %}
{% if product.short_description %}<p>{{ product.short_description }}</p>{% endif %}
<div class="description">{{ product.description | clean_html | safe }}</div>

{% if specifications %}
<h2>Specifications</h2>
<table>
    {% for row in specifications %}
    <tr><th>{{ row.0 }}</th><td>{{ row.1 }}</td></tr>
    {% endfor %}
</table>
{% endif %}

{% if downloads or product.manual_url %}
<h2>Downloads</h2>
<ul>
    {% if product.manual_url %}<li><a href="{{ product.manual_url }}">Owner's manual</a></li>{% endif %}
    {% for download in downloads %}
    <li><a href="{{ download.file_url }}">{{ download.title }}</a>{% if download.size %} ({{ download.size }}){% endif %}</li>
    {% endfor %}
</ul>
{% endif %}
{% endblock %}"#;

const NEWS_LIST: &str = r#"{% extends "base.html" %}

{% block title %}News - {{ super() }}{% endblock %}

{% block content %}
<h1>News</h1>
{% for article in articles %}
<article>
    {% if article.cover_image %}<img src="{{ article.cover_image }}" alt="">{% endif %}
    <h2><a href="/news/{{ article.slug }}">{{ article.title }}</a></h2>
    {% if article.published_at %}<time>{{ article.published_at | date(format="%B %e, %Y") }}</time>{% endif %}
    {% if article.excerpt %}<p>{{ article.excerpt }}</p>{% endif %}
</article>
{% else %}
<p>No news yet.</p>
{% endfor %}

<nav class="pagination">
    {% if has_previous %}<a href="/news?page={{ page - 1 }}">Newer</a>{% endif %}
    <span>Page {{ page }} of {{ total_pages }}</span>
    {% if has_next %}<a href="/news?page={{ page + 1 }}">Older</a>{% endif %}
</nav>
{% endblock %}"#;

const NEWS_DETAIL: &str = r#"{% extends "base.html" %}

{% block title %}{{ article.title }} - {{ super() }}{% endblock %}

{% block content %}
<article>
    <h1>{{ article.title }}</h1>
    {% if article.published_at %}<time>{{ article.published_at | date(format="%B %e, %Y") }}</time>{% endif %}
    {% if article.author %}<p>{{ article.author }}</p>{% endif %}
    {% if article.cover_image %}<img src="{{ article.cover_image }}" alt="">{% endif %}
    <div class="content">{{ article.content | clean_html | safe }}</div>
</article>
<p><a href="/news">All news</a></p>
{% endblock %}"#;

const DOWNLOADS: &str = r#"{% extends "base.html" %}

{% block title %}Downloads - {{ super() }}{% endblock %}

{% block content %}
<h1>Downloads</h1>
{% for group in groups %}
<h2>{{ group.name }}</h2>
<ul>
    {% for download in group.items %}
    <li>
        <a href="{{ download.file_url }}">{{ download.title }}</a>
        {% if download.version %}v{{ download.version }}{% endif %}
        {% if download.size %}({{ download.size }}){% endif %}
        {% if download.description %}<br>{{ download.description }}{% endif %}
    </li>
    {% endfor %}
</ul>
{% else %}
<p>No downloads available.</p>
{% endfor %}
{% endblock %}"#;

const DEALERS: &str = r#"{% extends "base.html" %}

{% block title %}Dealers - {{ super() }}{% endblock %}

{% block content %}
<h1>Dealers</h1>
{% for country in countries %}
<h2>{{ country.name }}</h2>
<div class="grid">
    {% for dealer in country.items %}
    <article>
        {% if dealer.logo_url %}<img src="{{ dealer.logo_url }}" alt="{{ dealer.name }}">{% endif %}
        <h3>{{ dealer.name }}</h3>
        {% if dealer.city %}<p>{{ dealer.city }}{% if dealer.region %}, {{ dealer.region }}{% endif %}</p>{% endif %}
        {% if dealer.address %}<p>{{ dealer.address }}</p>{% endif %}
        {% if dealer.phone %}<p>{{ dealer.phone }}</p>{% endif %}
        {% if dealer.email %}<p><a href="mailto:{{ dealer.email }}">{{ dealer.email }}</a></p>{% endif %}
        {% if dealer.website %}<p><a href="{{ dealer.website }}" rel="noopener">{{ dealer.website }}</a></p>{% endif %}
    </article>
    {% endfor %}
</div>
{% else %}
<p>No dealers listed yet.</p>
{% endfor %}
{% endblock %}"#;

const SUPPORT: &str = r#"{% extends "base.html" %}

{% block title %}Support - {{ super() }}{% endblock %}

{% block content %}
<h1>Support</h1>
{% for group in faq_groups %}
<h2>{{ group.name }}</h2>
{% for faq in group.items %}
<details>
    <summary>{{ faq.question }}</summary>
    <div>{{ faq.answer | clean_html | safe }}</div>
</details>
{% endfor %}
{% endfor %}
{% if site.support_email %}<p>Still need help? Write to <a href="mailto:{{ site.support_email }}">{{ site.support_email }}</a>.</p>{% endif %}
{% endblock %}"#;

const PAGE: &str = r#"{% extends "base.html" %}

{% block title %}{{ page.title }} - {{ super() }}{% endblock %}

{% block head %}{% if page.meta_description %}<meta name="description" content="{{ page.meta_description }}">{% endif %}{% endblock %}

{% block content %}
<h1>{{ page.title }}</h1>
<div class="content">{{ page.content | clean_html | safe }}</div>
{% endblock %}"#;

const ADMIN_LAYOUT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <meta name="robots" content="noindex">
    <title>{% block title %}Manage{% endblock %}</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            margin: 0;
            display: flex;
            color: #222;
        }
        aside {
            width: 200px;
            min-height: 100vh;
            background: #f4f4f4;
            padding: 20px;
        }
        aside a {
            display: block;
            padding: 4px 0;
            color: #333;
            text-decoration: none;
        }
        aside a.active {
            font-weight: bold;
        }
        main {
            flex: 1;
            padding: 20px 30px;
        }
        .flash { background: #e6f4ea; padding: 10px; }
        .error { background: #fdecea; color: #b00020; padding: 10px; }
        table { border-collapse: collapse; width: 100%; }
        td, th { border-bottom: 1px solid #eee; padding: 6px; text-align: left; }
        td form { display: inline; }
        label { display: block; margin-top: 12px; font-weight: 600; }
        input[type=text], input[type=number], input[type=url], input[type=datetime-local], textarea, select { width: 100%; max-width: 640px; }
        textarea { min-height: 120px; }
    </style>
</head>
<body>
    {% if admin_email %}
    <aside>
        <a href="/Manage"{% if section == "dashboard" %} class="active"{% endif %}>Dashboard</a>
        {% for item in nav %}
        <a href="/Manage/{{ item.slug }}"{% if section == item.slug %} class="active"{% endif %}>{{ item.title }}</a>
        {% endfor %}
        <a href="/Manage/Settings"{% if section == "settings" %} class="active"{% endif %}>Settings</a>
        <a href="/Manage/Security"{% if section == "security" %} class="active"{% endif %}>Security</a>
        <hr>
        <p>{{ admin_label }}{% if not mfa_enabled %}<br><small>2FA off</small>{% endif %}</p>
        <form method="post" action="/Auth/SignOut"><button type="submit">Sign out</button></form>
    </aside>
    {% endif %}
    <main>
        {% if flash %}<p class="flash">{{ flash }}</p>{% endif %}
        {% if error %}<p class="error">{{ error }}</p>{% endif %}
        {% block content %}{% endblock %}
    </main>
</body>
</html>"#;

const SIGN_IN: &str = r#"{% extends "admin/layout.html" %}

{% block title %}Sign in{% endblock %}

{% block content %}
<h1>Sign in</h1>
<form method="post" action="/Auth/SignIn">
    <label for="email">Email</label>
    <input type="text" id="email" name="email" value="{{ email }}" autocomplete="username" required>

    <label for="password">Password</label>
    <input type="password" id="password" name="password" autocomplete="current-password" required>

    <p><button type="submit">Sign in</button></p>
</form>
{% endblock %}"#;

const MFA: &str = r#"{% extends "admin/layout.html" %}

{% block title %}Two-factor authentication{% endblock %}

{% block content %}
<h1>Two-factor authentication</h1>
<p>Open your authenticator app and type the code it shows.</p>
<form method="post" action="/Auth/Mfa">
    <label for="code">Code</label>
    <input type="text" id="code" name="code" inputmode="numeric" pattern="[0-9]{6}" maxlength="6" autocomplete="one-time-code" autofocus required>
    <p><button type="submit">Verify</button></p>
</form>
<form method="post" action="/Auth/SignOut"><button type="submit">Cancel</button></form>
{% endblock %}"#;

const DASHBOARD: &str = r#"{% extends "admin/layout.html" %}

{% block title %}Dashboard{% endblock %}

{% block content %}
<h1>Dashboard</h1>
<table>
    <tr><th>Content</th><th>Rows</th></tr>
    {% for resource in resources %}
    <tr><td><a href="/Manage/{{ resource.slug }}">{{ resource.title }}</a></td><td>{{ resource.count }}</td></tr>
    {% endfor %}
</table>

<h2>Recent visits ({{ total_visits }} total)</h2>
<table>
    <tr><th>When</th><th>Path</th><th>Referrer</th></tr>
    {% for visit in recent_visits %}
    <tr>
        <td>{{ visit.visited_at | date(format="%Y-%m-%d %H:%M") }}</td>
        <td>{{ visit.path }}</td>
        <td>{{ visit.referrer | default(value="") }}</td>
    </tr>
    {% else %}
    <tr><td colspan="3">No visits recorded yet.</td></tr>
    {% endfor %}
</table>
{% endblock %}"#;

const LIST: &str = r#"{% extends "admin/layout.html" %}

{% block title %}{{ title }}{% endblock %}

{% block content %}
<h1>{{ title }} <small>({{ total }})</small></h1>
<p><a href="{{ base_path }}/new">New {{ singular | lower }}</a></p>

{% if searchable %}
<form method="get" action="{{ base_path }}">
    <input type="text" name="q" value="{{ q }}" placeholder="Search">
    <button type="submit">Search</button>
</form>
{% endif %}

<table>
    {% for row in rows %}
    <tr>
        <td>{% if row.thumbnail %}<img src="{{ row.thumbnail }}" alt="" height="40">{% endif %}</td>
        <td>
            <a href="{{ base_path }}/{{ row.id }}/edit">{{ row.label }}</a>
            {% if row.details %}<br><small>{{ row.details }}</small>{% endif %}
        </td>
        <td>
            {% for flag in row.flags %}
            <form method="post" action="{{ base_path }}/{{ row.id }}/toggle/{{ flag.field }}?{{ query_string }}">
                <button type="submit" class="flag-{{ flag.field }}">{{ flag.label }}: {% if flag.value %}on{% else %}off{% endif %}</button>
            </form>
            {% endfor %}
        </td>
        <td>
            {% if sortable %}
            <form method="post" action="{{ base_path }}/{{ row.id }}/move/up?{{ query_string }}"><button type="submit">Up</button></form>
            <form method="post" action="{{ base_path }}/{{ row.id }}/move/down?{{ query_string }}"><button type="submit">Down</button></form>
            {% endif %}
            <form method="post" action="{{ base_path }}/{{ row.id }}/delete" onsubmit="return confirm('Delete {{ row.label }}?')">
                <button type="submit">Delete</button>
            </form>
        </td>
    </tr>
    {% else %}
    <tr><td colspan="4">Nothing here yet.</td></tr>
    {% endfor %}
</table>

{% if total_pages > 1 %}
<nav>
    {% if has_previous %}<a href="{{ base_path }}?page={{ page - 1 }}{% if q %}&q={{ q | urlencode }}{% endif %}">Previous</a>{% endif %}
    <span>Page {{ page }} of {{ total_pages }}</span>
    {% if has_next %}<a href="{{ base_path }}?page={{ page + 1 }}{% if q %}&q={{ q | urlencode }}{% endif %}">Next</a>{% endif %}
</nav>
{% endif %}
{% endblock %}"#;

const FORM: &str = r#"{% extends "admin/layout.html" %}

{% block title %}{% if record_id %}Edit{% else %}New{% endif %} {{ singular | lower }}{% endblock %}

{% block content %}
<h1>{% if record_id %}Edit{% else %}New{% endif %} {{ singular | lower }}</h1>
<form method="post" action="{{ action }}" enctype="multipart/form-data">
    {% for field in fields %}
    {% if field.kind == "checkbox" %}
    <label><input type="checkbox" name="{{ field.name }}" value="on"{% if field.checked %} checked{% endif %}> {{ field.label }}</label>
    {% else %}
    <label for="{{ field.name }}">{{ field.label }}{% if field.required %} *{% endif %}</label>
    {% if field.kind == "textarea" or field.kind == "html" or field.kind == "lines" or field.kind == "json" %}
    <textarea id="{{ field.name }}" name="{{ field.name }}"{% if field.required %} required{% endif %}>{{ field.value }}</textarea>
    {% elif field.kind == "select" %}
    <select id="{{ field.name }}" name="{{ field.name }}">
        <option value="">None</option>
        {% for option in field.options %}
        <option value="{{ option.value }}"{% if option.value == field.value %} selected{% endif %}>{{ option.label }}</option>
        {% endfor %}
    </select>
    {% elif field.kind == "number" %}
    <input type="number" id="{{ field.name }}" name="{{ field.name }}" value="{{ field.value }}" step="1">
    {% elif field.kind == "decimal" %}
    <input type="text" id="{{ field.name }}" name="{{ field.name }}" value="{{ field.value }}" inputmode="decimal">
    {% elif field.kind == "datetime" %}
    <input type="datetime-local" id="{{ field.name }}" name="{{ field.name }}" value="{{ field.value }}">
    {% else %}
    <input type="text" id="{{ field.name }}" name="{{ field.name }}" value="{{ field.value }}"{% if field.required and not field.upload %} required{% endif %}>
    {% endif %}
    {% if field.upload %}
    <input type="file" name="{{ field.name }}__upload">
    {% endif %}
    {% if field.help %}<small>{{ field.help }}</small>{% endif %}
    {% endif %}
    {% endfor %}

    <p>
        <button type="submit">Save</button>
        <a href="{{ base_path }}">Cancel</a>
    </p>
</form>
{% endblock %}"#;

const SETTINGS: &str = r#"{% extends "admin/layout.html" %}

{% block title %}Settings{% endblock %}

{% block content %}
<h1>Site settings</h1>
<p>Values are JSON: strings need quotes, e.g. <code>"Tonearm Audio"</code>.</p>

{% for setting in settings %}
<form method="post" action="/Manage/Settings">
    <label for="setting-{{ setting.key }}">{{ setting.key }}{% if error_key is defined and error_key == setting.key %} <span class="error">invalid</span>{% endif %}</label>
    {% if setting.description %}<small>{{ setting.description }}</small>{% endif %}
    <input type="hidden" name="key" value="{{ setting.key }}">
    <textarea id="setting-{{ setting.key }}" name="value">{{ setting.value }}</textarea>
    <button type="submit">Save</button>
</form>
<form method="post" action="/Manage/Settings/delete">
    <input type="hidden" name="key" value="{{ setting.key }}">
    <button type="submit">Delete</button>
</form>
{% endfor %}

<h2>Add setting</h2>
<form method="post" action="/Manage/Settings">
    <label for="new-key">Key</label>
    <input type="text" id="new-key" name="key" value="{{ new_key | default(value="") }}" required>
    <label for="new-value">Value</label>
    <textarea id="new-value" name="value">{{ new_value | default(value="") }}</textarea>
    <button type="submit">Add</button>
</form>
{% endblock %}"#;

const SECURITY: &str = r#"{% extends "admin/layout.html" %}

{% block title %}Security{% endblock %}

{% block content %}
<h1>Two-factor authentication</h1>

{% if factors %}
<table>
    <tr><th>Name</th><th>Type</th><th>Status</th><th></th></tr>
    {% for factor in factors %}
    <tr>
        <td>{{ factor.friendly_name | default(value="Authenticator") }}</td>
        <td>{{ factor.factor_type }}</td>
        <td>{{ factor.status }}</td>
        <td>
            <form method="post" action="/Manage/Security/unenroll">
                <input type="hidden" name="factor_id" value="{{ factor.id }}">
                <button type="submit">Remove</button>
            </form>
        </td>
    </tr>
    {% endfor %}
</table>
{% endif %}

{% if enrollment %}
<h2>Finish setup</h2>
<p>Scan this code with your authenticator app, then enter the 6-digit code it shows.</p>
<img src="{{ enrollment.qr_code }}" alt="QR code" width="200" height="200">
<p>Or enter the secret manually: <code>{{ enrollment.secret }}</code></p>
<form method="post" action="/Manage/Security/verify">
    <input type="hidden" name="factor_id" value="{{ enrollment.factor_id }}">
    <label for="code">Code</label>
    <input type="text" id="code" name="code" inputmode="numeric" maxlength="6" autocomplete="one-time-code" required>
    <button type="submit">Verify</button>
</form>
{% elif not has_verified_factor %}
<h2>Add an authenticator</h2>
<form method="post" action="/Manage/Security/enroll">
    <label for="friendly_name">Name</label>
    <input type="text" id="friendly_name" name="friendly_name" placeholder="Authenticator app">
    <button type="submit">Start setup</button>
</form>
{% endif %}
{% endblock %}"#;
