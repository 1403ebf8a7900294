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

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tera::{to_value, Context, Filter, Tera, Value};

/// Tera wrapper that re-reads the template directory on every render in
/// development mode
pub enum TemplateEngine {
    Static(Arc<Tera>),
    Reloadable {
        templates_dir: String,
        cached: Arc<RwLock<Tera>>,
    },
}

impl TemplateEngine {
    pub fn new(templates_dir: &str, development_mode: bool) -> Result<Self> {
        let tera = Self::create_tera_instance(templates_dir)?;
        if development_mode {
            tracing::info!("Template hot reload enabled (development mode)");
            Ok(Self::Reloadable {
                templates_dir: templates_dir.to_string(),
                cached: Arc::new(RwLock::new(tera)),
            })
        } else {
            tracing::info!("Templates loaded once (production mode)");
            Ok(Self::Static(Arc::new(tera)))
        }
    }

    fn create_tera_instance(templates_dir: &str) -> Result<Tera> {
        let pattern = format!("{}/**/*.html", templates_dir);
        let mut tera = Tera::new(&pattern)?;
        tera.register_filter("clean_html", CleanHtmlFilter);
        tera.register_filter("price", PriceFilter);
        Ok(tera)
    }

    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        match self {
            Self::Static(tera) => Ok(tera.render(template_name, context)?),
            Self::Reloadable {
                templates_dir,
                cached,
            } => {
                match Self::create_tera_instance(templates_dir) {
                    Ok(new_tera) => {
                        if let Ok(mut write_guard) = cached.write() {
                            *write_guard = new_tera;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to reload templates: {}. Using cached version.", e);
                    }
                }
                let read_guard = cached
                    .read()
                    .map_err(|_| anyhow!("Template cache lock poisoned"))?;
                Ok(read_guard.render(template_name, context)?)
            }
        }
    }
}

impl Clone for TemplateEngine {
    fn clone(&self) -> Self {
        match self {
            Self::Static(tera) => Self::Static(Arc::clone(tera)),
            Self::Reloadable {
                templates_dir,
                cached,
            } => Self::Reloadable {
                templates_dir: templates_dir.clone(),
                cached: Arc::clone(cached),
            },
        }
    }
}

/// Sanitize stored rich-text HTML before it is output with `| safe`
struct CleanHtmlFilter;

impl Filter for CleanHtmlFilter {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        match value {
            Value::String(html) => Ok(to_value(ammonia::clean(html))?),
            Value::Null => Ok(Value::String(String::new())),
            _ => Err(tera::Error::msg("clean_html filter only works on strings")),
        }
    }
}

/// Two decimal places with a thousands separator: `1234.5` becomes `1,234.50`
struct PriceFilter;

impl Filter for PriceFilter {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        let amount = match value {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| tera::Error::msg("Failed to convert number to float"))?,
            _ => return Err(tera::Error::msg("price filter only works on numbers")),
        };
        Ok(to_value(format_price(amount))?)
    }
}

fn format_price(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, cents)
}
