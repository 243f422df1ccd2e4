//! Theme engine wrapping Tera.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use tera::Tera;
use tracing::debug;

/// Theme engine for rendering templates.
pub struct ThemeEngine {
    tera: Tera,
}

impl ThemeEngine {
    /// Create a new theme engine loading templates from the given directory.
    pub fn new(template_dir: &Path) -> Result<Self> {
        let pattern = template_dir.join("**/*.html");
        let pattern_str = pattern
            .to_str()
            .context("invalid template directory path")?;

        let mut tera = Tera::new(pattern_str).context("failed to initialize Tera templates")?;

        Self::register_filters(&mut tera);

        let template_names: Vec<_> = tera.get_template_names().collect();
        debug!(count = template_names.len(), "loaded templates");

        Ok(Self { tera })
    }

    /// Create a theme engine with no templates (for testing).
    pub fn empty() -> Self {
        let mut tera = Tera::default();
        Self::register_filters(&mut tera);
        Self { tera }
    }

    /// Register custom Tera filters.
    fn register_filters(tera: &mut Tera) {
        // Cut text to `length` characters, appending an ellipsis when cut.
        tera.register_filter(
            "truncate_chars",
            |value: &tera::Value, args: &HashMap<String, tera::Value>| {
                let text = tera::try_get_value!("truncate_chars", "value", String, value);
                let length = args
                    .get("length")
                    .and_then(|v| v.as_u64())
                    .map_or(150, |n| n as usize);

                if text.chars().count() <= length {
                    return Ok(tera::Value::String(text));
                }

                let mut cut: String = text.chars().take(length).collect();
                cut.push('…');
                Ok(tera::Value::String(cut))
            },
        );

        // Unix timestamps as human-readable dates
        tera.register_filter(
            "format_date",
            |value: &tera::Value, _args: &HashMap<String, tera::Value>| {
                let timestamp = match value {
                    tera::Value::Number(n) => n.as_i64().unwrap_or(0),
                    _ => return Ok(tera::Value::String(String::new())),
                };

                let formatted = chrono::DateTime::from_timestamp(timestamp, 0)
                    .map(|dt| dt.format("%B %-d, %Y").to_string())
                    .unwrap_or_else(|| "Unknown date".to_string());

                Ok(tera::Value::String(formatted))
            },
        );

        tera.register_filter(
            "strip_html",
            |value: &tera::Value, _args: &HashMap<String, tera::Value>| {
                let html = tera::try_get_value!("strip_html", "value", String, value);
                let text = ammonia::Builder::empty().clean(&html).to_string();
                Ok(tera::Value::String(text))
            },
        );
    }

    pub fn tera(&self) -> &Tera {
        &self.tera
    }

    /// Add a template from a string, e.g. one compiled into a plugin.
    pub fn add_raw_template(&mut self, name: &str, content: &str) -> Result<()> {
        self.tera
            .add_raw_template(name, content)
            .with_context(|| format!("failed to add template {name}"))
    }

    /// Render a template by name.
    pub fn render(&self, template: &str, context: &tera::Context) -> Result<String> {
        self.tera
            .render(template, context)
            .with_context(|| format!("failed to render template {template}"))
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }
}

impl std::fmt::Debug for ThemeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeEngine")
            .field("template_count", &self.tera.get_template_names().count())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn render_one(source: &str, key: &str, value: impl serde::Serialize) -> String {
        let mut engine = ThemeEngine::empty();
        engine.add_raw_template("test", source).unwrap();
        let mut ctx = tera::Context::new();
        ctx.insert(key, &value);
        engine.render("test", &ctx).unwrap()
    }

    #[test]
    fn format_date_with_valid_timestamp() {
        // 2025-02-15 00:00:00 UTC
        let out = render_one("{{ ts | format_date }}", "ts", 1739577600_i64);
        assert_eq!(out, "February 15, 2025");
    }

    #[test]
    fn format_date_with_string() {
        let out = render_one("{{ ts | format_date }}", "ts", "not a number");
        assert_eq!(out, "");
    }

    #[test]
    fn truncate_chars_counts_characters() {
        let out = render_one("{{ s | truncate_chars(length=3) }}", "s", "héllo");
        assert_eq!(out, "hél…");
        let out = render_one("{{ s | truncate_chars(length=10) }}", "s", "short");
        assert_eq!(out, "short");
    }

    #[test]
    fn strip_html_removes_tags() {
        let out = render_one(
            "{{ s | strip_html | safe }}",
            "s",
            r#"<p>Hello <b>world</b><img src="x.png"></p>"#,
        );
        assert_eq!(out, "Hello world");
    }

    #[test]
    fn has_template_reports_added_templates() {
        let mut engine = ThemeEngine::empty();
        assert!(!engine.has_template("shop/index.html"));
        engine.add_raw_template("shop/index.html", "ok").unwrap();
        assert!(engine.has_template("shop/index.html"));
    }
}
