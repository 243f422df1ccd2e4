//! Site-wide settings record.
//!
//! The `site_settings` table is treated as a singleton: the first row is
//! authoritative. Boot creates it with defaults when the table is empty, the
//! admin settings form updates it in place, and every request reads it fresh
//! to build the template projection.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::SqlitePool;

use crate::db;

/// Themes offered on the settings form.
pub const THEMES: &[&str] = &[
    "cerulean", "cosmo", "cyborg", "darkly", "flatly", "journal", "litera", "lumen", "lux",
    "materia", "minty", "pulse", "sandstone", "simplex", "sketchy", "slate", "solar", "spacelab",
    "superhero", "united", "yeti", "morph", "quartz", "vapor", "zephyr",
];

/// The site settings row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SiteSettings {
    pub id: i64,
    pub name: String,
    pub tagline: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub about: String,
    pub logo_url: String,
    pub favicon_url: String,
    pub facebook_url: String,
    pub twitter_url: String,
    pub linkedin_url: String,
    pub seo_keywords: String,
    pub seo_description: String,
    pub analytics_id: String,
    pub footer_text: String,
    pub maintenance: bool,
    pub theme: String,
    pub contact_email: String,
    pub privacy_policy: String,
    pub terms_of_service: String,
    pub language: String,
    pub locale: String,
    pub time_zone: String,
    pub selected_theme: String,
    pub container_class: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Fields an administrator may change. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SettingsUpdate {
    pub name: Option<String>,
    pub tagline: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub about: Option<String>,
    pub logo_url: Option<String>,
    pub favicon_url: Option<String>,
    pub facebook_url: Option<String>,
    pub twitter_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub seo_keywords: Option<String>,
    pub seo_description: Option<String>,
    pub analytics_id: Option<String>,
    pub footer_text: Option<String>,
    #[serde(deserialize_with = "deserialize_flag")]
    pub maintenance: Option<bool>,
    pub theme: Option<String>,
    pub contact_email: Option<String>,
    pub privacy_policy: Option<String>,
    pub terms_of_service: Option<String>,
    pub language: Option<String>,
    pub locale: Option<String>,
    pub time_zone: Option<String>,
    pub selected_theme: Option<String>,
    pub container_class: Option<String>,
}

/// Form values arrive as text; accept the usual spellings of "on".
fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map(|v| {
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "on" | "yes"
        )
    }))
}

const SELECT_COLUMNS: &str = "id, name, tagline, email, phone, address, about, logo_url, \
     favicon_url, facebook_url, twitter_url, linkedin_url, seo_keywords, seo_description, \
     analytics_id, footer_text, maintenance, theme, contact_email, privacy_policy, \
     terms_of_service, language, locale, time_zone, selected_theme, container_class, \
     created_at, updated_at";

impl Default for SiteSettings {
    /// Values written on first boot.
    fn default() -> Self {
        Self {
            id: 0,
            name: "InkPress".to_string(),
            tagline: "InkPress - a small CMS built with Rust".to_string(),
            email: "basic email".to_string(),
            phone: "basic phone".to_string(),
            address: "basic address".to_string(),
            about: "basic about".to_string(),
            logo_url: "/static/images/logo.png".to_string(),
            favicon_url: "/static/images/favicon.png".to_string(),
            facebook_url: "https://facebook.com".to_string(),
            twitter_url: "https://twitter.com".to_string(),
            linkedin_url: "https://linkedin.com".to_string(),
            seo_keywords: "basic seo keywords".to_string(),
            seo_description: "basic seo description".to_string(),
            analytics_id: "basic analytics id".to_string(),
            footer_text: "basic footer text".to_string(),
            maintenance: false,
            theme: "vapor".to_string(),
            contact_email: "basic contact email".to_string(),
            privacy_policy: "basic privacy policy".to_string(),
            terms_of_service: "basic terms of service".to_string(),
            language: "en".to_string(),
            locale: "en-US".to_string(),
            time_zone: "UTC".to_string(),
            selected_theme: "vapor".to_string(),
            container_class: "container".to_string(),
            created_at: 0,
            updated_at: 0,
        }
    }
}

impl SiteSettings {
    /// Load the authoritative (first) settings row, if any.
    pub async fn load(pool: &SqlitePool) -> Result<Option<Self>> {
        let query = format!("SELECT {SELECT_COLUMNS} FROM site_settings ORDER BY id LIMIT 1");
        let row = sqlx::query_as::<_, SiteSettings>(&query)
            .fetch_optional(pool)
            .await
            .context("failed to load site settings")?;

        Ok(row)
    }

    /// Load the settings row, falling back to defaults when the table is
    /// empty or unreadable. Used on the request path, where a missing row
    /// must not take pages down.
    pub async fn load_or_default(pool: &SqlitePool) -> Self {
        match Self::load(pool).await {
            Ok(Some(settings)) => settings,
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!(error = %e, "falling back to default site settings");
                Self::default()
            }
        }
    }

    /// Insert the default row unless one already exists.
    ///
    /// Returns `true` if a row was created. The check is a plain count, so
    /// two processes racing on an empty table can both insert; [`Self::load`]
    /// only ever reads the first row.
    pub async fn create_default(pool: &SqlitePool) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM site_settings")
            .fetch_one(pool)
            .await
            .context("failed to count site settings")?;

        if count > 0 {
            return Ok(false);
        }

        let now = db::now();
        let defaults = Self {
            created_at: now,
            updated_at: now,
            ..Self::default()
        };
        defaults.insert(pool).await?;

        tracing::info!("created default site settings");
        Ok(true)
    }

    /// Apply the supplied fields to the stored row and save it back.
    ///
    /// Last writer wins; there is no concurrency token.
    pub async fn update(pool: &SqlitePool, fields: &SettingsUpdate) -> Result<Self> {
        let mut settings = Self::load(pool)
            .await?
            .context("site settings row does not exist")?;

        settings.apply(fields);
        settings.updated_at = db::now();
        settings.save(pool).await?;

        Ok(settings)
    }

    /// Overwrite every field present in `fields`.
    pub fn apply(&mut self, fields: &SettingsUpdate) {
        fn set(target: &mut String, value: &Option<String>) {
            if let Some(v) = value {
                target.clone_from(v);
            }
        }

        set(&mut self.name, &fields.name);
        set(&mut self.tagline, &fields.tagline);
        set(&mut self.email, &fields.email);
        set(&mut self.phone, &fields.phone);
        set(&mut self.address, &fields.address);
        set(&mut self.about, &fields.about);
        set(&mut self.logo_url, &fields.logo_url);
        set(&mut self.favicon_url, &fields.favicon_url);
        set(&mut self.facebook_url, &fields.facebook_url);
        set(&mut self.twitter_url, &fields.twitter_url);
        set(&mut self.linkedin_url, &fields.linkedin_url);
        set(&mut self.seo_keywords, &fields.seo_keywords);
        set(&mut self.seo_description, &fields.seo_description);
        set(&mut self.analytics_id, &fields.analytics_id);
        set(&mut self.footer_text, &fields.footer_text);
        if let Some(maintenance) = fields.maintenance {
            self.maintenance = maintenance;
        }
        set(&mut self.theme, &fields.theme);
        set(&mut self.contact_email, &fields.contact_email);
        set(&mut self.privacy_policy, &fields.privacy_policy);
        set(&mut self.terms_of_service, &fields.terms_of_service);
        set(&mut self.language, &fields.language);
        set(&mut self.locale, &fields.locale);
        set(&mut self.time_zone, &fields.time_zone);
        set(&mut self.selected_theme, &fields.selected_theme);
        set(&mut self.container_class, &fields.container_class);
    }

    /// Read-only key/value view handed to templates.
    ///
    /// Templates reference these keys directly, so every field must appear
    /// here; a missing key renders as an empty string downstream.
    pub fn to_template_map(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("Name", self.name.clone()),
            ("Tagline", self.tagline.clone()),
            ("Email", self.email.clone()),
            ("Phone", self.phone.clone()),
            ("Address", self.address.clone()),
            ("About", self.about.clone()),
            ("LogoURL", self.logo_url.clone()),
            ("FaviconURL", self.favicon_url.clone()),
            ("FacebookURL", self.facebook_url.clone()),
            ("TwitterURL", self.twitter_url.clone()),
            ("LinkedInURL", self.linkedin_url.clone()),
            ("SEOKeywords", self.seo_keywords.clone()),
            ("SEODescription", self.seo_description.clone()),
            ("AnalyticsID", self.analytics_id.clone()),
            ("FooterText", self.footer_text.clone()),
            ("Maintenance", self.maintenance.to_string()),
            ("Theme", self.theme.clone()),
            ("ContactEmail", self.contact_email.clone()),
            ("PrivacyPolicy", self.privacy_policy.clone()),
            ("TermsOfService", self.terms_of_service.clone()),
            ("Language", self.language.clone()),
            ("Locale", self.locale.clone()),
            ("TimeZone", self.time_zone.clone()),
            ("SelectedTheme", self.selected_theme.clone()),
            ("ContainerClass", self.container_class.clone()),
        ])
    }

    async fn insert(&self, pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO site_settings (
                name, tagline, email, phone, address, about, logo_url, favicon_url,
                facebook_url, twitter_url, linkedin_url, seo_keywords, seo_description,
                analytics_id, footer_text, maintenance, theme, contact_email, privacy_policy,
                terms_of_service, language, locale, time_zone, selected_theme, container_class,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.name)
        .bind(&self.tagline)
        .bind(&self.email)
        .bind(&self.phone)
        .bind(&self.address)
        .bind(&self.about)
        .bind(&self.logo_url)
        .bind(&self.favicon_url)
        .bind(&self.facebook_url)
        .bind(&self.twitter_url)
        .bind(&self.linkedin_url)
        .bind(&self.seo_keywords)
        .bind(&self.seo_description)
        .bind(&self.analytics_id)
        .bind(&self.footer_text)
        .bind(self.maintenance)
        .bind(&self.theme)
        .bind(&self.contact_email)
        .bind(&self.privacy_policy)
        .bind(&self.terms_of_service)
        .bind(&self.language)
        .bind(&self.locale)
        .bind(&self.time_zone)
        .bind(&self.selected_theme)
        .bind(&self.container_class)
        .bind(self.created_at)
        .bind(self.updated_at)
        .execute(pool)
        .await
        .context("failed to insert site settings")?;

        Ok(())
    }

    async fn save(&self, pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE site_settings SET
                name = ?, tagline = ?, email = ?, phone = ?, address = ?, about = ?,
                logo_url = ?, favicon_url = ?, facebook_url = ?, twitter_url = ?,
                linkedin_url = ?, seo_keywords = ?, seo_description = ?, analytics_id = ?,
                footer_text = ?, maintenance = ?, theme = ?, contact_email = ?,
                privacy_policy = ?, terms_of_service = ?, language = ?, locale = ?,
                time_zone = ?, selected_theme = ?, container_class = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&self.name)
        .bind(&self.tagline)
        .bind(&self.email)
        .bind(&self.phone)
        .bind(&self.address)
        .bind(&self.about)
        .bind(&self.logo_url)
        .bind(&self.favicon_url)
        .bind(&self.facebook_url)
        .bind(&self.twitter_url)
        .bind(&self.linkedin_url)
        .bind(&self.seo_keywords)
        .bind(&self.seo_description)
        .bind(&self.analytics_id)
        .bind(&self.footer_text)
        .bind(self.maintenance)
        .bind(&self.theme)
        .bind(&self.contact_email)
        .bind(&self.privacy_policy)
        .bind(&self.terms_of_service)
        .bind(&self.language)
        .bind(&self.locale)
        .bind(&self.time_zone)
        .bind(&self.selected_theme)
        .bind(&self.container_class)
        .bind(self.updated_at)
        .bind(self.id)
        .execute(pool)
        .await
        .context("failed to save site settings")?;

        Ok(())
    }
}
