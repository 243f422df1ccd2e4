//! Shop plugin: a small product catalogue with search.

mod handlers;
pub mod product;

use async_trait::async_trait;
use axum::routing::{get, post};

use crate::plugin::{Plugin, PluginError, PluginHost, PluginSettings};

/// Plugin name, the key of its record.
pub const NAME: &str = "ShopPlugin";

/// Products per listing page.
pub const PER_PAGE: u32 = 10;

const TEMPLATES: &[(&str, &str)] = &[
    ("shop/index.html", include_str!("templates/index.html")),
    ("shop/product.html", include_str!("templates/product.html")),
    ("shop/admin.html", include_str!("templates/admin.html")),
];

/// Default shop settings.
pub fn default_settings() -> PluginSettings {
    PluginSettings::from([
        ("shop_name".to_string(), "Shop Name".to_string()),
        ("shop_description".to_string(), "Shop Description".to_string()),
        ("shop_address".to_string(), "Shop Address".to_string()),
        ("shop_phone".to_string(), "Shop Phone".to_string()),
        ("shop_email".to_string(), "Shop Email".to_string()),
    ])
}

#[derive(Debug, Default)]
pub struct ShopPlugin;

#[async_trait]
impl Plugin for ShopPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn author(&self) -> &str {
        "Ashba22"
    }

    fn version(&self) -> &str {
        "1.0"
    }

    fn default_settings(&self) -> PluginSettings {
        default_settings()
    }

    async fn setup(&self, host: &mut PluginHost<'_>) -> Result<(), PluginError> {
        product::migrate(host.db())
            .await
            .map_err(|e| PluginError::setup(NAME, format!("{e:#}")))?;

        for (name, source) in TEMPLATES {
            host.theme_mut()
                .add_raw_template(name, source)
                .map_err(|e| PluginError::setup(NAME, format!("{e:#}")))?;
        }

        host.route("/shop", get(handlers::shop_index))?
            .route("/shop/{page}", get(handlers::shop_page))?
            .route("/shop/admin", get(handlers::shop_admin))?
            .route("/shop/products", post(handlers::add_product))?
            .route("/product/{id}", get(handlers::view_product))?
            .route("/search-products-json", get(handlers::search_json))?;

        Ok(())
    }

    async fn teardown(&self) -> Result<(), PluginError> {
        tracing::debug!(plugin = NAME, "shop stopped");
        Ok(())
    }
}
