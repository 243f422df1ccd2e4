//! Plugins compiled into the binary.

pub mod latest_posts;
pub mod shop;

use std::sync::Arc;

use crate::plugin::Plugin;

/// Every built-in plugin, in registration order.
pub fn builtin() -> Vec<Arc<dyn Plugin>> {
    vec![
        Arc::new(shop::ShopPlugin),
        Arc::new(latest_posts::LatestPostsPlugin),
    ]
}
