//! HTTP middleware.

pub mod site_context;

pub use site_context::{SiteContext, inject_site_settings};
