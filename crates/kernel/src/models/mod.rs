//! Database models.

pub mod post;
pub mod site_settings;
pub mod user;

pub use post::{CreatePost, Post};
pub use site_settings::{SettingsUpdate, SiteSettings};
pub use user::{CreateUser, User};
