//! InkPress CMS Kernel Library
//!
//! Boot sequence, plugin lifecycle, site settings and the HTTP routes built
//! on them. The `inkpress` binary is a thin CLI over [`app::build`].

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod form;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod plugin;
pub mod plugins;
pub mod routes;
pub mod session;
pub mod state;
pub mod theme;
