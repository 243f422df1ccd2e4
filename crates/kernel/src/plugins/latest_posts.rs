//! Latest posts plugin: an HTML fragment listing recent posts, meant to be
//! pulled into pages with htmx.

use async_trait::async_trait;
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;

use crate::error::AppResult;
use crate::models::Post;
use crate::plugin::{Plugin, PluginError, PluginHost, PluginSettings, record};
use crate::routes::helpers::render;
use crate::state::AppState;

pub const NAME: &str = "LatestPostsPlugin";

/// Posts shown when the `limit` setting is missing or not a number.
const DEFAULT_LIMIT: i64 = 5;

const LIST_TEMPLATE: &str = r#"<ul class="list-group latest-posts">
{% for post in posts %}  <li class="list-group-item"><a href="/blog/post/{{ post.slug }}">{{ post.title }}</a> <small class="text-muted">{{ post.created_at | format_date }}</small></li>
{% endfor %}{% if posts | length == 0 %}  <li class="list-group-item text-muted">No posts yet.</li>
{% endif %}</ul>
"#;

pub fn default_settings() -> PluginSettings {
    PluginSettings::from([("limit".to_string(), DEFAULT_LIMIT.to_string())])
}

/// Number of posts to list, from the `limit` setting.
fn post_limit(settings: &PluginSettings) -> i64 {
    settings
        .get("limit")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_LIMIT)
}

/// GET /latest_posts_plugin
async fn latest_posts(State(state): State<AppState>) -> AppResult<Response> {
    let settings = record::load_settings(state.db(), NAME, &default_settings())
        .await?
        .unwrap_or_else(default_settings);

    let posts = Post::latest_published(state.db(), post_limit(&settings)).await?;

    let mut context = tera::Context::new();
    context.insert("posts", &posts);
    Ok(render(&state, "latest_posts/list.html", &context))
}

#[derive(Debug, Default)]
pub struct LatestPostsPlugin;

#[async_trait]
impl Plugin for LatestPostsPlugin {
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
        host.theme_mut()
            .add_raw_template("latest_posts/list.html", LIST_TEMPLATE)
            .map_err(|e| PluginError::setup(NAME, format!("{e:#}")))?;

        host.route("/latest_posts_plugin", get(latest_posts))?;
        Ok(())
    }

    async fn teardown(&self) -> Result<(), PluginError> {
        Ok(())
    }
}
