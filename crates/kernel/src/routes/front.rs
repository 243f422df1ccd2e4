//! Public pages: front page, single post and sitemap.

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Router};
use tower_sessions::Session;

use crate::error::{AppError, AppResult};
use crate::middleware::SiteContext;
use crate::models::Post;
use crate::state::AppState;

use super::helpers::{html_escape, page_context, render};

/// Posts shown on the front page.
const FRONT_PAGE_POSTS: i64 = 10;

/// GET /
async fn front_page(
    State(state): State<AppState>,
    Extension(site): Extension<SiteContext>,
    session: Session,
) -> AppResult<Response> {
    let posts = Post::latest_published(state.db(), FRONT_PAGE_POSTS).await?;

    let mut context = page_context(&site, &session).await;
    context.insert("posts", &posts);

    Ok(render(&state, "front/index.html", &context))
}

/// GET /blog/post/{slug}
async fn view_post(
    State(state): State<AppState>,
    Extension(site): Extension<SiteContext>,
    session: Session,
    Path(slug): Path<String>,
) -> AppResult<Response> {
    let post = Post::find_published_by_slug(state.db(), &slug)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut context = page_context(&site, &session).await;
    context.insert("post", &post);

    Ok(render(&state, "blog/post.html", &context))
}

/// GET /sitemap.xml
async fn sitemap(State(state): State<AppState>) -> AppResult<Response> {
    let posts = Post::all_published(state.db()).await?;

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n\
         <url><loc>/</loc></url>\n",
    );
    for post in &posts {
        let lastmod = chrono::DateTime::from_timestamp(post.updated_at, 0)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        xml.push_str(&format!(
            "<url><loc>/blog/post/{}</loc><lastmod>{lastmod}</lastmod></url>\n",
            html_escape(&post.slug)
        ));
    }
    xml.push_str("</urlset>\n");

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        xml,
    )
        .into_response())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(front_page))
        .route("/blog/post/{slug}", get(view_post))
        .route("/sitemap.xml", get(sitemap))
}
