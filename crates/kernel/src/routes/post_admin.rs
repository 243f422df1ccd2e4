//! Admin routes for blog posts: list, create, publish toggle and delete.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Extension, Form, Router};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{AppError, AppResult};
use crate::form::generate_csrf_token;
use crate::middleware::SiteContext;
use crate::models::{CreatePost, Post};
use crate::state::AppState;

use super::helpers::{page_context, render, require_admin, require_csrf};

/// New post form.
#[derive(Debug, Deserialize)]
struct PostForm {
    #[serde(rename = "_token", default)]
    token: String,
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    image_url: String,
    /// Checkbox; present only when ticked.
    #[serde(default)]
    published: Option<String>,
}

/// Form carrying only the CSRF token.
#[derive(Debug, Deserialize)]
struct CsrfOnlyForm {
    #[serde(rename = "_token", default)]
    token: String,
}

/// Post list with the add form.
///
/// GET /admin/posts
async fn list_posts(
    State(state): State<AppState>,
    Extension(site): Extension<SiteContext>,
    session: Session,
) -> AppResult<Response> {
    if let Err(rejection) = require_admin(&state, &session).await {
        return Ok(rejection);
    }

    let posts = Post::all(state.db()).await?;
    let csrf_token = generate_csrf_token(&session).await?;

    let mut context = page_context(&site, &session).await;
    context.insert("posts", &posts);
    context.insert("csrf_token", &csrf_token);

    Ok(render(&state, "admin/posts.html", &context))
}

/// Create a post.
///
/// POST /admin/posts
async fn create_post(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<PostForm>,
) -> AppResult<Response> {
    if let Err(rejection) = require_admin(&state, &session).await {
        return Ok(rejection);
    }
    if let Err(rejection) = require_csrf(&session, &form.token).await {
        return Ok(rejection);
    }

    let title = form.title.trim();
    if title.is_empty() {
        return Err(AppError::bad_request("title is required"));
    }
    if form.content.trim().is_empty() {
        return Err(AppError::bad_request("content is required"));
    }

    let post = Post::create(
        state.db(),
        CreatePost {
            title: title.to_string(),
            content: ammonia::clean(&form.content),
            image_url: form.image_url.trim().to_string(),
            published: form.published.is_some(),
        },
    )
    .await?;

    tracing::info!(post_id = post.id, slug = %post.slug, "post created");
    Ok(Redirect::to("/admin/posts").into_response())
}

/// Publish or unpublish a post.
///
/// POST /admin/posts/{id}/publish
async fn toggle_post_status(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
    Form(form): Form<CsrfOnlyForm>,
) -> AppResult<Response> {
    if let Err(rejection) = require_admin(&state, &session).await {
        return Ok(rejection);
    }
    if let Err(rejection) = require_csrf(&session, &form.token).await {
        return Ok(rejection);
    }

    let published = Post::toggle_published(state.db(), id)
        .await?
        .ok_or(AppError::NotFound)?;

    tracing::info!(post_id = id, published, "post status changed");
    Ok(Redirect::to("/admin/posts").into_response())
}

/// Delete a post.
///
/// POST /admin/posts/{id}/delete
async fn delete_post(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
    Form(form): Form<CsrfOnlyForm>,
) -> AppResult<Response> {
    if let Err(rejection) = require_admin(&state, &session).await {
        return Ok(rejection);
    }
    if let Err(rejection) = require_csrf(&session, &form.token).await {
        return Ok(rejection);
    }

    if !Post::delete(state.db(), id).await? {
        return Err(AppError::NotFound);
    }

    tracing::info!(post_id = id, "post deleted");
    Ok(Redirect::to("/admin/posts").into_response())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/posts", get(list_posts).post(create_post))
        .route("/admin/posts/{id}/publish", post(toggle_post_status))
        .route("/admin/posts/{id}/delete", post(delete_post))
}
