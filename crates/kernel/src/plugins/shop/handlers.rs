//! Shop HTTP handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Form, Json};
use serde::Deserialize;
use tower_sessions::Session;

use super::product::{self, NewProduct, Product};
use super::{NAME, PER_PAGE, default_settings};
use crate::error::{AppError, AppResult};
use crate::form::generate_csrf_token;
use crate::middleware::SiteContext;
use crate::plugin::record;
use crate::routes::helpers::{page_context, render, require_admin, require_csrf, toast};
use crate::state::AppState;

/// Results returned by the JSON search endpoint.
const SEARCH_LIMIT: i64 = 50;

#[derive(Debug, Default, Deserialize)]
pub(super) struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ProductForm {
    #[serde(rename = "_token", default)]
    token: String,
    name: String,
    price: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    picture: String,
    #[serde(default)]
    more_pictures: String,
    #[serde(default)]
    category_id: Option<i64>,
}

async fn shop_context(
    state: &AppState,
    site: &SiteContext,
    session: &Session,
) -> AppResult<tera::Context> {
    let settings = record::load_settings(state.db(), NAME, &default_settings())
        .await?
        .unwrap_or_else(default_settings);

    let mut context = page_context(site, session).await;
    context.insert("shop", &settings);
    Ok(context)
}

async fn render_listing(
    state: &AppState,
    site: &SiteContext,
    session: &Session,
    requested_page: u32,
    search: &str,
) -> AppResult<Response> {
    let search = search.trim();
    let listing = product::page(state.db(), search, requested_page, PER_PAGE).await?;

    let mut context = shop_context(state, site, session).await?;
    context.insert("products", &listing.products);
    context.insert("pager", &listing.pager);
    context.insert("search_query", search);

    Ok(render(state, "shop/index.html", &context))
}

/// GET /shop
pub(super) async fn shop_index(
    State(state): State<AppState>,
    Extension(site): Extension<SiteContext>,
    session: Session,
    Query(query): Query<SearchQuery>,
) -> AppResult<Response> {
    render_listing(&state, &site, &session, 1, &query.q).await
}

/// GET /shop/{page}
///
/// A page that is not a number shows the first page.
pub(super) async fn shop_page(
    State(state): State<AppState>,
    Extension(site): Extension<SiteContext>,
    session: Session,
    Path(page): Path<String>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Response> {
    let requested = page.parse::<u32>().unwrap_or(1);
    render_listing(&state, &site, &session, requested, &query.q).await
}

/// GET /product/{id}
pub(super) async fn view_product(
    State(state): State<AppState>,
    Extension(site): Extension<SiteContext>,
    session: Session,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let id = id.parse::<i64>().map_err(|_| AppError::NotFound)?;
    let product = product::find_by_id(state.db(), id)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut context = shop_context(&state, &site, &session).await?;
    context.insert("product", &product);

    Ok(render(&state, "shop/product.html", &context))
}

/// GET /search-products-json?q=
pub(super) async fn search_json(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<Product>>> {
    let products = product::search(state.db(), query.q.trim(), SEARCH_LIMIT).await?;
    Ok(Json(products))
}

/// GET /shop/admin
pub(super) async fn shop_admin(
    State(state): State<AppState>,
    Extension(site): Extension<SiteContext>,
    session: Session,
) -> AppResult<Response> {
    if let Err(rejection) = require_admin(&state, &session).await {
        return Ok(rejection);
    }

    let products = product::search(state.db(), "", i64::MAX).await?;
    let csrf_token = generate_csrf_token(&session).await?;

    let mut context = shop_context(&state, &site, &session).await?;
    context.insert("products", &products);
    context.insert("csrf_token", &csrf_token);

    Ok(render(&state, "shop/admin.html", &context))
}

/// POST /shop/products
pub(super) async fn add_product(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ProductForm>,
) -> AppResult<Response> {
    if let Err(rejection) = require_admin(&state, &session).await {
        return Ok(rejection);
    }
    if let Err(rejection) = require_csrf(&session, &form.token).await {
        return Ok(rejection);
    }

    let name = strip_tags(&form.name);
    if name.trim().is_empty() {
        return Err(AppError::bad_request("name is required"));
    }
    let price = form
        .price
        .trim()
        .parse::<u32>()
        .map_err(|_| AppError::bad_request("price must be a whole number"))?;

    let created = product::create(
        state.db(),
        NewProduct {
            name,
            price: i64::from(price),
            description: ammonia::clean(&form.description),
            picture: form.picture.trim().to_string(),
            more_pictures: form.more_pictures.trim().to_string(),
            category_id: form.category_id,
        },
    )
    .await?;

    tracing::info!(product_id = created.id, "product created");
    let mut response = toast(StatusCode::CREATED, "Product created successfully");
    response
        .headers_mut()
        .insert(axum::http::header::LOCATION, location(created.id));
    Ok(response.into_response())
}

/// Remove all markup from `input`, keeping its text.
fn strip_tags(input: &str) -> String {
    ammonia::Builder::empty().clean(input).to_string()
}

fn location(id: i64) -> axum::http::HeaderValue {
    axum::http::HeaderValue::from_str(&format!("/product/{id}"))
        .unwrap_or_else(|_| axum::http::HeaderValue::from_static("/shop"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_tags_keeps_text() {
        assert_eq!(strip_tags("<b>Blue</b> Mug"), "Blue Mug");
        assert_eq!(strip_tags(r#"<a href="javascript:x()">Mug</a>"#), "Mug");
    }
}
