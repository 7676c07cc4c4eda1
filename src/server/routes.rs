use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;
use std::sync::Arc;

use super::pages;
use crate::context::SiteContext;
use crate::error::Result;
use crate::resolver::{package_detail, search_view, Detail};
use crate::view::Page;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
}

/// `GET /mw`
pub async fn search(
    State(ctx): State<Arc<SiteContext>>,
    Query(params): Query<SearchParams>,
) -> Result<Html<String>> {
    let view = search_view(&ctx, params.q.as_deref()).await?;
    Ok(Html(ctx.renderer().render(Page::Search(&view))?))
}

/// `GET /mw/:name`
pub async fn package(
    State(ctx): State<Arc<SiteContext>>,
    Path(name): Path<String>,
    request: Request,
) -> Result<Response> {
    match package_detail(&ctx, &name).await? {
        Detail::Found(view) => {
            let html = ctx.renderer().render(Page::Detail(&view))?;
            Ok(Html(html).into_response())
        }
        Detail::NotFound => Ok(StatusCode::NOT_FOUND.into_response()),
        Detail::NotApplicable => Ok(pages::fall_through(State(ctx), request).await),
    }
}
