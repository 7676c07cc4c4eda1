//! Everything that is not a middleware route: static assets, markdown
//! pages and the not-found page.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{ACCEPT, CACHE_CONTROL};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::debug;

use crate::context::SiteContext;
use crate::error::Result;
use crate::markdown::{self, RenderOptions};
use crate::model::MarkdownView;
use crate::view::Page;

const IMMUTABLE: &str = "public, max-age=31536000, immutable";
const NO_CACHE: &str = "no-cache";

/// Tries a static asset, then a markdown page, then answers 404.
pub async fn fall_through(State(ctx): State<Arc<SiteContext>>, request: Request) -> Response {
    let wants_html = accepts_html(request.headers());
    let path = request.uri().path().to_string();

    if request.method() == Method::GET || request.method() == Method::HEAD {
        let asset = serve_asset(&ctx, request).await;
        let status = asset.status();
        // A directory redirect yields to `<path>.md` when one exists.
        let redirect = status.is_redirection() && status != StatusCode::NOT_MODIFIED;
        if status != StatusCode::NOT_FOUND && !redirect {
            return asset;
        }

        match markdown_page(&ctx, &path).await {
            Ok(Some(page)) => return page,
            Ok(None) if redirect => return asset,
            Ok(None) => {}
            Err(e) => return e.into_response(),
        }
    }

    not_found(&ctx, wants_html).await
}

async fn serve_asset(ctx: &SiteContext, request: Request) -> Response {
    let response = match ServeDir::new(&ctx.config().static_dir).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    let mut response = response.map(Body::new);
    if response.status().is_success() || response.status() == StatusCode::NOT_MODIFIED {
        let policy = if ctx.config().mode.is_production() {
            IMMUTABLE
        } else {
            NO_CACHE
        };
        response
            .headers_mut()
            .insert(CACHE_CONTROL, HeaderValue::from_static(policy));
    }
    response
}

/// Maps a request path onto `<static_dir>/<path>.md`, or `index.md` for
/// directory paths. Paths with `.` or `..` segments map to nothing.
fn markdown_file(static_dir: &Path, request_path: &str) -> Option<PathBuf> {
    let segments: Vec<&str> = request_path.split('/').filter(|s| !s.is_empty()).collect();
    if segments
        .iter()
        .any(|s| *s == "." || *s == ".." || s.contains('\\'))
    {
        return None;
    }

    let mut file = static_dir.to_path_buf();
    if segments.is_empty() || request_path.ends_with('/') {
        file.extend(&segments);
        file.push("index.md");
    } else {
        let (last, parents) = segments.split_last()?;
        file.extend(parents);
        file.push(format!("{}.md", last));
    }
    Some(file)
}

async fn markdown_page(ctx: &SiteContext, request_path: &str) -> Result<Option<Response>> {
    let Some(file) = markdown_file(&ctx.config().static_dir, request_path) else {
        return Ok(None);
    };

    let source = match tokio::fs::read_to_string(&file).await {
        Ok(source) => source,
        Err(e)
            if matches!(
                e.kind(),
                ErrorKind::NotFound | ErrorKind::NotADirectory | ErrorKind::IsADirectory
            ) =>
        {
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    debug!("Rendering {}", file.display());

    let site_name = &ctx.config().site_name;
    let title = source
        .lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(|heading| format!("{} | {}", heading.trim(), site_name))
        .unwrap_or_else(|| site_name.clone());

    let view = MarkdownView {
        title,
        body_html: markdown::render_with(
            &source,
            ctx.highlighter(),
            RenderOptions { heading_ids: true },
        ),
    };
    let html = ctx.renderer().render(Page::Markdown(&view))?;

    Ok(Some(
        ([(CACHE_CONTROL, HeaderValue::from_static(IMMUTABLE))], Html(html)).into_response(),
    ))
}

async fn not_found(ctx: &SiteContext, wants_html: bool) -> Response {
    if !wants_html {
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    }

    let custom = ctx.config().static_dir.join("404.html");
    let html = match tokio::fs::read_to_string(&custom).await {
        Ok(html) => html,
        Err(_) => match ctx.renderer().render(Page::NotFound) {
            Ok(html) => html,
            Err(e) => return e.into_response(),
        },
    };
    (StatusCode::NOT_FOUND, Html(html)).into_response()
}

/// True when the `Accept` header lists `text/html`.
fn accepts_html(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|media| media.split(';').next().map(str::trim) == Some("text/html"))
}
