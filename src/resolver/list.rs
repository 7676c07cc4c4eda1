use tracing::debug;

use super::is_denylisted;
use crate::context::SiteContext;
use crate::error::Result;
use crate::markdown::escape_html;
use crate::model::{PackageSummary, SearchView};

/// Fetches the listing and applies [`filter_listing`].
pub async fn list_packages(ctx: &SiteContext, query: Option<&str>) -> Result<Vec<PackageSummary>> {
    let listing = ctx.registry().listing().await?;
    Ok(filter_listing(listing, query))
}

/// Without a query, drops denylisted entries. With a non-empty query,
/// keeps entries whose name contains the lowercased query, searching the
/// whole listing including denylisted names.
pub fn filter_listing(listing: Vec<PackageSummary>, query: Option<&str>) -> Vec<PackageSummary> {
    match query.filter(|q| !q.is_empty()) {
        None => listing
            .into_iter()
            .filter(|pkg| !is_denylisted(&pkg.name))
            .collect(),
        Some(query) => {
            let needle = query.to_lowercase();
            listing
                .into_iter()
                .filter(|pkg| pkg.name.contains(&needle))
                .collect()
        }
    }
}

pub fn preview_fragment(pkg: &PackageSummary) -> String {
    format!(
        r#"
<a class="mw_preview" href="{}">
  <div>
    <h3>{}</h3>
  </div>
</a>
"#,
        escape_html(&pkg.href()),
        escape_html(&pkg.name)
    )
}

/// Builds the search page view model.
#[tracing::instrument(skip(ctx))]
pub async fn search_view(ctx: &SiteContext, query: Option<&str>) -> Result<SearchView> {
    let packages = list_packages(ctx, query).await?;
    debug!("{} packages match", packages.len());

    let pkg_templates = packages
        .iter()
        .map(preview_fragment)
        .collect::<Vec<_>>()
        .join("<br />");

    Ok(SearchView {
        title: "Middleware".to_string(),
        query: query.map(str::to_string),
        pkg_templates,
        head: r#"<link rel="stylesheet" href="/css/search.css" />"#.to_string(),
    })
}
