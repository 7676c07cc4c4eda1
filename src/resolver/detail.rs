use tracing::debug;

use super::is_denylisted;
use crate::context::SiteContext;
use crate::error::Result;
use crate::markdown::{self, Highlighter};
use crate::model::{DetailView, PackageRecord, RepositoryLink};

/// What the detail route should do for a requested name.
#[derive(Debug)]
pub enum Detail {
    Found(Box<DetailView>),
    /// The registry has no such package.
    NotFound,
    /// Not a middleware name; let the next handler try the path.
    NotApplicable,
}

/// Resolves one package into its page view model.
///
/// Denylisted names return [`Detail::NotApplicable`] without fetching.
#[tracing::instrument(skip(ctx))]
pub async fn package_detail(ctx: &SiteContext, name: &str) -> Result<Detail> {
    if is_denylisted(name) || !is_plain_name(name) {
        debug!("{} is not a middleware package", name);
        return Ok(Detail::NotApplicable);
    }

    let Some(record) = ctx.registry().package(name).await? else {
        return Ok(Detail::NotFound);
    };

    let view = build_detail_view(record, ctx.highlighter(), &ctx.config().site_name)?;
    Ok(Detail::Found(Box::new(view)))
}

/// True when `name` can be appended to the registry URL as one path
/// segment without changing which resource it points at.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.contains(['/', '\\', '?', '#', '%'])
}

/// Assembles the view model from a fetched record.
///
/// Fails with a malformed-record error when the latest version or its
/// repository is missing.
pub fn build_detail_view(
    record: PackageRecord,
    highlighter: &dyn Highlighter,
    site_name: &str,
) -> Result<DetailView> {
    let (version, body) = record.latest()?;
    let link = RepositoryLink::from_version(&record.name, body)?;
    let readme_html = markdown::render(record.readme.as_deref().unwrap_or(""), highlighter);

    Ok(DetailView {
        title: format!("{} | {}", record.name, site_name),
        version: version.to_string(),
        readme_html,
        repo_link: link.url,
        repo_directory: link.directory,
        head: r#"<link rel="stylesheet" href="/css/mw.css" />"#.to_string(),
        name: record.name,
    })
}
