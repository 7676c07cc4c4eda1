use serde::Serialize;

/// View model for the middleware search page.
#[derive(Debug, Clone, Serialize)]
pub struct SearchView {
    pub title: String,
    /// The query as typed, echoed back into the search box.
    pub query: Option<String>,
    /// Pre-rendered preview fragments, inserted as-is.
    pub pkg_templates: String,
    pub head: String,
}

/// View model for a single middleware package page.
#[derive(Debug, Clone, Serialize)]
pub struct DetailView {
    pub name: String,
    pub version: String,
    /// README rendered to HTML, inserted as-is.
    pub readme_html: String,
    pub repo_link: String,
    pub repo_directory: Option<String>,
    pub title: String,
    pub head: String,
}

/// View model for a page rendered from a markdown file under the static
/// directory.
#[derive(Debug, Clone, Serialize)]
pub struct MarkdownView {
    pub title: String,
    pub body_html: String,
}
