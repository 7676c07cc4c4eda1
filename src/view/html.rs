//! Built-in HTML page templates.
//!
//! Pages share one layout: the site stylesheet, an optional page-specific
//! `<head>` fragment, a navigation bar and the page body.

use super::{Page, ViewRenderer};
use crate::error::Result;
use crate::markdown::escape_html;
use crate::model::{DetailView, MarkdownView, SearchView};

/// Renders pages with `format!` templates.
pub struct HtmlRenderer {
    site_name: String,
}

impl HtmlRenderer {
    pub fn new(site_name: impl Into<String>) -> Self {
        Self {
            site_name: site_name.into(),
        }
    }

    fn layout(&self, title: &str, head: &str, body: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link rel="stylesheet" href="/css/main.css" />
    {head}
</head>
<body>
    <nav>
        <a class="logo" href="/">{site}</a>
        <a href="/docs">Docs</a>
        <a href="/mw">Middleware</a>
    </nav>
    <main>
{body}
    </main>
</body>
</html>
"#,
            title = escape_html(title),
            head = head,
            site = escape_html(&self.site_name),
            body = body,
        )
    }

    fn search(&self, view: &SearchView) -> String {
        let query = view.query.as_deref().unwrap_or("");
        let results = if view.pkg_templates.is_empty() {
            r#"<p class="empty">No middleware found</p>"#.to_string()
        } else {
            view.pkg_templates.clone()
        };

        let body = format!(
            r#"        <h1>Middleware</h1>
        <form class="search" action="/mw" method="get">
            <input type="search" name="q" placeholder="Search middleware..." value="{}" />
        </form>
        <section class="mw_list">
{}
        </section>
"#,
            escape_html(query),
            results
        );
        self.layout(&view.title, &view.head, &body)
    }

    fn detail(&self, view: &DetailView) -> String {
        let directory = match &view.repo_directory {
            Some(dir) => format!(
                r#"
            <span class="mw_dir">Directory: <code>{}</code></span>"#,
                escape_html(dir)
            ),
            None => String::new(),
        };

        let body = format!(
            r#"        <header class="mw_header">
            <h1>{name}</h1>
            <span class="mw_version">v{version}</span>
            <a class="mw_repo" href="{link}">{link}</a>{directory}
        </header>
        <article class="readme">
{readme}
        </article>
"#,
            name = escape_html(&view.name),
            version = escape_html(&view.version),
            link = escape_html(&view.repo_link),
            directory = directory,
            readme = view.readme_html,
        );
        self.layout(&view.title, &view.head, &body)
    }

    fn markdown(&self, view: &MarkdownView) -> String {
        let body = format!(
            r#"        <article class="markdown">
{}
        </article>
"#,
            view.body_html
        );
        self.layout(&view.title, "", &body)
    }

    fn not_found(&self) -> String {
        let body = r#"        <h1>404</h1>
        <p>This page does not exist. <a href="/">Go home</a>.</p>
"#;
        self.layout(&format!("Not Found | {}", self.site_name), "", body)
    }
}

impl ViewRenderer for HtmlRenderer {
    fn render(&self, page: Page<'_>) -> Result<String> {
        Ok(match page {
            Page::Search(view) => self.search(view),
            Page::Detail(view) => self.detail(view),
            Page::Markdown(view) => self.markdown(view),
            Page::NotFound => self.not_found(),
        })
    }
}
