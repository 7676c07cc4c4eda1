//! Page rendering.
//!
//! Handlers never build HTML themselves: they hand a [`Page`] to a
//! [`ViewRenderer`]. [`HtmlRenderer`] is the built-in implementation.

mod html;

pub use html::HtmlRenderer;

use crate::error::Result;
use crate::model::{DetailView, MarkdownView, SearchView};

/// A named template together with its view model.
#[derive(Debug, Clone, Copy)]
pub enum Page<'a> {
    Search(&'a SearchView),
    Detail(&'a DetailView),
    Markdown(&'a MarkdownView),
    NotFound,
}

impl Page<'_> {
    pub fn template_name(&self) -> &'static str {
        match self {
            Page::Search(_) => "pages/search",
            Page::Detail(_) => "pages/mw",
            Page::Markdown(_) => "pages/markdown",
            Page::NotFound => "pages/404",
        }
    }
}

pub trait ViewRenderer: Send + Sync {
    fn render(&self, page: Page<'_>) -> Result<String>;
}
