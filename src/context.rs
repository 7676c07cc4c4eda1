//! Process-wide collaborators shared by every request.

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::markdown::{Highlighter, SyntectHighlighter};
use crate::registry::{HttpFetcher, RegistryClient};
use crate::view::{HtmlRenderer, ViewRenderer};

/// Everything a resolver or route needs: config, upstream client,
/// highlighter and view renderer.
///
/// Built once at startup and shared behind an `Arc`; nothing in it is
/// mutated after construction except the response cache inside the client.
pub struct SiteContext {
    config: Config,
    registry: RegistryClient,
    highlighter: Arc<dyn Highlighter>,
    renderer: Arc<dyn ViewRenderer>,
}

impl SiteContext {
    pub fn new(
        config: Config,
        registry: RegistryClient,
        highlighter: Arc<dyn Highlighter>,
        renderer: Arc<dyn ViewRenderer>,
    ) -> Self {
        Self {
            config,
            registry,
            highlighter,
            renderer,
        }
    }

    /// Wires the production collaborators: cached HTTP fetcher, syntect
    /// highlighter and the built-in HTML templates.
    pub fn from_config(config: Config) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::from_config(&config)?);
        let registry = RegistryClient::new(
            fetcher,
            config.listing_url.clone(),
            config.registry_url.clone(),
        );
        let renderer = Arc::new(HtmlRenderer::new(config.site_name.clone()));

        Ok(Self::new(
            config,
            registry,
            Arc::new(SyntectHighlighter::new()),
            renderer,
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &RegistryClient {
        &self.registry
    }

    pub fn highlighter(&self) -> &dyn Highlighter {
        self.highlighter.as_ref()
    }

    pub fn renderer(&self) -> &dyn ViewRenderer {
        self.renderer.as_ref()
    }
}
