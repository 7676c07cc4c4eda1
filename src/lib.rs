pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod markdown;
pub mod model;
pub mod registry;
pub mod resolver;
pub mod server;
pub mod view;

pub use cache::Cache;
pub use config::{Config, Mode};
pub use context::SiteContext;
pub use error::{Error, Result};
pub use model::{DetailView, PackageRecord, PackageSummary, RepositoryLink, SearchView};
pub use registry::{Fetch, FetchResponse, HttpFetcher, RegistryClient};
