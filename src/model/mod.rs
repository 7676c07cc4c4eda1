//! Core data types for registry payloads and page view models.
//!
//! - [`PackageSummary`] - One entry of the plugin directory listing
//! - [`PackageRecord`] - A package's registry document
//! - [`RepositoryLink`] - Browsable repository URL derived from a record
//! - [`SearchView`] / [`DetailView`] / [`MarkdownView`] - Page view models
//!
//! # Example
//!
//! ```
//! use mwsite::model::RepositoryLink;
//!
//! let link = RepositoryLink::from_parts("git", "git+https://github.com/org/repo.git", None);
//! assert_eq!(link.url, "https://github.com/org/repo");
//! ```

mod package;
mod view;

pub use package::*;
pub use view::*;
