//! Package list and package detail resolution.
//!
//! Both resolvers take the shared [`SiteContext`](crate::SiteContext),
//! perform at most one upstream fetch and return a view model (or an
//! outcome telling the route what to do instead).

pub mod detail;
pub mod list;

pub use detail::{package_detail, Detail};
pub use list::{list_packages, search_view};

/// Packages that are framework infrastructure rather than middleware.
pub const DENYLIST: [&str; 15] = [
    "app",
    "etag",
    "cookie",
    "cookie-signature",
    "dotenv",
    "send",
    "router",
    "req",
    "res",
    "type-is",
    "content-disposition",
    "forwarded",
    "proxy-addr",
    "accepts",
    "cli",
];

pub fn is_denylisted(name: &str) -> bool {
    DENYLIST.contains(&name)
}
