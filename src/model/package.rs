use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// One entry of the repository contents listing.
///
/// Only `name` is interpreted; every other field the listing API returns is
/// kept in `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageSummary {
    pub name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PackageSummary {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// Site-relative link to this package's detail page.
    pub fn href(&self) -> String {
        format!("/mw/{}", self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistTags {
    pub latest: String,
}

/// A package document as served by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    #[serde(rename = "dist-tags")]
    pub dist_tags: DistTags,
    #[serde(default)]
    pub versions: HashMap<String, VersionBody>,
    #[serde(default)]
    pub readme: Option<String>,
}

impl PackageRecord {
    /// Returns the latest published version and its manifest.
    ///
    /// Fails when `dist-tags.latest` names a version the record does not
    /// contain.
    pub fn latest(&self) -> Result<(&str, &VersionBody)> {
        let version = self.dist_tags.latest.as_str();
        let body = self
            .versions
            .get(version)
            .ok_or_else(|| Error::MalformedRecord {
                name: self.name.clone(),
                reason: format!("dist-tags.latest {} is not a published version", version),
            })?;
        Ok((version, body))
    }
}

/// The manifest of a single published version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionBody {
    #[serde(default)]
    pub repository: Option<RepositoryField>,
}

/// `repository` as it appears in a manifest: either the full object or the
/// `"github:owner/repo"` shorthand string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RepositoryField {
    Detailed(Repository),
    Shorthand(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

/// Repository location shown on a package page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryLink {
    pub url: String,
    pub directory: Option<String>,
}

impl RepositoryLink {
    /// Derives the link from a version manifest. A manifest without a
    /// `repository` field is a malformed record.
    pub fn from_version(name: &str, body: &VersionBody) -> Result<Self> {
        match &body.repository {
            Some(RepositoryField::Detailed(repo)) => Ok(Self::from_parts(
                &repo.kind,
                &repo.url,
                repo.directory.clone(),
            )),
            Some(RepositoryField::Shorthand(url)) => Ok(Self::from_parts("", url, None)),
            None => Err(Error::MalformedRecord {
                name: name.to_string(),
                reason: "missing repository".to_string(),
            }),
        }
    }

    pub fn from_parts(kind: &str, url: &str, directory: Option<String>) -> Self {
        Self {
            url: browsable_url(kind, url),
            directory,
        }
    }
}

/// Strips the `"<kind>+"` VCS prefix and the `".git"` suffix from a
/// repository URL. Anything without them is returned unchanged.
pub fn browsable_url(kind: &str, url: &str) -> String {
    let without_prefix = if kind.is_empty() {
        url
    } else {
        url.strip_prefix(kind)
            .and_then(|rest| rest.strip_prefix('+'))
            .unwrap_or(url)
    };
    without_prefix
        .strip_suffix(".git")
        .unwrap_or(without_prefix)
        .to_string()
}
