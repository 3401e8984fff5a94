//! Tracking-store locations and `models:/` URIs.

use crate::error::{RegistryError, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const MODELS_SCHEME: &str = "models:/";

/// Where registered models are looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingUri {
    /// Local file store (the `mlruns` directory layout).
    File(PathBuf),
    /// MLflow tracking server base url, without trailing slash.
    Rest(String),
}

impl TrackingUri {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(RegistryError::InvalidTrackingUri(raw.to_string()));
        }
        match scheme_of(raw) {
            Some(s) if s.eq_ignore_ascii_case("http") || s.eq_ignore_ascii_case("https") => {
                let base = raw.trim_end_matches('/');
                if base.len() <= s.len() + "://".len() {
                    return Err(RegistryError::InvalidTrackingUri(raw.to_string()));
                }
                Ok(Self::Rest(base.to_string()))
            }
            Some(s) if s.eq_ignore_ascii_case("file") => Ok(Self::File(file_uri_path(raw))),
            Some(s) => Err(RegistryError::UnsupportedTrackingUri { scheme: s.to_ascii_lowercase() }),
            None if raw.eq_ignore_ascii_case("databricks") || raw.eq_ignore_ascii_case("databricks-uc") => {
                Err(RegistryError::UnsupportedTrackingUri { scheme: raw.to_ascii_lowercase() })
            }
            None => Ok(Self::File(PathBuf::from(raw))),
        }
    }
}

impl FromStr for TrackingUri {
    type Err = RegistryError;
    fn from_str(s: &str) -> Result<Self> { Self::parse(s) }
}

impl fmt::Display for TrackingUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "file:{}", path.display()),
            Self::Rest(base) => f.write_str(base),
        }
    }
}

/// Which registered version a [`ModelUri`] points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelector {
    Stage(String),
    Version(u64),
    Latest,
    Alias(String),
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stage(stage) => f.write_str(stage),
            Self::Version(v) => write!(f, "{v}"),
            Self::Latest => f.write_str("latest"),
            Self::Alias(alias) => write!(f, "@{alias}"),
        }
    }
}

/// `models:/<name>/<stage|version|latest>` or `models:/<name>@<alias>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelUri {
    pub name: String,
    pub selector: VersionSelector,
}

impl ModelUri {
    pub fn new(name: impl Into<String>, selector: VersionSelector) -> Self {
        Self { name: name.into(), selector }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &'static str| RegistryError::InvalidModelUri { uri: raw.to_string(), reason };
        let rest = raw
            .trim()
            .strip_prefix(MODELS_SCHEME)
            .ok_or_else(|| invalid("expected `models:/<name>/<stage|version>` or `models:/<name>@<alias>`"))?;

        if let Some((name, alias)) = rest.split_once('@') {
            if name.is_empty() || name.contains('/') {
                return Err(invalid("missing model name"));
            }
            if alias.is_empty() || alias.contains('/') {
                return Err(invalid("missing alias"));
            }
            return Ok(Self::new(name, VersionSelector::Alias(alias.to_string())));
        }

        let (name, sel) = rest.split_once('/').ok_or_else(|| invalid("missing stage or version"))?;
        if name.is_empty() {
            return Err(invalid("missing model name"));
        }
        if sel.is_empty() || sel.contains('/') {
            return Err(invalid("missing stage or version"));
        }
        let selector = if sel.eq_ignore_ascii_case("latest") {
            VersionSelector::Latest
        } else if sel.bytes().all(|b| b.is_ascii_digit()) {
            VersionSelector::Version(sel.parse().map_err(|_| invalid("version out of range"))?)
        } else {
            VersionSelector::Stage(sel.to_string())
        };
        Ok(Self::new(name, selector))
    }
}

impl FromStr for ModelUri {
    type Err = RegistryError;
    fn from_str(s: &str) -> Result<Self> { Self::parse(s) }
}

impl fmt::Display for ModelUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.selector {
            VersionSelector::Alias(alias) => write!(f, "{MODELS_SCHEME}{}@{alias}", self.name),
            other => write!(f, "{MODELS_SCHEME}{}/{other}", self.name),
        }
    }
}

/// Local path for an artifact location, or `None` when it needs a remote fetch.
pub fn local_artifact_path(location: &str) -> Option<PathBuf> {
    match scheme_of(location) {
        None => Some(PathBuf::from(location)),
        Some(s) if s.eq_ignore_ascii_case("file") => Some(file_uri_path(location)),
        Some(_) => None,
    }
}

/// Scheme of `raw`, ignoring single-letter windows drive prefixes.
pub(crate) fn scheme_of(raw: &str) -> Option<&str> {
    let (scheme, _) = raw.split_once(':')?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if scheme.len() < 2 || !first.is_ascii_alphabetic() {
        return None;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')).then_some(scheme)
}

fn file_uri_path(raw: &str) -> PathBuf {
    let rest = &raw["file:".len()..];
    let path = match rest.strip_prefix("//") {
        Some(after) => match after.find('/') {
            Some(idx) => &after[idx..],
            None => after,
        },
        None => rest,
    };
    // file:///C:/models -> C:/models
    let bytes = path.as_bytes();
    if bytes.len() >= 3 && bytes[0] == b'/' && bytes[1].is_ascii_alphabetic() && bytes[2] == b':' {
        return PathBuf::from(&path[1..]);
    }
    PathBuf::from(path)
}
