//! Registered model versions and selector matching.

use crate::uri::VersionSelector;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelVersion {
    pub name: String,
    pub version: u64,
    pub stage: Option<String>,
    /// Where the version's artifacts live (`storage_location`, falling back to `source`).
    pub location: Option<String>,
}

/// Picks the version a selector refers to. Stages compare case-insensitively and
/// resolve to the highest matching version. Aliases are store-specific and never
/// match here.
pub fn select<'a>(versions: &'a [ModelVersion], selector: &VersionSelector) -> Option<&'a ModelVersion> {
    match selector {
        VersionSelector::Stage(stage) => versions
            .iter()
            .filter(|v| v.stage.as_deref().is_some_and(|s| s.eq_ignore_ascii_case(stage)))
            .max_by_key(|v| v.version),
        VersionSelector::Version(n) => versions.iter().find(|v| v.version == *n),
        VersionSelector::Latest => versions.iter().max_by_key(|v| v.version),
        VersionSelector::Alias(_) => None,
    }
}
