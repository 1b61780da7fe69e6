//! Version queries and the "new enough" comparison.

use serde::Deserialize;

/// A dotted version string contained a non-numeric component.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid version component '{0}'")]
pub struct InvalidVersionFormat(String);

/// The daemon's version and feature set, from `rpm-ostree --version`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VersionData {
    /// The version number, e.g. `2022.10`.
    #[serde(rename = "Version")]
    pub version: String,
    /// Names of the compiled-in features.
    #[serde(rename = "Features", default)]
    pub features: Vec<String>,
}

/// The `--version` output document; the fields are nested under an
/// `rpm-ostree` root key.
#[derive(Debug, Deserialize)]
pub(crate) struct VersionQuery {
    #[serde(rename = "rpm-ostree")]
    pub(crate) root: VersionData,
}

/// Whether `actual` satisfies `required`, comparing dot-separated
/// non-negative integer components left to right.
///
/// Only components present in `actual` are checked: if `required` is
/// longer, the excess components are treated as satisfied. This
/// deliberately doesn't over-demand precision from the daemon's version
/// string; it is not a full semantic-version comparison.
pub fn version_at_least(required: &str, actual: &str) -> Result<bool, InvalidVersionFormat> {
    let verparts: Vec<&str> = actual.split('.').collect();
    for (i, req) in required.split('.').enumerate() {
        let Some(actual) = verparts.get(i) else {
            break;
        };
        let reqv = parse_component(req)?;
        let actualv = parse_component(actual)?;
        if actualv < reqv {
            return Ok(false);
        }
    }
    Ok(true)
}

fn parse_component(s: &str) -> Result<u64, InvalidVersionFormat> {
    s.parse().map_err(|_| InvalidVersionFormat(s.to_string()))
}
