//! The deployment model reported by `rpm-ostree status --json`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::imgref::{self, OstreeImageReference};

/// Errors derived from a status snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum DeploymentError {
    /// No deployment in the snapshot is marked booted. A running system
    /// always has exactly one, so this indicates broken daemon state.
    #[error("no booted deployment found")]
    NoBootedDeployment,
    /// The deployment was not created from a container image. Callers
    /// that branch on deployment kind treat this as a normal condition.
    #[error("deployment {id} is not container-based")]
    NotContainerBased {
        /// The deployment's identifier.
        id: String,
    },
    /// The stored container image reference failed to parse.
    #[error(transparent)]
    InvalidImageReference(#[from] imgref::ParseError),
}

/// A bootable filesystem tree.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Deployment {
    /// Unique identifier within one status snapshot.
    pub id: String,
    /// The operating system name.
    #[serde(rename = "osname")]
    pub os_name: String,
    /// Disambiguates deployments of the same OS.
    pub serial: i32,
    /// Content hash of the deployed tree.
    pub checksum: String,
    /// Content hash of the underlying base tree; reported only when
    /// local package layering has been applied on top of it.
    pub base_checksum: Option<String>,
    /// Human-readable version string.
    pub version: String,
    /// Seconds since the epoch.
    pub timestamp: u64,
    /// Whether this is the currently booted tree.
    pub booted: bool,
    /// Whether this tree becomes active on the next boot.
    pub staged: bool,
    /// Checksum of a live-applied overlay, if any.
    pub live_replaced: Option<String>,
    /// Free-form provenance of the deployment.
    pub origin: String,
    /// Human-readable description of a custom origin.
    pub custom_origin: Vec<String>,
    /// The ostree container image reference this deployment was created
    /// from; empty for non-container deployments.
    pub container_image_reference: String,
    /// Packages layered on request.
    pub requested_packages: Vec<String>,
    /// Base packages requested for removal.
    pub requested_base_removals: Vec<String>,
    /// Commit metadata of the base tree. The daemon serializes a
    /// gvariant dictionary here, so values are not uniformly strings.
    pub base_commit_meta: BTreeMap<String, serde_json::Value>,
}

impl Deployment {
    /// The checksum of the underlying base tree: the pre-layering commit
    /// for a locally layered tree, otherwise the tree itself.
    pub fn base_checksum(&self) -> &str {
        self.base_checksum.as_deref().unwrap_or(&self.checksum)
    }

    /// Parse the container image reference this deployment was created
    /// from, failing with [`DeploymentError::NotContainerBased`] for
    /// ostree-native deployments.
    pub fn require_container_image(&self) -> Result<OstreeImageReference, DeploymentError> {
        if self.container_image_reference.is_empty() {
            return Err(DeploymentError::NotContainerBased {
                id: self.id.clone(),
            });
        }
        Ok(self.container_image_reference.as_str().try_into()?)
    }
}

/// Summary of the daemon's current worldview. The deployment list is
/// the primary data; it preserves the daemon-reported order, with the
/// primary entry first.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Status {
    /// The list of bootable filesystem trees.
    #[serde(rename = "deployments", alias = "Deployments", default)]
    pub deployments: Vec<Deployment>,
    /// The active transaction, if any.
    #[serde(rename = "transaction", alias = "Transaction", default)]
    pub transaction: Option<Vec<String>>,
}

impl Status {
    /// Finds the booted deployment. At most one entry should be marked
    /// booted; should the daemon ever report more, the first wins.
    pub fn booted_deployment(&self) -> Result<&Deployment, DeploymentError> {
        self.deployments
            .iter()
            .find(|d| d.booted)
            .ok_or(DeploymentError::NoBootedDeployment)
    }

    /// Finds the staged deployment. Absence is the normal "no pending
    /// update" state, not an error.
    pub fn staged_deployment(&self) -> Option<&Deployment> {
        self.deployments.iter().find(|d| d.staged)
    }
}
