//! # Parsing for ostree container image references
//!
//! ostree-based systems combine a standard container image reference
//! with a signature verification policy into a single URL-like string,
//! stored e.g. in a deployment's origin. The scheme token names the
//! verification mechanism:
//!
//! - `ostree-remote-registry:<remotename>:<image>` - Verify via ostree remote
//! - `ostree-image-signed:<transport>:<image>` - Use container policy
//! - `ostree-unverified-registry:<image>` - No verification (not recommended)
//!
//! Example: `ostree-remote-registry:fedora:quay.io/fedora/fedora-coreos:stable`
//!
//! The `*-registry` forms are shorthands whose tail is a bare registry
//! image; the `*-image` forms carry an explicit transport, and a
//! `docker://` transport is equivalent to `registry:`. Parsing is exposed
//! via [`OstreeImageReference`], which decomposes into a
//! [`SignatureSource`] and a transport-qualified [`ImageReference`].

use std::fmt;
use std::str::FromStr;

/// An error from parsing an image reference string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The leading scheme or transport token is not a known one.
    #[error("unknown transport prefix '{0}'")]
    UnknownTransportPrefix(String),
    /// The reference matched a known prefix but is structurally invalid.
    #[error("malformed reference '{reference}': {reason}")]
    MalformedReference {
        /// The full input string.
        reference: String,
        /// The structural problem with it.
        reason: &'static str,
    },
}

impl ParseError {
    fn malformed(reference: &str, reason: &'static str) -> Self {
        Self::MalformedReference {
            reference: reference.to_string(),
            reason,
        }
    }
}

/// A backend/transport for OCI/Docker images.
#[derive(Copy, Clone, Hash, Debug, PartialEq, Eq)]
pub enum Transport {
    /// A remote Docker/OCI registry (`registry:` or `docker://`)
    Registry,
    /// A local OCI directory (`oci:`)
    OciDir,
    /// A local OCI archive tarball (`oci-archive:`)
    OciArchive,
    /// A local Docker archive tarball (`docker-archive:`)
    DockerArchive,
    /// Local container storage (`containers-storage:`)
    ContainerStorage,
    /// Local directory (`dir:`)
    Dir,
    /// Local Docker daemon (`docker-daemon:`)
    DockerDaemon,
}

impl Transport {
    const OCI_STR: &'static str = "oci";
    const OCI_ARCHIVE_STR: &'static str = "oci-archive";
    const DOCKER_ARCHIVE_STR: &'static str = "docker-archive";
    const CONTAINERS_STORAGE_STR: &'static str = "containers-storage";
    const LOCAL_DIRECTORY_STR: &'static str = "dir";
    const REGISTRY_STR: &'static str = "registry";
    const DOCKER_DAEMON_STR: &'static str = "docker-daemon";
}

impl TryFrom<&str> for Transport {
    type Error = ParseError;

    fn try_from(value: &str) -> Result<Self, ParseError> {
        Ok(match value {
            Self::REGISTRY_STR | "docker" => Self::Registry,
            Self::OCI_STR => Self::OciDir,
            Self::OCI_ARCHIVE_STR => Self::OciArchive,
            Self::DOCKER_ARCHIVE_STR => Self::DockerArchive,
            Self::CONTAINERS_STORAGE_STR => Self::ContainerStorage,
            Self::LOCAL_DIRECTORY_STR => Self::Dir,
            Self::DOCKER_DAEMON_STR => Self::DockerDaemon,
            o => return Err(ParseError::UnknownTransportPrefix(o.to_string())),
        })
    }
}

/// Combination of a transport and a transport-specific image identifier.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct ImageReference {
    /// The storage and transport for the image.
    pub transport: Transport,
    /// The image identifier (e.g. `quay.io/somerepo/someimage:latest`),
    /// stored verbatim after the transport prefix.
    pub image: String,
}

impl TryFrom<&str> for ImageReference {
    type Error = ParseError;

    fn try_from(value: &str) -> Result<Self, ParseError> {
        let (transport_name, mut image) = value
            .split_once(':')
            .ok_or_else(|| ParseError::malformed(value, "missing ':'"))?;
        let transport = Transport::try_from(transport_name)?;
        if transport_name == "docker" {
            image = image
                .strip_prefix("//")
                .ok_or_else(|| ParseError::malformed(value, "missing '//' after 'docker:'"))?;
        }
        if image.is_empty() {
            return Err(ParseError::malformed(value, "empty image name"));
        }
        Ok(Self {
            transport,
            image: image.to_string(),
        })
    }
}

impl FromStr for ImageReference {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, ParseError> {
        Self::try_from(s)
    }
}

/// Policy for signature verification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SignatureSource {
    /// Fetches use the named ostree remote for signature verification
    /// of the ostree commit.
    OstreeRemote(String),
    /// Fetches defer to the `containers-policy.json`, which is expected
    /// to require a signature.
    ContainerPolicy,
    /// NOT RECOMMENDED.  No cryptographic signature is required.
    ContainerPolicyAllowInsecure,
}

impl SignatureSource {
    /// Whether this policy requires no image-level signature. Note this
    /// is true for [`Self::OstreeRemote`] as well: there the trust root
    /// is the remote's key configuration, not an image signature.
    pub fn allow_insecure(&self) -> bool {
        !matches!(self, Self::ContainerPolicy)
    }

    /// The name of the ostree remote supplying signing keys, if this is
    /// remote-backed verification.
    pub fn ostree_remote(&self) -> Option<&str> {
        match self {
            Self::OstreeRemote(remote) => Some(remote),
            _ => None,
        }
    }
}

/// The scheme token starting an ostree image reference. Each token fixes
/// the verification policy and whether the tail carries its own
/// transport or is a bare registry image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scheme {
    UnverifiedImage,
    UnverifiedRegistry,
    ImageSigned,
    RemoteImage,
    RemoteRegistry,
}

impl Scheme {
    fn parse(token: &str) -> Option<Self> {
        Some(match token {
            "ostree-unverified-image" => Self::UnverifiedImage,
            "ostree-unverified-registry" => Self::UnverifiedRegistry,
            "ostree-image-signed" => Self::ImageSigned,
            "ostree-remote-image" => Self::RemoteImage,
            "ostree-remote-registry" => Self::RemoteRegistry,
            _ => return None,
        })
    }

    /// The shorthand forms whose tail is a bare registry image.
    fn forces_registry(self) -> bool {
        matches!(self, Self::UnverifiedRegistry | Self::RemoteRegistry)
    }

    /// The forms carrying a second colon-delimited `<remote>` segment.
    fn takes_remote(self) -> bool {
        matches!(self, Self::RemoteImage | Self::RemoteRegistry)
    }
}

/// Combination of a signature verification mechanism, and a standard
/// container image reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OstreeImageReference {
    /// The signature verification mechanism.
    pub sigverify: SignatureSource,
    /// The container image reference.
    pub imgref: ImageReference,
}

impl TryFrom<&str> for OstreeImageReference {
    type Error = ParseError;

    fn try_from(value: &str) -> Result<Self, ParseError> {
        let (token, rest) = value
            .split_once(':')
            .ok_or_else(|| ParseError::malformed(value, "missing ':'"))?;
        let scheme = Scheme::parse(token)
            .ok_or_else(|| ParseError::UnknownTransportPrefix(token.to_string()))?;
        let (sigverify, tail) = if scheme.takes_remote() {
            let (remote, tail) = rest
                .split_once(':')
                .ok_or_else(|| ParseError::malformed(value, "missing second ':'"))?;
            (SignatureSource::OstreeRemote(remote.to_string()), tail)
        } else {
            let sigverify = match scheme {
                Scheme::ImageSigned => SignatureSource::ContainerPolicy,
                _ => SignatureSource::ContainerPolicyAllowInsecure,
            };
            (sigverify, rest)
        };
        if tail.is_empty() {
            return Err(ParseError::malformed(value, "empty image name"));
        }
        let imgref = if scheme.forces_registry() {
            ImageReference {
                transport: Transport::Registry,
                image: tail.to_string(),
            }
        } else {
            tail.try_into()?
        };
        Ok(Self { sigverify, imgref })
    }
}

impl FromStr for OstreeImageReference {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, ParseError> {
        Self::try_from(s)
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            // TODO once skopeo supports this, canonicalize as registry:
            Self::Registry => "docker://",
            Self::OciArchive => "oci-archive:",
            Self::DockerArchive => "docker-archive:",
            Self::OciDir => "oci:",
            Self::ContainerStorage => "containers-storage:",
            Self::Dir => "dir:",
            Self::DockerDaemon => "docker-daemon:",
        };
        f.write_str(s)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.transport, self.image)
    }
}

impl fmt::Display for SignatureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OstreeRemote(r) => write!(f, "ostree-remote-image:{r}"),
            Self::ContainerPolicy => write!(f, "ostree-image-signed"),
            Self::ContainerPolicyAllowInsecure => write!(f, "ostree-unverified-image"),
        }
    }
}

impl fmt::Display for OstreeImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.sigverify, &self.imgref) {
            (SignatureSource::ContainerPolicyAllowInsecure, imgref)
                if imgref.transport == Transport::Registry =>
            {
                // Because allow-insecure is the effective default, allow formatting
                // without it.  Note this formatting is asymmetric and cannot be
                // re-parsed.
                if f.alternate() {
                    write!(f, "{}", self.imgref)
                } else {
                    write!(f, "ostree-unverified-registry:{}", self.imgref.image)
                }
            }
            (sigverify, imgref) => {
                write!(f, "{sigverify}:{imgref}")
            }
        }
    }
}
