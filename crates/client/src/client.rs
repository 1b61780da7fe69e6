//! A handle for driving the rpm-ostree daemon's command interface.

use std::process::Command;

use anyhow::{Context, Result};
use fn_error_context::context;

use crate::imgref::OstreeImageReference;
use crate::status::Status;
use crate::version::{VersionData, VersionQuery, version_at_least};

/// The binary we drive.
const RPM_OSTREE: &str = "rpm-ostree";
/// Environment key identifying the invoking client to the daemon.
const CLIENT_ID_ENV: &str = "RPMOSTREE_CLIENT_ID";

/// A handle for interacting with an rpm-ostree based system.
#[derive(Debug, Clone)]
pub struct Client {
    client_id: String,
}

impl Client {
    /// Create a new client. The identifier should be a short, unique and
    /// ideally machine-readable string, as simple as
    /// `examplecorp-management-agent`; to be more verbose, use a URL,
    /// e.g. `https://gitlab.com/examplecorp/management-agent`.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            client_id: id.into(),
        }
    }

    fn new_cmd(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(RPM_OSTREE);
        cmd.env(CLIENT_ID_ENV, &self.client_id);
        cmd.args(args);
        cmd
    }

    fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<()> {
        let _ = self.run_captured(args)?;
        Ok(())
    }

    /// Run the command to completion, returning its stdout; a failure
    /// exit surfaces the captured stderr in the error.
    fn run_captured<S: AsRef<str>>(&self, args: &[S]) -> Result<Vec<u8>> {
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        tracing::debug!("Executing: {RPM_OSTREE} {}", args.join(" "));
        let output = self
            .new_cmd(&args)
            .output()
            .with_context(|| format!("Spawning {RPM_OSTREE}"))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "{RPM_OSTREE} {} failed ({}): {}",
                args.join(" "),
                output.status,
                stderr.trim()
            );
        }
        Ok(output.stdout)
    }

    /// Query the running daemon's version and feature set.
    #[context("Querying daemon version")]
    pub fn version(&self) -> Result<VersionData> {
        let buf = self.run_captured(&["--version"])?;
        let q: VersionQuery = serde_yaml::from_slice(&buf)
            .context("Failed to parse `rpm-ostree --version` output")?;
        Ok(q.root)
    }

    /// Checks whether the version of rpm-ostree is new enough.
    pub fn version_equal_or_greater(&self, required: &str) -> Result<bool> {
        let actual = self.version()?;
        Ok(version_at_least(required, &actual.version)?)
    }

    /// Load the current system state.
    #[context("Querying deployment status")]
    pub fn query_status(&self) -> Result<Status> {
        let buf = self.run_captured(&["status", "--json"])?;
        serde_json::from_slice(&buf).context("Failed to parse `rpm-ostree status --json` output")
    }

    /// Remove the pending deployment.
    pub fn remove_pending_deployment(&self) -> Result<()> {
        self.run(&["cleanup", "-p"])
    }

    /// Remove the rollback deployment.
    pub fn remove_rollback_deployment(&self) -> Result<()> {
        self.run(&["cleanup", "-r"])
    }

    /// Adjust the kernel arguments.
    pub fn change_kernel_arguments(&self, to_add: &[&str], to_remove: &[&str]) -> Result<()> {
        self.run(&kargs_args(to_add, to_remove))
    }

    /// Install or remove layered packages.
    pub fn change_packages(&self, to_add: &[&str], to_remove: &[&str]) -> Result<()> {
        self.run(&change_packages_args(to_add, to_remove))
    }

    /// Uninstall base packages, optionally installing new ones at the
    /// same time.
    pub fn override_remove(&self, to_remove: &[&str], to_install: &[&str]) -> Result<()> {
        self.run(&override_args("remove", to_remove, "--install", to_install))
    }

    /// Drop base package overrides, optionally uninstalling layered
    /// packages at the same time.
    pub fn override_reset(&self, to_reset: &[&str], to_uninstall: &[&str]) -> Result<()> {
        self.run(&override_args("reset", to_reset, "--uninstall", to_uninstall))
    }

    /// Switch to the target container image.
    pub fn rebase(&self, target: &OstreeImageReference) -> Result<()> {
        let target = target.to_string();
        self.run(&["rebase", "--experimental", target.as_str()])
    }

    /// Switch to the target registry image, ignoring lack of image
    /// signatures.
    pub fn rebase_unverified_registry(&self, image: &str) -> Result<()> {
        let target = format!("ostree-unverified-registry:{image}");
        self.run(&["rebase", "--experimental", target.as_str()])
    }
}

fn kargs_args(to_add: &[&str], to_remove: &[&str]) -> Vec<String> {
    let mut args = vec!["kargs".to_string()];
    args.extend(to_remove.iter().map(|a| format!("--delete={a}")));
    args.extend(to_add.iter().map(|a| format!("--append={a}")));
    args
}

/// The primary verb comes from whichever direction is non-empty; the
/// other direction rides along as flags.
fn change_packages_args(to_add: &[&str], to_remove: &[&str]) -> Vec<String> {
    let mut args = Vec::new();
    if to_add.is_empty() {
        args.push("uninstall".to_string());
        args.extend(to_remove.iter().map(|s| s.to_string()));
    } else {
        args.push("install".to_string());
        args.extend(to_add.iter().map(|s| s.to_string()));
        for pkg in to_remove {
            args.push("--uninstall".to_string());
            args.push(pkg.to_string());
        }
    }
    args
}

fn override_args(verb: &str, primary: &[&str], flag: &str, secondary: &[&str]) -> Vec<String> {
    let mut args = vec!["override".to_string(), verb.to_string()];
    args.extend(primary.iter().map(|s| s.to_string()));
    for pkg in secondary {
        args.push(flag.to_string());
        args.push(pkg.to_string());
    }
    args
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use super::*;
    use crate::imgref::{ImageReference, SignatureSource, Transport};

    #[test]
    fn test_new_cmd() {
        let c = Client::new("test");
        let cmd = c.new_cmd(&["status", "--json"]);
        assert_eq!(cmd.get_program(), RPM_OSTREE);
        let args: Vec<_> = cmd.get_args().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(args, ["status", "--json"]);
        let id = cmd
            .get_envs()
            .find(|(k, _)| *k == OsStr::new(CLIENT_ID_ENV))
            .and_then(|(_, v)| v);
        assert_eq!(id, Some(OsStr::new("test")));
    }

    #[test]
    fn test_kargs_args() {
        assert_eq!(
            kargs_args(&["quiet", "rw"], &["mitigations=off"]),
            ["kargs", "--delete=mitigations=off", "--append=quiet", "--append=rw"]
        );
    }

    #[test]
    fn test_change_packages_args() {
        assert_eq!(
            change_packages_args(&[], &["nano", "vim"]),
            ["uninstall", "nano", "vim"]
        );
        assert_eq!(
            change_packages_args(&["strace"], &["nano"]),
            ["install", "strace", "--uninstall", "nano"]
        );
    }

    #[test]
    fn test_override_args() {
        assert_eq!(
            override_args("remove", &["firefox"], "--install", &["chromium"]),
            ["override", "remove", "firefox", "--install", "chromium"]
        );
        assert_eq!(
            override_args("reset", &["firefox"], "--uninstall", &[]),
            ["override", "reset", "firefox"]
        );
    }

    #[test]
    fn test_rebase_target_rendering() {
        // The rebase argument is the display form of the reference.
        let target = OstreeImageReference {
            sigverify: SignatureSource::ContainerPolicy,
            imgref: ImageReference {
                transport: Transport::Registry,
                image: "quay.io/exampleos/blah:stable".into(),
            },
        };
        assert_eq!(
            target.to_string(),
            "ostree-image-signed:docker://quay.io/exampleos/blah:stable"
        );
    }
}
