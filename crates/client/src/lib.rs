//! # Client library for the rpm-ostree daemon
//!
//! This crate wraps the `rpm-ostree` command-line interface for use by
//! management agents: it constructs and invokes the commands, decodes
//! the daemon's structured status reports, and models the resulting
//! deployment snapshots.
//!
//! The main entrypoint is [`Client`]; start with [`Client::query_status`]
//! which yields a [`Status`] snapshot of the bootable filesystem trees
//! known to the daemon.
//!
//! Status and version snapshots are immutable values decoded from one
//! query's output; they hold no handle back to the daemon.

mod client;
pub use client::*;
mod journal;
pub use journal::*;
mod status;
pub use status::*;
mod version;
pub use version::*;

// Deployment accessors return the grammar crate's types, so re-export it.
pub use rpmostree_imgref as imgref;
