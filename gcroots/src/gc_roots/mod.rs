//! GC roots keeping the store paths of flake inputs alive.

use std::path::{Path, PathBuf};

use flake_usages::flake_lock::InputSet;

use crate::error::GcRootsError;

mod r#impl;

pub const GCROOTS_ROOT: &str = "/nix/var/nix/gcroots";

pub trait RootRegistrar {
    /// Directory holding the roots of `lockfile`.
    fn root_dir(&self, lockfile: &Path) -> Result<PathBuf, GcRootsError>;

    /// Replace all roots of `lockfile` with one link per input,
    /// returns the root directory.
    fn register(&self, lockfile: &Path, inputs: &InputSet) -> Result<PathBuf, GcRootsError>;
}

/// Per-user roots under `<gcroots_root>/per-user/<user>/flake-inputs<flake dir>`.
///
/// Two runs on the same lockfile at once race on the directory, nothing guards it.
#[derive(Debug, Clone)]
pub struct GcRootDir {
    gcroots_root: PathBuf,
    user: String,
}
