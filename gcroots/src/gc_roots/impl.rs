use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use flake_usages::flake_lock::InputSet;
use log::debug;

use super::*;
use crate::error::GcRootsError;
use crate::utils::expand_path;

fn root_failure(path: &Path) -> impl FnOnce(io::Error) -> GcRootsError + '_ {
    move |source| GcRootsError::RootCreationFailed {
        path: path.to_path_buf(),
        source,
    }
}

impl GcRootDir {
    pub fn new(gcroots_root: impl Into<PathBuf>, user: impl Into<String>) -> Self {
        GcRootDir {
            gcroots_root: gcroots_root.into(),
            user: user.into(),
        }
    }
}

impl RootRegistrar for GcRootDir {
    fn root_dir(&self, lockfile: &Path) -> Result<PathBuf, GcRootsError> {
        let lockfile = expand_path(lockfile).map_err(root_failure(lockfile))?;
        let flake_dir = lockfile.parent().unwrap_or(Path::new("/"));

        Ok(self
            .gcroots_root
            .join("per-user")
            .join(&self.user)
            .join(format!("flake-inputs{}", flake_dir.display())))
    }

    fn register(&self, lockfile: &Path, inputs: &InputSet) -> Result<PathBuf, GcRootsError> {
        let dir = self.root_dir(lockfile)?;

        if fs::symlink_metadata(&dir).is_ok() {
            debug!("removing stale roots in {}", dir.display());
            fs::remove_dir_all(&dir).map_err(root_failure(&dir))?;
        }
        fs::create_dir_all(&dir).map_err(root_failure(&dir))?;

        for input in inputs.iter() {
            let link = dir.join(input.name());
            let store_path = input
                .store_path()
                .ok_or_else(|| GcRootsError::StorePathNotFound {
                    name: input.name().to_string(),
                    descriptor: input.locked().describe(),
                })?;

            debug!("linking {} -> {store_path}", link.display());
            symlink(store_path, &link).map_err(root_failure(&link))?;
        }

        Ok(dir)
    }
}
