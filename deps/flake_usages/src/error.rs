//! Errors met while reading lockfiles and looking into the fetcher cache.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    /// The lockfile cannot be read at all.
    #[error("cannot read lockfile `{}`: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The lockfile is readable, but not shaped like a flake lock.
    #[error("malformed lockfile `{}`: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },
    /// No fetch locator can be built from this locked descriptor.
    #[error("don't know how to create flake URL for input `{name}` from:\n{descriptor}")]
    UnrecognizedLocatorShape { name: String, descriptor: String },
    /// The fetcher cache database cannot be opened or queried.
    #[error("fetcher cache `{}` unavailable: {source}", .path.display())]
    CacheUnavailable {
        path: PathBuf,
        source: rusqlite::Error,
    },
}
