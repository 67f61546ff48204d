//! Lookups into the nix fetcher cache, where archive inputs fetched during
//! evaluation leave their store paths.

use std::path::{Path, PathBuf};

use log::debug;
use rusqlite::{Connection, OpenFlags, OptionalExtension};

use crate::error::LockError;

/*
The part of the cache schema we read, owned by nix itself:

create table if not exists Cache (
    input     text not null,
    info      text not null,
    path      text not null,
    immutable integer not null,
    timestamp integer not null,
    primary key (input)
);
*/

/// Cache file, relative to the user cache directory.
pub const FETCHER_CACHE_FILE: &str = "nix/fetcher-cache-v2.sqlite";
/// Marker nix puts in cache keys of fetched-but-unpacked archives.
pub const ARCHIVE_MARKER: &str = "zipball";

const SELECT_PATH: &str = "SELECT path FROM Cache WHERE input LIKE ?1 LIMIT 1";

/// Something able to find the store path an archive input was fetched to.
pub trait FetcherCache {
    /// First cached store path whose key matches `rev`, in row order.
    fn store_path(&self, rev: &str) -> Result<Option<String>, LockError>;
}

/// How a revision is matched against the opaque cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheMatch {
    marker: String,
}

impl CacheMatch {
    pub fn new(marker: impl Into<String>) -> Self {
        CacheMatch {
            marker: marker.into(),
        }
    }

    /// `LIKE` pattern: the key contains `rev`, followed by the marker.
    pub fn pattern(&self, rev: &str) -> String {
        format!("%{rev}%{}%", self.marker)
    }
}

impl Default for CacheMatch {
    fn default() -> Self {
        CacheMatch::new(ARCHIVE_MARKER)
    }
}

/// The on-disk fetcher cache, opened read only.
pub struct SqliteFetcherCache {
    path: PathBuf,
    conn: Connection,
    matcher: CacheMatch,
}

impl SqliteFetcherCache {
    pub fn open(path: impl AsRef<Path>, matcher: CacheMatch) -> Result<Self, LockError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| LockError::CacheUnavailable {
            path: path.clone(),
            source,
        })?;

        Ok(SqliteFetcherCache {
            path,
            conn,
            matcher,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FetcherCache for SqliteFetcherCache {
    fn store_path(&self, rev: &str) -> Result<Option<String>, LockError> {
        let pattern = self.matcher.pattern(rev);
        debug!("fetcher cache lookup: {pattern}");

        self.conn
            .query_row(SELECT_PATH, [&pattern], |row| row.get::<usize, String>(0))
            .optional()
            .map_err(|source| LockError::CacheUnavailable {
                path: self.path.clone(),
                source,
            })
    }
}
