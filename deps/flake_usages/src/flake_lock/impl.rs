use std::fmt::Display;
use std::fs;
use std::path::Path;

use log::debug;
use serde_json::{Map, Value};

use super::*;
use crate::error::LockError;

/// Read and normalize the lockfile at `path`.
pub fn read_lockfile(path: impl AsRef<Path>) -> Result<FlakeLock, LockError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| LockError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    parse_lockfile(path, &content)
}

/// Parse lockfile `content`, `path` is only used in error reports.
///
/// Nodes without a `locked` descriptor (the root) are dropped silently,
/// nodes with `flake = false` are dropped and recorded in `non_flake`.
pub fn parse_lockfile(path: impl AsRef<Path>, content: &str) -> Result<FlakeLock, LockError> {
    let path = path.as_ref();
    let malformed = |reason: String| LockError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    let raw: RawLock = serde_json::from_str(content).map_err(|e| malformed(e.to_string()))?;
    debug!(
        "lockfile {} version {:?}, {} nodes",
        path.display(),
        raw.version,
        raw.nodes.len()
    );

    let mut lock = FlakeLock::default();

    for (name, node) in raw.nodes {
        let node: RawNode =
            serde_json::from_value(node).map_err(|e| malformed(format!("node `{name}`: {e}")))?;

        if node.flake == Some(false) {
            debug!("skipping non-flake input `{name}`");
            lock.non_flake.push(name);
            continue;
        }

        if let Some(locked) = node.locked {
            let locked =
                LockedRef::from_attrs(locked).map_err(|e| malformed(format!("node `{name}`: {e}")))?;
            lock.nodes.push(DependencyNode { name, locked });
        }
    }

    Ok(lock)
}

impl ArchiveHost {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "github" => Some(Self::Github),
            "gitlab" => Some(Self::Gitlab),
            "sourcehut" => Some(Self::Sourcehut),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Gitlab => "gitlab",
            Self::Sourcehut => "sourcehut",
        }
    }
}

impl FetchKind {
    /// Classify a `type` tag, this never fails.
    pub fn from_tag(tag: &str) -> Self {
        match ArchiveHost::from_tag(tag) {
            Some(host) => Self::Archive(host),
            None => Self::Other(tag.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Archive(host) => host.as_str(),
            Self::Other(tag) => tag.as_str(),
        }
    }

    pub fn is_archive(&self) -> bool {
        match self {
            Self::Archive(_) => true,
            Self::Other(_) => false,
        }
    }
}

impl Display for FetchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LockedRef {
    pub fn from_attrs(attrs: Map<String, Value>) -> Result<Self, String> {
        let kind = match attrs.get("type") {
            Some(Value::String(tag)) => FetchKind::from_tag(tag),
            Some(other) => return Err(format!("locked `type` is not a string: {other}")),
            None => return Err("locked descriptor has no `type`".to_string()),
        };

        let field = |key: &str| attrs.get(key).and_then(Value::as_str).map(str::to_string);

        Ok(LockedRef {
            kind,
            url: field("url"),
            rev: field("rev"),
            owner: field("owner"),
            repo: field("repo"),
            attrs,
        })
    }

    /// Pretty printed descriptor, for error messages.
    pub fn describe(&self) -> String {
        serde_json::to_string_pretty(&self.attrs).unwrap_or_else(|_| format!("{:?}", self.attrs))
    }
}

impl DependencyNode {
    pub fn is_archive(&self) -> bool {
        self.locked.kind.is_archive()
    }
}

impl ResolvedInput {
    pub fn new(node: DependencyNode) -> Self {
        let is_archive = node.is_archive();
        ResolvedInput {
            node,
            is_archive,
            store_path: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }

    pub fn locked(&self) -> &LockedRef {
        &self.node.locked
    }

    pub fn store_path(&self) -> Option<&str> {
        self.store_path.as_deref()
    }

    pub fn set_store_path(&mut self, path: String) {
        self.store_path = Some(path);
    }
}

impl InputSet {
    /// Split nodes into evaluable and archive inputs.
    pub fn classify(nodes: impl IntoIterator<Item = DependencyNode>) -> Self {
        let mut set = InputSet::default();
        for node in nodes {
            let input = ResolvedInput::new(node);
            if input.is_archive {
                set.archive.push(input);
            } else {
                set.evaluable.push(input);
            }
        }

        set
    }

    pub fn len(&self) -> usize {
        self.evaluable.len() + self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evaluable inputs first, then archive ones.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedInput> {
        self.evaluable.iter().chain(self.archive.iter())
    }

    /// Inputs still lacking a non-empty store path.
    pub fn unresolved(&self) -> Vec<&ResolvedInput> {
        self.iter()
            .filter(|input| input.store_path().map_or(true, str::is_empty))
            .collect()
    }
}
