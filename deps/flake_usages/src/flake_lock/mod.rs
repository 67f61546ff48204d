//! This module describes the nodes of a `flake.lock` we care about,
//! and how they are split by fetch strategy.

use serde::Deserialize;
use serde_json::{Map, Value};

mod r#impl;

pub use r#impl::{parse_lockfile, read_lockfile};

/// Source hosting platforms serving inputs as archives (`zipball`s in the
/// fetcher cache), whose store paths cannot be evaluated directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveHost {
    Github,
    Gitlab,
    Sourcehut,
}

/// The `type` tag of a locked descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FetchKind {
    Archive(ArchiveHost),
    Other(String),
}

/// The `locked` attribute set of a lockfile node.
#[derive(Debug, Clone, PartialEq)]
pub struct LockedRef {
    pub kind: FetchKind,
    pub url: Option<String>,
    pub rev: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    // raw attributes, only kept for error reports
    attrs: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DependencyNode {
    pub name: String,
    pub locked: LockedRef,
}

/// Nodes read from a lockfile, in lockfile order.
#[derive(Debug, Default)]
pub struct FlakeLock {
    pub nodes: Vec<DependencyNode>,
    // inputs marked `flake = false`, skipped
    pub non_flake: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedInput {
    pub node: DependencyNode,
    pub is_archive: bool,
    store_path: Option<String>,
}

/// Inputs split by fetch strategy, each half keeping lockfile order.
#[derive(Debug, Default)]
pub struct InputSet {
    pub evaluable: Vec<ResolvedInput>,
    pub archive: Vec<ResolvedInput>,
}

#[derive(Debug, Deserialize)]
struct RawLock {
    nodes: Map<String, Value>,
    #[serde(default)]
    version: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    #[serde(default)]
    flake: Option<bool>,
    #[serde(default)]
    locked: Option<Map<String, Value>>,
}
