//! Rebuild flake URLs from locked descriptors.

use crate::error::LockError;
use crate::flake_lock::{DependencyNode, FetchKind, LockedRef};

/// Build the fetch locator of `node`.
///
/// A direct `url` with a `rev` wins, as `<type>+<url>?rev=<rev>`. Archive
/// hosts fall back to `<type>:<owner>/<repo>/<rev>`. Anything else cannot
/// be fetched.
pub fn flake_url(node: &DependencyNode) -> Result<String, LockError> {
    locked_url(&node.locked).ok_or_else(|| LockError::UnrecognizedLocatorShape {
        name: node.name.clone(),
        descriptor: node.locked.describe(),
    })
}

fn locked_url(locked: &LockedRef) -> Option<String> {
    if let (Some(url), Some(rev)) = (&locked.url, &locked.rev) {
        return Some(format!("{}+{url}?rev={rev}", locked.kind));
    }

    match &locked.kind {
        FetchKind::Archive(host) => {
            let owner = locked.owner.as_deref()?;
            let repo = locked.repo.as_deref()?;
            let rev = locked.rev.as_deref()?;
            Some(format!("{}:{owner}/{repo}/{rev}", host.as_str()))
        }
        FetchKind::Other(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    fn node(name: &str, locked: Value) -> DependencyNode {
        let Value::Object(attrs) = locked else {
            panic!("locked must be an object");
        };
        DependencyNode {
            name: name.to_string(),
            locked: LockedRef::from_attrs(attrs).unwrap(),
        }
    }

    #[test]
    fn direct_url_with_rev() {
        let n = node(
            "repo",
            json!({ "type": "tarball", "url": "https://example/repo.tar", "rev": "abc123" }),
        );
        assert_eq!(
            flake_url(&n).unwrap(),
            "tarball+https://example/repo.tar?rev=abc123"
        );
    }

    #[test]
    fn archive_host_shape() {
        let n = node(
            "r",
            json!({ "type": "github", "owner": "o", "repo": "r", "rev": "abc123" }),
        );
        assert_eq!(flake_url(&n).unwrap(), "github:o/r/abc123");

        let n = node(
            "srht",
            json!({ "type": "sourcehut", "owner": "~u", "repo": "r", "rev": "ff00" }),
        );
        assert_eq!(flake_url(&n).unwrap(), "sourcehut:~u/r/ff00");
    }

    #[test]
    fn url_wins_over_owner_repo() {
        let n = node(
            "gl",
            json!({ "type": "gitlab", "owner": "o", "repo": "r", "rev": "1", "url": "https://gl/x" }),
        );
        assert_eq!(flake_url(&n).unwrap(), "gitlab+https://gl/x?rev=1");
    }

    #[test]
    fn same_descriptor_same_locator() {
        let locked = json!({ "type": "git", "url": "https://example/x.git", "rev": "cafe", "ref": "main" });
        let a = flake_url(&node("x", locked.clone())).unwrap();
        let b = flake_url(&node("x", locked)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_shape_reports_descriptor() {
        let n = node("local", json!({ "type": "path", "path": "/src/local" }));
        match flake_url(&n) {
            Err(LockError::UnrecognizedLocatorShape { name, descriptor }) => {
                assert_eq!(name, "local");
                assert!(descriptor.contains("/src/local"));
            }
            other => panic!("unexpected {other:?}"),
        }

        // archive hosts still need all of owner, repo and rev
        let n = node("gh", json!({ "type": "github", "owner": "o", "repo": "r" }));
        assert!(flake_url(&n).is_err());
    }
}
