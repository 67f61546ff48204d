use std::fmt::Write;
use std::path::Path;

use flake_usages::flake_lock::InputSet;

const GUTTER: usize = 2;

/// Summary of resolved inputs, `root_dir` is none on dry runs.
pub fn render(root_dir: Option<&Path>, inputs: &InputSet) -> String {
    let mut out = match root_dir {
        Some(dir) => format!("Created {} links in {}:\n", inputs.len(), dir.display()),
        None => format!("Resolved {} inputs, no links created:\n", inputs.len()),
    };

    let width = inputs.iter().map(|i| i.name().chars().count()).max().unwrap_or(0) + GUTTER;
    for input in inputs.iter() {
        let label = format!("{}:", input.name());
        let suffix = if input.is_archive { " (archive)" } else { "" };
        let _ = writeln!(
            out,
            "{label:<width$}{}{suffix}",
            input.store_path().unwrap_or_default()
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use flake_usages::external::serde_json::{json, Value};
    use flake_usages::flake_lock::{DependencyNode, LockedRef};

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
    fn aligned_lines() {
        let mut inputs = InputSet::classify([
            node(
                "nixpkgs",
                json!({ "type": "github", "owner": "NixOS", "repo": "nixpkgs", "rev": "abc" }),
            ),
            node("u", json!({ "type": "git", "url": "https://x/u", "rev": "def" })),
        ]);
        inputs.evaluable[0].set_store_path("/nix/store/bbb-source".to_string());
        inputs.archive[0].set_store_path("/nix/store/aaa-source".to_string());

        assert_eq!(
            render(Some(Path::new("/roots/flake-inputs/src")), &inputs),
            concat!(
                "Created 2 links in /roots/flake-inputs/src:\n",
                "u:       /nix/store/bbb-source\n",
                "nixpkgs: /nix/store/aaa-source (archive)\n",
            )
        );
    }

    #[test]
    fn non_ascii_names_align() {
        let mut inputs = InputSet::classify([
            node("ünïcödé", json!({ "type": "git", "url": "https://x/u", "rev": "1" })),
            node("ab", json!({ "type": "git", "url": "https://x/ab", "rev": "2" })),
        ]);
        inputs.evaluable[0].set_store_path("/nix/store/u".to_string());
        inputs.evaluable[1].set_store_path("/nix/store/ab".to_string());

        assert_eq!(
            render(None, &inputs),
            concat!(
                "Resolved 2 inputs, no links created:\n",
                "ünïcödé: /nix/store/u\n",
                "ab:      /nix/store/ab\n",
            )
        );
    }

    #[test]
    fn empty_dry_run() {
        assert_eq!(
            render(None, &InputSet::default()),
            "Resolved 0 inputs, no links created:\n"
        );
    }
}
