//! Store paths through `nix eval`.

use std::borrow::Cow;
use std::process::{Command, Stdio};

use flake_usages::external::fxhash::FxHashMap as HashMap;
use flake_usages::external::serde_json::{self, Value};
use flake_usages::flake_lock::{DependencyNode, InputSet};
use flake_usages::flake_locator::flake_url;
use flake_usages::LockError;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::error::GcRootsError;

lazy_static! {
    static ref RE_IDENT: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_'-]*$").unwrap();
}

const KEYWORDS: [&str; 10] = [
    "assert", "else", "if", "in", "inherit", "let", "or", "rec", "then", "with",
];

/// Evaluates an attribute set of strings.
pub trait Evaluator {
    fn evaluate(&self, expr: &str) -> Result<HashMap<String, String>, GcRootsError>;
}

pub struct NixEvaluator {
    program: String,
}

impl NixEvaluator {
    pub fn new(program: impl Into<String>) -> Self {
        NixEvaluator {
            program: program.into(),
        }
    }

    fn nix(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["eval", "--impure", "--json", "--expr"]);
        cmd
    }
}

impl Evaluator for NixEvaluator {
    fn evaluate(&self, expr: &str) -> Result<HashMap<String, String>, GcRootsError> {
        debug!("evaluating:\n{expr}");

        // fetch progress and errors stay visible to the user
        let output = self
            .nix()
            .arg(expr)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|source| GcRootsError::EvaluatorSpawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(GcRootsError::EvaluatorFailure {
                expr: expr.to_string(),
                code: output.status.code().unwrap_or(1),
            });
        }

        parse_output(&output.stdout)
    }
}

/// `builtins.getFlake "<locator>"` of `node`.
pub fn flake_expr(node: &DependencyNode) -> Result<String, LockError> {
    Ok(format!("builtins.getFlake {}", nix_string(&flake_url(node)?)))
}

/// One attribute set binding every input name to its store path.
///
/// Evaluable inputs are realised through string interpolation, archive inputs
/// only through `toString`, which fetches the archive without unpacking it
/// and leaves its store path in the fetcher cache.
pub fn inputs_expr(inputs: &InputSet) -> Result<String, LockError> {
    let mut attrs = Vec::with_capacity(inputs.len());
    for input in &inputs.evaluable {
        attrs.push(format!(
            "{} = \"${{{}}}\";",
            nix_attr(input.name()),
            flake_expr(&input.node)?
        ));
    }
    for input in &inputs.archive {
        attrs.push(format!(
            "{} = toString ({});",
            nix_attr(input.name()),
            flake_expr(&input.node)?
        ));
    }

    let mut expr = String::from("{\n");
    for attr in attrs {
        expr.push_str("  ");
        expr.push_str(&attr);
        expr.push('\n');
    }
    expr.push_str("}\n");

    Ok(expr)
}

/// Parse the `--json` output of an attribute set of strings.
pub fn parse_output(stdout: &[u8]) -> Result<HashMap<String, String>, GcRootsError> {
    let value: Value = serde_json::from_slice(stdout)
        .map_err(|e| GcRootsError::MalformedEvaluatorOutput(e.to_string()))?;

    let attrs = match value {
        Value::Object(attrs) => attrs,
        other => {
            return Err(GcRootsError::MalformedEvaluatorOutput(format!(
                "expected an attribute set, got {other}"
            )))
        }
    };

    attrs
        .into_iter()
        .map(|(name, value)| match value {
            Value::String(path) => Ok((name, path)),
            other => Err(GcRootsError::MalformedEvaluatorOutput(format!(
                "`{name}` is not a string: {other}"
            ))),
        })
        .collect()
}

fn nix_attr(name: &str) -> Cow<'_, str> {
    if RE_IDENT.is_match(name) && !KEYWORDS.contains(&name) {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(nix_string(name))
    }
}

fn nix_string(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(c);
            }
            '$' if chars.peek() == Some(&'{') => quoted.push_str("\\$"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
