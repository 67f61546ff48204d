//! This file describe errors may meet.

use std::path::PathBuf;

use flake_usages::LockError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GcRootsError {
    /// Bad command line.
    #[error("{0}")]
    Usage(String),
    #[error("no lockfile provided via cmdline args and no `flake.lock` in working directory")]
    MissingLockfile,
    /// Environment lacks something we need, e.g. the user name.
    #[error("{0}")]
    Config(String),
    /// Lockfile or fetcher cache issues.
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("cannot run evaluator `{program}`: {source}")]
    EvaluatorSpawn {
        program: String,
        source: std::io::Error,
    },
    /// The evaluator ran and failed, `code` becomes our exit code.
    #[error("evaluator exited with code {code} while evaluating expression:\n{expr}")]
    EvaluatorFailure { expr: String, code: i32 },
    #[error("malformed evaluator output: {0}")]
    MalformedEvaluatorOutput(String),
    #[error("couldn't find store path for input `{name}`:\n{descriptor}")]
    StorePathNotFound { name: String, descriptor: String },
    #[error("cannot create gc root `{}`: {source}", .path.display())]
    RootCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl GcRootsError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::EvaluatorFailure { code, .. } => *code,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluator_code_is_propagated() {
        let err = GcRootsError::EvaluatorFailure {
            expr: "{ }".to_string(),
            code: 102,
        };
        assert_eq!(err.exit_code(), 102);
        assert!(err.to_string().contains("{ }"));

        assert_eq!(GcRootsError::MissingLockfile.exit_code(), 1);
    }
}
