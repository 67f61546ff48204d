//! This module sets the options for our tool, from defaults, environment and command line.

use std::path::{Path, PathBuf};

use flake_usages::fetcher_cache::{CacheMatch, ARCHIVE_MARKER, FETCHER_CACHE_FILE};
use getopts::Options;

use crate::error::GcRootsError;
use crate::gc_roots::GCROOTS_ROOT;
use crate::utils::expand_path;

pub const DEFAULT_LOCKFILE: &str = "flake.lock";

/// What the command line asks us to do.
#[derive(Debug)]
pub enum Invocation {
    Help(String),
    Run(GcRootsConfig),
}

#[derive(Debug)]
pub struct GcRootsConfig {
    // absolute path of the lockfile
    lockfile: PathBuf,
    // usually /nix/var/nix/gcroots
    gcroots_root: PathBuf,
    // fetcher cache database, none if no cache dir is known
    cache_db: Option<PathBuf>,
    cache_match: CacheMatch,
    // evaluator program
    nix: String,
    // owner of the per-user gc roots
    user: Option<String>,
    // resolve only, leave gc roots alone
    dry_run: bool,
    verbose: bool,
    log_file: Option<PathBuf>,
}

fn options() -> Options {
    let mut opts = Options::new();
    opts.optflag("h", "help", "Print help information");
    opts.optflag("v", "verbose", "Print debug logs on stderr");
    opts.optflag("n", "dry-run", "Resolve store paths, but do not create gc roots");
    opts.optopt(
        "",
        "gcroots-dir",
        &format!("GC roots directory (default {GCROOTS_ROOT})"),
        "DIR",
    );
    opts.optopt(
        "",
        "cache-db",
        "Nix fetcher cache (default ~/.cache/nix/fetcher-cache-v2.sqlite)",
        "FILE",
    );
    opts.optopt(
        "",
        "cache-marker",
        &format!("Cache key marker of archive inputs (default {ARCHIVE_MARKER})"),
        "MARKER",
    );
    opts.optopt("", "nix", "Evaluator program (default nix)", "PROGRAM");
    opts.optopt("", "user", "Owner of the gc roots (default $USER)", "NAME");
    opts.optopt("", "log-file", "Append debug logs to this file", "FILE");
    opts
}

pub fn usage(program: &str) -> String {
    let brief = format!(
        "Usage: {program} [OPTIONS] [LOCKFILE]\n\n\
         Pin all inputs of a flake lockfile as nix gc roots.\n\
         LOCKFILE defaults to `{DEFAULT_LOCKFILE}` in the working directory."
    );
    options().usage(&brief)
}

impl GcRootsConfig {
    /// Build configurations from command line `args` (without program name),
    /// `env` looks up environment variables, `exists` tells whether a file is there.
    pub fn from_args(
        program: &str,
        args: &[String],
        env: impl Fn(&str) -> Option<String>,
        exists: impl Fn(&Path) -> bool,
    ) -> Result<Invocation, GcRootsError> {
        let matches = options()
            .parse(args)
            .map_err(|e| GcRootsError::Usage(format!("{e}\n\n{}", usage(program))))?;

        if matches.opt_present("h") {
            return Ok(Invocation::Help(usage(program)));
        }

        let lockfile = match matches.free.as_slice() {
            [] if exists(Path::new(DEFAULT_LOCKFILE)) => PathBuf::from(DEFAULT_LOCKFILE),
            [] => return Err(GcRootsError::MissingLockfile),
            [lockfile] => PathBuf::from(lockfile),
            [_, rest @ ..] => {
                return Err(GcRootsError::Usage(format!(
                    "unexpected arguments: {}\n\n{}",
                    rest.join(" "),
                    usage(program)
                )))
            }
        };
        let lockfile = expand_path(&lockfile).map_err(|e| {
            GcRootsError::Config(format!("cannot resolve {}: {e}", lockfile.display()))
        })?;

        let env = |key: &str| env(key).filter(|value| !value.is_empty());

        let cache_db = matches.opt_str("cache-db").map(PathBuf::from).or_else(|| {
            env("XDG_CACHE_HOME")
                .map(PathBuf::from)
                .or_else(|| env("HOME").map(|home| Path::new(&home).join(".cache")))
                .map(|cache_dir| cache_dir.join(FETCHER_CACHE_FILE))
        });

        let cache_match = matches
            .opt_str("cache-marker")
            .map(CacheMatch::new)
            .unwrap_or_default();

        let user = matches
            .opt_str("user")
            .or_else(|| env("USER"))
            .or_else(|| env("LOGNAME"));

        Ok(Invocation::Run(GcRootsConfig {
            lockfile,
            gcroots_root: matches
                .opt_str("gcroots-dir")
                .map_or_else(|| PathBuf::from(GCROOTS_ROOT), PathBuf::from),
            cache_db,
            cache_match,
            nix: matches.opt_str("nix").unwrap_or_else(|| "nix".to_string()),
            user,
            dry_run: matches.opt_present("n"),
            verbose: matches.opt_present("v"),
            log_file: matches.opt_str("log-file").map(PathBuf::from),
        }))
    }

    pub fn lockfile(&self) -> &Path {
        &self.lockfile
    }

    pub fn gcroots_root(&self) -> &Path {
        &self.gcroots_root
    }

    pub fn cache_db(&self) -> Result<&Path, GcRootsError> {
        self.cache_db.as_deref().ok_or_else(|| {
            GcRootsError::Config(
                "cannot locate the nix fetcher cache, set $HOME or pass --cache-db".to_string(),
            )
        })
    }

    pub fn cache_match(&self) -> &CacheMatch {
        &self.cache_match
    }

    pub fn nix(&self) -> &str {
        &self.nix
    }

    pub fn user(&self) -> Result<&str, GcRootsError> {
        self.user.as_deref().ok_or_else(|| {
            GcRootsError::Config("cannot tell the current user, set $USER or pass --user".to_string())
        })
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(args: &[&str]) -> Vec<String> {
        args.iter().map(|arg| arg.to_string()).collect()
    }

    fn run_config(argv: &[&str], env: &[(&str, &str)]) -> GcRootsConfig {
        let lookup = |key: &str| {
            env.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        };
        match GcRootsConfig::from_args("flake-gcroots", &args(argv), lookup, |_| false).unwrap() {
            Invocation::Run(config) => config,
            Invocation::Help(_) => panic!("unexpected help"),
        }
    }

    #[test]
    fn defaults_from_environment() {
        let config = run_config(&["/src/proj/flake.lock"], &[("HOME", "/home/u"), ("USER", "u")]);

        assert_eq!(config.lockfile(), Path::new("/src/proj/flake.lock"));
        assert_eq!(config.gcroots_root(), Path::new(GCROOTS_ROOT));
        assert_eq!(
            config.cache_db().unwrap(),
            Path::new("/home/u/.cache/nix/fetcher-cache-v2.sqlite")
        );
        assert_eq!(config.cache_match(), &CacheMatch::default());
        assert_eq!(config.nix(), "nix");
        assert_eq!(config.user().unwrap(), "u");
        assert!(!config.is_dry_run());
    }

    #[test]
    fn xdg_cache_and_logname() {
        let config = run_config(
            &["/src/flake.lock"],
            &[("XDG_CACHE_HOME", "/xdg"), ("HOME", "/home/u"), ("LOGNAME", "l")],
        );
        assert_eq!(
            config.cache_db().unwrap(),
            Path::new("/xdg/nix/fetcher-cache-v2.sqlite")
        );
        assert_eq!(config.user().unwrap(), "l");
    }

    #[test]
    fn command_line_overrides() {
        let config = run_config(
            &[
                "--gcroots-dir",
                "/tmp/roots",
                "--cache-db",
                "/tmp/cache.sqlite",
                "--cache-marker",
                "tarball",
                "--nix",
                "/opt/nix/bin/nix",
                "--user",
                "ci",
                "-n",
                "/src/flake.lock",
            ],
            &[("USER", "u")],
        );

        assert_eq!(config.gcroots_root(), Path::new("/tmp/roots"));
        assert_eq!(config.cache_db().unwrap(), Path::new("/tmp/cache.sqlite"));
        assert_eq!(config.cache_match(), &CacheMatch::new("tarball"));
        assert_eq!(config.nix(), "/opt/nix/bin/nix");
        assert_eq!(config.user().unwrap(), "ci");
        assert!(config.is_dry_run());
    }

    #[test]
    fn missing_user_and_cache_are_lazy_errors() {
        let config = run_config(&["/src/flake.lock"], &[("USER", "")]);
        assert!(matches!(config.user(), Err(GcRootsError::Config(_))));
        assert!(matches!(config.cache_db(), Err(GcRootsError::Config(_))));
    }

    #[test]
    fn default_lockfile_in_working_directory() {
        let config = match GcRootsConfig::from_args(
            "flake-gcroots",
            &[],
            |_| None,
            |path| path == Path::new(DEFAULT_LOCKFILE),
        )
        .unwrap()
        {
            Invocation::Run(config) => config,
            Invocation::Help(_) => panic!("unexpected help"),
        };

        let cwd = std::env::current_dir().unwrap();
        assert_eq!(config.lockfile(), cwd.join(DEFAULT_LOCKFILE));
    }

    #[test]
    fn no_lockfile_anywhere() {
        let err = GcRootsConfig::from_args("flake-gcroots", &[], |_| None, |_| false).unwrap_err();
        assert!(matches!(err, GcRootsError::MissingLockfile));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn lockfile_path_is_expanded() {
        let config = run_config(&["/src/a/../proj/./flake.lock"], &[]);
        assert_eq!(config.lockfile(), Path::new("/src/proj/flake.lock"));
    }

    #[test]
    fn help_and_bad_args() {
        let help = GcRootsConfig::from_args("flake-gcroots", &args(&["-h"]), |_| None, |_| false)
            .unwrap();
        assert!(matches!(help, Invocation::Help(text) if text.contains("--gcroots-dir")));

        let err = GcRootsConfig::from_args("flake-gcroots", &args(&["a", "b"]), |_| None, |_| false);
        assert!(matches!(err, Err(GcRootsError::Usage(_))));

        let err = GcRootsConfig::from_args("flake-gcroots", &args(&["--bogus"]), |_| None, |_| false);
        assert!(matches!(err, Err(GcRootsError::Usage(_))));
    }
}
