use std::path::{Path, PathBuf};

use flake_usages::fetcher_cache::{FetcherCache, SqliteFetcherCache};
use flake_usages::flake_lock::{read_lockfile, InputSet, ResolvedInput};
use flake_usages::LockError;
use log::debug;

use crate::config::GcRootsConfig;
use crate::error::GcRootsError;
use crate::evaluate::{inputs_expr, Evaluator, NixEvaluator};
use crate::gc_roots::{GcRootDir, RootRegistrar};
use crate::report;
use crate::utils::{info_print, warn_print};

/// Result of one pass over a lockfile.
pub struct Pinned {
    pub inputs: InputSet,
    // none on dry runs
    pub root_dir: Option<PathBuf>,
}

/// The main entry, pin all inputs of the configured lockfile.
pub fn run(config: &GcRootsConfig) -> Result<(), GcRootsError> {
    let evaluator = NixEvaluator::new(config.nix());
    let open_cache = || -> Result<SqliteFetcherCache, GcRootsError> {
        let cache = SqliteFetcherCache::open(config.cache_db()?, config.cache_match().clone())?;
        debug!("fetcher cache: {}", cache.path().display());
        Ok(cache)
    };

    let pinned = if config.is_dry_run() {
        pin(config.lockfile(), &evaluator, open_cache, None::<&GcRootDir>)?
    } else {
        let registrar = GcRootDir::new(config.gcroots_root(), config.user()?);
        pin(config.lockfile(), &evaluator, open_cache, Some(&registrar))?
    };

    print!("{}", report::render(pinned.root_dir.as_deref(), &pinned.inputs));
    Ok(())
}

/// Read `lockfile`, resolve every input and, given a registrar, replace its gc roots.
///
/// Nothing is registered unless all inputs got a store path.
pub fn pin<E, C, R>(
    lockfile: &Path,
    evaluator: &E,
    open_cache: impl FnOnce() -> Result<C, GcRootsError>,
    registrar: Option<&R>,
) -> Result<Pinned, GcRootsError>
where
    E: Evaluator,
    C: FetcherCache,
    R: RootRegistrar,
{
    let lock = read_lockfile(lockfile)?;
    for name in &lock.non_flake {
        warn_print(
            "Skipping",
            &format!("non-flake input `{name}`, it can't be fetched with `builtins.getFlake`"),
        );
    }

    let mut inputs = InputSet::classify(lock.nodes);
    info_print(
        "Resolving",
        &format!(
            "{} inputs ({} archives) of {}",
            inputs.len(),
            inputs.archive.len(),
            lockfile.display()
        ),
    );
    resolve_store_paths(&mut inputs, evaluator, open_cache)?;

    let root_dir = match registrar {
        Some(registrar) => {
            let dir = registrar.register(lockfile, &inputs)?;
            info_print("Registered", &format!("gc roots in {}", dir.display()));
            Some(dir)
        }
        None => None,
    };

    Ok(Pinned { inputs, root_dir })
}

/// Give every input its store path: one evaluation for all of them, then the
/// fetcher cache for archives, which that evaluation fills.
pub fn resolve_store_paths<E, C>(
    inputs: &mut InputSet,
    evaluator: &E,
    open_cache: impl FnOnce() -> Result<C, GcRootsError>,
) -> Result<(), GcRootsError>
where
    E: Evaluator,
    C: FetcherCache,
{
    if inputs.is_empty() {
        debug!("no inputs to evaluate");
        return Ok(());
    }

    let expr = inputs_expr(inputs)?;
    let mut evaluated = evaluator.evaluate(&expr)?;

    if !inputs.archive.is_empty() {
        let cache = open_cache()?;
        resolve_archives(&mut inputs.archive, &cache)?;
    }

    for input in &mut inputs.evaluable {
        let path = evaluated
            .remove(input.name())
            .filter(|path| !path.is_empty())
            .ok_or_else(|| not_found(input))?;
        input.set_store_path(path);
    }

    // archive bindings are only fetch side effects
    for name in inputs.archive.iter().map(ResolvedInput::name) {
        evaluated.remove(name);
    }
    if !evaluated.is_empty() {
        debug!("ignoring extra evaluated bindings: {:?}", evaluated.keys());
    }

    // every input leaves with exactly one non-empty store path
    if let Some(input) = inputs.unresolved().first() {
        return Err(not_found(input));
    }

    Ok(())
}

/// Look up archive inputs in the fetcher cache by their `rev`.
pub fn resolve_archives<C: FetcherCache>(
    archives: &mut [ResolvedInput],
    cache: &C,
) -> Result<(), GcRootsError> {
    for input in archives {
        let rev = input.locked().rev.as_deref().ok_or_else(|| {
            LockError::UnrecognizedLocatorShape {
                name: input.name().to_string(),
                descriptor: input.locked().describe(),
            }
        })?;

        let path = cache
            .store_path(rev)?
            .filter(|path| !path.is_empty())
            .ok_or_else(|| not_found(input))?;
        debug!("archive {} -> {path}", input.name());
        input.set_store_path(path);
    }

    Ok(())
}

fn not_found(input: &ResolvedInput) -> GcRootsError {
    GcRootsError::StorePathNotFound {
        name: input.name().to_string(),
        descriptor: input.locked().describe(),
    }
}
