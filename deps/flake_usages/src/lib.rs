//! Shared pieces for pinning flake inputs: the `flake.lock` model,
//! fetch locators and the nix fetcher cache.

pub mod error;
pub mod fetcher_cache;
pub mod flake_lock;
pub mod flake_locator;

pub use error::LockError;

// re-export
pub mod external {
    pub use fxhash;
    pub use serde_json;
}
