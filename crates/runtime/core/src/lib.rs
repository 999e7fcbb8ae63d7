//! # hotswap-core
//!
//! Lightweight infrastructure for redefining named code units at runtime.
//!
//! ## Overview
//!
//! A code unit is compiled elsewhere, translated into an image the host can
//! run, loaded into a fresh execution context and published here under its
//! name. The interesting part is redefinition: once a name has been
//! redefined, nothing on the defining thread may observe the old artifact,
//! neither through the cache nor through an ancestor resolver nor through
//! the context that is busy loading the new one.
//!
//! ## Architecture
//!
//! ```text
//! hotswap-core (this crate)
//!   ├── name      — CodeName, dot/path normalisation
//!   ├── artifact  — LoadedArtifact + process-unique ArtifactId
//!   ├── guard     — per-thread redefinition marker (scoped)
//!   ├── cache     — name → Weak<LoadedArtifact>, swept on publish
//!   ├── locks     — per-name definition locks owned by a cache
//!   ├── resolver  — guard → cache → ancestor chain
//!   ├── host      — Translator / Host / ExecutionContext seams
//!   └── types     — LoaderConfig, LoaderMetrics
//!
//! hotswap-dynload (heavy side)
//!   └── translator, in-memory host, DynamicLoader::define
//! ```
//!
//! The cache never keeps an artifact alive. Holders of the `Arc` returned by
//! `define`/`resolve` do; once they are gone the entry disappears on the next
//! publish of any name.

pub mod artifact;
pub mod cache;
pub mod error;
pub mod guard;
pub mod host;
pub mod locks;
pub mod name;
pub mod resolver;
pub mod types;

pub use artifact::{ArtifactId, LoadedArtifact};
pub use cache::CodeCache;
pub use error::{DefinitionError, LoadError, NotFound};
pub use host::{ExecutionContext, Host, Translator};
pub use locks::DefinitionLocks;
pub use name::CodeName;
pub use resolver::{NameResolver, Resolve, ResolverChain, StaticResolver};
pub use types::{LoaderConfig, LoaderMetrics, MetricsSnapshot};

lazy_static::lazy_static! {
    /// Process-wide code cache.
    ///
    /// Every `DynamicLoader` built without an explicit cache publishes here,
    /// so a unit defined through one loader is visible to every resolver in
    /// the process.
    pub static ref CODE_CACHE: cache::CodeCache = cache::CodeCache::new();
}
