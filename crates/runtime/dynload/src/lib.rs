//! hotswap dynamic loader: translate, instantiate and publish code units.
//!
//! This crate provides the heavy side of the hotswap runtime: the
//! orchestration of a (re)definition and reference implementations of the
//! collaborators `hotswap-core` only describes.
//!
//! # Architecture
//!
//! ```text
//! hotswap-core (lightweight infra)
//!   └── guard, cache, resolver, host traits
//!
//! hotswap-dynload (this crate)
//!   ├── image      — HSU1 raw unit / HSI1 image wire formats
//!   ├── translator — UnitTranslator (raw unit → image)
//!   ├── host       — InMemoryHost / InMemoryContext
//!   └── loader     — DynamicLoader::define / resolve
//! ```
//!
//! # Defining a unit
//!
//! ```
//! use bytes::Bytes;
//! use hotswap_core::{CodeCache, CodeName, LoaderConfig};
//! use hotswap_dynload::{DynamicLoader, RawUnit, UnitBody};
//!
//! let loader = DynamicLoader::in_memory(LoaderConfig::default()).with_cache(CodeCache::new());
//! let name = CodeName::new("pkg.Foo").unwrap();
//! let raw = RawUnit::new(name.to_path(), Bytes::from_static(b"v1")).encode().unwrap();
//!
//! let artifact = loader.define(&name, raw).unwrap();
//! let resolved = loader.resolve(&name).unwrap();
//! assert_eq!(resolved.id(), artifact.id());
//! assert_eq!(resolved.payload::<UnitBody>().unwrap().0, Bytes::from_static(b"v1"));
//! ```

pub mod error;
pub mod host;
pub mod image;
pub mod loader;
pub mod translator;

// Re-exports for convenience
pub use error::FormatError;
pub use host::{InMemoryContext, InMemoryHost, UnitBody};
pub use hotswap_core::{
    CODE_CACHE, CodeCache, CodeName, DefinitionError, DefinitionLocks, LoadError, LoadedArtifact,
    LoaderConfig, NotFound, Resolve,
};
pub use image::{Image, RawUnit};
pub use loader::DynamicLoader;
pub use translator::UnitTranslator;

#[cfg(test)]
mod tests;
