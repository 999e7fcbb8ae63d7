//! Name resolution.
//!
//! Resolution goes guard → cache → ancestor. The guard check comes first
//! on purpose: an execution context loading a fresh image delegates to its
//! parent before looking at its own bytes, and the parent must refuse the
//! name that is being redefined or the context would never see the new
//! definition.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use rustc_hash::FxHashMap;

use crate::artifact::LoadedArtifact;
use crate::cache::CodeCache;
use crate::error::NotFound;
use crate::guard;
use crate::name::CodeName;
use crate::types::LoaderMetrics;

/// A link in the resolver chain.
///
/// `NotFound` means "try the next resolver", not failure.
pub trait Resolve: Send + Sync {
    fn resolve(&self, name: &CodeName) -> Result<Arc<LoadedArtifact>, NotFound>;
}

/// Guard-aware resolver used both for steady-state lookups and as the
/// parent of every execution context created by the loader.
pub struct NameResolver {
    cache: CodeCache,
    ancestor: Option<Arc<dyn Resolve>>,
    metrics: Arc<LoaderMetrics>,
}

impl NameResolver {
    pub fn new(
        cache: CodeCache,
        ancestor: Option<Arc<dyn Resolve>>,
        metrics: Arc<LoaderMetrics>,
    ) -> Self {
        Self {
            cache,
            ancestor,
            metrics,
        }
    }

    pub fn cache(&self) -> &CodeCache {
        &self.cache
    }
}

impl Resolve for NameResolver {
    fn resolve(&self, name: &CodeName) -> Result<Arc<LoadedArtifact>, NotFound> {
        if guard::is_being_defined(name) {
            self.metrics.guarded_misses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(%name, "Refusing in-flight name, forcing load from fresh image");
            return Err(NotFound(name.clone()));
        }

        if let Some(artifact) = self.cache.lookup(name) {
            self.metrics.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(artifact);
        }

        match &self.ancestor {
            Some(ancestor) => ancestor.resolve(name),
            None => Err(NotFound(name.clone())),
        }
    }
}

impl std::fmt::Debug for NameResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameResolver")
            .field("cache_entries", &self.cache.len())
            .field("has_ancestor", &self.ancestor.is_some())
            .finish()
    }
}

/// Ahead-of-time resolver.
///
/// Holds its artifacts strongly: units registered here were linked into
/// the process up front and live as long as the resolver.
#[derive(Debug, Default)]
pub struct StaticResolver {
    units: FxHashMap<CodeName, Arc<LoadedArtifact>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an artifact under its own name, replacing any previous one.
    pub fn insert(&mut self, artifact: Arc<LoadedArtifact>) -> Option<Arc<LoadedArtifact>> {
        self.units.insert(artifact.name().clone(), artifact)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl Resolve for StaticResolver {
    fn resolve(&self, name: &CodeName) -> Result<Arc<LoadedArtifact>, NotFound> {
        self.units
            .get(name)
            .cloned()
            .ok_or_else(|| NotFound(name.clone()))
    }
}

/// Ordered chain of resolvers; the first one that knows the name wins.
#[derive(Default)]
pub struct ResolverChain {
    links: Vec<Arc<dyn Resolve>>,
}

impl ResolverChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resolver to the end of the chain.
    pub fn with(mut self, link: Arc<dyn Resolve>) -> Self {
        self.links.push(link);
        self
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl Resolve for ResolverChain {
    fn resolve(&self, name: &CodeName) -> Result<Arc<LoadedArtifact>, NotFound> {
        for link in &self.links {
            if let Ok(artifact) = link.resolve(name) {
                return Ok(artifact);
            }
        }
        Err(NotFound(name.clone()))
    }
}

impl std::fmt::Debug for ResolverChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverChain")
            .field("links", &self.links.len())
            .finish()
    }
}
