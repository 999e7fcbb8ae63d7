//! Dynamic loader: high-level API for defining and resolving code units.
//!
//! Combines the translator, the host and the guarded name resolver into the
//! single mutating entry point, [`DynamicLoader::define`].

use std::sync::atomic::Ordering;
use std::sync::{Arc, PoisonError};

use bytes::Bytes;
use hotswap_core::{
    CODE_CACHE, CodeCache, CodeName, DefinitionError, Host, LoadError, LoadedArtifact,
    LoaderConfig, LoaderMetrics, NameResolver, NotFound, Resolve, Translator, guard,
};

use crate::host::{DEFAULT_HOST_API, InMemoryHost};
use crate::translator::UnitTranslator;

pub struct DynamicLoader {
    translator: Arc<dyn Translator>,
    host: Arc<dyn Host>,
    resolver: Arc<NameResolver>,
    cache: CodeCache,
    ancestor: Option<Arc<dyn Resolve>>,
    config: LoaderConfig,
    metrics: Arc<LoaderMetrics>,
}

impl DynamicLoader {
    /// Create a loader publishing into the process-wide [`CODE_CACHE`].
    pub fn new(translator: Arc<dyn Translator>, host: Arc<dyn Host>) -> Self {
        Self::with_config(translator, host, LoaderConfig::default())
    }

    /// Create a loader with a custom configuration.
    ///
    /// The loader itself only reads `serialize_redefinitions`. The size
    /// limit, name check and API level are translation settings: they take
    /// effect only if `translator` was built from the same config (as
    /// [`DynamicLoader::in_memory`] does with `UnitTranslator::with_config`).
    pub fn with_config(
        translator: Arc<dyn Translator>,
        host: Arc<dyn Host>,
        config: LoaderConfig,
    ) -> Self {
        let cache = CODE_CACHE.clone();
        let metrics = Arc::new(LoaderMetrics::new());
        let resolver = Arc::new(NameResolver::new(cache.clone(), None, Arc::clone(&metrics)));
        Self {
            translator,
            host,
            resolver,
            cache,
            ancestor: None,
            config,
            metrics,
        }
    }

    /// Loader backed by the reference translator and in-memory host.
    ///
    /// The host runs at `config.min_host_api` or the default level,
    /// whichever is higher, so every image the translator stamps loads.
    pub fn in_memory(config: LoaderConfig) -> Self {
        let translator = Arc::new(UnitTranslator::with_config(config.clone()));
        let host = InMemoryHost::new(config.min_host_api.max(DEFAULT_HOST_API));
        Self::with_config(translator, Arc::new(host), config)
    }

    /// Publish into `cache` instead of the process-wide cache.
    ///
    /// Loaders sharing a cache also share its per-name definition locks.
    pub fn with_cache(mut self, cache: CodeCache) -> Self {
        self.cache = cache;
        self.rebuild_resolver();
        self
    }

    /// Delegate names unknown to the cache to `ancestor`.
    pub fn with_ancestor(mut self, ancestor: Arc<dyn Resolve>) -> Self {
        self.ancestor = Some(ancestor);
        self.rebuild_resolver();
        self
    }

    fn rebuild_resolver(&mut self) {
        self.resolver = Arc::new(NameResolver::new(
            self.cache.clone(),
            self.ancestor.clone(),
            Arc::clone(&self.metrics),
        ));
    }

    pub fn cache(&self) -> &CodeCache {
        &self.cache
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn metrics(&self) -> &LoaderMetrics {
        &self.metrics
    }

    /// The guarded resolver, usable as the parent of other contexts.
    pub fn resolver(&self) -> Arc<dyn Resolve> {
        self.resolver.clone()
    }

    /// Resolve `name` through guard, cache and ancestors.
    pub fn resolve(&self, name: &CodeName) -> Result<Arc<LoadedArtifact>, NotFound> {
        self.resolver.resolve(name)
    }

    /// Define (or redefine) `name` from a raw compiled unit.
    ///
    /// On success the returned artifact is published in the cache; the cache
    /// only holds it weakly, so keep the `Arc` for as long as the definition
    /// should stay resolvable. On failure nothing is published for `name`,
    /// any previous entry has been invalidated, and the calling thread's
    /// redefinition marker is clear again.
    pub fn define(
        &self,
        name: &CodeName,
        raw: Bytes,
    ) -> Result<Arc<LoadedArtifact>, DefinitionError> {
        // Check before taking the per-name lock: a reentrant define of the
        // same name would otherwise block on a lock this thread already holds.
        if let Some(in_flight) = guard::current() {
            return Err(self.fail(name, LoadError::DefinitionInFlight { in_flight }));
        }

        let lock = self
            .config
            .serialize_redefinitions
            .then(|| self.cache.definition_lock(name));
        // The lock protects no data, so a poisoned lock is still usable.
        let _serialized = lock
            .as_ref()
            .map(|lock| lock.lock().unwrap_or_else(PoisonError::into_inner));

        match self.define_guarded(name, raw) {
            Ok((artifact, swept)) => {
                self.metrics.definitions.fetch_add(1, Ordering::Relaxed);
                self.metrics
                    .entries_swept
                    .fetch_add(u64::try_from(swept).unwrap_or(u64::MAX), Ordering::Relaxed);
                tracing::info!(
                    %name,
                    artifact_id = %artifact.id(),
                    image_size = artifact.image_size,
                    swept,
                    "Defined code unit"
                );
                Ok(artifact)
            }
            Err(cause) => Err(self.fail(name, cause)),
        }
    }

    /// Steps run while the redefinition marker for `name` is held.
    fn define_guarded(
        &self,
        name: &CodeName,
        raw: Bytes,
    ) -> Result<(Arc<LoadedArtifact>, usize), LoadError> {
        let _scope = guard::begin(name.clone())?;

        if self.cache.invalidate(name) {
            self.metrics.redefinitions.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(%name, "Invalidated cached definition");
        }

        let image = self.translator.translate(name, raw)?;

        let parent: Arc<dyn Resolve> = self.resolver.clone();
        let context = self.host.instantiate(image, parent)?;

        // The resolver refuses `name` while the marker is held, so the context
        // has to load it from the image it was just seeded with.
        let artifact = context.load(name)?.ok_or(LoadError::EmptyResult)?;

        let swept = self.cache.publish(name.clone(), &artifact);
        Ok((artifact, swept))
    }

    fn fail(&self, name: &CodeName, cause: LoadError) -> DefinitionError {
        self.metrics
            .definition_failures
            .fetch_add(1, Ordering::Relaxed);
        match &cause {
            LoadError::DefinitionInFlight { in_flight } => {
                tracing::warn!(%name, %in_flight, "Refusing reentrant definition");
            }
            _ => tracing::error!(%name, error = %cause, "Failed to define code unit"),
        }
        DefinitionError::new(name.clone(), cause)
    }
}

impl std::fmt::Debug for DynamicLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicLoader")
            .field("config", &self.config)
            .field("cache_entries", &self.cache.len())
            .field("has_ancestor", &self.ancestor.is_some())
            .finish_non_exhaustive()
    }
}
