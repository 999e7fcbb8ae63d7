//! Shared test helpers for hotswap-dynload tests.

use std::sync::{Arc, Barrier};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use hotswap_core::{
    CodeCache, CodeName, ExecutionContext, Host, LoadError, LoadedArtifact, LoaderConfig, Resolve,
    Translator,
};

use crate::host::UnitBody;
use crate::image::RawUnit;
use crate::loader::DynamicLoader;
use crate::translator::UnitTranslator;

pub fn name(s: &str) -> CodeName {
    CodeName::new(s).expect("valid name")
}

/// Encode a raw unit declaring the path of `name`.
pub fn unit(name: &CodeName, body: &[u8]) -> Bytes {
    RawUnit::new(name.to_path(), Bytes::copy_from_slice(body))
        .encode()
        .expect("encodable unit")
}

/// Body the in-memory host loaded the artifact from.
pub fn body_of(artifact: &LoadedArtifact) -> Bytes {
    artifact
        .payload::<UnitBody>()
        .expect("in-memory payload")
        .0
        .clone()
}

/// Reference loader publishing into its own cache (not `CODE_CACHE`).
pub fn isolated_loader() -> DynamicLoader {
    isolated_loader_with(LoaderConfig::default())
}

pub fn isolated_loader_with(config: LoaderConfig) -> DynamicLoader {
    DynamicLoader::in_memory(config).with_cache(CodeCache::new())
}

/// Host whose contexts nominally load but never produce an artifact.
#[derive(Debug)]
pub struct EmptyHost;

#[derive(Debug)]
struct EmptyContext;

impl ExecutionContext for EmptyContext {
    fn load(&self, _name: &CodeName) -> Result<Option<Arc<LoadedArtifact>>, LoadError> {
        Ok(None)
    }
}

impl Host for EmptyHost {
    fn instantiate(
        &self,
        _image: Bytes,
        _parent: Arc<dyn Resolve>,
    ) -> Result<Box<dyn ExecutionContext>, LoadError> {
        Ok(Box::new(EmptyContext))
    }
}

/// Translator that records how many translations overlap in time.
#[derive(Debug, Default)]
pub struct ObservingTranslator {
    inner: UnitTranslator,
    delay: Duration,
    /// When set, every translation waits here until `n` are in flight.
    rendezvous: Option<Barrier>,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl ObservingTranslator {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    /// Block each translation until `n` translations are running at once.
    ///
    /// Only use with definitions that are allowed to overlap, otherwise the
    /// first one waits forever.
    pub fn with_rendezvous(n: usize) -> Self {
        Self {
            rendezvous: Some(Barrier::new(n)),
            ..Default::default()
        }
    }
}

impl Translator for ObservingTranslator {
    fn translate(&self, name: &CodeName, raw: Bytes) -> Result<Bytes, LoadError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        if let Some(rendezvous) = &self.rendezvous {
            rendezvous.wait();
        }
        std::thread::sleep(self.delay);
        let result = self.inner.translate(name, raw);
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
