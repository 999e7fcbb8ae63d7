//! Redefinition tests for the dynamic loader.
//!
//! Covers the single-thread protocol:
//! - a redefinition is never shadowed by the cache or an ahead-of-time unit
//! - failures publish nothing and leave the thread's marker clear
//! - reentrant definitions on one thread are refused

use std::sync::Arc;

use bytes::Bytes;
use hotswap_core::{
    CodeCache, LoadError, LoadedArtifact, LoaderConfig, NotFound, StaticResolver, guard,
};

use crate::host::{InMemoryHost, UnitBody};
use crate::loader::DynamicLoader;
use crate::tests::test_helpers::{
    EmptyHost, body_of, isolated_loader, isolated_loader_with, name, unit,
};
use crate::translator::UnitTranslator;

#[test]
fn test_define_then_resolve_same_identity() {
    let loader = isolated_loader();
    let foo = name("pkg.Foo");

    let a1 = loader.define(&foo, unit(&foo, b"v1")).expect("defined");
    let r1 = loader.resolve(&foo).expect("resolvable");
    let r2 = loader.resolve(&foo).expect("resolvable");

    assert!(Arc::ptr_eq(&a1, &r1));
    assert!(Arc::ptr_eq(&r1, &r2));
    assert_eq!(body_of(&r1), Bytes::from_static(b"v1"));
}

#[test]
fn test_redefinition_replaces_previous_artifact() {
    let loader = isolated_loader();
    let foo = name("pkg.Foo");

    let a1 = loader.define(&foo, unit(&foo, b"v1")).expect("defined");
    assert!(Arc::ptr_eq(&loader.resolve(&foo).expect("resolvable"), &a1));

    // a1 is still held here, so the old definition is alive and cached
    // right up to the moment of redefinition.
    let a2 = loader.define(&foo, unit(&foo, b"v2")).expect("redefined");

    assert!(!Arc::ptr_eq(&a1, &a2));
    assert!(a2.id() > a1.id());
    assert_eq!(body_of(&a2), Bytes::from_static(b"v2"));

    let resolved = loader.resolve(&foo).expect("resolvable");
    assert!(Arc::ptr_eq(&resolved, &a2));
    assert_eq!(loader.cache().len(), 1);
    assert_eq!(loader.metrics().snapshot().redefinitions, 1);
}

#[test]
fn test_redefinition_not_shadowed_by_ahead_of_time_unit() {
    let foo = name("pkg.Foo");
    let mut aot = StaticResolver::new();
    let linked = Arc::new(LoadedArtifact::new(
        foo.clone(),
        0,
        UnitBody(Bytes::from_static(b"aot")),
    ));
    aot.insert(Arc::clone(&linked));
    let loader = isolated_loader().with_ancestor(Arc::new(aot));

    assert!(Arc::ptr_eq(&loader.resolve(&foo).expect("ahead-of-time"), &linked));

    let defined = loader.define(&foo, unit(&foo, b"repl")).expect("defined");
    assert_eq!(body_of(&defined), Bytes::from_static(b"repl"));
    assert!(Arc::ptr_eq(&loader.resolve(&foo).expect("cached"), &defined));

    // Once the dynamic definition is released the ahead-of-time unit shows
    // through again.
    drop(defined);
    assert!(Arc::ptr_eq(&loader.resolve(&foo).expect("ahead-of-time"), &linked));
}

#[test]
fn test_malformed_unit_publishes_nothing() {
    let loader = isolated_loader();
    let bad = name("pkg.Bad");

    let err = loader
        .define(&bad, Bytes::from_static(b"not a unit"))
        .expect_err("malformed");

    assert!(err.is_translation());
    assert_eq!(err.name, bad);
    assert_eq!(loader.resolve(&bad).err(), Some(NotFound(bad.clone())));
    assert!(!loader.cache().contains(&bad));
    assert_eq!(guard::current(), None);
    assert_eq!(loader.metrics().snapshot().definition_failures, 1);
}

#[test]
fn test_failed_redefinition_invalidates_old_entry() {
    let loader = isolated_loader();
    let foo = name("pkg.Foo");
    let _v1 = loader.define(&foo, unit(&foo, b"v1")).expect("defined");

    loader
        .define(&foo, Bytes::from_static(b"garbage"))
        .expect_err("malformed");

    assert!(loader.resolve(&foo).is_err());
    // A retry with good bytes succeeds.
    let v2 = loader.define(&foo, unit(&foo, b"v2")).expect("retried");
    assert_eq!(body_of(&v2), Bytes::from_static(b"v2"));
}

#[test]
fn test_empty_result_is_definition_error() {
    let loader = DynamicLoader::new(Arc::new(UnitTranslator::new()), Arc::new(EmptyHost))
        .with_cache(CodeCache::new());
    let foo = name("pkg.Foo");

    let err = loader.define(&foo, unit(&foo, b"v1")).expect_err("empty");

    assert!(matches!(err.cause, LoadError::EmptyResult));
    assert_eq!(err.to_string(), "failed to define pkg.Foo: empty load result");
    assert!(loader.cache().is_empty());
    assert_eq!(guard::current(), None);
}

#[test]
fn test_instantiation_failure_is_definition_error() {
    let config = LoaderConfig {
        min_host_api: 30,
        ..Default::default()
    };
    let loader = DynamicLoader::with_config(
        Arc::new(UnitTranslator::with_config(config.clone())),
        Arc::new(InMemoryHost::new(26)),
        config,
    )
    .with_cache(CodeCache::new());
    let foo = name("pkg.Foo");

    let err = loader.define(&foo, unit(&foo, b"v1")).expect_err("host too old");

    assert!(matches!(err.cause, LoadError::Instantiation(_)));
    assert!(!err.is_translation());
    assert_eq!(guard::current(), None);
}

#[test]
fn test_in_memory_host_matches_configured_api_level() {
    let loader = isolated_loader_with(LoaderConfig {
        min_host_api: 28,
        ..Default::default()
    });
    let foo = name("pkg.Foo");

    let defined = loader.define(&foo, unit(&foo, b"v1")).expect("host runs at API 28");
    assert_eq!(body_of(&defined), Bytes::from_static(b"v1"));

    // Below the default level the host keeps its default.
    let older = isolated_loader_with(LoaderConfig {
        min_host_api: 21,
        ..Default::default()
    });
    assert!(older.define(&foo, unit(&foo, b"v1")).is_ok());
}

#[test]
fn test_translation_limits_come_from_translator() {
    let config = LoaderConfig {
        max_unit_size: 8,
        ..Default::default()
    };
    let foo = name("pkg.Foo");

    // The size limit belongs to the translator's config, not the loader's.
    let lenient = DynamicLoader::with_config(
        Arc::new(UnitTranslator::new()),
        Arc::new(InMemoryHost::default()),
        config.clone(),
    )
    .with_cache(CodeCache::new());
    assert!(lenient.define(&foo, unit(&foo, &[0u8; 64])).is_ok());

    let strict = DynamicLoader::with_config(
        Arc::new(UnitTranslator::with_config(config.clone())),
        Arc::new(InMemoryHost::default()),
        config,
    )
    .with_cache(CodeCache::new());
    let err = strict
        .define(&foo, unit(&foo, &[0u8; 64]))
        .expect_err("oversized");
    assert!(matches!(err.cause, LoadError::UnitTooLarge { max: 8, .. }));
}

#[test]
fn test_oversized_unit_rejected() {
    let loader = isolated_loader_with(LoaderConfig {
        max_unit_size: 16,
        ..Default::default()
    });
    let foo = name("pkg.Foo");

    let err = loader
        .define(&foo, unit(&foo, &[0u8; 64]))
        .expect_err("oversized");

    assert!(matches!(err.cause, LoadError::UnitTooLarge { max: 16, .. }));
    assert!(err.is_translation());
}

#[test]
fn test_reentrant_definition_refused() {
    let loader = isolated_loader();
    let outer = name("pkg.Outer");
    let inner = name("pkg.Inner");

    let scope = guard::begin(outer.clone()).expect("no marker yet");
    let err = loader
        .define(&inner, unit(&inner, b"v1"))
        .expect_err("marker already held");

    assert!(matches!(
        err.cause,
        LoadError::DefinitionInFlight { ref in_flight } if *in_flight == outer
    ));
    assert_eq!(guard::current(), Some(outer));
    assert!(!loader.cache().contains(&inner));
    drop(scope);

    assert!(loader.define(&inner, unit(&inner, b"v1")).is_ok());
}

#[test]
fn test_reentrant_same_name_does_not_deadlock_when_serialized() {
    let loader = isolated_loader_with(LoaderConfig {
        serialize_redefinitions: true,
        ..Default::default()
    });
    let foo = name("pkg.Foo");

    let _scope = guard::begin(foo.clone()).expect("no marker yet");
    let err = loader.define(&foo, unit(&foo, b"v1")).expect_err("in flight");
    assert!(matches!(err.cause, LoadError::DefinitionInFlight { .. }));
}

#[test]
fn test_resolver_usable_as_parent_after_definition() {
    let loader = isolated_loader();
    let foo = name("pkg.Foo");
    let defined = loader.define(&foo, unit(&foo, b"v1")).expect("defined");

    let parent = loader.resolver();
    assert!(Arc::ptr_eq(&parent.resolve(&foo).expect("resolvable"), &defined));
    assert!(parent.resolve(&name("pkg.Unknown")).is_err());
}
