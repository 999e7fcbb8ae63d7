//! Redefinition guard.
//!
//! While a thread is (re)defining a unit, its resolvers must not hand back
//! the old definition of that unit: the execution context loading the new
//! image asks its parent first, and a parent that answers from the cache or
//! from an ahead-of-time resolver would shadow the fresh bytes. The guard
//! records which name the current thread is defining so that
//! `NameResolver` can refuse exactly that name.
//!
//! The marker is thread-scoped. Two threads redefining different names never
//! see each other's marker, and two threads redefining the *same* name are
//! not serialized by the guard alone (see `DefinitionLocks` in
//! `hotswap-dynload` for that).

use std::cell::RefCell;
use std::marker::PhantomData;

use crate::error::LoadError;
use crate::name::CodeName;

thread_local! {
    static IN_FLIGHT: RefCell<Option<CodeName>> = const { RefCell::new(None) };
}

/// Scoped redefinition marker returned by [`begin`].
///
/// Dropping the scope clears the marker, on every exit path including
/// unwinding. The scope is `!Send`: the marker belongs to the thread that
/// set it.
#[derive(Debug)]
#[must_use = "the marker is cleared as soon as the scope is dropped"]
pub struct DefinitionScope {
    name: CodeName,
    _not_send: PhantomData<*const ()>,
}

impl DefinitionScope {
    pub fn name(&self) -> &CodeName {
        &self.name
    }
}

impl Drop for DefinitionScope {
    fn drop(&mut self) {
        end();
    }
}

/// Mark `name` as being defined by the current thread.
///
/// Fails with [`LoadError::DefinitionInFlight`] if this thread already holds
/// a marker; the existing marker is left untouched.
pub fn begin(name: CodeName) -> Result<DefinitionScope, LoadError> {
    IN_FLIGHT.with(|slot| {
        let mut slot = slot.borrow_mut();
        if let Some(in_flight) = slot.as_ref() {
            return Err(LoadError::DefinitionInFlight {
                in_flight: in_flight.clone(),
            });
        }
        *slot = Some(name.clone());
        Ok(DefinitionScope {
            name,
            _not_send: PhantomData,
        })
    })
}

/// Clear the current thread's marker. Normally called by dropping the scope.
fn end() {
    IN_FLIGHT.with(|slot| {
        slot.borrow_mut().take();
    });
}

/// Whether the current thread is in the middle of defining `name`.
pub fn is_being_defined(name: &CodeName) -> bool {
    IN_FLIGHT.with(|slot| slot.borrow().as_ref() == Some(name))
}

/// Name the current thread is defining, if any.
pub fn current() -> Option<CodeName> {
    IN_FLIGHT.with(|slot| slot.borrow().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> CodeName {
        CodeName::new(s).expect("valid name")
    }

    #[test]
    fn test_scope_sets_and_clears_marker() {
        let foo = name("pkg.Foo");
        {
            let _scope = begin(foo.clone()).expect("no marker yet");
            assert!(is_being_defined(&foo));
            assert!(!is_being_defined(&name("pkg.Bar")));
        }
        assert!(!is_being_defined(&foo));
        assert_eq!(current(), None);
    }

    #[test]
    fn test_reentrant_begin_is_refused() {
        let _scope = begin(name("pkg.Outer")).expect("no marker yet");
        let err = begin(name("pkg.Inner")).expect_err("marker already set");
        assert!(matches!(
            err,
            LoadError::DefinitionInFlight { ref in_flight } if in_flight.as_str() == "pkg.Outer"
        ));
        // The refused attempt must not clear the outer marker.
        assert_eq!(current(), Some(name("pkg.Outer")));
    }

    #[test]
    fn test_marker_cleared_on_unwind() {
        let foo = name("pkg.Panics");
        let result = std::panic::catch_unwind(|| {
            let _scope = begin(foo.clone()).expect("no marker yet");
            panic!("load blew up");
        });
        assert!(result.is_err());
        assert!(!is_being_defined(&foo));
    }

    #[test]
    fn test_markers_are_per_thread() {
        let foo = name("pkg.Foo");
        let _scope = begin(foo.clone()).expect("no marker yet");

        let other = std::thread::spawn({
            let foo = foo.clone();
            move || {
                let seen = is_being_defined(&foo);
                let own = begin(name("pkg.Bar")).map(|_scope| ());
                (seen, own.is_ok())
            }
        })
        .join()
        .expect("thread finished");

        assert_eq!(other, (false, true));
        assert!(is_being_defined(&foo));
    }
}
