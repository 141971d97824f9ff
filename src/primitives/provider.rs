// ============================================================================
// spark-store - Provider
// Scope a store to a call tree and look it up from anywhere inside it
// ============================================================================

use std::fmt;

use crate::core::context;
use crate::core::error::{Result, StoreError};
use crate::primitives::selector::{SelectOptions, Selector};
use crate::primitives::store::Store;
use crate::reactivity::equality::SameValue;

/// Pops the frame pushed by `provide`, even when `f` unwinds.
struct ProvideGuard {
    depth: usize,
}

impl Drop for ProvideGuard {
    fn drop(&mut self) {
        context::truncate_frames(self.depth);
    }
}

/// Make `store` visible to [`use_store`] and friends while `f` runs.
///
/// Providers nest; an inner store shadows an outer store of the same state
/// type.
///
/// # Example
///
/// ```
/// use spark_store::{Store, provide, use_store};
///
/// let store = Store::new(5u32);
/// let seen = provide(&store, || *use_store::<u32>().unwrap().snapshot());
/// assert_eq!(seen, 5);
/// assert!(use_store::<u32>().is_err());
/// ```
pub fn provide<S: 'static, R>(store: &Store<S>, f: impl FnOnce() -> R) -> R {
    let depth = context::push_frame(std::rc::Rc::new(store.clone()));
    let _guard = ProvideGuard { depth };
    tracing::trace!(depth, state = std::any::type_name::<S>(), "store provided");
    f()
}

/// The innermost provided store for state type `S`.
pub fn use_store<S: 'static>() -> Result<Store<S>> {
    context::find_frame::<Store<S>>().ok_or_else(|| {
        let err = StoreError::missing::<S>();
        tracing::warn!(error = %err, "store lookup failed");
        err
    })
}

/// Bind a selector on the provided store with the default comparator.
pub fn use_selector<S: 'static, Sel>(
    derive: impl Fn(&S) -> Sel + 'static,
) -> Result<Selector<S, Sel>>
where
    Sel: SameValue + 'static,
{
    Ok(use_store::<S>()?.select(derive))
}

pub fn use_selector_with<S: 'static, Sel: 'static>(
    derive: impl Fn(&S) -> Sel + 'static,
    options: SelectOptions<Sel>,
) -> Result<Selector<S, Sel>> {
    Ok(use_store::<S>()?.select_with(derive, options))
}

/// A write-only capability for the provided store.
pub fn use_setter<S: 'static>() -> Result<StoreSetter<S>> {
    use_store::<S>().map(|store| StoreSetter { store })
}

// =============================================================================
// STORE SETTER
// =============================================================================

/// Mutation handle that cannot read or subscribe.
pub struct StoreSetter<S> {
    store: Store<S>,
}

impl<S> Clone for StoreSetter<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: 'static> StoreSetter<S> {
    pub fn set_state(&self, transition: impl FnOnce(&S) -> S) -> Result<()> {
        self.store.set_state(transition)
    }

    pub fn set(&self, next: S) -> Result<()> {
        self.store.set(next)
    }
}

impl<S> fmt::Debug for StoreSetter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreSetter")
            .field("state", &std::any::type_name::<S>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::provided_depth;
    use tracing_test::traced_test;

    #[test]
    fn lookup_inside_and_outside_scope() {
        let store = Store::new(String::from("hi"));
        assert!(use_store::<String>().is_err());

        provide(&store, || {
            let found = use_store::<String>().unwrap();
            assert!(found.ptr_eq(&store));
        });

        assert!(use_store::<String>().is_err());
    }

    #[test]
    fn inner_provider_shadows_outer() {
        let outer = Store::new(1i64);
        let inner = Store::new(2i64);

        provide(&outer, || {
            provide(&inner, || {
                assert_eq!(*use_store::<i64>().unwrap().snapshot(), 2);
            });
            assert_eq!(*use_store::<i64>().unwrap().snapshot(), 1);
        });
    }

    #[test]
    fn different_state_types_coexist() {
        let numbers = Store::new(3u16);
        let flags = Store::new(true);
        provide(&numbers, || {
            provide(&flags, || {
                assert_eq!(*use_store::<u16>().unwrap().snapshot(), 3);
                assert!(*use_store::<bool>().unwrap().snapshot());
            });
        });
    }

    #[test]
    #[traced_test]
    fn missing_store_is_an_error_for_every_hook() {
        let err = use_selector::<u8, u8>(|n| *n).unwrap_err();
        assert!(err.is_missing_store());
        assert!(use_setter::<u8>().is_err());
        assert!(
            use_selector_with::<u8, u8>(|n| *n, SelectOptions::new())
                .unwrap_err()
                .is_missing_store()
        );
        assert!(logs_contain("store lookup failed"));
    }

    #[test]
    fn frame_is_popped_on_panic() {
        let base = provided_depth();
        let store = Store::new(0u8);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            provide::<u8, ()>(&store, || {
                assert_eq!(provided_depth(), base + 1);
                panic!("inside provider");
            })
        }));
        assert!(result.is_err());
        assert_eq!(provided_depth(), base);
    }

    #[test]
    fn setter_and_selector_hooks_share_the_store() {
        let store = Store::new(10i32);
        provide(&store, || {
            let doubled = use_selector::<i32, i32>(|n| n * 2).unwrap();
            let setter = use_setter::<i32>().unwrap();
            setter.set_state(|n| n + 1).unwrap();
            assert_eq!(*doubled.get(), 22);
            setter.set(0).unwrap();
            assert_eq!(*doubled.get(), 0);
        });
    }
}
