// ============================================================================
// spark-store - Type Definitions
// Callback aliases and listener identity shared by store and selectors
// ============================================================================

use std::fmt;
use std::rc::Rc;

use super::constants::FIRST_LISTENER_ID;

// =============================================================================
// CALLBACK ALIASES
// =============================================================================

/// Zero-argument store listener. The store knows nothing else about it.
pub type ListenerFn = Rc<dyn Fn()>;

/// Pure derivation from the full state to one observer's slice.
pub type DeriveFn<S, Sel> = Rc<dyn Fn(&S) -> Sel>;

/// Equality predicate deciding whether two derived values count as unchanged.
pub type EqualsFn<T> = Rc<dyn Fn(&T, &T) -> bool>;

/// Dependent of a selector, called with the newly delivered value.
pub type DependentFn<Sel> = Rc<dyn Fn(&Rc<Sel>)>;

// =============================================================================
// LISTENER ID
// =============================================================================

/// Unique handle for one registration.
///
/// Subscribing the same closure twice yields two ids and two registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) const FIRST: Self = Self(FIRST_LISTENER_ID);

    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic() {
        let a = ListenerId::FIRST;
        let b = a.next();
        assert!(b > a);
        assert_eq!(a.get(), FIRST_LISTENER_ID);
        assert_eq!(b.to_string(), format!("#{}", FIRST_LISTENER_ID + 1));
    }
}
