// ============================================================================
// spark-store - Ergonomic Macros
// ============================================================================

/// Clone handles into a move closure.
///
/// Saves the `let x = x.clone();` block before every listener or dependent
/// that needs its own copy of a store or selector.
///
/// # Usage
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use spark_store::{cloned, Store};
///
/// let store = Store::new(0);
/// let seen = Rc::new(Cell::new(0));
///
/// let _sub = store.subscribe(cloned!(store, seen => move || seen.set(*store.snapshot())));
/// store.set(3).unwrap();
/// assert_eq!(seen.get(), 3);
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}
