// ============================================================================
// spark-store - Provider Context
// Thread-local stack of provided stores
// ============================================================================
//
// A store becomes visible to code running inside `provide(&store, f)`.
// Frames are type-erased (`Rc<dyn Any>`) so stores of different state types
// can share one stack; lookups walk from the innermost frame outwards, so an
// inner store shadows an outer store of the same type.
// ============================================================================

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

thread_local! {
    static PROVIDED: RefCell<Vec<Rc<dyn Any>>> = const { RefCell::new(Vec::new()) };
}

/// Push a frame, returning the depth it was pushed at.
pub(crate) fn push_frame(frame: Rc<dyn Any>) -> usize {
    PROVIDED.with(|stack| {
        let mut stack = stack.borrow_mut();
        stack.push(frame);
        stack.len() - 1
    })
}

/// Drop every frame at or above `depth`.
pub(crate) fn truncate_frames(depth: usize) {
    // Collect first so frame destructors run outside the borrow.
    let popped: Vec<Rc<dyn Any>> = PROVIDED.with(|stack| {
        let mut stack = stack.borrow_mut();
        if depth < stack.len() {
            stack.drain(depth..).collect()
        } else {
            Vec::new()
        }
    });
    drop(popped);
}

/// Innermost frame of concrete type `T`, cloned.
pub(crate) fn find_frame<T: Clone + 'static>() -> Option<T> {
    PROVIDED.with(|stack| {
        stack
            .borrow()
            .iter()
            .rev()
            .find_map(|frame| frame.downcast_ref::<T>().cloned())
    })
}

/// Number of frames currently provided on this thread.
pub fn provided_depth() -> usize {
    PROVIDED.with(|stack| stack.borrow().len())
}
