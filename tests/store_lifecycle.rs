use spark_store::{
    DebugConfig, MemorySink, RuntimeMode, SelectOptions, Store, StoreError, Unsubscribe,
    UpdateStatus, cloned,
};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use tracing_test::traced_test;

#[test]
fn selector_unsubscribe_is_idempotent() {
    let store = Store::new(0);
    let selector = store.select(|n: &i32| *n);
    assert_eq!(store.listener_count(), 1);

    selector.unsubscribe();
    selector.unsubscribe();
    assert_eq!(store.listener_count(), 0);
    assert!(!selector.is_active());
}

#[test]
fn dependent_unsubscribe_is_idempotent() {
    let store = Store::new(0);
    let selector = store.select(|n: &i32| *n);
    let sub = selector.subscribe(|_| {});
    assert_eq!(selector.dependent_count(), 1);

    sub.unsubscribe();
    sub.unsubscribe();
    assert_eq!(selector.dependent_count(), 0);
}

#[test]
fn selector_dropped_while_store_lives() {
    let store = Store::new(String::from("a"));
    let derives = Rc::new(Cell::new(0));
    {
        let _len = store.select(cloned!(derives => move |s: &String| {
            derives.set(derives.get() + 1);
            s.len()
        }));
        store.set("bb".into()).unwrap();
        assert_eq!(derives.get(), 2);
    }
    store.set("ccc".into()).unwrap();
    assert_eq!(derives.get(), 2, "dropped selector must stop deriving");
    assert_eq!(store.listener_count(), 0);
}

#[test]
fn selector_outlives_every_other_store_handle() {
    let selector = {
        let store = Store::new(5u8);
        store.select(|n: &u8| *n + 1)
    };
    assert_eq!(*selector.get(), 6);
    selector.store().set(9).unwrap();
    assert_eq!(*selector.get(), 10);
}

#[test]
fn selector_deactivates_itself_from_its_own_dependent() {
    let store = Store::new(0);
    let selector = store.select(|n: &i32| *n);
    let deliveries = Rc::new(Cell::new(0));

    let _sub = selector.subscribe({
        let selector = selector.clone();
        let deliveries = deliveries.clone();
        move |_| {
            deliveries.set(deliveries.get() + 1);
            selector.unsubscribe();
        }
    });

    store.set(1).unwrap();
    store.set(2).unwrap();
    assert_eq!(deliveries.get(), 1);
    assert_eq!(*selector.get(), 1);
    assert_eq!(store.listener_count(), 0);
}

#[test]
fn selector_dropped_mid_pass_by_earlier_listener() {
    let store = Store::new(0);
    let holder: Rc<RefCell<Option<spark_store::Selector<i32, i32>>>> =
        Rc::new(RefCell::new(None));
    let derives = Rc::new(Cell::new(0));

    let _dropper = store.subscribe(cloned!(holder => move || {
        holder.borrow_mut().take();
    }));
    *holder.borrow_mut() = Some(store.select(cloned!(derives => move |n: &i32| {
        derives.set(derives.get() + 1);
        *n
    })));

    store.set(1).unwrap();
    assert_eq!(derives.get(), 1, "selector removed before its turn is skipped");
    assert_eq!(store.listener_count(), 1);
}

#[test]
fn listener_added_mid_pass_runs_next_time() {
    let store = Store::new(0);
    let late_hits = Rc::new(Cell::new(0));
    let late: Rc<RefCell<Option<Unsubscribe>>> = Rc::new(RefCell::new(None));

    let _adder = store.subscribe(cloned!(store, late, late_hits => move || {
        if late.borrow().is_none() {
            let sub = store.subscribe(cloned!(late_hits => move || late_hits.set(late_hits.get() + 1)));
            *late.borrow_mut() = Some(sub);
        }
    }));

    store.set(1).unwrap();
    assert_eq!(late_hits.get(), 0);
    store.set(2).unwrap();
    assert_eq!(late_hits.get(), 1);
}

#[test]
#[traced_test]
fn panicking_listener_is_isolated_and_reported() {
    let store = Store::new(0);
    let after = Rc::new(Cell::new(0));
    let selector = store.select(|n: &i32| *n);

    let _bad = store.subscribe(|| panic!("listener failure"));
    let _good = store.subscribe(cloned!(after => move || after.set(after.get() + 1)));

    let err = store.set(4).unwrap_err();
    assert_eq!(
        err,
        StoreError::ListenerPanicked {
            failed: 1,
            notified: 3
        }
    );
    assert_eq!(after.get(), 1);
    assert_eq!(*selector.get(), 4);
    assert_eq!(*store.snapshot(), 4);
    assert!(logs_contain("listener panicked during notification"));
}

#[test]
#[traced_test]
fn panicking_dependent_does_not_fail_the_store_pass() {
    let store = Store::new(0);
    let selector = store.select(|n: &i32| *n);
    let seen = Rc::new(Cell::new(0));

    let _bad = selector.subscribe(|_| panic!("dependent failure"));
    let _good = selector.subscribe(cloned!(seen => move |v: &Rc<i32>| seen.set(**v)));

    store.set(3).unwrap();
    assert_eq!(seen.get(), 3);
    assert!(logs_contain("selector dependents panicked"));
}

/// A value whose `Debug` rendering fails for 2.
struct Touchy(i32);

impl fmt::Debug for Touchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        assert!(self.0 != 2, "cannot render two");
        write!(f, "Touchy({})", self.0)
    }
}

#[test]
#[traced_test]
fn failing_diagnostic_render_does_not_break_the_pass() {
    let sink = Arc::new(MemorySink::new());
    let store = Store::builder(Touchy(1))
        .debug(DebugConfig::new("touchy"))
        .mode(RuntimeMode::Development)
        .sink(sink.clone())
        .build();
    let mirror = store.select_with(
        |t: &Touchy| Touchy(t.0),
        SelectOptions::with_compare(|a: &Touchy, b: &Touchy| a.0 == b.0)
            .debug(DebugConfig::new("mirror")),
    );
    let hits = Rc::new(Cell::new(0));
    let seen = Rc::new(Cell::new(0));
    let _listener = store.subscribe(cloned!(hits => move || hits.set(hits.get() + 1)));
    let _dependent = mirror.subscribe(cloned!(seen => move |t: &Rc<Touchy>| seen.set(t.0)));

    store.set(Touchy(2)).unwrap();

    assert_eq!(store.snapshot().0, 2);
    assert_eq!(store.version(), 1);
    assert_eq!(hits.get(), 1);
    assert_eq!(mirror.get().0, 2);
    assert_eq!(mirror.version(), 1);
    assert_eq!(seen.get(), 2);
    assert!(logs_contain("diagnostic emit panicked"));
    // Only the initial render could be rendered.
    assert_eq!(sink.statuses(), vec![UpdateStatus::InitialRender]);

    store.set(Touchy(3)).unwrap();
    assert_eq!(hits.get(), 2);
    assert_eq!(seen.get(), 3);
}
