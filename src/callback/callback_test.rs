use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;

use super::*;

fn counting_callback(counter: &Arc<AtomicUsize>) -> ReloadCallback {
    let counter = Arc::clone(counter);
    Arc::new(move |_key: &str| {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn dispatch_invokes_registered_callback_with_key() {
    let registry = CallbackRegistry::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    registry.register(
        "/svc/config/log/level",
        Arc::new(move |key: &str| seen_clone.lock().push(key.to_string())),
    );

    assert!(registry.dispatch("/svc/config/log/level"));
    assert_eq!(*seen.lock(), vec!["/svc/config/log/level".to_string()]);
}

#[test]
fn dispatch_without_callback_is_noop() {
    let registry = CallbackRegistry::new();

    assert!(!registry.dispatch("/svc/config/name"));
    assert!(registry.is_empty());
}

#[test]
fn register_replaces_existing_callback() {
    let registry = CallbackRegistry::new();
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    assert!(registry.register("k", counting_callback(&first)).is_none());
    assert!(registry.register("k", counting_callback(&second)).is_some());
    registry.dispatch("k");

    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);
    assert_eq!(registry.len(), 1);
}

#[test]
fn callback_may_register_during_dispatch() {
    let registry = Arc::new(CallbackRegistry::new());
    let inner = Arc::clone(&registry);
    registry.register(
        "outer",
        Arc::new(move |_key: &str| {
            inner.register("nested", Arc::new(|_key: &str| {}));
        }),
    );

    registry.dispatch("outer");

    assert!(registry.contains("nested"));
}
