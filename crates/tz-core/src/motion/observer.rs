//! Observers notified on every playback step.
//!
//! Any number of consumers (renderer, logger, test harness) can subscribe to
//! the positions produced by [`MotionPlayer::step`](super::MotionPlayer::step).

use std::collections::BTreeMap;
use std::fmt;

/// Receiver of playback updates.
pub trait MotionObserver: Send {
    /// Returns the name of this observer.
    fn name(&self) -> &str;

    /// Observers with lower priority are notified first.
    fn priority(&self) -> i32 {
        0
    }

    /// Called with the positions returned by one playback step.
    fn on_update(&mut self, time: f32, positions: &BTreeMap<String, f32>);
}

/// Observer backed by a closure.
pub struct FnObserver<F> {
    name: String,
    callback: F,
}

impl<F> FnObserver<F>
where
    F: FnMut(f32, &BTreeMap<String, f32>) + Send,
{
    pub fn new(name: impl Into<String>, callback: F) -> Self {
        Self {
            name: name.into(),
            callback,
        }
    }
}

impl<F> MotionObserver for FnObserver<F>
where
    F: FnMut(f32, &BTreeMap<String, f32>) + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn on_update(&mut self, time: f32, positions: &BTreeMap<String, f32>) {
        (self.callback)(time, positions)
    }
}

/// Registry for managing motion observers.
pub struct ObserverRegistry {
    observers: Vec<Box<dyn MotionObserver>>,
    sorted: bool,
}

impl ObserverRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
            sorted: true,
        }
    }

    /// Registers a new observer.
    pub fn register<O: MotionObserver + 'static>(&mut self, observer: O) {
        tracing::debug!("Registered motion observer '{}'", observer.name());
        self.observers.push(Box::new(observer));
        self.sorted = false;
    }

    /// Unregisters an observer by name.
    ///
    /// Returns the removed observer, or None if not found.
    pub fn unregister(&mut self, name: &str) -> Option<Box<dyn MotionObserver>> {
        let pos = self.observers.iter().position(|o| o.name() == name)?;
        Some(self.observers.remove(pos))
    }

    /// Returns true if the registry contains an observer with the given name.
    pub fn contains(&self, name: &str) -> bool {
        self.observers.iter().any(|o| o.name() == name)
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Names of all observers in notification order.
    pub fn names(&mut self) -> Vec<String> {
        self.ensure_sorted();
        self.observers.iter().map(|o| o.name().to_string()).collect()
    }

    fn ensure_sorted(&mut self) {
        if !self.sorted {
            self.observers.sort_by_key(|o| o.priority());
            self.sorted = true;
        }
    }

    /// Notifies every observer in priority order.
    pub fn notify_all(&mut self, time: f32, positions: &BTreeMap<String, f32>) {
        self.ensure_sorted();
        for observer in &mut self.observers {
            observer.on_update(time, positions);
        }
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.observers.iter().map(|o| o.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    struct Recorder {
        name: String,
        priority: i32,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl MotionObserver for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn on_update(&mut self, time: f32, _positions: &BTreeMap<String, f32>) {
            self.log.lock().push(format!("{}@{}", self.name, time));
        }
    }

    fn recorder(name: &str, priority: i32, log: &Arc<Mutex<Vec<String>>>) -> Recorder {
        Recorder {
            name: name.to_string(),
            priority,
            log: Arc::clone(log),
        }
    }

    #[test]
    fn test_registry_register() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ObserverRegistry::new();
        assert!(registry.is_empty());

        registry.register(recorder("renderer", 0, &log));
        registry.register(recorder("logger", 10, &log));
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("renderer"));
        assert!(!registry.contains("missing"));
    }

    #[test]
    fn test_registry_priority_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ObserverRegistry::new();
        registry.register(recorder("late", 10, &log));
        registry.register(recorder("early", -5, &log));
        registry.register(recorder("middle", 0, &log));

        assert_eq!(registry.names(), ["early", "middle", "late"]);
        registry.notify_all(1.5, &BTreeMap::new());
        assert_eq!(*log.lock(), ["early@1.5", "middle@1.5", "late@1.5"]);
    }

    #[test]
    fn test_registry_unregister() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ObserverRegistry::new();
        registry.register(recorder("a", 0, &log));
        registry.register(FnObserver::new("b", |_, _: &BTreeMap<String, f32>| {}));

        let removed = registry.unregister("a");
        assert_eq!(removed.map(|o| o.name().to_string()), Some("a".to_string()));
        assert!(registry.unregister("a").is_none());
        assert_eq!(registry.len(), 1);

        registry.notify_all(0.0, &BTreeMap::new());
        assert!(log.lock().is_empty());
    }
}
