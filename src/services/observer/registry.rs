use super::Observer;
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

/// Observers keyed by caller identity.
///
/// Runs started for the same caller record into the same observer.
#[derive(Debug, Default)]
pub struct ObserverRegistry {
    observers: Mutex<HashMap<Uuid, Arc<Observer>>>,
}

impl ObserverRegistry {
    /// Create empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The observer for `caller`, created on first use.
    pub fn get_or_create(&self, caller: Uuid) -> Arc<Observer> {
        self.observers
            .lock()
            .entry(caller)
            .or_insert_with(|| {
                tracing::debug!(caller = %caller, "Registering observer");
                Arc::new(Observer::new())
            })
            .clone()
    }

    pub fn get(&self, caller: &Uuid) -> Option<Arc<Observer>> {
        self.observers.lock().get(caller).cloned()
    }

    pub fn remove(&self, caller: &Uuid) -> Option<Arc<Observer>> {
        self.observers.lock().remove(caller)
    }

    pub fn len(&self) -> usize {
        self.observers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.lock().is_empty()
    }
}
