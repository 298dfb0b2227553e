// File: src/trigger.rs
// Purpose: Debounced field validation driven by UI events

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use valang_core::FormView;

use crate::engine::ValangValidator;

/// UI events that re-validate a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEvent {
    Blur,
    Change,
    KeyUp,
    KeyDown,
}

impl FieldEvent {
    pub fn is_keystroke(self) -> bool {
        matches!(self, FieldEvent::KeyUp | FieldEvent::KeyDown)
    }
}

/// Coalesces bursts of field events into one validation per field.
///
/// Each field has at most one pending timer; a new event replaces it.
pub struct EventTrigger<F> {
    validator: Arc<Mutex<ValangValidator<F>>>,
    pending: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl<F> EventTrigger<F>
where
    F: FormView + Send + 'static,
{
    pub fn new(validator: ValangValidator<F>) -> Self {
        Self {
            validator: Arc::new(Mutex::new(validator)),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Read-only access to the validator. Validation goes through
    /// `validate_now` and `submit`, which cancel pending timers first.
    pub fn inspect<R>(&self, f: impl FnOnce(&ValangValidator<F>) -> R) -> R {
        f(&lock(&self.validator))
    }

    /// Schedule validation of `field` after the event's debounce delay,
    /// replacing any timer already pending for it. Returns false when the
    /// event is ignored (unbound field, event type switched off, or no
    /// tokio runtime to run the timer on).
    pub fn fire(&self, field: &str, event: FieldEvent) -> bool {
        let Some(delay) = self.delay_for(field, event) else {
            return false;
        };
        let Ok(runtime) = Handle::try_current() else {
            warn!(field, ?event, "no tokio runtime, event dropped");
            return false;
        };

        let mut pending = self.timers();
        if let Some(previous) = pending.remove(field) {
            previous.abort();
        }

        let validator = self.validator.clone();
        let name = field.to_string();
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let valid = lock(&validator).validate_field(&name);
            debug!(field = %name, valid, "debounced validation ran");
        });
        pending.insert(field.to_string(), handle);

        debug!(field, ?event, ?delay, "validation scheduled");
        true
    }

    /// Cancel any pending timer and validate `field` right away
    pub fn validate_now(&self, field: &str) -> bool {
        if let Some(previous) = self.timers().remove(field) {
            previous.abort();
        }
        lock(&self.validator).validate_field(field)
    }

    /// Cancel every pending timer and run the submit handler
    pub fn submit(&self) -> bool {
        for (_, handle) in self.timers().drain() {
            handle.abort();
        }
        lock(&self.validator).handle_submit()
    }

    /// Fields with a timer still waiting to fire
    pub fn pending(&self) -> Vec<String> {
        let mut fields: Vec<String> = self
            .timers()
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(field, _)| field.clone())
            .collect();
        fields.sort();
        fields
    }

    fn delay_for(&self, field: &str, event: FieldEvent) -> Option<Duration> {
        let validator = lock(&self.validator);
        if !validator.is_bound(field) {
            return None;
        }

        let events = &validator.config().events;
        let enabled = match event {
            FieldEvent::Blur => events.validate_on_blur,
            FieldEvent::Change => events.validate_on_change,
            FieldEvent::KeyUp | FieldEvent::KeyDown => events.validate_on_key,
        };
        if !enabled {
            return None;
        }

        Some(if event.is_keystroke() {
            events.keystroke_debounce()
        } else {
            events.debounce()
        })
    }

    fn timers(&self) -> MutexGuard<'_, HashMap<String, JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<F> Drop for EventTrigger<F> {
    fn drop(&mut self) {
        let pending = self.pending.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, handle) in pending.drain() {
            handle.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
