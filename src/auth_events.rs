use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError, Weak,
        atomic::{AtomicU64, Ordering},
    },
};
use uuid::Uuid;

/// AuthEvent
///
/// A session-state transition observed by this server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn { user_id: Uuid },
    SignedOut { user_id: Uuid },
    /// A reset link was exchanged for a session.
    PasswordRecovery { user_id: Uuid },
    PasswordUpdated { user_id: Uuid },
}

impl AuthEvent {
    pub fn user_id(&self) -> Uuid {
        match self {
            AuthEvent::SignedIn { user_id }
            | AuthEvent::SignedOut { user_id }
            | AuthEvent::PasswordRecovery { user_id }
            | AuthEvent::PasswordUpdated { user_id } => *user_id,
        }
    }
}

type Listener = Arc<dyn Fn(&AuthEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<u64, Listener>>,
}

impl Registry {
    fn listeners(&self) -> MutexGuard<'_, HashMap<u64, Listener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// AuthEvents
///
/// Explicit subscription point for session-state transitions. Cloning shares the
/// same registry, so the copy held by `AppState` and the one held by `main` see the
/// same listeners.
#[derive(Clone, Default)]
pub struct AuthEvents {
    registry: Arc<Registry>,
}

impl AuthEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` until the returned `Subscription` is dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&AuthEvent) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.listeners().insert(id, Arc::new(callback));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Delivers `event` to every live subscriber.
    pub fn emit(&self, event: AuthEvent) {
        // Callbacks run outside the lock so they may subscribe or unsubscribe themselves.
        let listeners: Vec<Listener> = self.registry.listeners().values().cloned().collect();
        for listener in listeners {
            listener(&event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.listeners().len()
    }
}

/// Subscription
///
/// Handle returned by `AuthEvents::subscribe`. Dropping it detaches the callback.
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    /// Detaches the callback now; equivalent to dropping the handle.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.listeners().remove(&self.id);
        }
    }
}
