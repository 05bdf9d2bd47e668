//! Process-wide diagnostic event log.
//!
//! A bounded, newest-first ring of events shared by every lifecycle
//! controller and read by the debug overlay. The default process-wide bus is
//! reachable through [`global()`]; consumers take a [`DiagnosticBus`] handle
//! so tests can run against isolated instances.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, Weak};

pub const DEFAULT_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub severity: Severity,
}

type Handler = Arc<dyn Fn(&DiagnosticEvent) + Send + Sync>;

struct BusInner {
    events: VecDeque<DiagnosticEvent>,
    capacity: usize,
    subscribers: HashMap<u64, Handler>,
    next_token: u64,
}

/// Handle to a shared diagnostic bus. Cloning is cheap and all clones point
/// at the same buffer.
#[derive(Clone)]
pub struct DiagnosticBus {
    inner: Arc<Mutex<BusInner>>,
}

impl DiagnosticBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BusInner {
                events: VecDeque::new(),
                capacity: capacity.max(1),
                subscribers: HashMap::new(),
                next_token: 0,
            })),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Append an event, evicting the oldest entry past capacity, and notify
    /// every current subscriber with the new event. The line is also
    /// mirrored to the `log` facade.
    pub fn record(&self, message: impl Into<String>, severity: Severity) {
        let event = DiagnosticEvent {
            timestamp: Utc::now(),
            message: message.into(),
            severity,
        };

        match severity {
            Severity::Error => log::error!("[diag] {}", event.message),
            _ => log::info!("[diag] {}", event.message),
        }

        // Handlers run outside the lock so they may read the bus themselves.
        let handlers: Vec<Handler> = {
            let mut inner = self.inner.lock().unwrap();
            inner.events.push_front(event.clone());
            if inner.events.len() > inner.capacity {
                inner.events.pop_back();
            }
            inner.subscribers.values().cloned().collect()
        };

        for handler in handlers {
            handler(&event);
        }
    }

    /// Register a handler for events recorded after this call. History is
    /// not replayed; read [`snapshot`](Self::snapshot) for initial state.
    pub fn subscribe(
        &self,
        handler: impl Fn(&DiagnosticEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let mut inner = self.inner.lock().unwrap();
        let token = inner.next_token;
        inner.next_token += 1;
        inner.subscribers.insert(token, Arc::new(handler));
        Subscription {
            bus: Arc::downgrade(&self.inner),
            token,
        }
    }

    /// Current buffer contents, newest first.
    pub fn snapshot(&self) -> Vec<DiagnosticEvent> {
        let inner = self.inner.lock().unwrap();
        inner.events.iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().events.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().unwrap().capacity
    }
}

/// Deregisters its handler when dropped.
pub struct Subscription {
    bus: Weak<Mutex<BusInner>>,
    token: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            if let Ok(mut inner) = inner.lock() {
                inner.subscribers.remove(&self.token);
            }
        }
    }
}

static GLOBAL: Lazy<DiagnosticBus> = Lazy::new(DiagnosticBus::with_default_capacity);

/// The process-wide bus. Lazily initialized, never torn down.
pub fn global() -> DiagnosticBus {
    GLOBAL.clone()
}
