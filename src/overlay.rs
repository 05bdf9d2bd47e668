//! Headless model for the diagnostics overlay.
//!
//! The overlay mirrors the diagnostic bus and polls host/credential status
//! on a fixed interval for display. It is strictly observational toward the
//! lifecycle controllers: the only write paths are a full reload callback
//! and a controller's own public `retry`.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::{
    controller::ResourceController,
    credential::CredentialGate,
    diagnostics::{DiagnosticBus, DiagnosticEvent, Subscription},
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialProbe {
    /// No poll has completed yet.
    Checking,
    Present,
    Missing,
}

impl CredentialProbe {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialProbe::Checking => "checking",
            CredentialProbe::Present => "present",
            CredentialProbe::Missing => "missing",
        }
    }
}

struct OverlayShared {
    open: bool,
    host_present: bool,
    credential: CredentialProbe,
    events: Vec<DiagnosticEvent>,
    max_events: usize,
}

pub struct DebugOverlay {
    bus: DiagnosticBus,
    gate: CredentialGate,
    shared: Arc<Mutex<OverlayShared>>,
    reload: Option<Arc<dyn Fn() + Send + Sync>>,
    poller: Mutex<Option<JoinHandle<()>>>,
    _subscription: Subscription,
}

impl DebugOverlay {
    pub fn new(bus: DiagnosticBus, gate: CredentialGate) -> Self {
        let max_events = bus.capacity();
        let shared = Arc::new(Mutex::new(OverlayShared {
            open: false,
            host_present: gate.host_present(),
            credential: CredentialProbe::Checking,
            events: Vec::new(),
            max_events,
        }));

        // Subscribe first, then seed from the snapshot, so nothing recorded
        // in between is lost.
        let sink = Arc::clone(&shared);
        let subscription = bus.subscribe(move |event| {
            let mut shared = sink.lock().unwrap();
            shared.events.insert(0, event.clone());
            let max_events = shared.max_events;
            shared.events.truncate(max_events);
        });
        shared.lock().unwrap().events = bus.snapshot();

        Self {
            bus,
            gate,
            shared,
            reload: None,
            poller: Mutex::new(None),
            _subscription: subscription,
        }
    }

    /// Install the "reload app" action the overlay button triggers.
    pub fn with_reload(mut self, reload: impl Fn() + Send + Sync + 'static) -> Self {
        self.reload = Some(Arc::new(reload));
        self
    }

    pub fn open(&self) {
        self.shared.lock().unwrap().open = true;
    }

    pub fn close(&self) {
        self.shared.lock().unwrap().open = false;
    }

    pub fn toggle(&self) {
        let mut shared = self.shared.lock().unwrap();
        shared.open = !shared.open;
    }

    pub fn is_open(&self) -> bool {
        self.shared.lock().unwrap().open
    }

    /// Start the status poller at the default 2s cadence.
    pub fn spawn_poller(&self) {
        self.spawn_poller_with_interval(DEFAULT_POLL_INTERVAL);
    }

    /// The poll reads host and credential status for display only; it never
    /// drives a controller transition.
    pub fn spawn_poller_with_interval(&self, interval: Duration) {
        self.stop_poller();
        let gate = self.gate.clone();
        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let host_present = gate.host_present();
                let available = gate.is_available().await;
                let mut shared = shared.lock().unwrap();
                shared.host_present = host_present;
                shared.credential = if available {
                    CredentialProbe::Present
                } else {
                    CredentialProbe::Missing
                };
            }
        });
        *self.poller.lock().unwrap() = Some(handle);
    }

    pub fn stop_poller(&self) {
        if let Some(handle) = self.poller.lock().unwrap().take() {
            handle.abort();
        }
    }

    pub fn view(&self) -> OverlayView {
        let shared = self.shared.lock().unwrap();
        OverlayView {
            open: shared.open,
            host_present: shared.host_present,
            credential: shared.credential,
            events: shared.events.clone(),
        }
    }

    /// Clear the shared log (the overlay's "clear console" action).
    pub fn clear_events(&self) {
        self.bus.clear();
        self.shared.lock().unwrap().events.clear();
    }

    /// Trigger a full reload, when the host wired one in.
    pub fn reload(&self) {
        if let Some(reload) = &self.reload {
            reload();
        }
    }

    /// Ask a controller to retry through its own public entry point.
    pub async fn retry(&self, controller: &ResourceController) {
        controller.retry().await;
    }
}

impl Drop for DebugOverlay {
    fn drop(&mut self) {
        self.stop_poller();
    }
}

/// Snapshot of everything the overlay renders.
#[derive(Debug, Clone)]
pub struct OverlayView {
    pub open: bool,
    pub host_present: bool,
    pub credential: CredentialProbe,
    pub events: Vec<DiagnosticEvent>,
}

impl fmt::Display for OverlayView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "StoryVis Diagnostics")?;
        writeln!(f, "====================")?;
        writeln!(f, "Credential: {}", self.credential.as_str())?;
        writeln!(
            f,
            "Host capability: {}",
            if self.host_present {
                "available"
            } else {
                "waiting"
            }
        )?;
        writeln!(f)?;
        if self.events.is_empty() {
            writeln!(f, "No events recorded yet.")?;
        } else {
            for event in &self.events {
                writeln!(
                    f,
                    "[{}] [{}] {}",
                    event.timestamp.format("%H:%M:%S"),
                    event.severity.as_str(),
                    event.message
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::CredentialHost;
    use crate::diagnostics::Severity;
    use crate::error::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubHost;

    #[async_trait]
    impl CredentialHost for StubHost {
        async fn has_selected_credential(&self) -> Result<bool> {
            Ok(true)
        }

        async fn open_select_credential(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_seeds_from_snapshot_and_follows_new_events() {
        let bus = DiagnosticBus::new(10);
        bus.record("earlier", Severity::Info);

        let overlay = DebugOverlay::new(bus.clone(), CredentialGate::absent());
        bus.record("later", Severity::Error);

        let view = overlay.view();
        let messages: Vec<&str> = view.events.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["later", "earlier"]);
    }

    #[tokio::test]
    async fn test_event_list_respects_bus_capacity() {
        let bus = DiagnosticBus::new(3);
        let overlay = DebugOverlay::new(bus.clone(), CredentialGate::absent());
        for i in 0..6 {
            bus.record(format!("e{}", i), Severity::Info);
        }
        assert_eq!(overlay.view().events.len(), 3);
        assert_eq!(overlay.view().events[0].message, "e5");
    }

    #[tokio::test]
    async fn test_toggle_and_clear() {
        let bus = DiagnosticBus::new(10);
        bus.record("noise", Severity::Info);
        let overlay = DebugOverlay::new(bus.clone(), CredentialGate::absent());

        assert!(!overlay.is_open());
        overlay.toggle();
        assert!(overlay.is_open());

        overlay.clear_events();
        assert!(overlay.view().events.is_empty());
        assert!(bus.is_empty());
    }

    #[tokio::test]
    async fn test_poller_updates_credential_status() {
        let bus = DiagnosticBus::new(10);
        let gate = CredentialGate::with_host(Arc::new(StubHost));
        let overlay = DebugOverlay::new(bus, gate);

        assert_eq!(overlay.view().credential, CredentialProbe::Checking);
        overlay.spawn_poller_with_interval(Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(30)).await;

        let view = overlay.view();
        assert!(view.host_present);
        assert_eq!(view.credential, CredentialProbe::Present);
        overlay.stop_poller();
    }

    #[tokio::test]
    async fn test_reload_callback_fires() {
        let bus = DiagnosticBus::new(10);
        let fired = Arc::new(AtomicUsize::new(0));
        let hits = Arc::clone(&fired);
        let overlay = DebugOverlay::new(bus, CredentialGate::absent())
            .with_reload(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            });

        overlay.reload();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_view_renders_status_and_events() {
        let bus = DiagnosticBus::new(10);
        bus.record("something happened", Severity::Error);
        let overlay = DebugOverlay::new(bus, CredentialGate::absent());

        let rendered = overlay.view().to_string();
        assert!(rendered.contains("Credential: checking"));
        assert!(rendered.contains("Host capability: waiting"));
        assert!(rendered.contains("[error] something happened"));
    }
}
