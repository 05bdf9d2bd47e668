//! Per-placeholder lifecycle controller.
//!
//! Each visual placeholder owns exactly one [`ResourceController`]. The
//! controller walks a small state machine: check the credential gate, issue
//! one generation request, then land in `Ready`, `NeedsCredential`, or
//! `Errored`. Retries are manual. A monotonically increasing sequence number
//! guards every completion so a superseded request can never overwrite a
//! fresher one.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::{
    credential::CredentialGate,
    diagnostics::{DiagnosticBus, Severity},
    gemini::ImageGenerator,
    models::{AspectRatio, GeneratedImage, GenerationRequest},
};

/// What the primary UI shows for non-actionable failures. Raw service detail
/// goes only to the diagnostic log.
pub const GENERIC_ERROR_MESSAGE: &str = "Image generation temporarily unavailable.";

/// The prompt and aspect ratio currently bound to a placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualParams {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
}

impl VisualParams {
    pub fn new(prompt: impl Into<String>, aspect_ratio: AspectRatio) -> Self {
        Self {
            prompt: prompt.into(),
            aspect_ratio,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceState {
    Idle,
    CheckingCredential,
    NeedsCredential,
    Requesting,
    Ready(GeneratedImage),
    Errored(String),
}

impl ResourceState {
    pub fn name(&self) -> &'static str {
        match self {
            ResourceState::Idle => "idle",
            ResourceState::CheckingCredential => "checking-credential",
            ResourceState::NeedsCredential => "needs-credential",
            ResourceState::Requesting => "requesting",
            ResourceState::Ready(_) => "ready",
            ResourceState::Errored(_) => "errored",
        }
    }
}

/// Read-only view handed to the presentational caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSnapshot {
    pub state: ResourceState,
    pub image_data: Option<Vec<u8>>,
    pub error_message: Option<String>,
}

pub struct ResourceController {
    label: String,
    instance_id: Uuid,
    params: Mutex<VisualParams>,
    state: Mutex<ResourceState>,
    seq: AtomicU64,
    disposed: AtomicBool,
    gate: CredentialGate,
    generator: Arc<dyn ImageGenerator>,
    bus: DiagnosticBus,
}

impl ResourceController {
    pub fn new(
        label: impl Into<String>,
        params: VisualParams,
        gate: CredentialGate,
        generator: Arc<dyn ImageGenerator>,
        bus: DiagnosticBus,
    ) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            instance_id: Uuid::new_v4(),
            params: Mutex::new(params),
            state: Mutex::new(ResourceState::Idle),
            seq: AtomicU64::new(0),
            disposed: AtomicBool::new(false),
            gate,
            generator,
            bus,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn snapshot(&self) -> ResourceSnapshot {
        let state = self.state.lock().unwrap().clone();
        let image_data = match &state {
            ResourceState::Ready(image) => Some(image.image_data.clone()),
            _ => None,
        };
        let error_message = match &state {
            ResourceState::Errored(message) => Some(message.clone()),
            _ => None,
        };
        ResourceSnapshot {
            state,
            image_data,
            error_message,
        }
    }

    /// Placeholder mounted: start the first run.
    pub async fn activate(&self) {
        let issued = self.next_seq();
        self.run(issued).await;
    }

    /// Prompt or aspect ratio changed: reset to `Idle`, supersede any
    /// in-flight request, and re-run.
    pub async fn set_params(&self, params: VisualParams) {
        *self.params.lock().unwrap() = params;
        let issued = self.next_seq();
        if !self.apply(issued, ResourceState::Idle) {
            return;
        }
        self.run(issued).await;
    }

    /// Manual retry. Only acts in `Errored`; anywhere else the call is a
    /// logged no-op (the overlay can race a param change).
    pub async fn retry(&self) {
        {
            let state = self.state.lock().unwrap();
            if !matches!(*state, ResourceState::Errored(_)) {
                log::debug!(
                    "[{}/{}] retry ignored in state {}",
                    self.label,
                    self.instance_id,
                    state.name()
                );
                return;
            }
        }
        let issued = self.next_seq();
        self.request(issued).await;
    }

    /// Run the host's credential selection flow, then re-enter the check.
    /// Selection is assumed granted; the next generation attempt verifies.
    pub async fn request_credential(&self) {
        let issued = self.next_seq();
        self.gate.request_selection().await;
        if !self.is_current(issued) {
            return;
        }
        self.run(issued).await;
    }

    /// Placeholder unmounted. Any in-flight completion is implicitly
    /// superseded and will mutate nothing.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.next_seq();
        log::debug!("[{}/{}] disposed", self.label, self.instance_id);
    }

    async fn run(&self, issued: u64) {
        if !self.apply(issued, ResourceState::CheckingCredential) {
            return;
        }
        let available = self.gate.is_available().await;
        if !available {
            self.enter_needs_credential(issued, "no credential selected");
            return;
        }
        self.request(issued).await;
    }

    async fn request(&self, issued: u64) {
        if !self.apply(issued, ResourceState::Requesting) {
            return;
        }
        let request = {
            let params = self.params.lock().unwrap();
            GenerationRequest {
                prompt: params.prompt.clone(),
                aspect_ratio: params.aspect_ratio,
            }
        };

        let outcome = self.generator.generate(&request).await;

        match outcome {
            Ok(image) => {
                let bytes = image.image_data.len();
                if self.apply(issued, ResourceState::Ready(image)) {
                    self.bus.record(
                        format!("[{}] visual ready ({} bytes)", self.label, bytes),
                        Severity::Success,
                    );
                }
            }
            Err(failure) if failure.kind.is_credential_problem() => {
                self.enter_needs_credential(issued, &failure.to_string());
            }
            Err(failure) => {
                if self.apply(issued, ResourceState::Errored(GENERIC_ERROR_MESSAGE.to_string())) {
                    self.bus.record(
                        format!("[{}] generation failed: {}", self.label, failure),
                        Severity::Error,
                    );
                }
            }
        }
    }

    fn enter_needs_credential(&self, issued: u64, detail: &str) {
        if self.apply(issued, ResourceState::NeedsCredential) {
            self.bus.record(
                format!("[{}] credential required: {}", self.label, detail),
                Severity::Info,
            );
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, issued: u64) -> bool {
        !self.disposed.load(Ordering::SeqCst) && self.seq.load(Ordering::SeqCst) == issued
    }

    /// Apply a transition only if `issued` is still the latest sequence
    /// number and the controller is alive. Returns whether it was applied.
    fn apply(&self, issued: u64, next: ResourceState) -> bool {
        let mut state = self.state.lock().unwrap();
        if !self.is_current(issued) {
            log::debug!(
                "[{}/{}] superseded transition to {} discarded",
                self.label,
                self.instance_id,
                next.name()
            );
            return false;
        }
        *state = next;
        true
    }
}

impl std::fmt::Debug for ResourceController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceController")
            .field("label", &self.label)
            .field("instance_id", &self.instance_id)
            .field("state", &self.state.lock().unwrap().name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::CredentialHost;
    use crate::error::{FailureKind, GenerationFailure, Result};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::Notify;

    struct StubHost {
        selected: bool,
    }

    #[async_trait]
    impl CredentialHost for StubHost {
        async fn has_selected_credential(&self) -> Result<bool> {
            Ok(self.selected)
        }

        async fn open_select_credential(&self) -> Result<()> {
            Ok(())
        }
    }

    fn gate(selected: bool) -> CredentialGate {
        CredentialGate::with_host(Arc::new(StubHost { selected }))
    }

    struct Script {
        wait: Option<Arc<Notify>>,
        outcome: std::result::Result<GeneratedImage, GenerationFailure>,
    }

    struct ScriptedGenerator {
        scripts: Mutex<VecDeque<Script>>,
    }

    impl ScriptedGenerator {
        fn new(scripts: Vec<Script>) -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(scripts.into()),
            })
        }

        fn ok(data: &[u8]) -> Script {
            Script {
                wait: None,
                outcome: Ok(GeneratedImage::png(data.to_vec())),
            }
        }

        fn err(kind: FailureKind, message: &str) -> Script {
            Script {
                wait: None,
                outcome: Err(GenerationFailure::new(kind, message)),
            }
        }

        fn ok_after(notify: Arc<Notify>, data: &[u8]) -> Script {
            Script {
                wait: Some(notify),
                outcome: Ok(GeneratedImage::png(data.to_vec())),
            }
        }
    }

    #[async_trait]
    impl ImageGenerator for ScriptedGenerator {
        async fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> std::result::Result<GeneratedImage, GenerationFailure> {
            let script = self
                .scripts
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected generate call");
            if let Some(notify) = script.wait {
                notify.notified().await;
            }
            script.outcome
        }
    }

    fn params() -> VisualParams {
        VisualParams::new("a calm meadow at dawn", AspectRatio::Wide)
    }

    fn error_events(bus: &DiagnosticBus) -> usize {
        bus.snapshot()
            .iter()
            .filter(|e| e.severity == Severity::Error)
            .count()
    }

    #[tokio::test]
    async fn test_absent_host_halts_in_needs_credential() {
        let bus = DiagnosticBus::new(10);
        let generator = ScriptedGenerator::new(vec![]);
        let controller = ResourceController::new(
            "hero",
            params(),
            CredentialGate::absent(),
            generator,
            bus.clone(),
        );

        controller.activate().await;

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.state, ResourceState::NeedsCredential);
        assert!(snapshot.image_data.is_none());
        let events = bus.snapshot();
        assert_eq!(events.len(), 1);
        assert!(events[0].message.contains("[hero]"));
        assert_eq!(events[0].severity, Severity::Info);
    }

    #[tokio::test]
    async fn test_success_reaches_ready_with_payload() {
        let bus = DiagnosticBus::new(10);
        let generator = ScriptedGenerator::new(vec![ScriptedGenerator::ok(b"png-bytes")]);
        let controller =
            ResourceController::new("hero", params(), gate(true), generator, bus.clone());

        controller.activate().await;

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.image_data.as_deref(), Some(&b"png-bytes"[..]));
        assert!(matches!(snapshot.state, ResourceState::Ready(_)));
        assert_eq!(bus.snapshot().len(), 1);
        assert_eq!(bus.snapshot()[0].severity, Severity::Success);
    }

    #[tokio::test]
    async fn test_transient_failure_lands_in_errored_with_generic_message() {
        let bus = DiagnosticBus::new(10);
        let generator = ScriptedGenerator::new(vec![ScriptedGenerator::err(
            FailureKind::TransientServiceError,
            "HTTP 429 from service",
        )]);
        let controller =
            ResourceController::new("story-1", params(), gate(true), generator, bus.clone());

        controller.activate().await;

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.error_message.as_deref(), Some(GENERIC_ERROR_MESSAGE));
        // The raw detail must reach the diagnostic log, not the snapshot.
        assert!(bus.snapshot()[0].message.contains("HTTP 429"));
        assert_eq!(error_events(&bus), 1);
    }

    #[tokio::test]
    async fn test_entitlement_failure_re_enters_needs_credential() {
        let bus = DiagnosticBus::new(10);
        let generator = ScriptedGenerator::new(vec![ScriptedGenerator::err(
            FailureKind::EntitlementDenied,
            "Requested entity was not found.",
        )]);
        let controller =
            ResourceController::new("story-2", params(), gate(true), generator, bus.clone());

        controller.activate().await;

        assert_eq!(controller.snapshot().state, ResourceState::NeedsCredential);
        assert_eq!(error_events(&bus), 0);
    }

    #[tokio::test]
    async fn test_retry_from_errored_succeeds_without_new_error_event() {
        let bus = DiagnosticBus::new(10);
        let generator = ScriptedGenerator::new(vec![
            ScriptedGenerator::err(FailureKind::Unknown, "glitch"),
            ScriptedGenerator::ok(b"fresh"),
        ]);
        let controller =
            ResourceController::new("hero", params(), gate(true), generator, bus.clone());

        controller.activate().await;
        assert!(matches!(
            controller.snapshot().state,
            ResourceState::Errored(_)
        ));
        assert_eq!(error_events(&bus), 1);

        controller.retry().await;

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.image_data.as_deref(), Some(&b"fresh"[..]));
        assert!(snapshot.error_message.is_none());
        // The prior error event is not re-emitted by the retry.
        assert_eq!(error_events(&bus), 1);
    }

    #[tokio::test]
    async fn test_retry_outside_errored_is_a_no_op() {
        let bus = DiagnosticBus::new(10);
        let generator = ScriptedGenerator::new(vec![ScriptedGenerator::ok(b"img")]);
        let controller =
            ResourceController::new("hero", params(), gate(true), generator, bus.clone());

        controller.activate().await;
        controller.retry().await; // Ready, nothing scripted: must not call generate.

        assert!(matches!(controller.snapshot().state, ResourceState::Ready(_)));
    }

    #[tokio::test]
    async fn test_request_credential_runs_selection_then_generates() {
        let bus = DiagnosticBus::new(10);
        let generator = ScriptedGenerator::new(vec![ScriptedGenerator::ok(b"after-select")]);
        let controller =
            ResourceController::new("hero", params(), gate(true), generator, bus.clone());

        controller.request_credential().await;

        assert_eq!(
            controller.snapshot().image_data.as_deref(),
            Some(&b"after-select"[..])
        );
    }

    #[tokio::test]
    async fn test_stale_result_is_rejected_after_param_change() {
        let bus = DiagnosticBus::new(10);
        let release_first = Arc::new(Notify::new());
        let generator = ScriptedGenerator::new(vec![
            ScriptedGenerator::ok_after(Arc::clone(&release_first), b"stale"),
            ScriptedGenerator::ok(b"current"),
        ]);
        let controller =
            ResourceController::new("hero", params(), gate(true), generator, bus.clone());

        let background = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.activate().await })
        };
        // Let the first request reach its suspension point.
        tokio::task::yield_now().await;

        controller
            .set_params(VisualParams::new("a storm over the sea", AspectRatio::Tall))
            .await;
        assert_eq!(
            controller.snapshot().image_data.as_deref(),
            Some(&b"current"[..])
        );

        // Now let the superseded request complete; it must change nothing.
        release_first.notify_one();
        background.await.unwrap();

        assert_eq!(
            controller.snapshot().image_data.as_deref(),
            Some(&b"current"[..])
        );
        // Exactly one success event: the superseded completion emitted none.
        assert_eq!(bus.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_dispose_while_requesting_discards_late_completion() {
        let bus = DiagnosticBus::new(10);
        let release = Arc::new(Notify::new());
        let generator =
            ScriptedGenerator::new(vec![ScriptedGenerator::ok_after(Arc::clone(&release), b"late")]);
        let controller =
            ResourceController::new("hero", params(), gate(true), generator, bus.clone());

        let background = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.activate().await })
        };
        tokio::task::yield_now().await;
        assert_eq!(controller.snapshot().state, ResourceState::Requesting);

        controller.dispose();
        release.notify_one();
        background.await.unwrap();

        // The late completion performed no state mutation.
        assert_eq!(controller.snapshot().state, ResourceState::Requesting);
        assert!(bus.is_empty());
    }
}
