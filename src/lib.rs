//! # StoryVis
//!
//! Generation lifecycle core for content pages that display on-demand AI
//! visuals. Each placeholder on the page owns a [`ResourceController`] that
//! checks the credential gate, issues a single generation request against
//! the Gemini image endpoint, classifies failures, and supports manual
//! retry. Everything of note lands on a shared [`DiagnosticBus`] the
//! [`DebugOverlay`] renders.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use storyvis::{
//!     AspectRatio, CredentialGate, DiagnosticBus, GeminiConfig, ImageClient,
//!     ResourceController, VisualParams,
//! };
//!
//! # async fn run() -> storyvis::Result<()> {
//! let bus = DiagnosticBus::with_default_capacity();
//! let client = Arc::new(ImageClient::new(GeminiConfig::from_env())?);
//!
//! let controller = ResourceController::new(
//!     "hero",
//!     VisualParams::new("a calm meadow at dawn", AspectRatio::Wide),
//!     CredentialGate::absent(),
//!     client,
//!     bus.clone(),
//! );
//! controller.activate().await;
//! println!("{:?}", controller.snapshot().state.name());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod credential;
pub mod diagnostics;
pub mod error;
pub mod gemini;
pub mod logger;
pub mod models;
pub mod overlay;

pub use config::GeminiConfig;
pub use controller::{
    ResourceController, ResourceSnapshot, ResourceState, VisualParams, GENERIC_ERROR_MESSAGE,
};
pub use credential::{CredentialGate, CredentialHost};
pub use diagnostics::{DiagnosticBus, DiagnosticEvent, Severity, Subscription};
pub use error::{FailureKind, GenerationFailure, Result, StoryVisError};
pub use gemini::{ImageClient, ImageGenerator};
pub use models::{AspectRatio, GeneratedImage, GenerationRequest, ImageEncoding};
pub use overlay::{CredentialProbe, DebugOverlay, OverlayView};
