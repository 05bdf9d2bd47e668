//! Gate over the host-provided credential capability.
//!
//! The hosting environment may or may not expose an interactive credential
//! selector. Absence is "capability not offered", never an error.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;

/// The optional capability the hosting environment exposes for credential
/// selection. Implemented by host adapters, not by this crate.
#[async_trait]
pub trait CredentialHost: Send + Sync {
    /// Whether the user currently has a credential selected.
    async fn has_selected_credential(&self) -> Result<bool>;

    /// Open the host's interactive selection flow and wait for the dialog
    /// to close. Completion carries no success signal.
    async fn open_select_credential(&self) -> Result<()>;
}

#[derive(Clone)]
pub struct CredentialGate {
    host: Option<Arc<dyn CredentialHost>>,
}

impl CredentialGate {
    pub fn new(host: Option<Arc<dyn CredentialHost>>) -> Self {
        Self { host }
    }

    pub fn absent() -> Self {
        Self { host: None }
    }

    pub fn with_host(host: Arc<dyn CredentialHost>) -> Self {
        Self { host: Some(host) }
    }

    /// Whether the host capability exists at all. Display only.
    pub fn host_present(&self) -> bool {
        self.host.is_some()
    }

    /// Whether a usable credential is currently selected. Returns `false`
    /// when the capability is absent or the query fails; never panics and
    /// never propagates an error.
    pub async fn is_available(&self) -> bool {
        match &self.host {
            None => false,
            Some(host) => host.has_selected_credential().await.unwrap_or(false),
        }
    }

    /// Run the host's selection flow, if offered. The outcome is treated as
    /// optimistically granted: there is no re-verification here, the next
    /// generation attempt is the actual check.
    pub async fn request_selection(&self) {
        if let Some(host) = &self.host {
            if let Err(err) = host.open_select_credential().await {
                log::warn!("credential selection flow failed: {}", err);
            }
        }
    }
}
