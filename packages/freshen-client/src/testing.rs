//! Test doubles for the browser seam and the asset patcher.
//!
//! Everything here records instead of acting: a [`FakeWindow`] remembers
//! the navigations and reloads it was asked for, a [`RecordingPatcher`]
//! remembers each delegation it received. Engine behavior is then asserted
//! by reading the recordings back.
//!
//! # Feature Flag
//!
//! This module is compiled for this crate's own tests and for downstreams
//! that enable the `testing` feature:
//!
//! ```toml
//! [dev-dependencies]
//! freshen-client = { version = "0.1", features = ["testing"] }
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use freshen_client::testing::{FakeWindow, RecordingPatcher};
//! use freshen_client::{EffectEngine, EffectEvent};
//!
//! let window = FakeWindow::new("http:", "localhost:3000");
//! let handle = EffectEngine::builder()
//!     .with_window(window.clone())
//!     .with_patcher(RecordingPatcher::new())
//!     .build()?
//!     .start();
//!
//! handle.emit(EffectEvent::BrowserReload);
//! handle.join().await?;
//!
//! assert_eq!(window.reloads(), vec![true]);
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::browser::{BrowserWindow, DocumentHandle, NavigatorHandle, PageLocation};
use crate::event::{EffectEvent, FileEvent};
use crate::patch::{AssetPatcher, PatchConfig};

// =============================================================================
// Browser doubles
// =============================================================================

/// A window that records navigation and reload requests instead of
/// performing them.
pub struct FakeWindow {
    location: Mutex<PageLocation>,
    assigned: Mutex<Vec<String>>,
    reloads: Mutex<Vec<bool>>,
}

impl FakeWindow {
    /// A window currently at `protocol//host` (for example `"http:"`,
    /// `"localhost:3000"`).
    pub fn new(protocol: &str, host: &str) -> Arc<Self> {
        Arc::new(Self {
            location: Mutex::new(PageLocation {
                protocol: protocol.to_string(),
                host: host.to_string(),
            }),
            assigned: Mutex::new(Vec::new()),
            reloads: Mutex::new(Vec::new()),
        })
    }

    /// Every URL handed to `assign`, oldest first.
    pub fn assigned(&self) -> Vec<String> {
        self.assigned.lock().unwrap().clone()
    }

    /// The `force_no_cache` flag of every reload request, oldest first.
    pub fn reloads(&self) -> Vec<bool> {
        self.reloads.lock().unwrap().clone()
    }
}

impl BrowserWindow for FakeWindow {
    fn location(&self) -> PageLocation {
        self.location.lock().unwrap().clone()
    }

    fn assign(&self, url: &str) {
        self.assigned.lock().unwrap().push(url.to_string());
    }

    fn reload(&self, force_no_cache: bool) {
        self.reloads.lock().unwrap().push(force_no_cache);
    }
}

impl std::fmt::Debug for FakeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeWindow")
            .field("location", &self.location())
            .field("assigned", &self.assigned())
            .field("reloads", &self.reloads())
            .finish()
    }
}

/// A document handle with nothing behind it.
pub fn null_document() -> DocumentHandle {
    Arc::new(())
}

/// A navigator handle with nothing behind it.
pub fn null_navigator() -> NavigatorHandle {
    Arc::new(())
}

// =============================================================================
// Patcher doubles
// =============================================================================

/// One recorded delegation to a [`RecordingPatcher`].
#[derive(Clone)]
pub struct PatchCall {
    /// The file change as the patcher received it.
    pub event: FileEvent,
    /// The config derived from the options current at delegation time.
    pub config: PatchConfig,
    /// The document handle forwarded with the call.
    pub document: DocumentHandle,
    /// The navigator handle forwarded with the call.
    pub navigator: NavigatorHandle,
}

/// An [`AssetPatcher`] that records every delegation and answers each one
/// with a canned list of follow-on effects.
pub struct RecordingPatcher {
    follow_ons: Vec<EffectEvent>,
    calls: Mutex<Vec<PatchCall>>,
}

impl RecordingPatcher {
    /// A patcher that patches everything silently (no follow-ons).
    pub fn new() -> Arc<Self> {
        Self::with_follow_ons(Vec::new())
    }

    /// A patcher that answers every call with `follow_ons`, for example
    /// `vec![EffectEvent::BrowserReload]` to mimic a patcher falling back
    /// to a full reload.
    pub fn with_follow_ons(follow_ons: Vec<EffectEvent>) -> Arc<Self> {
        Arc::new(Self {
            follow_ons,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Every recorded delegation, oldest first.
    pub fn calls(&self) -> Vec<PatchCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetPatcher for RecordingPatcher {
    async fn patch(
        &self,
        event: &FileEvent,
        config: &PatchConfig,
        document: DocumentHandle,
        navigator: NavigatorHandle,
    ) -> anyhow::Result<Vec<EffectEvent>> {
        self.calls.lock().unwrap().push(PatchCall {
            event: event.clone(),
            config: config.clone(),
            document,
            navigator,
        });
        Ok(self.follow_ons.clone())
    }
}

/// An [`AssetPatcher`] that rejects every delegation with the given
/// message.
pub struct FailingPatcher {
    message: String,
}

impl FailingPatcher {
    pub fn new(message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            message: message.into(),
        })
    }
}

#[async_trait]
impl AssetPatcher for FailingPatcher {
    async fn patch(
        &self,
        _event: &FileEvent,
        _config: &PatchConfig,
        _document: DocumentHandle,
        _navigator: NavigatorHandle,
    ) -> anyhow::Result<Vec<EffectEvent>> {
        anyhow::bail!("{}", self.message)
    }
}
