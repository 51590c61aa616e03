//! Browser environment handles.
//!
//! The engine drives exactly one environment surface itself: the window
//! (navigation and hard reloads). Document and navigator handles are opaque
//! here; they exist to be threaded through to the asset patcher, which knows
//! the host's concrete types.

use std::any::Any;
use std::sync::Arc;

/// The window surface the engine drives.
///
/// Implementations wrap whatever the host embeds the client in: a real
/// browser binding, a webview bridge, or a test fake.
pub trait BrowserWindow: Send + Sync {
    /// The window's current location.
    fn location(&self) -> PageLocation;

    /// Navigate the window to `url`.
    fn assign(&self, url: &str);

    /// Reload the page. `force_no_cache` requests a reload that bypasses
    /// caches.
    fn reload(&self, force_no_cache: bool);
}

/// The pieces of a window location the engine reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLocation {
    /// Scheme with trailing colon, e.g. `"http:"`.
    pub protocol: String,
    /// Host, including the port when non-default, e.g. `"localhost:3000"`.
    pub host: String,
}

/// Shared handle to the host window.
pub type WindowHandle = Arc<dyn BrowserWindow>;

/// Opaque handle to the host's DOM document, forwarded to the asset patcher
/// untouched.
pub type DocumentHandle = Arc<dyn Any + Send + Sync>;

/// Opaque handle to the host's navigator object, forwarded to the asset
/// patcher untouched.
pub type NavigatorHandle = Arc<dyn Any + Send + Sync>;
