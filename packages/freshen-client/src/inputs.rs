//! Latest-value state slots the dispatch layer joins against.
//!
//! `Inputs` is a fixed set of named slots: client options plus the window,
//! document and navigator handles. Each slot holds exactly the most recent
//! value pushed into it. Reads never block and never fail; if nothing has
//! been pushed yet a slot reports its defined initial value. Every write
//! notifies watchers, and a new watcher observes the current value
//! immediately rather than waiting for the next write.
//!
//! Slots are backed by `tokio::sync::watch`, which is precisely this
//! contract: a single latest value, lock-free-ish reads, change
//! notification.
//!
//! # Guarantees
//!
//! - A slot always has a value.
//! - Readers see whole values, never partial writes.
//! - Per-slot writes are observed in order by watchers; only the latest
//!   value is retained for late readers.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use crate::browser::{DocumentHandle, NavigatorHandle, WindowHandle};
use crate::event::ClientOptions;

/// The client's state snapshot registry.
///
/// Cheap to clone; clones share the same slots.
#[derive(Clone)]
pub struct Inputs {
    options: Arc<watch::Sender<ClientOptions>>,
    window: Arc<watch::Sender<WindowHandle>>,
    document: Arc<watch::Sender<DocumentHandle>>,
    navigator: Arc<watch::Sender<NavigatorHandle>>,
}

impl Inputs {
    /// Create the slots, seeded with the environment handles the client is
    /// bootstrapped with. The options slot starts at
    /// `ClientOptions::default()` until the server pushes a `SetOptions`
    /// effect.
    pub fn new(
        window: WindowHandle,
        document: DocumentHandle,
        navigator: NavigatorHandle,
    ) -> Self {
        Self {
            options: Arc::new(watch::channel(ClientOptions::default()).0),
            window: Arc::new(watch::channel(window).0),
            document: Arc::new(watch::channel(document).0),
            navigator: Arc::new(watch::channel(navigator).0),
        }
    }

    // -- reads ---------------------------------------------------------------

    /// The latest options snapshot.
    pub fn options(&self) -> ClientOptions {
        self.options.borrow().clone()
    }

    /// The latest window handle.
    pub fn window(&self) -> WindowHandle {
        self.window.borrow().clone()
    }

    /// The latest document handle.
    pub fn document(&self) -> DocumentHandle {
        self.document.borrow().clone()
    }

    /// The latest navigator handle.
    pub fn navigator(&self) -> NavigatorHandle {
        self.navigator.borrow().clone()
    }

    // -- writes --------------------------------------------------------------

    /// Replace the options snapshot and notify watchers.
    pub fn set_options(&self, options: ClientOptions) {
        self.options.send_replace(options);
    }

    /// Replace the window handle and notify watchers.
    pub fn set_window(&self, window: WindowHandle) {
        self.window.send_replace(window);
    }

    /// Replace the document handle and notify watchers.
    pub fn set_document(&self, document: DocumentHandle) {
        self.document.send_replace(document);
    }

    /// Replace the navigator handle and notify watchers.
    pub fn set_navigator(&self, navigator: NavigatorHandle) {
        self.navigator.send_replace(navigator);
    }

    // -- watches -------------------------------------------------------------

    /// Follow the options slot over time.
    ///
    /// The receiver reports the current value first; `changed()` resolves on
    /// each subsequent write.
    pub fn watch_options(&self) -> watch::Receiver<ClientOptions> {
        self.options.subscribe()
    }

    /// Follow the window slot over time.
    pub fn watch_window(&self) -> watch::Receiver<WindowHandle> {
        self.window.subscribe()
    }

    /// Follow the document slot over time.
    pub fn watch_document(&self) -> watch::Receiver<DocumentHandle> {
        self.document.subscribe()
    }

    /// Follow the navigator slot over time.
    pub fn watch_navigator(&self) -> watch::Receiver<NavigatorHandle> {
        self.navigator.subscribe()
    }
}

impl fmt::Debug for Inputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let options = self.options.borrow();
        f.debug_struct("Inputs")
            .field("options", &*options)
            .finish_non_exhaustive()
    }
}
