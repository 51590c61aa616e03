//! # Freshen Client
//!
//! The in-page half of the freshen live-reload loop: decoded server frames
//! become effects, effects become browser side effects, and everything runs
//! through one dispatch lane in arrival order.
//!
//! ## Core Concepts
//!
//! The crate separates **deciding what happens** from **doing it**:
//! - [`EffectEvent`] = a closed vocabulary of things the server may ask for
//! - [`EffectHandler`] = the side-effecting response routed per [`EffectKind`]
//! - [`Inputs`] = live slots (options, window, document, navigator) every
//!   handler reads at handling time, never at construction time
//!
//! The key principle: **handlers act on the present**. A handler dispatched
//! a minute after construction sees the options pushed a second ago.
//!
//! ## Architecture
//!
//! ```text
//! WebSocket frame ──EffectEvent::from_wire()──► EffectEvent
//!                                                    │
//!                                                    ▼ emit()
//!  reload_browser_safe() ────────────────────► EventBus ──► other subscribers
//!                                                    │
//!                                                    ▼ subscribe()
//!                                          dispatch loop (one task)
//!                                                    │
//!                                         HandlerRegistry lookup
//!                                              │           │
//!                                          routed       unrouted: dropped
//!                                              │
//!                                              ▼
//!                               EffectHandler::handle(event, inputs)
//!                                    │                     │
//!                                    ▼                     ▼
//!                           window / patcher        follow-on effects
//!                                                  (handled same turn)
//! ```
//!
//! ## Key Invariants
//!
//! 1. **One lane** - Events are handled strictly in arrival order, one at a
//!    time, follow-ons included
//! 2. **Closed vocabulary** - Unknown wire tags are decode errors; known but
//!    unrouted kinds are dropped without ceremony
//! 3. **Absent payload fields are no-ops** - A location change with neither
//!    path nor url does nothing, silently
//! 4. **Failures stop the lane** - A handler error or panic surfaces through
//!    [`EngineHandle::join`]; it is never swallowed or retried
//! 5. **Two-phase reload** - `PreBrowserReload` lands in the calling turn,
//!    `BrowserReload` strictly the next one, so subscribers get a full turn
//!    to flush
//!
//! ## Guarantees
//!
//! - **At-most-once delivery**: the bus drops the oldest events for a
//!   receiver that falls behind; the loop logs the gap and carries on
//! - **In-memory only**: nothing is persisted or replayed
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use freshen_client::{AssetPatcher, EffectEngine, EffectEvent};
//!
//! let handle = EffectEngine::builder()
//!     .with_window(Arc::new(DomWindow))       // your BrowserWindow impl
//!     .with_patcher(Arc::new(DomPatcher))     // your AssetPatcher impl
//!     .build()?
//!     .start();
//!
//! // Feed frames straight off the socket.
//! while let Some(frame) = socket.next().await {
//!     handle.emit(EffectEvent::from_wire(&frame?)?);
//! }
//!
//! // Ask for a reload that announces itself first.
//! handle.reload_browser_safe();
//! ```
//!
//! ## What This Is Not
//!
//! Freshen-client is **not**:
//! - A file watcher or a server (it consumes decoded frames)
//! - A DOM implementation (the window and patcher are seams you provide)
//! - A transport (sockets, reconnects, and handshakes live elsewhere)
//!
//! Freshen-client **is**:
//! > The ordered, inspectable dispatch lane between "the server said" and
//! > "the page did".

// Core modules
mod browser;
mod bus;
mod dispatch;
mod engine;
mod error;
mod event;
mod handler;
mod inputs;
mod patch;
mod registry;
mod sequencer;

// Testing utilities (for our tests and downstreams' via the feature)
#[cfg(any(test, feature = "testing"))]
pub mod testing;


// Re-export the event vocabulary and wire codec
pub use event::{ClientOptions, EffectEvent, EffectKind, FileEvent, LocationChange};

// Re-export error types
pub use error::EffectError;

// Re-export the browser seam
pub use browser::{BrowserWindow, DocumentHandle, NavigatorHandle, PageLocation, WindowHandle};

// Re-export the patching seam
pub use patch::{AssetPatcher, PatchConfig};

// Re-export the state slots
pub use inputs::Inputs;

// Re-export handler types and the default wiring
pub use handler::{
    default_handlers, BrowserReloadHandler, BrowserSetLocationHandler, EffectHandler,
    FileReloadHandler, SetOptionsHandler,
};

// Re-export registry types
pub use registry::{HandlerMap, HandlerRegistry};

// Re-export bus types
pub use bus::EventBus;

// Re-export dispatcher types
pub use dispatch::Dispatcher;

// Re-export the reload sequence
pub use sequencer::reload_browser_safe;

// Re-export engine types (primary entry point)
pub use engine::{EffectEngine, EngineBuilder, EngineHandle};

// Re-export commonly used external types
pub use async_trait::async_trait;
