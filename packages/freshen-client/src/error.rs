//! Structured error types for the effect dispatch engine.
//!
//! `EffectError` provides pattern-matchable errors instead of generic
//! `anyhow::Error`. Handlers and the asset patcher use `anyhow` internally
//! (their failures are host-defined and opaque); the engine wraps whatever
//! they return in a structured variant before surfacing it.
//!
//! # The Permissiveness Boundary
//!
//! Not everything unexpected is an error here. An effect kind with no routed
//! handler, or a location change with no usable fields, is silently ignored:
//! the client runs inside end-user pages and a stray server frame must never
//! take the page down. Errors are reserved for genuine collaborator failures
//! and misuse of the construction API.
//!
//! # Example
//!
//! ```ignore
//! use freshen_client::EffectError;
//!
//! match handle.join().await {
//!     Ok(()) => println!("engine wound down cleanly"),
//!     Err(EffectError::HandlerFailed { kind, handler, source }) => {
//!         eprintln!("{handler} failed on {kind}: {source}");
//!     }
//!     Err(e) => eprintln!("engine stopped: {e}"),
//! }
//! ```

use thiserror::Error;

use crate::event::EffectKind;

/// Structured error type for effect dispatch operations.
///
/// Each variant includes context about what went wrong.
#[derive(Debug, Error)]
pub enum EffectError {
    /// A wire frame carried a tag outside the effect vocabulary.
    ///
    /// The effect kind set is closed; transports should drop such frames.
    #[error("unknown effect tag: {tag}")]
    UnknownEffect {
        /// The tag exactly as it appeared on the wire.
        tag: String,
    },

    /// A wire frame could not be decoded as an effect tuple.
    #[error("malformed effect frame: {0}")]
    MalformedFrame(#[from] serde_json::Error),

    /// An effect handler (or the collaborator it delegates to) failed.
    ///
    /// The engine neither swallows nor retries these; the error terminates
    /// the dispatch loop and is surfaced to whoever observes it.
    #[error("effect handler {handler} failed while handling {kind}: {source}")]
    HandlerFailed {
        /// Kind of the effect being handled when the failure occurred.
        kind: EffectKind,
        /// Type name of the failing handler.
        handler: &'static str,
        /// The underlying failure as the handler reported it.
        source: anyhow::Error,
    },

    /// An effect handler panicked instead of returning an error.
    ///
    /// The panic is caught so the payload can be reported, then treated the
    /// same as a handler failure.
    #[error("effect handler {handler} panicked while handling {kind}: {message}")]
    HandlerPanicked {
        /// Kind of the effect being handled when the panic occurred.
        kind: EffectKind,
        /// Type name of the panicking handler.
        handler: &'static str,
        /// Extracted panic message.
        message: String,
    },

    /// The engine builder was asked to build without a required part.
    #[error("engine builder missing required {what}")]
    BuilderIncomplete {
        /// Name of the missing part.
        what: &'static str,
    },

    /// The dispatch engine task stopped without reporting a result.
    ///
    /// Seen when joining an engine whose task was cancelled or panicked
    /// outside handler execution.
    #[error("dispatch engine task stopped unexpectedly")]
    EngineStopped,
}
