//! The effect dispatch engine: bus consumption, lifecycle, and the control
//! handle.
//!
//! ```text
//! transport ──decode──► EffectEvent ──emit()──► EventBus ◄── reload_browser_safe()
//!                                                  │
//!                                                  ▼ subscribe()
//!                                         dispatch loop (one task)
//!                                                  │
//!                                     ┌── lookup kind in registry ──┐
//!                                     │                             │
//!                                 routed?                      unrouted: drop
//!                                     │
//!                                     ▼
//!                        handler.handle(event, inputs)
//!                                     │
//!                        follow-ons re-enter, same turn
//! ```
//!
//! One logical execution context: the loop takes events strictly in arrival
//! order and runs each handler to completion (follow-ons included) before
//! receiving the next event. Handler failures terminate the loop and
//! surface through [`EffectEngine::run`] / [`EngineHandle::join`]; they are
//! never swallowed or retried here.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use freshen_client::{EffectEngine, EffectEvent};
//!
//! let handle = EffectEngine::builder()
//!     .with_window(Arc::new(my_window))
//!     .with_patcher(Arc::new(my_patcher))
//!     .build()?
//!     .start();
//!
//! handle.emit(EffectEvent::from_wire(frame)?);
//! handle.reload_browser_safe();
//! ```

use futures::{FutureExt, StreamExt};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::browser::{DocumentHandle, NavigatorHandle, WindowHandle};
use crate::bus::EventBus;
use crate::dispatch::Dispatcher;
use crate::error::EffectError;
use crate::event::EffectEvent;
use crate::handler::default_handlers;
use crate::inputs::Inputs;
use crate::patch::AssetPatcher;
use crate::registry::{HandlerMap, HandlerRegistry};
use crate::sequencer;

use std::sync::Arc;

/// An assembled, not-yet-running dispatch engine.
///
/// Construct with [`EffectEngine::builder`], then either [`start`] it onto
/// its own task or drive it directly with [`run`].
///
/// [`start`]: EffectEngine::start
/// [`run`]: EffectEngine::run
pub struct EffectEngine {
    dispatcher: Dispatcher,
    bus: EventBus,
    receiver: broadcast::Receiver<EffectEvent>,
}

impl EffectEngine {
    /// Start building an engine.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// The bus this engine consumes. Events emitted here from any clone
    /// reach the dispatch loop.
    pub fn bus(&self) -> EventBus {
        self.bus.clone()
    }

    /// The state slots handlers read.
    pub fn inputs(&self) -> Inputs {
        self.dispatcher.inputs()
    }

    /// The handler registry the engine routes through.
    pub fn registry(&self) -> HandlerRegistry {
        self.dispatcher.registry()
    }

    /// Spawn the dispatch loop onto its own task and return the control
    /// handle.
    ///
    /// Must be called within a tokio runtime. The loop ends when every bus
    /// emitter is gone or a handler fails; [`EngineHandle::join`] reports
    /// which.
    pub fn start(self) -> EngineHandle {
        let EffectEngine {
            dispatcher,
            bus,
            receiver,
        } = self;
        let inputs = dispatcher.inputs();
        let registry = dispatcher.registry();
        let task = tokio::spawn(Self::run_loop(dispatcher, receiver));
        EngineHandle {
            bus,
            inputs,
            registry,
            task,
        }
    }

    /// Drive the dispatch loop on the current task.
    ///
    /// Releases the engine's own bus emitter first, so the loop winds down
    /// cleanly once every clone taken from [`EffectEngine::bus`] has been
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns the first handler failure; `Ok(())` on a clean bus close.
    pub async fn run(self) -> Result<(), EffectError> {
        let EffectEngine {
            dispatcher,
            bus,
            receiver,
        } = self;
        drop(bus);
        Self::run_loop(dispatcher, receiver).await
    }

    async fn run_loop(
        dispatcher: Dispatcher,
        mut receiver: broadcast::Receiver<EffectEvent>,
    ) -> Result<(), EffectError> {
        info!("effect dispatch engine started");
        loop {
            match receiver.recv().await {
                Ok(event) => dispatcher.dispatch(event).await?,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "effect bus lagged; continuing with next available event");
                }
                Err(RecvError::Closed) => {
                    info!("effect bus closed; dispatch engine stopping");
                    return Ok(());
                }
            }
        }
    }
}

impl std::fmt::Debug for EffectEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectEngine")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Chainable construction of an [`EffectEngine`].
///
/// A window is always required. A patcher is required unless a custom
/// handler mapping is supplied with [`with_handlers`], which replaces the
/// default wiring entirely.
///
/// [`with_handlers`]: EngineBuilder::with_handlers
#[derive(Default)]
pub struct EngineBuilder {
    window: Option<WindowHandle>,
    document: Option<DocumentHandle>,
    navigator: Option<NavigatorHandle>,
    patcher: Option<Arc<dyn AssetPatcher>>,
    handlers: Option<HandlerMap>,
    capacity: Option<usize>,
}

impl EngineBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The window the engine drives. Required.
    pub fn with_window(mut self, window: WindowHandle) -> Self {
        self.window = Some(window);
        self
    }

    /// The document handle forwarded to the asset patcher. Defaults to an
    /// inert placeholder.
    pub fn with_document(mut self, document: DocumentHandle) -> Self {
        self.document = Some(document);
        self
    }

    /// The navigator handle forwarded to the asset patcher. Defaults to an
    /// inert placeholder.
    pub fn with_navigator(mut self, navigator: NavigatorHandle) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// The asset patcher bound into the default `FileReload` handler.
    pub fn with_patcher(mut self, patcher: Arc<dyn AssetPatcher>) -> Self {
        self.patcher = Some(patcher);
        self
    }

    /// Replace the default handler mapping entirely.
    pub fn with_handlers(mut self, handlers: HandlerMap) -> Self {
        self.handlers = Some(handlers);
        self
    }

    /// Override the event bus capacity.
    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Assemble the engine.
    ///
    /// # Errors
    ///
    /// [`EffectError::BuilderIncomplete`] when the window is missing, or
    /// when neither a patcher nor a custom handler mapping was supplied.
    pub fn build(self) -> Result<EffectEngine, EffectError> {
        let window = self
            .window
            .ok_or(EffectError::BuilderIncomplete { what: "window" })?;
        let document = self
            .document
            .unwrap_or_else(|| Arc::new(()) as DocumentHandle);
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(()) as NavigatorHandle);

        let handlers = match self.handlers {
            Some(map) => map,
            None => {
                let patcher = self.patcher.ok_or(EffectError::BuilderIncomplete {
                    what: "asset patcher",
                })?;
                default_handlers(patcher)
            }
        };

        let inputs = Inputs::new(window, document, navigator);
        let registry = HandlerRegistry::new(handlers);
        let bus = match self.capacity {
            Some(capacity) => EventBus::with_capacity(capacity),
            None => EventBus::new(),
        };
        let receiver = bus.subscribe();

        Ok(EffectEngine {
            dispatcher: Dispatcher::new(registry, inputs),
            bus,
            receiver,
        })
    }
}

impl std::fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("has_window", &self.window.is_some())
            .field("has_patcher", &self.patcher.is_some())
            .field("has_custom_handlers", &self.handlers.is_some())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Handle
// =============================================================================

/// Control surface for a started engine.
///
/// Dropping the handle (without [`join`]) releases its bus emitter; once no
/// other emitter clones remain, the loop drains what is buffered and stops
/// cleanly.
///
/// [`join`]: EngineHandle::join
pub struct EngineHandle {
    bus: EventBus,
    inputs: Inputs,
    registry: HandlerRegistry,
    task: JoinHandle<Result<(), EffectError>>,
}

impl EngineHandle {
    /// Emit one effect into dispatch. Returns the number of bus receivers
    /// that saw it.
    pub fn emit(&self, event: EffectEvent) -> usize {
        self.bus.emit(event)
    }

    /// Run the two-phase safe reload.
    ///
    /// `PreBrowserReload` is emitted synchronously, within the caller's
    /// turn. `BrowserReload` follows from a spawned forwarder after the
    /// sequence's next-turn deferral, so every subscriber gets a full turn
    /// between announcement and reload.
    pub fn reload_browser_safe(&self) {
        let mut phases = Box::pin(sequencer::reload_browser_safe());

        // The announcement phase is ready on first poll; keep it in this turn.
        if let Some(event) = phases.next().now_or_never().flatten() {
            self.bus.emit(event);
        }

        let bus = self.bus.clone();
        tokio::spawn(async move {
            while let Some(event) = phases.next().await {
                bus.emit(event);
            }
        });
    }

    /// Subscribe to the engine's bus.
    ///
    /// This is how collaborators observe `PreBrowserReload` (and anything
    /// else) ahead of the dispatch loop's side effects.
    pub fn subscribe(&self) -> broadcast::Receiver<EffectEvent> {
        self.bus.subscribe()
    }

    /// A clone of the engine's bus.
    pub fn bus(&self) -> EventBus {
        self.bus.clone()
    }

    /// The state slots handlers read.
    pub fn inputs(&self) -> Inputs {
        self.inputs.clone()
    }

    /// The handler registry, for live mapping replacement.
    pub fn registry(&self) -> HandlerRegistry {
        self.registry.clone()
    }

    /// Whether the dispatch loop is still running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Release this handle's bus emitter and wait for the engine to finish.
    ///
    /// With no other emitters alive the loop drains buffered events and
    /// stops; if a handler already failed, that failure is returned.
    ///
    /// # Errors
    ///
    /// The propagated handler failure, or [`EffectError::EngineStopped`] if
    /// the engine task was cancelled or panicked outside handler execution.
    pub async fn join(self) -> Result<(), EffectError> {
        let EngineHandle {
            bus,
            inputs: _,
            registry: _,
            task,
        } = self;
        drop(bus);
        match task.await {
            Ok(result) => result,
            Err(join_error) => {
                error!(error = %join_error, "dispatch engine task did not complete");
                Err(EffectError::EngineStopped)
            }
        }
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
