//! Routing core: one event in, its whole same-turn cascade out.
//!
//! [`Dispatcher::dispatch`] runs the full dispatch algorithm for a single
//! inbound event:
//!
//! 1. Snapshot the current handler mapping and look up the event's kind.
//! 2. No handler routed → drop the event silently. A stray frame from the
//!    server must never take the page down.
//! 3. Otherwise run the handler to completion against the live state slots.
//! 4. Effects the handler returned go onto a same-turn queue and repeat from
//!    step 1, in order, before this call returns.
//!
//! Follow-on effects therefore interleave *ahead* of anything else queued on
//! the bus: a patcher that answers a `FileReload` with a forced
//! `BrowserReload` gets that reload handled in the same turn as the file
//! change that caused it.
//!
//! Handler failures and panics end the cascade immediately and are returned
//! to the caller; the dispatcher neither swallows nor retries them.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::{debug, error, trace};

use crate::error::EffectError;
use crate::event::EffectEvent;
use crate::inputs::Inputs;
use crate::registry::HandlerRegistry;

/// Routes effect events to handlers over the latest state snapshots.
///
/// Cheap to clone; clones share the registry and slots.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    registry: HandlerRegistry,
    inputs: Inputs,
}

impl Dispatcher {
    /// Create a dispatcher over the given registry and state slots.
    pub fn new(registry: HandlerRegistry, inputs: Inputs) -> Self {
        Self { registry, inputs }
    }

    /// The registry this dispatcher routes through.
    pub fn registry(&self) -> HandlerRegistry {
        self.registry.clone()
    }

    /// The state slots handlers read.
    pub fn inputs(&self) -> Inputs {
        self.inputs.clone()
    }

    /// Dispatch `event` and every follow-on effect it transitively produces,
    /// to completion, within the current turn.
    ///
    /// # Errors
    ///
    /// Returns the first handler failure or panic, leaving any remaining
    /// follow-on effects unprocessed.
    pub async fn dispatch(&self, event: EffectEvent) -> Result<(), EffectError> {
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            let kind = event.kind();
            // Snapshot at lookup time: replacement mid-handling must not
            // redirect an event that is already in flight.
            let Some(handler) = self.registry.current().get(kind).cloned() else {
                trace!(%kind, "no handler routed for effect; dropping");
                continue;
            };

            debug!(%kind, handler = handler.name(), "dispatching effect");
            let outcome = AssertUnwindSafe(handler.handle(event, &self.inputs))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(follow_ons)) => {
                    if !follow_ons.is_empty() {
                        debug!(
                            %kind,
                            count = follow_ons.len(),
                            "handler produced follow-on effects"
                        );
                        queue.extend(follow_ons);
                    }
                }
                Ok(Err(source)) => {
                    error!(%kind, handler = handler.name(), error = %source, "effect handler failed");
                    return Err(EffectError::HandlerFailed {
                        kind,
                        handler: handler.name(),
                        source,
                    });
                }
                Err(panic_info) => {
                    let message = extract_panic_message(&panic_info);
                    error!(%kind, handler = handler.name(), panic = %message, "effect handler panicked");
                    return Err(EffectError::HandlerPanicked {
                        kind,
                        handler: handler.name(),
                        message,
                    });
                }
            }
        }

        Ok(())
    }
}

fn extract_panic_message(panic_info: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
