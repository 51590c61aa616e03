//! Broadcast bus for inbound effect events.
//!
//! # Guarantees
//!
//! - **At-most-once delivery**: slow receivers may miss events
//! - **In-memory only**: events are not persisted
//! - **No replay**: lagged receivers get `RecvError::Lagged`
//!
//! The engine subscribes to dispatch effects; anything else may subscribe
//! too. That second part matters for the reload sequence: collaborators
//! that must act before a hard reload subscribe here and react to
//! `PreBrowserReload` in the turn before `BrowserReload` lands.

use tokio::sync::broadcast;

use crate::event::EffectEvent;

/// Default channel capacity for the event bus.
///
/// Sized for bursts of watcher events, not sustained backlog; the engine
/// normally drains far faster than a file watcher produces.
const DEFAULT_CAPACITY: usize = 256;

/// Broadcast channel of [`EffectEvent`]s.
///
/// Cloneable; clones share the channel.
///
/// # Example
///
/// ```ignore
/// let bus = EventBus::new();
/// let mut receiver = bus.subscribe();
///
/// bus.emit(EffectEvent::BrowserReload);
///
/// assert_eq!(receiver.recv().await?, EffectEvent::BrowserReload);
/// ```
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EffectEvent>,
}

impl EventBus {
    /// Create a new event bus with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new event bus with the specified capacity.
    ///
    /// The capacity determines how many events can be buffered before slow
    /// receivers start lagging.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers (fire-and-forget).
    ///
    /// Returns the number of receivers that received the event; emitting
    /// into an unsubscribed bus is a quiet no-op.
    pub fn emit(&self, event: EffectEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to events on this bus.
    ///
    /// The receiver sees events emitted after subscription; earlier events
    /// are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<EffectEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
