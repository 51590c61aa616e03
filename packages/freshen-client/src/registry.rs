//! The live-updatable handler registry.
//!
//! The registry holds the current kind→handler mapping as one atomically
//! replaceable value, not as mutable per-key storage: configuration swaps
//! the whole [`HandlerMap`] at once, and a change-notification channel tells
//! interested parties that it happened. There is deliberately no key-level
//! update operation.
//!
//! Lookups snapshot the mapping (an `Arc` clone), so an event already being
//! handled completes against the mapping that was current when it was looked
//! up, no matter how many replacements land mid-flight.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::event::EffectKind;
use crate::handler::EffectHandler;

/// An immutable-once-installed mapping from effect kind to handler.
///
/// Built with the chainable [`HandlerMap::with`]; may be partial. Kinds
/// without an entry are silently unrouted at dispatch time.
#[derive(Default)]
pub struct HandlerMap {
    handlers: HashMap<EffectKind, Arc<dyn EffectHandler>>,
}

impl HandlerMap {
    /// An empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler for `kind`, replacing any previous entry for it.
    pub fn with<H: EffectHandler>(self, kind: EffectKind, handler: H) -> Self {
        self.with_shared(kind, Arc::new(handler))
    }

    /// Add an already-shared handler for `kind`.
    ///
    /// Useful when a test or collaborator keeps its own reference to the
    /// handler.
    pub fn with_shared(mut self, kind: EffectKind, handler: Arc<dyn EffectHandler>) -> Self {
        self.handlers.insert(kind, handler);
        self
    }

    /// The handler routed for `kind`, if any.
    pub fn get(&self, kind: EffectKind) -> Option<&Arc<dyn EffectHandler>> {
        self.handlers.get(&kind)
    }

    /// Whether `kind` has a routed handler.
    pub fn contains(&self, kind: EffectKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// The kinds with routed handlers, in no particular order.
    pub fn kinds(&self) -> impl Iterator<Item = EffectKind> + '_ {
        self.handlers.keys().copied()
    }

    /// Number of routed kinds.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no kind is routed.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<EffectKind> = self.kinds().collect();
        kinds.sort();
        f.debug_struct("HandlerMap").field("kinds", &kinds).finish()
    }
}

/// Cloneable holder of the current handler mapping.
///
/// Clones share the same underlying mapping and notification channel.
#[derive(Clone)]
pub struct HandlerRegistry {
    current: Arc<watch::Sender<Arc<HandlerMap>>>,
}

impl HandlerRegistry {
    /// Install the initial mapping.
    pub fn new(map: HandlerMap) -> Self {
        let (sender, _) = watch::channel(Arc::new(map));
        Self {
            current: Arc::new(sender),
        }
    }

    /// Snapshot the mapping as of now.
    pub fn current(&self) -> Arc<HandlerMap> {
        self.current.borrow().clone()
    }

    /// Atomically install a complete replacement mapping and notify
    /// watchers.
    ///
    /// All lookups after this call see the new mapping; in-flight handling
    /// finishes against whichever snapshot it looked up.
    pub fn replace(&self, map: HandlerMap) {
        let map = Arc::new(map);
        debug!(kinds = map.len(), "replacing effect handler mapping");
        self.current.send_replace(map);
    }

    /// Follow mapping changes over time.
    ///
    /// The receiver reports the current mapping first; `changed()` resolves
    /// on each replacement.
    pub fn watch(&self) -> watch::Receiver<Arc<HandlerMap>> {
        self.current.subscribe()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("current", &*self.current())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EffectEvent;
    use crate::inputs::Inputs;

    struct Nop;

    #[async_trait::async_trait]
    impl EffectHandler for Nop {
        async fn handle(
            &self,
            _event: EffectEvent,
            _inputs: &Inputs,
        ) -> anyhow::Result<Vec<EffectEvent>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn map_builder_chains_and_replaces_per_kind() {
        let map = HandlerMap::new()
            .with(EffectKind::BrowserReload, Nop)
            .with(EffectKind::SetOptions, Nop)
            .with(EffectKind::BrowserReload, Nop);

        assert_eq!(map.len(), 2);
        assert!(map.contains(EffectKind::BrowserReload));
        assert!(map.contains(EffectKind::SetOptions));
        assert!(!map.contains(EffectKind::FileReload));
    }

    #[test]
    fn partial_map_reports_unrouted_kinds() {
        let map = HandlerMap::new().with(EffectKind::SetOptions, Nop);
        assert!(map.get(EffectKind::FileReload).is_none());
        assert!(map.get(EffectKind::SetOptions).is_some());
    }

    #[test]
    fn empty_map_is_empty() {
        let map = HandlerMap::new();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn replace_swaps_the_whole_mapping() {
        let registry = HandlerRegistry::new(
            HandlerMap::new()
                .with(EffectKind::SetOptions, Nop)
                .with(EffectKind::BrowserReload, Nop),
        );
        assert_eq!(registry.current().len(), 2);

        registry.replace(HandlerMap::new().with(EffectKind::FileReload, Nop));

        let current = registry.current();
        assert_eq!(current.len(), 1);
        assert!(current.contains(EffectKind::FileReload));
        assert!(!current.contains(EffectKind::SetOptions));
    }

    #[test]
    fn held_snapshot_survives_replacement() {
        let registry = HandlerRegistry::new(HandlerMap::new().with(EffectKind::SetOptions, Nop));
        let snapshot = registry.current();

        registry.replace(HandlerMap::new());

        // The old snapshot still routes; the registry no longer does.
        assert!(snapshot.contains(EffectKind::SetOptions));
        assert!(registry.current().is_empty());
    }

    #[tokio::test]
    async fn watchers_are_notified_on_replacement() {
        let registry = HandlerRegistry::new(HandlerMap::new());
        let mut watcher = registry.watch();
        assert!(watcher.borrow_and_update().is_empty());

        registry.replace(HandlerMap::new().with(EffectKind::BrowserReload, Nop));

        watcher.changed().await.unwrap();
        assert!(watcher
            .borrow_and_update()
            .contains(EffectKind::BrowserReload));
    }

    #[test]
    fn clones_share_the_mapping() {
        let registry = HandlerRegistry::new(HandlerMap::new());
        let alias = registry.clone();

        alias.replace(HandlerMap::new().with(EffectKind::SetOptions, Nop));

        assert!(registry.current().contains(EffectKind::SetOptions));
    }

    #[test]
    fn debug_lists_routed_kinds() {
        let registry =
            HandlerRegistry::new(HandlerMap::new().with(EffectKind::BrowserReload, Nop));
        let rendered = format!("{registry:?}");
        assert!(rendered.contains("HandlerRegistry"));
        assert!(rendered.contains("BrowserReload"));
    }
}
