//! Effect handlers: the trait and the built-in set.
//!
//! A handler owns the side effect for one effect kind. It receives the event
//! and the live [`Inputs`] slots, does its work, and returns any follow-on
//! effects, which the dispatcher feeds back through routing in the same
//! turn.
//!
//! The built-in set reproduces the standard client wiring:
//!
//! | kind                 | side effect                                  |
//! |----------------------|----------------------------------------------|
//! | `SetOptions`         | replace the options slot                     |
//! | `FileReload`         | delegate to the asset patcher                |
//! | `BrowserReload`      | hard-reload the window                       |
//! | `BrowserSetLocation` | navigate the window                          |
//!
//! `PreBrowserReload` has no routed handler: it is a notification other bus
//! subscribers react to before the hard reload lands, and inside the engine
//! it takes the silent-drop path.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info, trace};

use crate::event::{EffectEvent, EffectKind};
use crate::inputs::Inputs;
use crate::patch::{AssetPatcher, PatchConfig};
use crate::registry::HandlerMap;

/// A side effect keyed to one effect kind.
///
/// Handlers run to completion, one event at a time, inside the engine's
/// single logical execution context. They read whatever state they need from
/// `inputs` at handling time, so they always observe the latest snapshots.
///
/// # Errors
///
/// An `Err` is a collaborator failure. The engine does not swallow or retry
/// it; the dispatch loop terminates and the error surfaces to its observer.
#[async_trait]
pub trait EffectHandler: Send + Sync + 'static {
    /// Execute the side effect for `event`.
    ///
    /// Returns follow-on effects to re-enter dispatch; an empty vec means
    /// the effect was purely terminal.
    async fn handle(&self, event: EffectEvent, inputs: &Inputs) -> Result<Vec<EffectEvent>>;

    /// Type name used in logs and failure reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

// =============================================================================
// Built-in handlers
// =============================================================================

/// Writes `SetOptions` payloads into the options slot.
pub struct SetOptionsHandler;

#[async_trait]
impl EffectHandler for SetOptionsHandler {
    async fn handle(&self, event: EffectEvent, inputs: &Inputs) -> Result<Vec<EffectEvent>> {
        let EffectEvent::SetOptions(options) = event else {
            return Ok(Vec::new());
        };
        debug!(tag_names = ?options.tag_names, "applying client options");
        inputs.set_options(options);
        Ok(Vec::new())
    }
}

/// Delegates file changes to the asset patcher.
///
/// Reads the latest options, document and navigator at handling time,
/// derives the patch config from the options, and forwards everything to the
/// patcher. The patcher's effects (typically a forced reload when in-place
/// patching is impossible) become this handler's follow-ons.
pub struct FileReloadHandler {
    patcher: Arc<dyn AssetPatcher>,
}

impl FileReloadHandler {
    /// Wrap the given patcher.
    pub fn new(patcher: Arc<dyn AssetPatcher>) -> Self {
        Self { patcher }
    }
}

#[async_trait]
impl EffectHandler for FileReloadHandler {
    async fn handle(&self, event: EffectEvent, inputs: &Inputs) -> Result<Vec<EffectEvent>> {
        let EffectEvent::FileReload(file) = event else {
            return Ok(Vec::new());
        };
        let options = inputs.options();
        let config = PatchConfig::for_options(&options);
        debug!(
            path = %file.path,
            event = %file.event,
            tag_names = config.tag_names.len(),
            "delegating file change to asset patcher"
        );
        self.patcher
            .patch(&file, &config, inputs.document(), inputs.navigator())
            .await
    }
}

/// Hard-reloads the window, bypassing caches.
pub struct BrowserReloadHandler;

#[async_trait]
impl EffectHandler for BrowserReloadHandler {
    async fn handle(&self, event: EffectEvent, inputs: &Inputs) -> Result<Vec<EffectEvent>> {
        let EffectEvent::BrowserReload = event else {
            return Ok(Vec::new());
        };
        info!("reloading browser (cache bypassed)");
        inputs.window().reload(true);
        Ok(Vec::new())
    }
}

/// Navigates the window from a `BrowserSetLocation` payload.
///
/// `path` wins over `url`: a path is resolved against the window's current
/// protocol and host, a url is used verbatim. A payload with neither leaves
/// the window alone.
pub struct BrowserSetLocationHandler;

#[async_trait]
impl EffectHandler for BrowserSetLocationHandler {
    async fn handle(&self, event: EffectEvent, inputs: &Inputs) -> Result<Vec<EffectEvent>> {
        let EffectEvent::BrowserSetLocation(change) = event else {
            return Ok(Vec::new());
        };
        let window = inputs.window();
        if let Some(path) = change.path.as_deref() {
            let at = window.location();
            let url = format!("{}//{}{}", at.protocol, at.host, path);
            info!(%url, "pointing browser at path");
            window.assign(&url);
        } else if let Some(url) = change.url.as_deref() {
            info!(%url, "pointing browser at url");
            window.assign(url);
        } else {
            trace!("location change carried neither path nor url; ignoring");
        }
        Ok(Vec::new())
    }
}

/// The standard handler mapping: the four routed kinds wired to the built-in
/// handlers above, with `FileReload` bound to the given patcher.
pub fn default_handlers(patcher: Arc<dyn AssetPatcher>) -> HandlerMap {
    HandlerMap::new()
        .with(EffectKind::SetOptions, SetOptionsHandler)
        .with(EffectKind::FileReload, FileReloadHandler::new(patcher))
        .with(EffectKind::BrowserReload, BrowserReloadHandler)
        .with(EffectKind::BrowserSetLocation, BrowserSetLocationHandler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ClientOptions, FileEvent, LocationChange};
    use crate::testing::{
        null_document, null_navigator, FailingPatcher, FakeWindow, RecordingPatcher,
    };

    fn inputs_with(window: Arc<FakeWindow>) -> Inputs {
        Inputs::new(window, null_document(), null_navigator())
    }

    fn options_with_tags(tags: &[&str]) -> ClientOptions {
        ClientOptions {
            tag_names: tags.iter().map(|t| t.to_string()).collect(),
            ..ClientOptions::default()
        }
    }

    #[tokio::test]
    async fn set_options_writes_the_slot() {
        let inputs = inputs_with(FakeWindow::new("http:", "localhost:3000"));

        let follow_ons = SetOptionsHandler
            .handle(
                EffectEvent::SetOptions(options_with_tags(&["script"])),
                &inputs,
            )
            .await
            .unwrap();

        assert!(follow_ons.is_empty());
        assert_eq!(inputs.options().tag_names, vec!["script"]);
    }

    #[tokio::test]
    async fn handlers_ignore_foreign_variants() {
        let window = FakeWindow::new("http:", "localhost:3000");
        let inputs = inputs_with(window.clone());

        // A mapping could route any kind anywhere; a handler fed the wrong
        // variant must not act on it.
        let follow_ons = BrowserReloadHandler
            .handle(EffectEvent::PreBrowserReload, &inputs)
            .await
            .unwrap();

        assert!(follow_ons.is_empty());
        assert!(window.reloads().is_empty());
        assert_eq!(inputs.options(), ClientOptions::default());
    }

    #[tokio::test]
    async fn file_reload_delegates_with_derived_config() {
        let inputs = inputs_with(FakeWindow::new("http:", "localhost:3000"));
        inputs.set_options(options_with_tags(&["script"]));
        let patcher = RecordingPatcher::new();

        let file = FileEvent {
            path: "css/site.css".to_string(),
            ..FileEvent::default()
        };
        let follow_ons = FileReloadHandler::new(patcher.clone())
            .handle(EffectEvent::FileReload(file.clone()), &inputs)
            .await
            .unwrap();

        assert!(follow_ons.is_empty());
        let calls = patcher.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].event, file);
        assert_eq!(calls[0].config.tag_names, vec!["script"]);
        assert!(calls[0].config.live_css);
        assert!(calls[0].config.live_img);
        assert!(Arc::ptr_eq(&calls[0].document, &inputs.document()));
        assert!(Arc::ptr_eq(&calls[0].navigator, &inputs.navigator()));
    }

    #[tokio::test]
    async fn file_reload_propagates_patcher_follow_ons() {
        let inputs = inputs_with(FakeWindow::new("http:", "localhost:3000"));
        let patcher = RecordingPatcher::with_follow_ons(vec![EffectEvent::BrowserReload]);

        let follow_ons = FileReloadHandler::new(patcher)
            .handle(EffectEvent::FileReload(FileEvent::default()), &inputs)
            .await
            .unwrap();

        assert_eq!(follow_ons, vec![EffectEvent::BrowserReload]);
    }

    #[tokio::test]
    async fn file_reload_surfaces_patcher_errors() {
        let inputs = inputs_with(FakeWindow::new("http:", "localhost:3000"));
        let patcher = FailingPatcher::new("stylesheet swap rejected");

        let err = FileReloadHandler::new(patcher)
            .handle(EffectEvent::FileReload(FileEvent::default()), &inputs)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("stylesheet swap rejected"));
    }

    #[tokio::test]
    async fn browser_reload_forces_a_cache_bypassing_reload() {
        let window = FakeWindow::new("http:", "localhost:3000");
        let inputs = inputs_with(window.clone());

        BrowserReloadHandler
            .handle(EffectEvent::BrowserReload, &inputs)
            .await
            .unwrap();

        assert_eq!(window.reloads(), vec![true]);
    }

    #[tokio::test]
    async fn set_location_resolves_path_against_current_location() {
        let window = FakeWindow::new("http:", "x.test");
        let inputs = inputs_with(window.clone());

        BrowserSetLocationHandler
            .handle(
                EffectEvent::BrowserSetLocation(LocationChange::to_path("/foo")),
                &inputs,
            )
            .await
            .unwrap();

        assert_eq!(window.assigned(), vec!["http://x.test/foo"]);
    }

    #[tokio::test]
    async fn set_location_uses_url_verbatim() {
        let window = FakeWindow::new("http:", "x.test");
        let inputs = inputs_with(window.clone());

        BrowserSetLocationHandler
            .handle(
                EffectEvent::BrowserSetLocation(LocationChange::to_url("http://y.test/bar")),
                &inputs,
            )
            .await
            .unwrap();

        assert_eq!(window.assigned(), vec!["http://y.test/bar"]);
    }

    #[tokio::test]
    async fn set_location_prefers_path_when_both_are_present() {
        let window = FakeWindow::new("https:", "x.test");
        let inputs = inputs_with(window.clone());

        BrowserSetLocationHandler
            .handle(
                EffectEvent::BrowserSetLocation(LocationChange {
                    path: Some("/docs".to_string()),
                    url: Some("http://elsewhere.test/".to_string()),
                }),
                &inputs,
            )
            .await
            .unwrap();

        assert_eq!(window.assigned(), vec!["https://x.test/docs"]);
    }

    #[tokio::test]
    async fn set_location_with_empty_payload_leaves_the_window_alone() {
        let window = FakeWindow::new("http:", "x.test");
        let inputs = inputs_with(window.clone());

        BrowserSetLocationHandler
            .handle(
                EffectEvent::BrowserSetLocation(LocationChange::default()),
                &inputs,
            )
            .await
            .unwrap();

        assert!(window.assigned().is_empty());
        assert!(window.reloads().is_empty());
    }

    #[test]
    fn default_mapping_routes_exactly_the_four_handled_kinds() {
        let map = default_handlers(RecordingPatcher::new());

        assert!(map.contains(EffectKind::SetOptions));
        assert!(map.contains(EffectKind::FileReload));
        assert!(map.contains(EffectKind::BrowserReload));
        assert!(map.contains(EffectKind::BrowserSetLocation));
        assert!(!map.contains(EffectKind::PreBrowserReload));
        assert_eq!(map.len(), 4);
    }
}
