//! The in-place asset patching seam.
//!
//! When a watched file changes, the engine does not touch the DOM itself: it
//! hands the change to an [`AssetPatcher`] together with the latest document
//! and navigator handles and a config derived from the current client
//! options. What the patcher does with them (stylesheet swaps, cache-busted
//! image urls, or giving up) is its own business; it reports back only as
//! follow-on effects, which re-enter dispatch like any other event.

use async_trait::async_trait;

use crate::browser::{DocumentHandle, NavigatorHandle};
use crate::event::{ClientOptions, EffectEvent, FileEvent};

/// Config handed to the asset patcher for each file change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchConfig {
    /// Element tag names the patcher may rewrite in place.
    pub tag_names: Vec<String>,
    /// Whether stylesheets may be refreshed without a page reload.
    pub live_css: bool,
    /// Whether images may be refreshed without a page reload.
    pub live_img: bool,
}

impl PatchConfig {
    /// Derive the patch config for the given options snapshot.
    ///
    /// Live CSS and image refresh are always on; the options only control
    /// which tags are eligible.
    pub fn for_options(options: &ClientOptions) -> Self {
        Self {
            tag_names: options.tag_names.clone(),
            live_css: true,
            live_img: true,
        }
    }
}

/// External capability that applies a file change to the page in place.
///
/// Consumed as a black box. A patcher that cannot apply the change in place
/// typically returns `[EffectEvent::BrowserReload]` to force a full reload;
/// a patcher that handled everything returns no effects at all.
///
/// # Errors
///
/// A returned error is a collaborator failure: the engine propagates it to
/// whoever observes the dispatch loop instead of swallowing or retrying it.
#[async_trait]
pub trait AssetPatcher: Send + Sync + 'static {
    /// Apply `event` to the page, constrained by `config`.
    async fn patch(
        &self,
        event: &FileEvent,
        config: &PatchConfig,
        document: DocumentHandle,
        navigator: NavigatorHandle,
    ) -> anyhow::Result<Vec<EffectEvent>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_derivation_copies_tag_names_and_forces_live_flags() {
        let options = ClientOptions {
            tag_names: vec!["link".to_string(), "img".to_string()],
            ..ClientOptions::default()
        };

        let config = PatchConfig::for_options(&options);

        assert_eq!(config.tag_names, vec!["link", "img"]);
        assert!(config.live_css);
        assert!(config.live_img);
    }

    #[test]
    fn config_derivation_from_default_options_is_empty_but_live() {
        let config = PatchConfig::for_options(&ClientOptions::default());
        assert!(config.tag_names.is_empty());
        assert!(config.live_css);
        assert!(config.live_img);
    }
}
