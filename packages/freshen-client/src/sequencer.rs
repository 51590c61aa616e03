//! The two-phase safe reload sequence.
//!
//! A hard reload destroys the page's execution context, so anything that
//! wants to run beforehand (saving scroll state, tearing down sockets,
//! flushing logs) needs warning. [`reload_browser_safe`] provides it:
//! announce first, reload on the next scheduler turn.
//!
//! The deferral is an explicit yield to the scheduler, not a timer: work
//! already queued in the turn that observes `PreBrowserReload` runs before
//! the `BrowserReload` phase is even produced.

use async_stream::stream;
use futures::Stream;
use tokio::task;

use crate::event::EffectEvent;

/// The ordered two-phase reload sequence.
///
/// Phase 1, [`EffectEvent::PreBrowserReload`], is available on the first
/// poll, in the caller's own turn. Phase 2, [`EffectEvent::BrowserReload`],
/// is produced only after a yield to the scheduler, so it always lands on a
/// strictly later turn.
///
/// # Example
///
/// ```ignore
/// use freshen_client::reload_browser_safe;
/// use futures::StreamExt;
///
/// let mut phases = Box::pin(reload_browser_safe());
/// while let Some(event) = phases.next().await {
///     bus.emit(event);
/// }
/// ```
pub fn reload_browser_safe() -> impl Stream<Item = EffectEvent> {
    stream! {
        yield EffectEvent::PreBrowserReload;
        // Everyone who saw the announcement gets a full turn before the
        // reload exists at all.
        task::yield_now().await;
        yield EffectEvent::BrowserReload;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{FutureExt, StreamExt};

    #[tokio::test]
    async fn emits_announce_then_reload_and_ends() {
        let phases: Vec<EffectEvent> = reload_browser_safe().collect().await;
        assert_eq!(
            phases,
            vec![EffectEvent::PreBrowserReload, EffectEvent::BrowserReload]
        );
    }

    #[tokio::test]
    async fn announcement_is_ready_in_the_callers_turn() {
        let mut phases = Box::pin(reload_browser_safe());
        assert_eq!(
            phases.next().now_or_never().flatten(),
            Some(EffectEvent::PreBrowserReload)
        );
    }

    #[tokio::test]
    async fn hard_reload_waits_for_the_next_scheduler_turn() {
        let mut phases = Box::pin(reload_browser_safe());
        assert_eq!(
            phases.next().now_or_never().flatten(),
            Some(EffectEvent::PreBrowserReload)
        );

        // Same turn: the reload phase is not ready yet.
        assert_eq!(phases.next().now_or_never().flatten(), None);

        // After yielding to the scheduler it arrives, then the sequence ends.
        assert_eq!(phases.next().await, Some(EffectEvent::BrowserReload));
        assert_eq!(phases.next().await, None);
    }
}
