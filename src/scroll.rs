//! Scroll anchoring for the conversation view
//!
//! One `ScrollAnchor` lives per active conversation and is reset on every
//! contact switch. After each message-list update it makes exactly one of
//! three decisions: restore the visual offset (an older page was
//! prepended above the viewport), jump to the bottom (first render, or
//! the user just sent a message), or leave the position alone. A wrong
//! decision shows up as a visible jump, so the caller must apply the
//! returned adjustment in a layout-synchronous hook, after the new list
//! is measured and before the next paint.

use crate::model::Message;

/// Geometry of the scroll container at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetrics {
    /// Distance scrolled from the top of the content (px)
    pub scroll_top: f64,
    /// Total content height (px)
    pub scroll_height: f64,
    /// Visible viewport height (px)
    pub client_height: f64,
}

/// What the embedder must do to the container after a list update
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollAdjustment {
    /// Set `scroll_top = scroll_height`
    ToBottom,
    /// Set `scroll_top` to the given value
    ToOffset(f64),
    /// Leave the position undisturbed
    None,
}

/// A rendered date separator and its top edge in content coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct SeparatorPosition {
    pub label: String,
    pub top: f64,
}

/// Per-conversation scroll state
///
/// `previous_scroll_height == 0.0` is the sentinel for "no pending
/// anchor".
#[derive(Debug, Default)]
pub struct ScrollAnchor {
    previous_scroll_height: f64,
    has_done_initial_scroll: bool,
    pinned_separator_label: Option<String>,
}

impl ScrollAnchor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything. Must be called whenever the active contact
    /// changes, or scroll state leaks across conversations.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Record the container height before an older page is prepended.
    /// Call this when the fetch is triggered, before it resolves.
    pub fn note_before_prepend(&mut self, metrics: ScrollMetrics) {
        self.previous_scroll_height = metrics.scroll_height;
    }

    /// Disarm a pending anchor whose prepend never happened (the older
    /// fetch failed or was superseded). Without this the next unrelated
    /// render would consume the stale anchor and jump the viewport.
    pub fn clear_pending_anchor(&mut self) {
        self.previous_scroll_height = 0.0;
    }

    pub fn has_pending_anchor(&self) -> bool {
        self.previous_scroll_height > 0.0
    }

    pub fn has_done_initial_scroll(&self) -> bool {
        self.has_done_initial_scroll
    }

    /// Decide the scroll correction for a freshly rendered list.
    ///
    /// `metrics` must reflect the container *after* the new list is laid
    /// out. Priority order matters: a pending anchor always wins over the
    /// bottom-scroll rules, otherwise an older-page load racing the
    /// user's own message would discard the anchor and jump.
    pub fn on_list_rendered(
        &mut self,
        messages: &[Message],
        metrics: ScrollMetrics,
    ) -> ScrollAdjustment {
        if self.has_pending_anchor() {
            let delta = metrics.scroll_height - self.previous_scroll_height;
            self.previous_scroll_height = 0.0;
            return ScrollAdjustment::ToOffset(delta);
        }

        if messages.is_empty() {
            return ScrollAdjustment::None;
        }

        if !self.has_done_initial_scroll {
            self.has_done_initial_scroll = true;
            return ScrollAdjustment::ToBottom;
        }

        // the user just sent something; follow it regardless of position
        let newest = &messages[messages.len() - 1];
        if newest.is_placeholder() {
            return ScrollAdjustment::ToBottom;
        }

        ScrollAdjustment::None
    }

    /// Recompute the pinned date label during a manual scroll: the first
    /// separator whose top edge is at or below the visible top edge, or
    /// the last separator once all of them have scrolled past.
    pub fn track_pinned(
        &mut self,
        separators: &[SeparatorPosition],
        scroll_top: f64,
    ) -> Option<&str> {
        self.pinned_separator_label = pinned_separator_label(separators, scroll_top);
        self.pinned_separator_label.as_deref()
    }

    pub fn pinned_label(&self) -> Option<&str> {
        self.pinned_separator_label.as_deref()
    }
}

/// Pure pinned-separator scan, O(separators)
pub fn pinned_separator_label(
    separators: &[SeparatorPosition],
    scroll_top: f64,
) -> Option<String> {
    separators
        .iter()
        .find(|s| s.top >= scroll_top)
        .or_else(|| separators.last())
        .map(|s| s.label.clone())
}

/// Admission control for older-page fetches: near the top, more pages
/// exist, and no fetch is already running. There is no debounce; the
/// `is_loading_more` flag is the only guard, so it must be set before the
/// fetch is awaited.
pub fn should_fetch_older(
    metrics: ScrollMetrics,
    threshold_px: f64,
    has_more: bool,
    is_loading_more: bool,
) -> bool {
    metrics.scroll_top <= threshold_px && has_more && !is_loading_more
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Direction, MessageStatus};
    use chrono::{TimeZone, Utc};

    fn msg(id: &str, ts_secs: i64) -> Message {
        Message {
            id: id.to_string(),
            client_temp_id: None,
            direction: Direction::Incoming,
            timestamp: Utc.timestamp_opt(ts_secs, 0).unwrap(),
            body: Some("oi".to_string()),
            media_url: None,
            media_type: None,
            ack: 0,
            status: None,
        }
    }

    fn placeholder(id: &str, ts_secs: i64) -> Message {
        let mut m = msg(id, ts_secs);
        m.direction = Direction::Outgoing;
        m.client_temp_id = Some(format!("tmp-{}", id));
        m.status = Some(MessageStatus::Sending);
        m
    }

    fn metrics(scroll_top: f64, scroll_height: f64) -> ScrollMetrics {
        ScrollMetrics {
            scroll_top,
            scroll_height,
            client_height: 600.0,
        }
    }

    #[test]
    fn test_initial_render_scrolls_to_bottom_once() {
        let mut anchor = ScrollAnchor::new();
        let messages = vec![msg("a", 100)];

        let first = anchor.on_list_rendered(&messages, metrics(0.0, 1000.0));
        assert_eq!(first, ScrollAdjustment::ToBottom);

        // second render with no changes leaves the position alone
        let second = anchor.on_list_rendered(&messages, metrics(1000.0, 1000.0));
        assert_eq!(second, ScrollAdjustment::None);
    }

    #[test]
    fn test_empty_list_does_not_consume_initial_scroll() {
        let mut anchor = ScrollAnchor::new();
        assert_eq!(
            anchor.on_list_rendered(&[], metrics(0.0, 0.0)),
            ScrollAdjustment::None
        );
        assert!(!anchor.has_done_initial_scroll());

        let adj = anchor.on_list_rendered(&[msg("a", 100)], metrics(0.0, 400.0));
        assert_eq!(adj, ScrollAdjustment::ToBottom);
    }

    #[test]
    fn test_prepend_restores_offset() {
        let mut anchor = ScrollAnchor::new();
        anchor.on_list_rendered(&[msg("b", 200)], metrics(0.0, 1000.0));

        // user scrolled near the top, older page requested
        anchor.note_before_prepend(metrics(50.0, 1000.0));
        assert!(anchor.has_pending_anchor());

        let merged = vec![msg("a", 100), msg("b", 200)];
        let adj = anchor.on_list_rendered(&merged, metrics(50.0, 1400.0));
        assert_eq!(adj, ScrollAdjustment::ToOffset(400.0));
        assert!(!anchor.has_pending_anchor());
    }

    #[test]
    fn test_cleared_anchor_is_not_consumed() {
        let mut anchor = ScrollAnchor::new();
        anchor.on_list_rendered(&[msg("b", 200)], metrics(0.0, 1000.0));

        // older fetch armed the anchor but failed; nothing was prepended
        anchor.note_before_prepend(metrics(50.0, 1000.0));
        anchor.clear_pending_anchor();
        assert!(!anchor.has_pending_anchor());

        // a later incoming message grows the list; position must hold
        let messages = vec![msg("b", 200), msg("c", 300)];
        let adj = anchor.on_list_rendered(&messages, metrics(50.0, 1100.0));
        assert_eq!(adj, ScrollAdjustment::None);
    }

    #[test]
    fn test_own_message_scrolls_to_bottom() {
        let mut anchor = ScrollAnchor::new();
        anchor.on_list_rendered(&[msg("a", 100)], metrics(0.0, 1000.0));

        let messages = vec![msg("a", 100), placeholder("b", 200)];
        let adj = anchor.on_list_rendered(&messages, metrics(300.0, 1100.0));
        assert_eq!(adj, ScrollAdjustment::ToBottom);
    }

    #[test]
    fn test_incoming_message_leaves_position() {
        let mut anchor = ScrollAnchor::new();
        anchor.on_list_rendered(&[msg("a", 100)], metrics(0.0, 1000.0));

        let messages = vec![msg("a", 100), msg("b", 200)];
        let adj = anchor.on_list_rendered(&messages, metrics(300.0, 1100.0));
        assert_eq!(adj, ScrollAdjustment::None);
    }

    #[test]
    fn test_pending_anchor_wins_over_own_message() {
        let mut anchor = ScrollAnchor::new();
        anchor.on_list_rendered(&[msg("b", 200)], metrics(0.0, 1000.0));
        anchor.note_before_prepend(metrics(20.0, 1000.0));

        // older page and an own placeholder land in the same render
        let messages = vec![msg("a", 100), msg("b", 200), placeholder("c", 300)];
        let adj = anchor.on_list_rendered(&messages, metrics(20.0, 1500.0));
        assert_eq!(adj, ScrollAdjustment::ToOffset(500.0));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut anchor = ScrollAnchor::new();
        anchor.on_list_rendered(&[msg("a", 100)], metrics(0.0, 1000.0));
        anchor.note_before_prepend(metrics(0.0, 1000.0));
        anchor.track_pinned(
            &[SeparatorPosition {
                label: "Hoje".to_string(),
                top: 0.0,
            }],
            0.0,
        );

        anchor.reset();
        assert!(!anchor.has_done_initial_scroll());
        assert!(!anchor.has_pending_anchor());
        assert!(anchor.pinned_label().is_none());
    }

    #[test]
    fn test_pinned_first_at_or_below_top() {
        let separators = vec![
            SeparatorPosition { label: "Ontem".to_string(), top: 100.0 },
            SeparatorPosition { label: "Hoje".to_string(), top: 900.0 },
        ];
        assert_eq!(
            pinned_separator_label(&separators, 50.0),
            Some("Ontem".to_string())
        );
        assert_eq!(
            pinned_separator_label(&separators, 100.0),
            Some("Ontem".to_string())
        );
        assert_eq!(
            pinned_separator_label(&separators, 500.0),
            Some("Hoje".to_string())
        );
    }

    #[test]
    fn test_pinned_falls_back_to_last() {
        let separators = vec![
            SeparatorPosition { label: "Ontem".to_string(), top: 100.0 },
            SeparatorPosition { label: "Hoje".to_string(), top: 900.0 },
        ];
        // deep below every separator
        assert_eq!(
            pinned_separator_label(&separators, 2000.0),
            Some("Hoje".to_string())
        );
    }

    #[test]
    fn test_pinned_empty_timeline() {
        assert_eq!(pinned_separator_label(&[], 0.0), None);
    }

    #[test]
    fn test_should_fetch_older_guards() {
        let near_top = metrics(80.0, 2000.0);
        let far = metrics(500.0, 2000.0);

        assert!(should_fetch_older(near_top, 100.0, true, false));
        assert!(!should_fetch_older(far, 100.0, true, false));
        assert!(!should_fetch_older(near_top, 100.0, false, false));
        assert!(!should_fetch_older(near_top, 100.0, true, true));
    }
}
