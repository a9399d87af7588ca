//! Event matching: which wine moments to surface to a user right now.
//!
//! An event is surfaced only when all three hold:
//! 1. its date lies in the active window around today,
//! 2. the user has not dismissed it,
//! 3. its tags intersect the user's in-stock bottle tags.
//!
//! Results are ordered newest date first. Surfaced events get `last_shown_at`
//! stamped on a best-effort basis.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::events::window::ActiveWindow;
use crate::flags::{UserFlags, WINE_MOMENTS};
use crate::inventory::load_tag_set;
use crate::inventory::tags::BottleTagSet;
use crate::models::event::{MatchedEvent, WineEvent};
use crate::store::CellarStore;

/// Inputs for one matcher invocation.
pub struct MatchParams<'a> {
    pub user_id: Uuid,
    pub flags: &'a UserFlags,
    pub today: NaiveDate,
    pub window_days: u32,
    pub now: DateTime<Utc>,
}

/// Pure matching step over already-loaded data.
pub fn match_events(
    events: Vec<WineEvent>,
    window: &ActiveWindow,
    dismissed: &HashSet<String>,
    tags: &BottleTagSet,
) -> Vec<MatchedEvent> {
    let mut matched: Vec<MatchedEvent> = events
        .into_iter()
        .filter(|e| window.contains(e.date))
        .filter(|e| !dismissed.contains(&e.id))
        .filter_map(|event| {
            let matched_tags = tags.intersect(&event.tags);
            if matched_tags.is_empty() {
                None
            } else {
                Some(MatchedEvent {
                    event,
                    matched_tags,
                })
            }
        })
        .collect();

    matched.sort_by(|a, b| {
        b.event
            .date
            .cmp(&a.event.date)
            .then_with(|| a.event.name.cmp(&b.event.name))
            .then_with(|| a.event.id.cmp(&b.event.id))
    });
    matched
}

/// Loads, matches and stamps the events to show `params.user_id`.
pub async fn find_matching_events(
    store: &dyn CellarStore,
    params: MatchParams<'_>,
) -> Result<Vec<MatchedEvent>, AppError> {
    let MatchParams {
        user_id,
        flags,
        today,
        window_days,
        now,
    } = params;

    if !flags.is_enabled(WINE_MOMENTS) {
        debug!("wine moments disabled for user {user_id}");
        return Ok(Vec::new());
    }

    // No stock, no recommendations. Skip the event query entirely.
    let tags = load_tag_set(store, user_id).await?;
    if tags.is_empty() {
        return Ok(Vec::new());
    }

    let window = ActiveWindow::around(today, window_days);
    let events = store.events_between(window.start, window.end).await?;
    if events.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<String> = events.iter().map(|e| e.id.clone()).collect();
    let dismissed = store.dismissed_event_ids(user_id, &ids).await?;
    let matched = match_events(events, &window, &dismissed, &tags);

    if !matched.is_empty() {
        let shown: Vec<String> = matched.iter().map(|m| m.event.id.clone()).collect();
        if let Err(e) = store.record_shown(user_id, &shown, now).await {
            warn!(
                user_id = %user_id,
                events = shown.len(),
                "failed to record last_shown_at: {e}"
            );
        }
    }

    debug!(
        "matched {} event(s) for user {user_id} in window {}..={}",
        matched.len(),
        window.start,
        window.end
    );
    Ok(matched)
}
