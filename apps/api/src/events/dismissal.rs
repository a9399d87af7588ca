use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::event::UserEventState;
use crate::store::CellarStore;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    /// Permanent opt-out of this event.
    Dismiss,
    /// Acknowledges the event was displayed. Never clears a dismissal.
    Seen,
}

/// Records a user's reaction to an event and returns the resulting state.
///
/// Both actions are idempotent upserts: re-dismissing keeps the first
/// `dismissed_at`, and `seen` only ever moves `last_shown_at`.
pub async fn apply_event_action(
    store: &dyn CellarStore,
    user_id: Uuid,
    event_id: &str,
    action: EventAction,
    now: DateTime<Utc>,
) -> Result<UserEventState, AppError> {
    let event_id = event_id.trim();
    if event_id.is_empty() {
        return Err(AppError::Validation("eventId must not be empty".into()));
    }
    let state = match action {
        EventAction::Dismiss => store.record_dismissal(user_id, event_id, now).await?,
        EventAction::Seen => store.record_seen(user_id, event_id, now).await?,
    };
    let state = state.ok_or_else(|| AppError::NotFound(format!("Event {event_id} not found")))?;
    if action == EventAction::Dismiss {
        info!("User {user_id} dismissed event {event_id}");
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::{EventType, WineEvent};
    use crate::store::MemoryStore;
    use chrono::{Duration, NaiveDate};

    async fn store_with_event(id: &str) -> MemoryStore {
        let store = MemoryStore::new();
        store
            .upsert_event(&WineEvent {
                id: id.into(),
                name: "Syrah Day".into(),
                date: NaiveDate::from_ymd_opt(2025, 2, 16).unwrap(),
                tags: vec!["syrah".into()],
                event_type: EventType::Grape,
                description: String::new(),
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_dismiss_twice_keeps_first_timestamp() {
        let store = store_with_event("e1").await;
        let user = Uuid::new_v4();
        let first = Utc::now();
        let second = first + Duration::minutes(5);

        apply_event_action(&store, user, "e1", EventAction::Dismiss, first)
            .await
            .unwrap();
        let state = apply_event_action(&store, user, "e1", EventAction::Dismiss, second)
            .await
            .unwrap();
        assert_eq!(state.dismissed_at, Some(first));
    }

    #[tokio::test]
    async fn test_seen_never_touches_dismissal() {
        let store = store_with_event("e1").await;
        let user = Uuid::new_v4();
        let t0 = Utc::now();

        let seen = apply_event_action(&store, user, "e1", EventAction::Seen, t0)
            .await
            .unwrap();
        assert_eq!(seen.last_shown_at, Some(t0));
        assert!(seen.dismissed_at.is_none());

        apply_event_action(&store, user, "e1", EventAction::Dismiss, t0)
            .await
            .unwrap();
        let t1 = t0 + Duration::hours(1);
        let after = apply_event_action(&store, user, "e1", EventAction::Seen, t1)
            .await
            .unwrap();
        assert_eq!(after.dismissed_at, Some(t0));
        assert_eq!(after.last_shown_at, Some(t1));
    }

    #[tokio::test]
    async fn test_unknown_event_is_not_found() {
        let store = store_with_event("e1").await;
        let err = apply_event_action(&store, Uuid::new_v4(), "nope", EventAction::Dismiss, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_seen_unknown_event_is_not_found_and_writes_nothing() {
        let store = store_with_event("e1").await;
        let user = Uuid::new_v4();
        let err = apply_event_action(&store, user, "nope", EventAction::Seen, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(store.user_event_state(user, "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blank_event_id_is_invalid() {
        let store = store_with_event("e1").await;
        let err = apply_event_action(&store, Uuid::new_v4(), "  ", EventAction::Seen, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_dismissal_is_per_user() {
        let store = store_with_event("e1").await;
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        apply_event_action(&store, alice, "e1", EventAction::Dismiss, Utc::now())
            .await
            .unwrap();
        assert!(store.user_event_state(bob, "e1").await.unwrap().is_none());
    }

    #[test]
    fn test_action_deserializes_lowercase() {
        let a: EventAction = serde_json::from_str("\"dismiss\"").unwrap();
        assert_eq!(a, EventAction::Dismiss);
        assert!(serde_json::from_str::<EventAction>("\"snooze\"").is_err());
    }
}
