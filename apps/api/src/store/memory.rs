use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::bottle::Bottle;
use crate::models::event::{UserEventState, WineEvent};
use crate::models::flags::{FlagAuditEntry, FlagChange, FlagUpdate, UserFlagsRecord};
use crate::store::{CellarStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Tables {
    events: BTreeMap<String, WineEvent>,
    states: HashMap<(Uuid, String), UserEventState>,
    bottles: Vec<Bottle>,
    flags: HashMap<Uuid, UserFlagsRecord>,
    audit: Vec<FlagAuditEntry>,
}

/// In-process store with the same upsert semantics as `PgStore`.
/// Cloning shares the underlying tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    unavailable: Arc<AtomicBool>,
    fail_shown_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes only `record_shown` fail, leaving reads intact.
    pub fn set_fail_shown_writes(&self, fail: bool) {
        self.fail_shown_writes.store(fail, Ordering::SeqCst);
    }

    pub fn insert_bottle(&self, bottle: Bottle) -> StoreResult<()> {
        self.write()?.bottles.push(bottle);
        Ok(())
    }

    pub fn flag_audit(&self) -> StoreResult<Vec<FlagAuditEntry>> {
        Ok(self.read()?.audit.clone())
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store marked unavailable".into()));
        }
        Ok(())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.check_available()?;
        self.tables
            .read()
            .map_err(|_| StoreError::Internal("lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.check_available()?;
        self.tables
            .write()
            .map_err(|_| StoreError::Internal("lock poisoned".into()))
    }
}

#[async_trait]
impl CellarStore for MemoryStore {
    async fn events_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<WineEvent>> {
        let tables = self.read()?;
        let mut events: Vec<WineEvent> = tables
            .events
            .values()
            .filter(|e| e.date >= start && e.date <= end)
            .cloned()
            .collect();
        events.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(events)
    }

    async fn upsert_event(&self, event: &WineEvent) -> StoreResult<()> {
        self.write()?
            .events
            .insert(event.id.clone(), event.clone());
        Ok(())
    }

    async fn dismissed_event_ids(
        &self,
        user_id: Uuid,
        event_ids: &[String],
    ) -> StoreResult<HashSet<String>> {
        let tables = self.read()?;
        Ok(event_ids
            .iter()
            .filter(|id| {
                tables
                    .states
                    .get(&(user_id, (*id).clone()))
                    .is_some_and(UserEventState::is_dismissed)
            })
            .cloned()
            .collect())
    }

    async fn user_event_state(
        &self,
        user_id: Uuid,
        event_id: &str,
    ) -> StoreResult<Option<UserEventState>> {
        Ok(self
            .read()?
            .states
            .get(&(user_id, event_id.to_string()))
            .cloned())
    }

    async fn record_dismissal(
        &self,
        user_id: Uuid,
        event_id: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<UserEventState>> {
        let mut tables = self.write()?;
        if !tables.events.contains_key(event_id) {
            return Ok(None);
        }
        let state = tables
            .states
            .entry((user_id, event_id.to_string()))
            .or_insert_with(|| UserEventState::new(user_id, event_id));
        state.dismissed_at.get_or_insert(at);
        Ok(Some(state.clone()))
    }

    async fn record_seen(
        &self,
        user_id: Uuid,
        event_id: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<UserEventState>> {
        let mut tables = self.write()?;
        if !tables.events.contains_key(event_id) {
            return Ok(None);
        }
        let state = tables
            .states
            .entry((user_id, event_id.to_string()))
            .or_insert_with(|| UserEventState::new(user_id, event_id));
        state.last_shown_at = Some(at);
        Ok(Some(state.clone()))
    }

    async fn record_shown(
        &self,
        user_id: Uuid,
        event_ids: &[String],
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        if self.fail_shown_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("record_shown failed".into()));
        }
        let mut tables = self.write()?;
        for event_id in event_ids {
            if !tables.events.contains_key(event_id) {
                return Err(StoreError::Internal(format!(
                    "foreign key violation: wine_events.{event_id}"
                )));
            }
            tables
                .states
                .entry((user_id, event_id.clone()))
                .or_insert_with(|| UserEventState::new(user_id, event_id.as_str()))
                .last_shown_at = Some(at);
        }
        Ok(())
    }

    async fn in_stock_bottles(&self, user_id: Uuid) -> StoreResult<Vec<Bottle>> {
        Ok(self
            .read()?
            .bottles
            .iter()
            .filter(|b| b.user_id == user_id && b.in_stock())
            .cloned()
            .collect())
    }

    async fn cellar_size(&self, user_id: Uuid) -> StoreResult<i64> {
        Ok(self
            .read()?
            .bottles
            .iter()
            .filter(|b| b.user_id == user_id && b.in_stock())
            .map(|b| i64::from(b.quantity))
            .sum())
    }

    async fn user_flags(&self, user_id: Uuid) -> StoreResult<Option<UserFlagsRecord>> {
        Ok(self.read()?.flags.get(&user_id).cloned())
    }

    async fn apply_flag_change(&self, change: FlagChange<'_>) -> StoreResult<FlagUpdate> {
        let mut tables = self.write()?;
        let record = tables
            .flags
            .entry(change.target_user_id)
            .or_insert_with(|| UserFlagsRecord {
                user_id: change.target_user_id,
                version: 0,
                overrides: BTreeMap::new(),
                updated_at: change.at,
            });

        let previous = record
            .overrides
            .get(change.flag_name)
            .copied()
            .unwrap_or(change.default_value);
        if previous == change.value {
            return Ok(FlagUpdate {
                changed: false,
                previous,
                version: record.version,
            });
        }

        record
            .overrides
            .insert(change.flag_name.to_string(), change.value);
        record.version += 1;
        record.updated_at = change.at;
        let version = record.version;

        tables.audit.push(FlagAuditEntry {
            id: Uuid::new_v4(),
            target_user_id: change.target_user_id,
            flag_name: change.flag_name.to_string(),
            old_value: previous,
            new_value: change.value,
            actor: change.actor.to_string(),
            version,
            created_at: change.at,
        });

        Ok(FlagUpdate {
            changed: true,
            previous,
            version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::EventType;

    fn event(id: &str, date: NaiveDate) -> WineEvent {
        WineEvent {
            id: id.into(),
            name: id.to_uppercase(),
            date,
            tags: vec!["syrah".into()],
            event_type: EventType::Grape,
            description: String::new(),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[tokio::test]
    async fn test_events_between_is_inclusive_and_newest_first() {
        let store = MemoryStore::new();
        for (id, d) in [("a", 1), ("b", 5), ("c", 9), ("d", 10)] {
            store.upsert_event(&event(id, day(d))).await.unwrap();
        }
        let ids: Vec<_> = store
            .events_between(day(5), day(9))
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_shown_does_not_touch_dismissal() {
        let store = MemoryStore::new();
        store.upsert_event(&event("e1", day(1))).await.unwrap();
        let user = Uuid::new_v4();
        let t0 = Utc::now();
        store.record_dismissal(user, "e1", t0).await.unwrap();
        store
            .record_shown(user, &["e1".to_string()], t0 + chrono::Duration::hours(1))
            .await
            .unwrap();
        let state = store.user_event_state(user, "e1").await.unwrap().unwrap();
        assert_eq!(state.dismissed_at, Some(t0));
        assert!(state.last_shown_at.is_some());
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_reads() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.user_flags(Uuid::new_v4()).await,
            Err(StoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_writes_for_missing_event_insert_nothing() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let now = Utc::now();
        assert_eq!(store.record_dismissal(user, "gone", now).await.unwrap(), None);
        assert_eq!(store.record_seen(user, "gone", now).await.unwrap(), None);
        assert!(store.user_event_state(user, "gone").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cellar_size_sums_in_stock_quantities() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        for q in [3, 0, 2] {
            store
                .insert_bottle(Bottle {
                    id: Uuid::new_v4(),
                    user_id: user,
                    name: "Hermitage".into(),
                    grapes: vec!["Syrah".into()],
                    color: Some("red".into()),
                    quantity: q,
                })
                .unwrap();
        }
        assert_eq!(store.cellar_size(user).await.unwrap(), 5);
        assert_eq!(store.in_stock_bottles(user).await.unwrap().len(), 2);
    }
}
