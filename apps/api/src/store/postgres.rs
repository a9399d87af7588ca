use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::bottle::Bottle;
use crate::models::event::{UserEventState, WineEvent, WineEventRow};
use crate::models::flags::{FlagChange, FlagUpdate, UserFlagsRecord};
use crate::store::{CellarStore, StoreResult};

/// Postgres-backed store. Relies on single-statement upserts for atomicity.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserFlagsRow {
    user_id: Uuid,
    version: i64,
    flags: Json<BTreeMap<String, bool>>,
    updated_at: DateTime<Utc>,
}

impl From<UserFlagsRow> for UserFlagsRecord {
    fn from(row: UserFlagsRow) -> Self {
        UserFlagsRecord {
            user_id: row.user_id,
            version: row.version,
            overrides: row.flags.0,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl CellarStore for PgStore {
    async fn events_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<WineEvent>> {
        let rows = sqlx::query_as::<_, WineEventRow>(
            r#"
            SELECT id, name, event_date, tags, event_type, description
            FROM wine_events
            WHERE event_date BETWEEN $1 AND $2
            ORDER BY event_date DESC, name ASC, id ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(WineEvent::try_from).collect()
    }

    async fn upsert_event(&self, event: &WineEvent) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO wine_events (id, name, event_date, tags, event_type, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                event_date = EXCLUDED.event_date,
                tags = EXCLUDED.tags,
                event_type = EXCLUDED.event_type,
                description = EXCLUDED.description,
                updated_at = now()
            "#,
        )
        .bind(&event.id)
        .bind(&event.name)
        .bind(event.date)
        .bind(&event.tags)
        .bind(event.event_type.as_str())
        .bind(&event.description)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn dismissed_event_ids(
        &self,
        user_id: Uuid,
        event_ids: &[String],
    ) -> StoreResult<HashSet<String>> {
        if event_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT event_id FROM user_event_states
            WHERE user_id = $1 AND event_id = ANY($2) AND dismissed_at IS NOT NULL
            "#,
        )
        .bind(user_id)
        .bind(event_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().collect())
    }

    async fn user_event_state(
        &self,
        user_id: Uuid,
        event_id: &str,
    ) -> StoreResult<Option<UserEventState>> {
        Ok(sqlx::query_as::<_, UserEventState>(
            r#"
            SELECT user_id, event_id, dismissed_at, last_shown_at
            FROM user_event_states
            WHERE user_id = $1 AND event_id = $2
            "#,
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn record_dismissal(
        &self,
        user_id: Uuid,
        event_id: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<UserEventState>> {
        // Selecting from wine_events makes an unknown event insert nothing.
        // COALESCE keeps the first dismissal timestamp on repeat calls.
        Ok(sqlx::query_as::<_, UserEventState>(
            r#"
            INSERT INTO user_event_states (user_id, event_id, dismissed_at)
            SELECT $1, e.id, $3 FROM wine_events e WHERE e.id = $2
            ON CONFLICT (user_id, event_id) DO UPDATE SET
                dismissed_at = COALESCE(user_event_states.dismissed_at, EXCLUDED.dismissed_at)
            RETURNING user_id, event_id, dismissed_at, last_shown_at
            "#,
        )
        .bind(user_id)
        .bind(event_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn record_seen(
        &self,
        user_id: Uuid,
        event_id: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<UserEventState>> {
        Ok(sqlx::query_as::<_, UserEventState>(
            r#"
            INSERT INTO user_event_states (user_id, event_id, last_shown_at)
            SELECT $1, e.id, $3 FROM wine_events e WHERE e.id = $2
            ON CONFLICT (user_id, event_id) DO UPDATE SET
                last_shown_at = EXCLUDED.last_shown_at
            RETURNING user_id, event_id, dismissed_at, last_shown_at
            "#,
        )
        .bind(user_id)
        .bind(event_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn record_shown(
        &self,
        user_id: Uuid,
        event_ids: &[String],
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        if event_ids.is_empty() {
            return Ok(());
        }
        sqlx::query(
            r#"
            INSERT INTO user_event_states (user_id, event_id, last_shown_at)
            SELECT $1, unnest($2::text[]), $3
            ON CONFLICT (user_id, event_id) DO UPDATE SET
                last_shown_at = EXCLUDED.last_shown_at
            "#,
        )
        .bind(user_id)
        .bind(event_ids)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn in_stock_bottles(&self, user_id: Uuid) -> StoreResult<Vec<Bottle>> {
        Ok(sqlx::query_as::<_, Bottle>(
            r#"
            SELECT id, user_id, name, grapes, color, quantity
            FROM bottles
            WHERE user_id = $1 AND quantity > 0
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn cellar_size(&self, user_id: Uuid) -> StoreResult<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM bottles WHERE user_id = $1 AND quantity > 0",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    async fn user_flags(&self, user_id: Uuid) -> StoreResult<Option<UserFlagsRecord>> {
        let row = sqlx::query_as::<_, UserFlagsRow>(
            "SELECT user_id, version, flags, updated_at FROM user_flags WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(UserFlagsRecord::from))
    }

    async fn apply_flag_change(&self, change: FlagChange<'_>) -> StoreResult<FlagUpdate> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO user_flags (user_id, version, flags) VALUES ($1, 0, '{}'::jsonb) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(change.target_user_id)
        .execute(&mut *tx)
        .await?;

        // Row lock serialises concurrent admin commands on the same user.
        let row = sqlx::query_as::<_, UserFlagsRow>(
            "SELECT user_id, version, flags, updated_at FROM user_flags WHERE user_id = $1 FOR UPDATE",
        )
        .bind(change.target_user_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut overrides = row.flags.0;
        let previous = overrides
            .get(change.flag_name)
            .copied()
            .unwrap_or(change.default_value);

        if previous == change.value {
            tx.commit().await?;
            return Ok(FlagUpdate {
                changed: false,
                previous,
                version: row.version,
            });
        }

        overrides.insert(change.flag_name.to_string(), change.value);
        let version = row.version + 1;

        sqlx::query("UPDATE user_flags SET flags = $2, version = $3, updated_at = $4 WHERE user_id = $1")
            .bind(change.target_user_id)
            .bind(Json(&overrides))
            .bind(version)
            .bind(change.at)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO feature_flag_audit
                (id, target_user_id, flag_name, old_value, new_value, actor, version, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(change.target_user_id)
        .bind(change.flag_name)
        .bind(previous)
        .bind(change.value)
        .bind(change.actor)
        .bind(version)
        .bind(change.at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(FlagUpdate {
            changed: true,
            previous,
            version,
        })
    }
}
