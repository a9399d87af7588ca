use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::store::StoreError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Grape,
    Holiday,
    Region,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Grape => "grape",
            EventType::Holiday => "holiday",
            EventType::Region => "region",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grape" => Ok(EventType::Grape),
            "holiday" => Ok(EventType::Holiday),
            "region" => Ok(EventType::Region),
            other => Err(format!("unknown event type '{other}'")),
        }
    }
}

/// A calendar-anchored "wine world moment".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WineEvent {
    pub id: String,
    pub name: String,
    pub date: NaiveDate,
    /// Normalised (lowercase, trimmed, deduplicated) tags.
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub description: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct WineEventRow {
    pub id: String,
    pub name: String,
    pub event_date: NaiveDate,
    pub tags: Vec<String>,
    pub event_type: String,
    pub description: String,
}

impl TryFrom<WineEventRow> for WineEvent {
    type Error = StoreError;

    fn try_from(row: WineEventRow) -> Result<Self, Self::Error> {
        let event_type = row
            .event_type
            .parse::<EventType>()
            .map_err(|e| StoreError::Corrupt(format!("wine_events.{}: {e}", row.id)))?;
        Ok(WineEvent {
            id: row.id,
            name: row.name,
            date: row.event_date,
            tags: row.tags,
            event_type,
            description: row.description,
        })
    }
}

/// Per-user, per-event interaction record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserEventState {
    pub user_id: Uuid,
    pub event_id: String,
    pub dismissed_at: Option<DateTime<Utc>>,
    pub last_shown_at: Option<DateTime<Utc>>,
}

impl UserEventState {
    pub fn new(user_id: Uuid, event_id: impl Into<String>) -> Self {
        Self {
            user_id,
            event_id: event_id.into(),
            dismissed_at: None,
            last_shown_at: None,
        }
    }

    pub fn is_dismissed(&self) -> bool {
        self.dismissed_at.is_some()
    }
}

/// An event surfaced to a user together with the tags that made it match.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchedEvent {
    #[serde(flatten)]
    pub event: WineEvent,
    pub matched_tags: Vec<String>,
}
