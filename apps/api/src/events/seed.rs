//! Event seeding for the admin tool. Events are upserted by id, so re-running
//! a seed file applies administrative edits without duplicating rows.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::inventory::tags::normalize_tags;
use crate::models::event::{EventType, WineEvent};
use crate::store::CellarStore;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct EventSeed {
    id: String,
    name: String,
    date: NaiveDate,
    tags: Vec<String>,
    #[serde(rename = "type")]
    event_type: EventType,
    #[serde(default)]
    description: String,
}

/// Parses and validates a JSON array of events.
pub fn parse_seed(json: &str) -> Result<Vec<WineEvent>, AppError> {
    let seeds: Vec<EventSeed> = serde_json::from_str(json)
        .map_err(|e| AppError::Validation(format!("invalid seed file: {e}")))?;

    let mut seen = HashSet::new();
    let mut events = Vec::with_capacity(seeds.len());
    for seed in seeds {
        let id = seed.id.trim().to_string();
        if id.is_empty() {
            return Err(AppError::Validation("event id must not be empty".into()));
        }
        if !seen.insert(id.clone()) {
            return Err(AppError::Validation(format!("duplicate event id '{id}'")));
        }
        let name = seed.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation(format!("event '{id}' has no name")));
        }
        let tags = normalize_tags(&seed.tags);
        if tags.is_empty() {
            return Err(AppError::Validation(format!(
                "event '{id}' has no tags and could never match"
            )));
        }
        events.push(WineEvent {
            id,
            name,
            date: seed.date,
            tags,
            event_type: seed.event_type,
            description: seed.description.trim().to_string(),
        });
    }
    Ok(events)
}

pub fn load_seed_file(path: &Path) -> anyhow::Result<Vec<WineEvent>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    Ok(parse_seed(&raw)?)
}

/// Upserts every event; returns how many were written.
pub async fn seed_events(store: &dyn CellarStore, events: &[WineEvent]) -> Result<usize, AppError> {
    for event in events {
        store.upsert_event(event).await?;
        info!("Seeded event {} ({}, {})", event.id, event.event_type, event.date);
    }
    Ok(events.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::io::Write;

    const SEED: &str = r#"[
        {"id": "syrah-day", "name": "International Syrah Day", "date": "2025-02-16",
         "tags": ["Syrah", "Shiraz"], "type": "grape", "description": "Celebrate Syrah"},
        {"id": "nye", "name": "New Year's Eve", "date": "2025-12-31",
         "tags": ["sparkling"], "type": "holiday"}
    ]"#;

    #[test]
    fn test_parse_normalizes_tags() {
        let events = parse_seed(SEED).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].tags, vec!["shiraz", "syrah"]);
        assert_eq!(events[1].event_type, EventType::Holiday);
        assert_eq!(events[1].description, "");
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"[
            {"id": "a", "name": "A", "date": "2025-01-01", "tags": ["red"], "type": "holiday"},
            {"id": "a", "name": "B", "date": "2025-01-02", "tags": ["red"], "type": "holiday"}
        ]"#;
        assert!(matches!(parse_seed(json), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_tagless_event_rejected() {
        let json = r#"[{"id": "a", "name": "A", "date": "2025-01-01", "tags": [" "], "type": "region"}]"#;
        assert!(matches!(parse_seed(json), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let json = r#"[{"id": "a", "name": "A", "date": "2025-01-01", "tags": ["red"], "type": "party"}]"#;
        assert!(parse_seed(json).is_err());
    }

    #[test]
    fn test_load_seed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SEED.as_bytes()).unwrap();
        let events = load_seed_file(file.path()).unwrap();
        assert_eq!(events[0].id, "syrah-day");
    }

    #[tokio::test]
    async fn test_reseeding_updates_in_place() {
        let store = MemoryStore::new();
        let events = parse_seed(SEED).unwrap();
        assert_eq!(seed_events(&store, &events).await.unwrap(), 2);

        let mut edited = events.clone();
        edited[0].name = "Syrah & Shiraz Day".into();
        seed_events(&store, &edited).await.unwrap();

        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        let stored = store.events_between(start, end).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().any(|e| e.name == "Syrah & Shiraz Day"));
    }
}
