//! Per-user feature configuration.
//!
//! Each user has one versioned flag record. It is resolved once per request
//! (see `auth::AuthUser`) and handed to handlers explicitly.

pub mod handlers;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::flags::{FlagChange, FlagUpdate, UserFlagsRecord};
use crate::store::CellarStore;

pub const WINE_MOMENTS: &str = "wine_moments";
pub const PHOTO_IMPORT_BETA: &str = "photo_import_beta";
pub const CSV_IMPORT_BETA: &str = "csv_import_beta";

/// Every known flag with its default value.
pub const KNOWN_FLAGS: &[(&str, bool)] = &[
    (WINE_MOMENTS, true),
    (PHOTO_IMPORT_BETA, false),
    (CSV_IMPORT_BETA, false),
];

pub fn default_value(flag_name: &str) -> Option<bool> {
    KNOWN_FLAGS
        .iter()
        .find(|(name, _)| *name == flag_name)
        .map(|(_, default)| *default)
}

/// Resolved flags: defaults overlaid with the user's overrides.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserFlags {
    pub version: i64,
    pub flags: BTreeMap<String, bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserFlags {
    pub fn defaults() -> Self {
        Self::from_record(None)
    }

    pub fn from_record(record: Option<UserFlagsRecord>) -> Self {
        let mut flags: BTreeMap<String, bool> = KNOWN_FLAGS
            .iter()
            .map(|(name, default)| (name.to_string(), *default))
            .collect();
        match record {
            Some(record) => {
                // Overrides for retired flags are ignored.
                for (name, value) in record.overrides {
                    if let Some(slot) = flags.get_mut(&name) {
                        *slot = value;
                    }
                }
                UserFlags {
                    version: record.version,
                    flags,
                    updated_at: Some(record.updated_at),
                }
            }
            None => UserFlags {
                version: 0,
                flags,
                updated_at: None,
            },
        }
    }

    pub fn is_enabled(&self, flag_name: &str) -> bool {
        self.flags
            .get(flag_name)
            .copied()
            .or_else(|| default_value(flag_name))
            .unwrap_or(false)
    }
}

pub async fn resolve(store: &dyn CellarStore, user_id: Uuid) -> Result<UserFlags, AppError> {
    let record = store.user_flags(user_id).await?;
    Ok(UserFlags::from_record(record))
}

/// Administrative command: set one flag for one user.
///
/// Idempotent. Re-applying the current value reports `changed = false` and
/// leaves the version and audit trail untouched.
pub async fn set_user_flag(
    store: &dyn CellarStore,
    target_user_id: Uuid,
    flag_name: &str,
    value: bool,
    actor: &str,
) -> Result<FlagUpdate, AppError> {
    let default_value = default_value(flag_name).ok_or_else(|| {
        AppError::Validation(format!(
            "Unknown flag '{flag_name}'. Known flags: {}",
            KNOWN_FLAGS
                .iter()
                .map(|(n, _)| *n)
                .collect::<Vec<_>>()
                .join(", ")
        ))
    })?;
    let actor = actor.trim();
    if actor.is_empty() {
        return Err(AppError::Validation("actor must not be empty".into()));
    }

    let update = store
        .apply_flag_change(FlagChange {
            target_user_id,
            flag_name,
            value,
            default_value,
            actor,
            at: Utc::now(),
        })
        .await?;

    if update.changed {
        info!(
            target_user = %target_user_id,
            flag = flag_name,
            previous = update.previous,
            value,
            actor,
            version = update.version,
            "feature flag updated"
        );
    } else {
        info!(
            target_user = %target_user_id,
            flag = flag_name,
            value,
            actor,
            "feature flag already at requested value"
        );
    }
    Ok(update)
}
