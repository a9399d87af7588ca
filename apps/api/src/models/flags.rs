use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted flag record. `overrides` only holds flags that were explicitly set;
/// defaults are applied when the record is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct UserFlagsRecord {
    pub user_id: Uuid,
    pub version: i64,
    pub overrides: BTreeMap<String, bool>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for a single administrative flag change.
#[derive(Debug, Clone)]
pub struct FlagChange<'a> {
    pub target_user_id: Uuid,
    pub flag_name: &'a str,
    pub value: bool,
    /// Effective value when the user has no override for this flag.
    pub default_value: bool,
    pub actor: &'a str,
    pub at: DateTime<Utc>,
}

/// Outcome of a flag change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagUpdate {
    pub changed: bool,
    pub previous: bool,
    pub version: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagAuditEntry {
    pub id: Uuid,
    pub target_user_id: Uuid,
    pub flag_name: String,
    pub old_value: bool,
    pub new_value: bool,
    pub actor: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}
