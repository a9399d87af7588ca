pub mod handlers;
pub mod tags;

use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::inventory::tags::BottleTagSet;
use crate::store::CellarStore;

/// Cellar overview. `bottle_count` is the canonical inventory size: the sum of
/// in-stock quantities, computed by the store and nowhere else.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    pub bottle_count: i64,
    pub distinct_wines: usize,
    pub tags: Vec<String>,
}

/// Loads the user's tag set from in-stock bottles.
pub async fn load_tag_set(store: &dyn CellarStore, user_id: Uuid) -> Result<BottleTagSet, AppError> {
    let bottles = store.in_stock_bottles(user_id).await?;
    Ok(BottleTagSet::from_bottles(&bottles))
}

pub async fn summarize(store: &dyn CellarStore, user_id: Uuid) -> Result<InventorySummary, AppError> {
    let bottles = store.in_stock_bottles(user_id).await?;
    let bottle_count = store.cellar_size(user_id).await?;
    Ok(InventorySummary {
        bottle_count,
        distinct_wines: bottles.len(),
        tags: BottleTagSet::from_bottles(&bottles).to_vec(),
    })
}
