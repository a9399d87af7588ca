use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Bottle {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub grapes: Vec<String>,
    pub color: Option<String>,
    pub quantity: i32,
}

impl Bottle {
    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }
}
