use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct CartItem {
    pub animation_id: String,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItem {
    pub animation_id: String,
}
