use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::CartProduct;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddProductRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateQuantityRequest {
    pub product_id: Uuid,
    /// Zero or a negative value removes the line.
    pub quantity: i32,
}

/// Cart contents priced with live product prices.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartSummary {
    pub cart_id: Uuid,
    pub cart_products: Vec<CartProduct>,
    pub total_price: i64,
}
