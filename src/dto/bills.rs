use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Bill, BillLine};

#[derive(Debug, Serialize, ToSchema)]
pub struct BillCreated {
    pub id: Uuid,
    pub amount: i64,
    pub lines: Vec<BillLine>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BillList {
    pub items: Vec<Bill>,
}
