//! Persistence seams.
//!
//! Services talk to storage only through these traits. [`SeaOrmStore`] backs the
//! running server with Postgres; [`MemoryStore`] keeps everything in process and is
//! what the test suite runs against.
//!
//! Lookups return `Option` for "found / not found"; absence is never an error at
//! this layer. Mutations that have more than one legitimate outcome return a
//! dedicated enum (see [`LineChange`]).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        Bill, BillWithLines, Cart, CartLine, CartProduct, Feedback, Product, Ratings, Survey,
        SurveyResult,
    },
};

pub mod memory;
pub mod orm;

pub use memory::MemoryStore;
pub use orm::SeaOrmStore;

#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
}

/// Outcome of a cart line mutation.
#[derive(Debug, Clone)]
pub enum LineChange {
    Created(CartLine),
    Updated(CartLine),
    Removed,
    /// No line exists for the (cart, product) pair.
    Missing,
}

/// One bill line as it will be written, tied to the cart line it snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillLineDraft {
    pub source_line_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: i64,
}

#[derive(Debug, Clone)]
pub struct BillDraft {
    pub resident_id: Uuid,
    pub amount: i64,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub bill_type: String,
    pub lines: Vec<BillLineDraft>,
}

impl BillDraft {
    /// True when `current` still describes exactly the cart this draft was built from.
    pub fn matches(&self, current: &[BillLineDraft]) -> bool {
        if self.lines.len() != current.len() {
            return false;
        }
        self.lines.iter().all(|line| current.contains(line))
    }
}

/// Snapshot of a cart's lines in the shape a bill draft uses.
pub fn snapshot_lines(lines: &[CartProduct]) -> Vec<BillLineDraft> {
    lines
        .iter()
        .map(|line| BillLineDraft {
            source_line_id: line.id,
            product_id: line.product.id,
            quantity: line.quantity,
            price: line.product.price,
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct NewSurvey {
    pub title: String,
    pub description: Option<String>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone)]
pub struct NewSurveyResult {
    pub survey_id: Uuid,
    pub resident_id: Uuid,
    pub ratings: Ratings,
}

#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub resident_id: Uuid,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub user_id: Option<Uuid>,
    pub action: String,
    pub resource: Option<String>,
    pub metadata: Option<Value>,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_products(&self, page: PageRequest) -> AppResult<(Vec<Product>, i64)>;
    async fn find_product(&self, id: Uuid) -> AppResult<Option<Product>>;
    async fn insert_product(&self, new: NewProduct) -> AppResult<Product>;
    async fn update_product(&self, id: Uuid, changes: ProductChanges)
    -> AppResult<Option<Product>>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn find_cart(&self, id: Uuid) -> AppResult<Option<Cart>>;
    async fn find_cart_for_resident(&self, resident_id: Uuid) -> AppResult<Option<Cart>>;
    /// Returns the resident's cart, creating it on first use.
    async fn ensure_cart(&self, resident_id: Uuid) -> AppResult<Cart>;
    /// Lines in insertion order, each joined with its live product.
    async fn cart_lines(&self, cart_id: Uuid) -> AppResult<Vec<CartProduct>>;
    /// Adds `quantity` to the existing line, or creates the line with exactly `quantity`.
    async fn add_to_line(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<LineChange>;
    /// Overwrites the line quantity; a non-positive value deletes the line.
    async fn set_line_quantity(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<LineChange>;
    async fn find_line(&self, line_id: Uuid) -> AppResult<Option<CartLine>>;
    async fn delete_line(&self, line_id: Uuid) -> AppResult<bool>;
}

#[async_trait]
pub trait BillStore: Send + Sync {
    /// Writes the bill and its lines and empties the cart in one unit.
    ///
    /// Fails with `Conflict` when the cart no longer matches `draft`, and with
    /// `NotFound` when the cart is gone. Either way nothing is written.
    async fn insert_bill_from_cart(
        &self,
        cart_id: Uuid,
        draft: &BillDraft,
    ) -> AppResult<BillWithLines>;
    async fn find_bill(&self, id: Uuid) -> AppResult<Option<BillWithLines>>;
    async fn list_bills(
        &self,
        resident_id: Option<Uuid>,
        page: PageRequest,
    ) -> AppResult<(Vec<Bill>, i64)>;
    /// Compare-and-set `UNPAID -> PAID`. Returns whether this call made the transition.
    async fn mark_bill_paid(&self, id: Uuid, paid_at: DateTime<Utc>) -> AppResult<bool>;
}

#[async_trait]
pub trait SurveyStore: Send + Sync {
    async fn insert_survey(&self, new: NewSurvey) -> AppResult<Survey>;
    async fn find_survey(&self, id: Uuid) -> AppResult<Option<Survey>>;
    async fn list_surveys(&self) -> AppResult<Vec<Survey>>;
    /// Fails with `Conflict` if the resident already answered the survey.
    async fn insert_survey_result(&self, new: NewSurveyResult) -> AppResult<SurveyResult>;
    async fn find_survey_result(&self, id: Uuid) -> AppResult<Option<SurveyResult>>;
    async fn list_survey_results(
        &self,
        survey_id: Option<Uuid>,
        resident_id: Option<Uuid>,
    ) -> AppResult<Vec<SurveyResult>>;
    async fn update_survey_result(
        &self,
        id: Uuid,
        ratings: Ratings,
    ) -> AppResult<Option<SurveyResult>>;
    async fn delete_survey_result(&self, id: Uuid) -> AppResult<bool>;
}

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn insert_feedback(&self, new: NewFeedback) -> AppResult<Feedback>;
    async fn list_feedback(&self, resident_id: Uuid) -> AppResult<Vec<Feedback>>;
    async fn resolve_feedback(&self, id: Uuid) -> AppResult<Option<Feedback>>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn record_audit(&self, entry: AuditEntry) -> AppResult<()>;
}

pub trait Store:
    CatalogStore + CartStore + BillStore + SurveyStore + FeedbackStore + AuditStore
{
}

impl<T> Store for T where
    T: CatalogStore + CartStore + BillStore + SurveyStore + FeedbackStore + AuditStore
{
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(quantity: i32, price: i64) -> BillLineDraft {
        BillLineDraft {
            source_line_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity,
            price,
        }
    }

    fn draft(lines: Vec<BillLineDraft>) -> BillDraft {
        let today = Utc::now().date_naive();
        BillDraft {
            resident_id: Uuid::new_v4(),
            amount: 0,
            issue_date: today,
            due_date: today,
            bill_type: "ORDER".into(),
            lines,
        }
    }

    #[test]
    fn draft_matches_same_lines_in_any_order() {
        let a = line(2, 10_000);
        let b = line(1, 5_000);
        let draft = draft(vec![a.clone(), b.clone()]);
        assert!(draft.matches(&[b, a]));
    }

    #[test]
    fn draft_rejects_changed_quantity_or_extra_line() {
        let a = line(2, 10_000);
        let draft = draft(vec![a.clone()]);

        let mut bumped = a.clone();
        bumped.quantity = 3;
        assert!(!draft.matches(&[bumped]));
        assert!(!draft.matches(&[a, line(1, 1)]));
        assert!(!draft.matches(&[]));
    }
}
