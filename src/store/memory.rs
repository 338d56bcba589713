use std::sync::{
    Mutex, MutexGuard,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    AuditEntry, AuditStore, BillDraft, BillStore, CartStore, CatalogStore, FeedbackStore,
    LineChange, NewFeedback, NewProduct, NewSurvey, NewSurveyResult, PageRequest, ProductChanges,
    SurveyStore, snapshot_lines,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        Bill, BillLine, BillWithLines, Cart, CartLine, CartProduct, Feedback, PaymentStatus,
        Product, Ratings, Survey, SurveyResult, cart_total,
    },
};

#[derive(Default)]
struct MemoryState {
    products: Vec<Product>,
    carts: Vec<Cart>,
    cart_lines: Vec<CartLine>,
    bills: Vec<Bill>,
    bill_lines: Vec<BillLine>,
    surveys: Vec<Survey>,
    survey_results: Vec<SurveyResult>,
    feedback: Vec<Feedback>,
    audit_log: Vec<AuditEntry>,
}

impl MemoryState {
    fn product(&self, id: Uuid) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    fn cart_products(&self, cart_id: Uuid) -> AppResult<Vec<CartProduct>> {
        self.cart_lines
            .iter()
            .filter(|line| line.cart_id == cart_id)
            .map(|line| {
                let product = self
                    .product(line.product_id)
                    .cloned()
                    .ok_or(AppError::NotFound("product"))?;
                Ok(CartProduct {
                    id: line.id,
                    product,
                    quantity: line.quantity,
                })
            })
            .collect()
    }

    /// Fails when the cart total would overflow with `product_id` at `quantity`.
    fn check_total_with(&self, cart_id: Uuid, product_id: Uuid, quantity: i32) -> AppResult<()> {
        let mut lines = self.cart_products(cart_id)?;
        match lines.iter_mut().find(|line| line.product.id == product_id) {
            Some(line) => line.quantity = quantity,
            None => {
                let product = self
                    .product(product_id)
                    .cloned()
                    .ok_or(AppError::NotFound("product"))?;
                lines.push(CartProduct {
                    id: Uuid::nil(),
                    product,
                    quantity,
                });
            }
        }
        cart_total(&lines).map(|_| ())
    }

    fn bill_with_lines(&self, bill: &Bill) -> BillWithLines {
        let mut lines: Vec<BillLine> = self
            .bill_lines
            .iter()
            .filter(|line| line.bill_id == bill.id)
            .cloned()
            .collect();
        lines.sort_by_key(|line| line.position);
        BillWithLines {
            bill: bill.clone(),
            lines,
        }
    }
}

/// Process-local [`Store`](super::Store) for tests and local experiments.
///
/// Every operation runs under one mutex, which gives the same all-or-nothing
/// behaviour the Postgres store gets from transactions.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_bill_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next bill write fail after the bill rows were staged.
    pub fn fail_next_bill_write(&self) {
        self.fail_bill_writes.store(true, Ordering::SeqCst);
    }

    /// Audit entries recorded so far.
    pub fn audit_actions(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|state| state.audit_log.iter().map(|e| e.action.clone()).collect())
            .unwrap_or_default()
    }

    fn state(&self) -> AppResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("memory store lock poisoned")))
    }
}

fn page<T: Clone>(items: &[T], page: PageRequest) -> Vec<T> {
    items
        .iter()
        .skip(page.offset.max(0) as usize)
        .take(page.limit.max(0) as usize)
        .cloned()
        .collect()
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_products(&self, request: PageRequest) -> AppResult<(Vec<Product>, i64)> {
        let state = self.state()?;
        let mut products = state.products.clone();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok((page(&products, request), products.len() as i64))
    }

    async fn find_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(self.state()?.product(id).cloned())
    }

    async fn insert_product(&self, new: NewProduct) -> AppResult<Product> {
        let mut state = self.state()?;
        if state.products.iter().any(|p| p.name == new.name) {
            return Err(AppError::Conflict(format!(
                "product `{}` already exists",
                new.name
            )));
        }
        let product = Product {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            price: new.price,
            created_at: Utc::now(),
        };
        state.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: Uuid,
        changes: ProductChanges,
    ) -> AppResult<Option<Product>> {
        let mut state = self.state()?;
        let Some(product) = state.products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            product.name = name;
        }
        if let Some(description) = changes.description {
            product.description = Some(description);
        }
        if let Some(price) = changes.price {
            product.price = price;
        }
        Ok(Some(product.clone()))
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn find_cart(&self, id: Uuid) -> AppResult<Option<Cart>> {
        Ok(self.state()?.carts.iter().find(|c| c.id == id).cloned())
    }

    async fn find_cart_for_resident(&self, resident_id: Uuid) -> AppResult<Option<Cart>> {
        Ok(self
            .state()?
            .carts
            .iter()
            .find(|c| c.resident_id == resident_id)
            .cloned())
    }

    async fn ensure_cart(&self, resident_id: Uuid) -> AppResult<Cart> {
        let mut state = self.state()?;
        if let Some(cart) = state.carts.iter().find(|c| c.resident_id == resident_id) {
            return Ok(cart.clone());
        }
        let cart = Cart {
            id: Uuid::new_v4(),
            resident_id,
            created_at: Utc::now(),
        };
        state.carts.push(cart.clone());
        Ok(cart)
    }

    async fn cart_lines(&self, cart_id: Uuid) -> AppResult<Vec<CartProduct>> {
        self.state()?.cart_products(cart_id)
    }

    async fn add_to_line(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<LineChange> {
        let mut state = self.state()?;
        if !state.carts.iter().any(|c| c.id == cart_id) {
            return Err(AppError::NotFound("cart"));
        }
        if state.product(product_id).is_none() {
            return Err(AppError::NotFound("product"));
        }

        let existing = state
            .cart_lines
            .iter()
            .position(|l| l.cart_id == cart_id && l.product_id == product_id);
        let new_quantity = match existing {
            Some(index) => state.cart_lines[index]
                .quantity
                .checked_add(quantity)
                .ok_or_else(|| AppError::Validation("quantity is too large".into()))?,
            None => quantity,
        };
        state.check_total_with(cart_id, product_id, new_quantity)?;

        let now = Utc::now();
        if let Some(index) = existing {
            let line = &mut state.cart_lines[index];
            line.quantity = new_quantity;
            line.updated_at = now;
            return Ok(LineChange::Updated(line.clone()));
        }

        let line = CartLine {
            id: Uuid::new_v4(),
            cart_id,
            product_id,
            quantity,
            created_at: now,
            updated_at: now,
        };
        state.cart_lines.push(line.clone());
        Ok(LineChange::Created(line))
    }

    async fn set_line_quantity(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<LineChange> {
        let mut state = self.state()?;
        let Some(index) = state
            .cart_lines
            .iter()
            .position(|l| l.cart_id == cart_id && l.product_id == product_id)
        else {
            return Ok(LineChange::Missing);
        };

        if quantity <= 0 {
            state.cart_lines.remove(index);
            return Ok(LineChange::Removed);
        }
        if quantity > state.cart_lines[index].quantity {
            state.check_total_with(cart_id, product_id, quantity)?;
        }

        let line = &mut state.cart_lines[index];
        line.quantity = quantity;
        line.updated_at = Utc::now();
        Ok(LineChange::Updated(line.clone()))
    }

    async fn find_line(&self, line_id: Uuid) -> AppResult<Option<CartLine>> {
        Ok(self
            .state()?
            .cart_lines
            .iter()
            .find(|l| l.id == line_id)
            .cloned())
    }

    async fn delete_line(&self, line_id: Uuid) -> AppResult<bool> {
        let mut state = self.state()?;
        let before = state.cart_lines.len();
        state.cart_lines.retain(|l| l.id != line_id);
        Ok(state.cart_lines.len() != before)
    }
}

#[async_trait]
impl BillStore for MemoryStore {
    async fn insert_bill_from_cart(
        &self,
        cart_id: Uuid,
        draft: &BillDraft,
    ) -> AppResult<BillWithLines> {
        let mut state = self.state()?;
        if !state.carts.iter().any(|c| c.id == cart_id) {
            return Err(AppError::NotFound("cart"));
        }

        let current = snapshot_lines(&state.cart_products(cart_id)?);
        if !draft.matches(&current) {
            return Err(AppError::Conflict(
                "cart changed while the bill was being prepared".into(),
            ));
        }

        let now = Utc::now();
        let bill = Bill {
            id: Uuid::new_v4(),
            resident_id: draft.resident_id,
            amount: draft.amount,
            issue_date: draft.issue_date,
            due_date: draft.due_date,
            bill_type: draft.bill_type.clone(),
            payment_status: PaymentStatus::Unpaid,
            paid_at: None,
            created_at: now,
        };
        let lines: Vec<BillLine> = draft
            .lines
            .iter()
            .zip(0..)
            .map(|(line, position)| BillLine {
                id: Uuid::new_v4(),
                bill_id: bill.id,
                position,
                product_id: line.product_id,
                quantity: line.quantity,
                price: line.price,
                created_at: now,
            })
            .collect();

        // Staged rows are only published once every step succeeded.
        if self.fail_bill_writes.swap(false, Ordering::SeqCst) {
            return Err(AppError::Internal(anyhow::anyhow!(
                "injected failure while writing bill lines"
            )));
        }

        state.bills.push(bill.clone());
        state.bill_lines.extend(lines.iter().cloned());
        state.cart_lines.retain(|l| l.cart_id != cart_id);

        Ok(BillWithLines { bill, lines })
    }

    async fn find_bill(&self, id: Uuid) -> AppResult<Option<BillWithLines>> {
        let state = self.state()?;
        Ok(state
            .bills
            .iter()
            .find(|b| b.id == id)
            .map(|bill| state.bill_with_lines(bill)))
    }

    async fn list_bills(
        &self,
        resident_id: Option<Uuid>,
        request: PageRequest,
    ) -> AppResult<(Vec<Bill>, i64)> {
        let state = self.state()?;
        let mut bills: Vec<Bill> = state
            .bills
            .iter()
            .filter(|b| resident_id.is_none_or(|r| b.resident_id == r))
            .cloned()
            .collect();
        bills.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok((page(&bills, request), bills.len() as i64))
    }

    async fn mark_bill_paid(&self, id: Uuid, paid_at: DateTime<Utc>) -> AppResult<bool> {
        let mut state = self.state()?;
        match state
            .bills
            .iter_mut()
            .find(|b| b.id == id && b.payment_status == PaymentStatus::Unpaid)
        {
            Some(bill) => {
                bill.payment_status = PaymentStatus::Paid;
                bill.paid_at = Some(paid_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl SurveyStore for MemoryStore {
    async fn insert_survey(&self, new: NewSurvey) -> AppResult<Survey> {
        let survey = Survey {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            created_by: new.created_by,
            created_at: Utc::now(),
        };
        self.state()?.surveys.push(survey.clone());
        Ok(survey)
    }

    async fn find_survey(&self, id: Uuid) -> AppResult<Option<Survey>> {
        Ok(self.state()?.surveys.iter().find(|s| s.id == id).cloned())
    }

    async fn list_surveys(&self) -> AppResult<Vec<Survey>> {
        Ok(self.state()?.surveys.clone())
    }

    async fn insert_survey_result(&self, new: NewSurveyResult) -> AppResult<SurveyResult> {
        let mut state = self.state()?;
        if !state.surveys.iter().any(|s| s.id == new.survey_id) {
            return Err(AppError::NotFound("survey"));
        }
        if state
            .survey_results
            .iter()
            .any(|r| r.survey_id == new.survey_id && r.resident_id == new.resident_id)
        {
            return Err(AppError::Conflict(
                "resident already answered this survey".into(),
            ));
        }
        let now = Utc::now();
        let result = SurveyResult {
            id: Uuid::new_v4(),
            survey_id: new.survey_id,
            resident_id: new.resident_id,
            cleanliness_rating: new.ratings.cleanliness,
            facilities_rating: new.ratings.facilities,
            services_rating: new.ratings.services,
            created_at: now,
            updated_at: now,
        };
        state.survey_results.push(result.clone());
        Ok(result)
    }

    async fn find_survey_result(&self, id: Uuid) -> AppResult<Option<SurveyResult>> {
        Ok(self
            .state()?
            .survey_results
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn list_survey_results(
        &self,
        survey_id: Option<Uuid>,
        resident_id: Option<Uuid>,
    ) -> AppResult<Vec<SurveyResult>> {
        Ok(self
            .state()?
            .survey_results
            .iter()
            .filter(|r| survey_id.is_none_or(|s| r.survey_id == s))
            .filter(|r| resident_id.is_none_or(|res| r.resident_id == res))
            .cloned()
            .collect())
    }

    async fn update_survey_result(
        &self,
        id: Uuid,
        ratings: Ratings,
    ) -> AppResult<Option<SurveyResult>> {
        let mut state = self.state()?;
        let Some(result) = state.survey_results.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        result.cleanliness_rating = ratings.cleanliness;
        result.facilities_rating = ratings.facilities;
        result.services_rating = ratings.services;
        result.updated_at = Utc::now();
        Ok(Some(result.clone()))
    }

    async fn delete_survey_result(&self, id: Uuid) -> AppResult<bool> {
        let mut state = self.state()?;
        let before = state.survey_results.len();
        state.survey_results.retain(|r| r.id != id);
        Ok(state.survey_results.len() != before)
    }
}

#[async_trait]
impl FeedbackStore for MemoryStore {
    async fn insert_feedback(&self, new: NewFeedback) -> AppResult<Feedback> {
        let feedback = Feedback {
            id: Uuid::new_v4(),
            resident_id: new.resident_id,
            title: new.title,
            content: new.content,
            resolved: false,
            created_at: Utc::now(),
        };
        self.state()?.feedback.push(feedback.clone());
        Ok(feedback)
    }

    async fn list_feedback(&self, resident_id: Uuid) -> AppResult<Vec<Feedback>> {
        Ok(self
            .state()?
            .feedback
            .iter()
            .filter(|f| f.resident_id == resident_id)
            .cloned()
            .collect())
    }

    async fn resolve_feedback(&self, id: Uuid) -> AppResult<Option<Feedback>> {
        let mut state = self.state()?;
        Ok(state
            .feedback
            .iter_mut()
            .find(|f| f.id == id)
            .map(|feedback| {
                feedback.resolved = true;
                feedback.clone()
            }))
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn record_audit(&self, entry: AuditEntry) -> AppResult<()> {
        self.state()?.audit_log.push(entry);
        Ok(())
    }
}
