use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
    TransactionTrait,
};
use uuid::Uuid;

use super::{
    AuditEntry, AuditStore, BillDraft, BillStore, CartStore, CatalogStore, FeedbackStore,
    LineChange, NewFeedback, NewProduct, NewSurvey, NewSurveyResult, PageRequest, ProductChanges,
    SurveyStore, snapshot_lines,
};
use crate::{
    entity::{
        AuditLogs, BillLines, Bills, CartLines, Carts, FeedbackEntries, Products, SurveyResults,
        Surveys, audit_logs, bill_lines, bills, cart_lines, carts, feedback, products,
        survey_results, surveys,
    },
    error::{AppError, AppResult},
    models::{
        Bill, BillLine, BillWithLines, Cart, CartLine, CartProduct, Feedback, PaymentStatus,
        Product, Ratings, Survey, SurveyResult, cart_total,
    },
};

/// Postgres-backed store. Every multi-row mutation runs in a transaction that
/// starts by locking the owning cart row, so cart mutations and conversions on
/// the same cart are serialized.
#[derive(Clone)]
pub struct SeaOrmStore {
    conn: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

fn unique_violation(err: DbErr, message: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict(message.to_string()),
        _ => AppError::OrmError(err),
    }
}

async fn lock_cart<C: ConnectionTrait>(conn: &C, cart_id: Uuid) -> AppResult<carts::Model> {
    Carts::find_by_id(cart_id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("cart"))
}

async fn load_cart_lines<C: ConnectionTrait>(conn: &C, cart_id: Uuid) -> AppResult<Vec<CartProduct>> {
    CartLines::find()
        .find_also_related(Products)
        .filter(cart_lines::Column::CartId.eq(cart_id))
        .order_by_asc(cart_lines::Column::CreatedAt)
        .order_by_asc(cart_lines::Column::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(|(line, product)| {
            let product = product.ok_or(AppError::NotFound("product"))?;
            Ok(CartProduct {
                id: line.id,
                product: product_from_entity(product),
                quantity: line.quantity,
            })
        })
        .collect()
}

/// Fails when the cart total would overflow with `product_id` at `quantity`.
async fn check_total_with<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<()> {
    let mut lines = load_cart_lines(conn, cart_id).await?;
    match lines.iter_mut().find(|line| line.product.id == product_id) {
        Some(line) => line.quantity = quantity,
        None => {
            let product = Products::find_by_id(product_id)
                .one(conn)
                .await?
                .ok_or(AppError::NotFound("product"))?;
            lines.push(CartProduct {
                id: Uuid::nil(),
                product: product_from_entity(product),
                quantity,
            });
        }
    }
    cart_total(&lines).map(|_| ())
}

#[async_trait]
impl CatalogStore for SeaOrmStore {
    async fn list_products(&self, page: PageRequest) -> AppResult<(Vec<Product>, i64)> {
        let finder = Products::find().order_by_desc(products::Column::CreatedAt);
        let total = finder.clone().count(&self.conn).await? as i64;
        let items = finder
            .limit(page.limit as u64)
            .offset(page.offset as u64)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(product_from_entity)
            .collect();
        Ok((items, total))
    }

    async fn find_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(Products::find_by_id(id)
            .one(&self.conn)
            .await?
            .map(product_from_entity))
    }

    async fn insert_product(&self, new: NewProduct) -> AppResult<Product> {
        let name = new.name.clone();
        let product = products::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(new.name),
            description: Set(new.description),
            price: Set(new.price),
            created_at: NotSet,
        }
        .insert(&self.conn)
        .await
        .map_err(|err| unique_violation(err, &format!("product `{name}` already exists")))?;
        Ok(product_from_entity(product))
    }

    async fn update_product(
        &self,
        id: Uuid,
        changes: ProductChanges,
    ) -> AppResult<Option<Product>> {
        let Some(product) = Products::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };
        let mut active: products::ActiveModel = product.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(description) = changes.description {
            active.description = Set(Some(description));
        }
        if let Some(price) = changes.price {
            active.price = Set(price);
        }
        let product = active
            .update(&self.conn)
            .await
            .map_err(|err| unique_violation(err, "product name already exists"))?;
        Ok(Some(product_from_entity(product)))
    }
}

#[async_trait]
impl CartStore for SeaOrmStore {
    async fn find_cart(&self, id: Uuid) -> AppResult<Option<Cart>> {
        Ok(Carts::find_by_id(id)
            .one(&self.conn)
            .await?
            .map(cart_from_entity))
    }

    async fn find_cart_for_resident(&self, resident_id: Uuid) -> AppResult<Option<Cart>> {
        Ok(Carts::find()
            .filter(carts::Column::ResidentId.eq(resident_id))
            .one(&self.conn)
            .await?
            .map(cart_from_entity))
    }

    async fn ensure_cart(&self, resident_id: Uuid) -> AppResult<Cart> {
        Carts::insert(carts::ActiveModel {
            id: Set(Uuid::new_v4()),
            resident_id: Set(resident_id),
            created_at: NotSet,
        })
        .on_conflict(
            OnConflict::column(carts::Column::ResidentId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&self.conn)
        .await?;

        self.find_cart_for_resident(resident_id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("cart vanished after upsert")))
    }

    async fn cart_lines(&self, cart_id: Uuid) -> AppResult<Vec<CartProduct>> {
        load_cart_lines(&self.conn, cart_id).await
    }

    async fn add_to_line(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<LineChange> {
        let txn = self.conn.begin().await?;
        lock_cart(&txn, cart_id).await?;

        let existing = CartLines::find()
            .filter(
                Condition::all()
                    .add(cart_lines::Column::CartId.eq(cart_id))
                    .add(cart_lines::Column::ProductId.eq(product_id)),
            )
            .one(&txn)
            .await?;

        let change = match existing {
            Some(line) => {
                let total = line
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| AppError::Validation("quantity is too large".into()))?;
                check_total_with(&txn, cart_id, product_id, total).await?;
                let mut active: cart_lines::ActiveModel = line.into();
                active.quantity = Set(total);
                active.updated_at = Set(Utc::now().into());
                LineChange::Updated(cart_line_from_entity(active.update(&txn).await?))
            }
            None => {
                check_total_with(&txn, cart_id, product_id, quantity).await?;
                let line = cart_lines::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    cart_id: Set(cart_id),
                    product_id: Set(product_id),
                    quantity: Set(quantity),
                    created_at: NotSet,
                    updated_at: NotSet,
                }
                .insert(&txn)
                .await
                .map_err(|err| unique_violation(err, "cart line was created concurrently"))?;
                LineChange::Created(cart_line_from_entity(line))
            }
        };

        txn.commit().await?;
        Ok(change)
    }

    async fn set_line_quantity(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<LineChange> {
        let txn = self.conn.begin().await?;
        lock_cart(&txn, cart_id).await?;

        let Some(line) = CartLines::find()
            .filter(
                Condition::all()
                    .add(cart_lines::Column::CartId.eq(cart_id))
                    .add(cart_lines::Column::ProductId.eq(product_id)),
            )
            .one(&txn)
            .await?
        else {
            return Ok(LineChange::Missing);
        };

        let change = if quantity <= 0 {
            line.delete(&txn).await?;
            LineChange::Removed
        } else {
            if quantity > line.quantity {
                check_total_with(&txn, cart_id, product_id, quantity).await?;
            }
            let mut active: cart_lines::ActiveModel = line.into();
            active.quantity = Set(quantity);
            active.updated_at = Set(Utc::now().into());
            LineChange::Updated(cart_line_from_entity(active.update(&txn).await?))
        };

        txn.commit().await?;
        Ok(change)
    }

    async fn find_line(&self, line_id: Uuid) -> AppResult<Option<CartLine>> {
        Ok(CartLines::find_by_id(line_id)
            .one(&self.conn)
            .await?
            .map(cart_line_from_entity))
    }

    async fn delete_line(&self, line_id: Uuid) -> AppResult<bool> {
        let Some(line) = CartLines::find_by_id(line_id).one(&self.conn).await? else {
            return Ok(false);
        };
        let txn = self.conn.begin().await?;
        lock_cart(&txn, line.cart_id).await?;
        let result = CartLines::delete_by_id(line_id).exec(&txn).await?;
        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl BillStore for SeaOrmStore {
    async fn insert_bill_from_cart(
        &self,
        cart_id: Uuid,
        draft: &BillDraft,
    ) -> AppResult<BillWithLines> {
        let txn = self.conn.begin().await?;
        lock_cart(&txn, cart_id).await?;

        let current = snapshot_lines(&load_cart_lines(&txn, cart_id).await?);
        if !draft.matches(&current) {
            return Err(AppError::Conflict(
                "cart changed while the bill was being prepared".into(),
            ));
        }

        let bill = bills::ActiveModel {
            id: Set(Uuid::new_v4()),
            resident_id: Set(draft.resident_id),
            amount: Set(draft.amount),
            issue_date: Set(draft.issue_date),
            due_date: Set(draft.due_date),
            bill_type: Set(draft.bill_type.clone()),
            payment_status: Set(PaymentStatus::Unpaid.as_str().to_string()),
            paid_at: Set(None),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;

        let mut lines = Vec::with_capacity(draft.lines.len());
        for (line, position) in draft.lines.iter().zip(0..) {
            let line = bill_lines::ActiveModel {
                id: Set(Uuid::new_v4()),
                bill_id: Set(bill.id),
                position: Set(position),
                product_id: Set(line.product_id),
                quantity: Set(line.quantity),
                price: Set(line.price),
                created_at: NotSet,
            }
            .insert(&txn)
            .await?;
            lines.push(bill_line_from_entity(line));
        }

        CartLines::delete_many()
            .filter(cart_lines::Column::CartId.eq(cart_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        Ok(BillWithLines {
            bill: bill_from_entity(bill)?,
            lines,
        })
    }

    async fn find_bill(&self, id: Uuid) -> AppResult<Option<BillWithLines>> {
        let Some(bill) = Bills::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };
        let lines = BillLines::find()
            .filter(bill_lines::Column::BillId.eq(bill.id))
            .order_by_asc(bill_lines::Column::Position)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(bill_line_from_entity)
            .collect();
        Ok(Some(BillWithLines {
            bill: bill_from_entity(bill)?,
            lines,
        }))
    }

    async fn list_bills(
        &self,
        resident_id: Option<Uuid>,
        page: PageRequest,
    ) -> AppResult<(Vec<Bill>, i64)> {
        let mut condition = Condition::all();
        if let Some(resident_id) = resident_id {
            condition = condition.add(bills::Column::ResidentId.eq(resident_id));
        }
        let finder = Bills::find()
            .filter(condition)
            .order_by_desc(bills::Column::CreatedAt);
        let total = finder.clone().count(&self.conn).await? as i64;
        let bills = finder
            .limit(page.limit as u64)
            .offset(page.offset as u64)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(bill_from_entity)
            .collect::<AppResult<Vec<_>>>()?;
        Ok((bills, total))
    }

    async fn mark_bill_paid(&self, id: Uuid, paid_at: DateTime<Utc>) -> AppResult<bool> {
        let paid_at: sea_orm::prelude::DateTimeWithTimeZone = paid_at.into();
        let result = Bills::update_many()
            .col_expr(
                bills::Column::PaymentStatus,
                Expr::value(PaymentStatus::Paid.as_str()),
            )
            .col_expr(bills::Column::PaidAt, Expr::value(paid_at))
            .filter(
                Condition::all()
                    .add(bills::Column::Id.eq(id))
                    .add(bills::Column::PaymentStatus.eq(PaymentStatus::Unpaid.as_str())),
            )
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected == 1)
    }
}

#[async_trait]
impl SurveyStore for SeaOrmStore {
    async fn insert_survey(&self, new: NewSurvey) -> AppResult<Survey> {
        let survey = surveys::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(new.title),
            description: Set(new.description),
            created_by: Set(new.created_by),
            created_at: NotSet,
        }
        .insert(&self.conn)
        .await?;
        Ok(survey_from_entity(survey))
    }

    async fn find_survey(&self, id: Uuid) -> AppResult<Option<Survey>> {
        Ok(Surveys::find_by_id(id)
            .one(&self.conn)
            .await?
            .map(survey_from_entity))
    }

    async fn list_surveys(&self) -> AppResult<Vec<Survey>> {
        Ok(Surveys::find()
            .order_by_desc(surveys::Column::CreatedAt)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(survey_from_entity)
            .collect())
    }

    async fn insert_survey_result(&self, new: NewSurveyResult) -> AppResult<SurveyResult> {
        if Surveys::find_by_id(new.survey_id)
            .one(&self.conn)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound("survey"));
        }
        let result = survey_results::ActiveModel {
            id: Set(Uuid::new_v4()),
            survey_id: Set(new.survey_id),
            resident_id: Set(new.resident_id),
            cleanliness_rating: Set(new.ratings.cleanliness),
            facilities_rating: Set(new.ratings.facilities),
            services_rating: Set(new.ratings.services),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&self.conn)
        .await
        .map_err(|err| unique_violation(err, "resident already answered this survey"))?;
        Ok(survey_result_from_entity(result))
    }

    async fn find_survey_result(&self, id: Uuid) -> AppResult<Option<SurveyResult>> {
        Ok(SurveyResults::find_by_id(id)
            .one(&self.conn)
            .await?
            .map(survey_result_from_entity))
    }

    async fn list_survey_results(
        &self,
        survey_id: Option<Uuid>,
        resident_id: Option<Uuid>,
    ) -> AppResult<Vec<SurveyResult>> {
        let mut condition = Condition::all();
        if let Some(survey_id) = survey_id {
            condition = condition.add(survey_results::Column::SurveyId.eq(survey_id));
        }
        if let Some(resident_id) = resident_id {
            condition = condition.add(survey_results::Column::ResidentId.eq(resident_id));
        }
        Ok(SurveyResults::find()
            .filter(condition)
            .order_by_asc(survey_results::Column::CreatedAt)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(survey_result_from_entity)
            .collect())
    }

    async fn update_survey_result(
        &self,
        id: Uuid,
        ratings: Ratings,
    ) -> AppResult<Option<SurveyResult>> {
        let Some(result) = SurveyResults::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };
        let mut active: survey_results::ActiveModel = result.into();
        active.cleanliness_rating = Set(ratings.cleanliness);
        active.facilities_rating = Set(ratings.facilities);
        active.services_rating = Set(ratings.services);
        active.updated_at = Set(Utc::now().into());
        Ok(Some(survey_result_from_entity(
            active.update(&self.conn).await?,
        )))
    }

    async fn delete_survey_result(&self, id: Uuid) -> AppResult<bool> {
        let result = SurveyResults::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl FeedbackStore for SeaOrmStore {
    async fn insert_feedback(&self, new: NewFeedback) -> AppResult<Feedback> {
        let entry = feedback::ActiveModel {
            id: Set(Uuid::new_v4()),
            resident_id: Set(new.resident_id),
            title: Set(new.title),
            content: Set(new.content),
            resolved: Set(false),
            created_at: NotSet,
        }
        .insert(&self.conn)
        .await?;
        Ok(feedback_from_entity(entry))
    }

    async fn list_feedback(&self, resident_id: Uuid) -> AppResult<Vec<Feedback>> {
        Ok(FeedbackEntries::find()
            .filter(feedback::Column::ResidentId.eq(resident_id))
            .order_by_desc(feedback::Column::CreatedAt)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(feedback_from_entity)
            .collect())
    }

    async fn resolve_feedback(&self, id: Uuid) -> AppResult<Option<Feedback>> {
        let Some(entry) = FeedbackEntries::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };
        let mut active: feedback::ActiveModel = entry.into();
        active.resolved = Set(true);
        Ok(Some(feedback_from_entity(active.update(&self.conn).await?)))
    }
}

#[async_trait]
impl AuditStore for SeaOrmStore {
    async fn record_audit(&self, entry: AuditEntry) -> AppResult<()> {
        AuditLogs::insert(audit_logs::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(entry.user_id),
            action: Set(entry.action),
            resource: Set(entry.resource),
            metadata: Set(entry.metadata),
            created_at: NotSet,
        })
        .exec_without_returning(&self.conn)
        .await?;
        Ok(())
    }
}

fn product_from_entity(model: products::Model) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn cart_from_entity(model: carts::Model) -> Cart {
    Cart {
        id: model.id,
        resident_id: model.resident_id,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn cart_line_from_entity(model: cart_lines::Model) -> CartLine {
    CartLine {
        id: model.id,
        cart_id: model.cart_id,
        product_id: model.product_id,
        quantity: model.quantity,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn bill_from_entity(model: bills::Model) -> AppResult<Bill> {
    let payment_status = model
        .payment_status
        .parse::<PaymentStatus>()
        .map_err(|err| AppError::Internal(anyhow::anyhow!(err)))?;
    Ok(Bill {
        id: model.id,
        resident_id: model.resident_id,
        amount: model.amount,
        issue_date: model.issue_date,
        due_date: model.due_date,
        bill_type: model.bill_type,
        payment_status,
        paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
    })
}

fn bill_line_from_entity(model: bill_lines::Model) -> BillLine {
    BillLine {
        id: model.id,
        bill_id: model.bill_id,
        position: model.position,
        product_id: model.product_id,
        quantity: model.quantity,
        price: model.price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn survey_from_entity(model: surveys::Model) -> Survey {
    Survey {
        id: model.id,
        title: model.title,
        description: model.description,
        created_by: model.created_by,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn survey_result_from_entity(model: survey_results::Model) -> SurveyResult {
    SurveyResult {
        id: model.id,
        survey_id: model.survey_id,
        resident_id: model.resident_id,
        cleanliness_rating: model.cleanliness_rating,
        facilities_rating: model.facilities_rating,
        services_rating: model.services_rating,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn feedback_from_entity(model: feedback::Model) -> Feedback {
    Feedback {
        id: model.id,
        resident_id: model.resident_id,
        title: model.title,
        content: model.content,
        resolved: model.resolved,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
