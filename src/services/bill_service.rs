use chrono::{Days, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::bills::{BillCreated, BillList},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{BillWithLines, Cart, CartProduct, ORDER_BILL_TYPE, PaymentStatus, Role},
    policy,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::{MAX_CONFLICT_ATTEMPTS, page_request, retry_on_conflict},
    store::{BillDraft, Store, snapshot_lines},
};

/// Freeze the cart's current lines and prices into a bill draft.
pub fn build_bill_draft(
    cart: &Cart,
    lines: &[CartProduct],
    issue_date: NaiveDate,
    due_days: i64,
) -> AppResult<BillDraft> {
    let lines = snapshot_lines(lines);
    let amount = lines.iter().try_fold(0i64, |acc, line| {
        line.price
            .checked_mul(i64::from(line.quantity))
            .and_then(|subtotal| acc.checked_add(subtotal))
            .ok_or_else(|| AppError::Validation("bill amount is too large".into()))
    })?;

    let due_date = u64::try_from(due_days)
        .ok()
        .and_then(|days| issue_date.checked_add_days(Days::new(days)))
        .ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "due date of {due_days} days after {issue_date} is out of range"
            ))
        })?;

    Ok(BillDraft {
        resident_id: cart.resident_id,
        amount,
        issue_date,
        due_date,
        bill_type: ORDER_BILL_TYPE.to_string(),
        lines,
    })
}

/// Turn the cart's contents into a new unpaid bill and empty the cart.
///
/// The lines are read, priced and written optimistically: if the cart changes
/// between the read and the write, the store refuses the write with `Conflict`
/// and the whole conversion starts over.
pub async fn create_from_cart(
    store: &dyn Store,
    user: &AuthUser,
    cart_id: Uuid,
    due_days: i64,
) -> AppResult<ApiResponse<BillCreated>> {
    let cart = store
        .find_cart(cart_id)
        .await?
        .ok_or(AppError::NotFound("cart"))?;
    policy::owner(user, cart.resident_id)
        .or(|| policy::admin(user))
        .enforce()?;

    let cart = &cart;
    let converted = retry_on_conflict(MAX_CONFLICT_ATTEMPTS, move || async move {
        let lines = store.cart_lines(cart.id).await?;
        if lines.is_empty() {
            return Err(AppError::Validation("cart is empty".into()));
        }
        let draft = build_bill_draft(cart, &lines, Utc::now().date_naive(), due_days)?;
        store.insert_bill_from_cart(cart.id, &draft).await
    })
    .await?;

    let BillWithLines { bill, lines } = converted;
    tracing::info!(
        bill_id = %bill.id,
        cart_id = %cart.id,
        amount = bill.amount,
        lines = lines.len(),
        "bill created from cart"
    );
    log_audit(
        store,
        Some(user),
        "bill_created",
        Some("bills"),
        Some(serde_json::json!({ "bill_id": bill.id, "cart_id": cart.id, "amount": bill.amount })),
    )
    .await;

    Ok(ApiResponse::success(
        "Bill created",
        BillCreated {
            id: bill.id,
            amount: bill.amount,
            lines,
        },
        Some(Meta::empty()),
    ))
}

/// Record payment of a bill.
///
/// Paying an already paid bill succeeds and returns it unchanged. The status
/// only ever moves `UNPAID -> PAID`, through a compare-and-set in the store.
pub async fn mark_paid(
    store: &dyn Store,
    user: &AuthUser,
    bill_id: Uuid,
) -> AppResult<ApiResponse<BillWithLines>> {
    let current = store
        .find_bill(bill_id)
        .await?
        .ok_or(AppError::NotFound("bill"))?;
    policy::owner(user, current.bill.resident_id)
        .or(|| policy::admin(user))
        .enforce()?;

    if current.bill.payment_status == PaymentStatus::Paid {
        tracing::info!(%bill_id, "bill already paid");
        return Ok(ApiResponse::success(
            "Bill already paid",
            current,
            Some(Meta::empty()),
        ));
    }

    let transitioned = store.mark_bill_paid(bill_id, Utc::now()).await?;
    let bill = store
        .find_bill(bill_id)
        .await?
        .ok_or(AppError::NotFound("bill"))?;

    if !transitioned {
        tracing::info!(%bill_id, status = %bill.bill.payment_status, "payment already recorded by a concurrent request");
        return Ok(ApiResponse::success(
            "Bill already paid",
            bill,
            Some(Meta::empty()),
        ));
    }

    tracing::info!(%bill_id, amount = bill.bill.amount, "bill paid");
    log_audit(
        store,
        Some(user),
        "bill_paid",
        Some("bills"),
        Some(serde_json::json!({ "bill_id": bill_id })),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment recorded",
        bill,
        Some(Meta::empty()),
    ))
}

pub async fn list_bills(
    store: &dyn Store,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<BillList>> {
    let (page, limit, request) = page_request(&pagination);
    let resident_filter = match user.role {
        Role::Admin => None,
        Role::Resident => Some(user.user_id),
    };
    let (items, total) = store.list_bills(resident_filter, request).await?;
    Ok(ApiResponse::success(
        "OK",
        BillList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_bill(
    store: &dyn Store,
    user: &AuthUser,
    bill_id: Uuid,
) -> AppResult<ApiResponse<BillWithLines>> {
    let bill = store
        .find_bill(bill_id)
        .await?
        .ok_or(AppError::NotFound("bill"))?;
    policy::owner(user, bill.bill.resident_id)
        .or(|| policy::admin(user))
        .enforce()?;
    Ok(ApiResponse::success("OK", bill, Some(Meta::empty())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Product;

    fn cart_product(price: i64, quantity: i32) -> CartProduct {
        CartProduct {
            id: Uuid::new_v4(),
            product: Product {
                id: Uuid::new_v4(),
                name: format!("product-{price}"),
                description: None,
                price,
                created_at: Utc::now(),
            },
            quantity,
        }
    }

    #[test]
    fn draft_freezes_prices_and_sets_due_date() -> AppResult<()> {
        let cart = Cart {
            id: Uuid::new_v4(),
            resident_id: Uuid::new_v4(),
            created_at: Utc::now(),
        };
        let lines = vec![cart_product(10_000, 2), cart_product(5_000, 1)];
        let issued = NaiveDate::from_ymd_opt(2024, 8, 1).ok_or(AppError::NotFound("date"))?;

        let draft = build_bill_draft(&cart, &lines, issued, 30)?;

        assert_eq!(draft.amount, 25_000);
        assert_eq!(draft.resident_id, cart.resident_id);
        assert_eq!(draft.bill_type, ORDER_BILL_TYPE);
        assert_eq!(draft.due_date, issued + chrono::Duration::days(30));
        let prices: Vec<i64> = draft.lines.iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![10_000, 5_000]);
        Ok(())
    }

    #[test]
    fn draft_rejects_unrepresentable_due_date() {
        let cart = Cart {
            id: Uuid::new_v4(),
            resident_id: Uuid::new_v4(),
            created_at: Utc::now(),
        };
        let lines = vec![cart_product(1_000, 1)];
        let today = Utc::now().date_naive();
        for due_days in [10_000_000_000, -1] {
            let result = build_bill_draft(&cart, &lines, today, due_days);
            assert!(matches!(result, Err(AppError::Internal(_))), "{due_days}");
        }
    }

    #[test]
    fn draft_rejects_overflowing_amount() {
        let cart = Cart {
            id: Uuid::new_v4(),
            resident_id: Uuid::new_v4(),
            created_at: Utc::now(),
        };
        let lines = vec![cart_product(i64::MAX, 2)];
        let result = build_bill_draft(&cart, &lines, Utc::now().date_naive(), 30);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
