use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::cart::{AddProductRequest, CartSummary, UpdateQuantityRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Cart, cart_total},
    policy,
    response::{ApiResponse, Meta},
    services::{MAX_CONFLICT_ATTEMPTS, retry_on_conflict},
    store::{LineChange, Store},
};

async fn summarize_cart(store: &dyn Store, cart: &Cart) -> AppResult<CartSummary> {
    let lines = store.cart_lines(cart.id).await?;
    Ok(CartSummary {
        cart_id: cart.id,
        total_price: cart_total(&lines)?,
        cart_products: lines,
    })
}

pub async fn add_product(
    store: &dyn Store,
    user: &AuthUser,
    payload: AddProductRequest,
) -> AppResult<ApiResponse<CartSummary>> {
    policy::resident(user).enforce()?;
    if payload.quantity <= 0 {
        return Err(AppError::Validation(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let product = store
        .find_product(payload.product_id)
        .await?
        .ok_or(AppError::NotFound("product"))?;

    let resident_id = user.user_id;
    let product_id = product.id;
    let quantity = payload.quantity;
    let (cart, change) = retry_on_conflict(MAX_CONFLICT_ATTEMPTS, move || async move {
        let cart = store.ensure_cart(resident_id).await?;
        let change = store.add_to_line(cart.id, product_id, quantity).await?;
        Ok((cart, change))
    })
    .await?;

    let action = match &change {
        LineChange::Created(_) => "cart_line_created",
        _ => "cart_line_incremented",
    };
    tracing::debug!(cart_id = %cart.id, %product_id, quantity, action, "cart updated");
    log_audit(
        store,
        Some(user),
        action,
        Some("cart_lines"),
        Some(serde_json::json!({ "cart_id": cart.id, "product_id": product_id, "quantity": quantity })),
    )
    .await;

    let summary = summarize_cart(store, &cart).await?;
    Ok(ApiResponse::success("OK", summary, Some(Meta::empty())))
}

pub async fn update_quantity(
    store: &dyn Store,
    user: &AuthUser,
    payload: UpdateQuantityRequest,
) -> AppResult<ApiResponse<CartSummary>> {
    policy::resident(user).enforce()?;
    let cart = store
        .find_cart_for_resident(user.user_id)
        .await?
        .ok_or(AppError::NotFound("cart"))?;

    let cart_id = cart.id;
    let product_id = payload.product_id;
    let quantity = payload.quantity;
    let change = retry_on_conflict(MAX_CONFLICT_ATTEMPTS, move || async move {
        store.set_line_quantity(cart_id, product_id, quantity).await
    })
    .await?;

    let action = match change {
        LineChange::Missing => return Err(AppError::NotFound("cart line")),
        LineChange::Removed => "cart_line_removed",
        LineChange::Created(_) | LineChange::Updated(_) => "cart_line_quantity_set",
    };
    log_audit(
        store,
        Some(user),
        action,
        Some("cart_lines"),
        Some(serde_json::json!({ "cart_id": cart.id, "product_id": product_id, "quantity": quantity })),
    )
    .await;

    let summary = summarize_cart(store, &cart).await?;
    Ok(ApiResponse::success("OK", summary, Some(Meta::empty())))
}

/// Deletes a line of the caller's own cart. Lines of other carts are reported as
/// missing so a line id reveals nothing about other residents.
pub async fn remove_line(store: &dyn Store, user: &AuthUser, line_id: Uuid) -> AppResult<()> {
    let line = store
        .find_line(line_id)
        .await?
        .ok_or(AppError::NotFound("cart line"))?;
    let cart = store
        .find_cart(line.cart_id)
        .await?
        .ok_or(AppError::NotFound("cart line"))?;

    if !policy::owner(user, cart.resident_id).is_allowed() {
        tracing::debug!(%line_id, user_id = %user.user_id, "cart line of another resident");
        return Err(AppError::NotFound("cart line"));
    }

    if !store.delete_line(line_id).await? {
        return Err(AppError::NotFound("cart line"));
    }

    log_audit(
        store,
        Some(user),
        "cart_line_removed",
        Some("cart_lines"),
        Some(serde_json::json!({ "cart_id": cart.id, "line_id": line_id })),
    )
    .await;
    Ok(())
}

pub async fn summarize(store: &dyn Store, user: &AuthUser) -> AppResult<ApiResponse<CartSummary>> {
    let cart = store
        .find_cart_for_resident(user.user_id)
        .await?
        .ok_or(AppError::NotFound("cart"))?;
    let summary = summarize_cart(store, &cart).await?;
    Ok(ApiResponse::success("OK", summary, Some(Meta::empty())))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{CartProduct, Product};

    fn line(price: i64, quantity: i32) -> CartProduct {
        CartProduct {
            id: Uuid::new_v4(),
            product: Product {
                id: Uuid::new_v4(),
                name: "p".into(),
                description: None,
                price,
                created_at: Utc::now(),
            },
            quantity,
        }
    }

    #[test]
    fn total_is_price_times_quantity() -> AppResult<()> {
        assert_eq!(cart_total(&[])?, 0);
        assert_eq!(cart_total(&[line(10_000, 2), line(5_000, 1)])?, 25_000);
        Ok(())
    }

    #[test]
    fn total_overflow_is_a_validation_error() {
        let huge = i64::MAX / 2 + 1;
        assert!(line(huge, 2).line_total().is_none());
        assert!(matches!(
            cart_total(&[line(huge, 1), line(huge, 1)]),
            Err(AppError::Validation(_))
        ));
    }
}
