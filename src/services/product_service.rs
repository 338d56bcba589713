use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Product,
    policy,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::page_request,
    store::{NewProduct, ProductChanges, Store},
};

fn validate_price(price: i64) -> AppResult<i64> {
    if price < 0 {
        return Err(AppError::Validation("price must not be negative".into()));
    }
    Ok(price)
}

pub async fn list_products(
    store: &dyn Store,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, request) = page_request(&pagination);
    let (items, total) = store.list_products(request).await?;
    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(store: &dyn Store, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = store
        .find_product(id)
        .await?
        .ok_or(AppError::NotFound("product"))?;
    Ok(ApiResponse::success("Product", product, None))
}

pub async fn create_product(
    store: &dyn Store,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    policy::admin(user).enforce()?;
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name must not be empty".into()));
    }
    let product = store
        .insert_product(NewProduct {
            name: name.to_string(),
            description: payload.description,
            price: validate_price(payload.price)?,
        })
        .await?;

    log_audit(
        store,
        Some(user),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        product,
        Some(Meta::empty()),
    ))
}

/// Price changes apply to carts immediately and never to issued bills.
pub async fn update_product(
    store: &dyn Store,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    policy::admin(user).enforce()?;
    let changes = ProductChanges {
        name: payload.name,
        description: payload.description,
        price: payload.price.map(validate_price).transpose()?,
    };
    let product = store
        .update_product(id, changes)
        .await?
        .ok_or(AppError::NotFound("product"))?;

    log_audit(
        store,
        Some(user),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id, "price": product.price })),
    )
    .await;

    Ok(ApiResponse::success(
        "Product updated",
        product,
        Some(Meta::empty()),
    ))
}
