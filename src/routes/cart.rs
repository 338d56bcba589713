use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use uuid::Uuid;

use crate::{
    dto::cart::{AddProductRequest, CartSummary, UpdateQuantityRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/add-product", post(add_product))
        .route("/update-product-quantity", post(update_product_quantity))
        .route("/{line_id}/delete-product", delete(delete_product))
        .route("/cart-summary", get(cart_summary))
}

#[utoipa::path(
    post,
    path = "/api/cart/add-product",
    request_body = AddProductRequest,
    responses(
        (status = 200, description = "Product added; quantity accumulates on repeated adds", body = ApiResponse<CartSummary>),
        (status = 400, description = "Quantity is not positive"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddProductRequest>,
) -> AppResult<Json<ApiResponse<CartSummary>>> {
    let resp = cart_service::add_product(state.store(), &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart/update-product-quantity",
    request_body = UpdateQuantityRequest,
    responses(
        (status = 200, description = "Quantity set; zero or less removes the line", body = ApiResponse<CartSummary>),
        (status = 404, description = "Cart or cart line not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn update_product_quantity(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateQuantityRequest>,
) -> AppResult<Json<ApiResponse<CartSummary>>> {
    let resp = cart_service::update_quantity(state.store(), &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart/{line_id}/delete-product",
    params(
        ("line_id" = Uuid, Path, description = "Cart line ID")
    ),
    responses(
        (status = 204, description = "Line removed"),
        (status = 404, description = "Cart line not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(line_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    cart_service::remove_line(state.store(), &user, line_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/cart/cart-summary",
    responses(
        (status = 200, description = "Cart lines with the live total", body = ApiResponse<CartSummary>),
        (status = 404, description = "Resident has no cart yet"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn cart_summary(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CartSummary>>> {
    let resp = cart_service::summarize(state.store(), &user).await?;
    Ok(Json(resp))
}
