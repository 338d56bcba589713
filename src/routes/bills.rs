use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::bills::{BillCreated, BillList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::BillWithLines,
    response::ApiResponse,
    routes::params::Pagination,
    services::bill_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_bills))
        .route("/{id}", get(get_bill))
        .route("/create-from-cart/{cart_id}", post(create_from_cart))
}

#[utoipa::path(
    post,
    path = "/api/bill/create-from-cart/{cart_id}",
    params(
        ("cart_id" = Uuid, Path, description = "Cart ID")
    ),
    responses(
        (status = 200, description = "Bill issued and cart emptied", body = ApiResponse<BillCreated>),
        (status = 400, description = "Cart is empty"),
        (status = 403, description = "Cart belongs to another resident"),
        (status = 404, description = "Cart not found"),
        (status = 409, description = "Cart kept changing during conversion"),
    ),
    security(("bearer_auth" = [])),
    tag = "Bills"
)]
pub async fn create_from_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(cart_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<BillCreated>>> {
    let resp =
        bill_service::create_from_cart(state.store(), &user, cart_id, state.bill_due_days).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/bill",
    params(Pagination),
    responses(
        (status = 200, description = "Bills visible to the caller", body = ApiResponse<BillList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Bills"
)]
pub async fn list_bills(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<BillList>>> {
    let resp = bill_service::list_bills(state.store(), &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/bill/{id}",
    params(
        ("id" = Uuid, Path, description = "Bill ID")
    ),
    responses(
        (status = 200, description = "Bill with its frozen lines", body = ApiResponse<BillWithLines>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Bills"
)]
pub async fn get_bill(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<BillWithLines>>> {
    let resp = bill_service::get_bill(state.store(), &user, id).await?;
    Ok(Json(resp))
}
