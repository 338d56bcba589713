use axum::{
    Json, Router,
    extract::{Path, State},
    routing::patch,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::auth::AuthUser,
    models::BillWithLines,
    response::ApiResponse,
    services::bill_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/{bill_id}", patch(mark_paid))
}

#[utoipa::path(
    patch,
    path = "/api/payment/{bill_id}",
    params(
        ("bill_id" = Uuid, Path, description = "Bill ID")
    ),
    responses(
        (status = 200, description = "Bill is PAID; repeating the call is a no-op", body = ApiResponse<BillWithLines>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Bill not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payment"
)]
pub async fn mark_paid(
    State(state): State<AppState>,
    user: AuthUser,
    Path(bill_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<BillWithLines>>> {
    let resp = bill_service::mark_paid(state.store(), &user, bill_id).await?;
    Ok(Json(resp))
}
