use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::surveys::{CleanlinessDistribution, SurveyStatistics},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::survey_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(missing_survey_id))
        .route("/cleanliness", get(cleanliness_distribution))
        .route("/{survey_id}", get(survey_statistics))
}

/// Unexpected failures keep their text on this endpoint for diagnostics.
fn surface_internal(err: AppError) -> AppError {
    match err {
        AppError::Internal(inner) => AppError::Diagnostic(inner.to_string()),
        AppError::OrmError(inner) => AppError::Diagnostic(inner.to_string()),
        other => other,
    }
}

pub async fn missing_survey_id() -> AppError {
    AppError::Validation("survey id is required".into())
}

#[utoipa::path(
    get,
    path = "/api/statistics/{survey_id}",
    params(
        ("survey_id" = Uuid, Path, description = "Survey ID")
    ),
    responses(
        (status = 200, description = "Maximum rating per category, or has_data = false when nobody answered", body = ApiResponse<SurveyStatistics>),
        (status = 400, description = "Missing or malformed survey id"),
        (status = 404, description = "Survey not found"),
        (status = 500, description = "Aggregation failed; the message carries the cause"),
    ),
    security(("bearer_auth" = [])),
    tag = "Statistics"
)]
pub async fn survey_statistics(
    State(state): State<AppState>,
    user: AuthUser,
    Path(survey_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<SurveyStatistics>>> {
    let resp = survey_service::statistics(state.store(), &user, survey_id)
        .await
        .map_err(surface_internal)?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/statistics/cleanliness",
    responses(
        (status = 200, description = "Result count per cleanliness rating", body = ApiResponse<CleanlinessDistribution>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Statistics"
)]
pub async fn cleanliness_distribution(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CleanlinessDistribution>>> {
    let resp = survey_service::cleanliness_distribution(state.store(), &user)
        .await
        .map_err(surface_internal)?;
    Ok(Json(resp))
}
