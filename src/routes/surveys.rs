use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::surveys::{CreateSurveyRequest, SubmitSurveyResultRequest, UpdateSurveyResultRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Survey, SurveyResult},
    response::ApiResponse,
    services::survey_service,
    state::AppState,
};

pub fn survey_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_surveys).post(create_survey))
        .route("/{id}", get(get_survey))
}

pub fn result_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_results).post(submit_result))
        .route(
            "/{id}",
            get(get_result).put(update_result).delete(delete_result),
        )
}

#[utoipa::path(
    get,
    path = "/api/survey",
    responses(
        (status = 200, description = "All surveys", body = ApiResponse<Vec<Survey>>)
    ),
    security(("bearer_auth" = [])),
    tag = "Surveys"
)]
pub async fn list_surveys(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<Survey>>>> {
    let resp = survey_service::list_surveys(state.store()).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/survey",
    request_body = CreateSurveyRequest,
    responses(
        (status = 200, description = "Survey created", body = ApiResponse<Survey>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Surveys"
)]
pub async fn create_survey(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateSurveyRequest>,
) -> AppResult<Json<ApiResponse<Survey>>> {
    let resp = survey_service::create_survey(state.store(), &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/survey/{id}",
    params(
        ("id" = Uuid, Path, description = "Survey ID")
    ),
    responses(
        (status = 200, description = "Survey", body = ApiResponse<Survey>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Surveys"
)]
pub async fn get_survey(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Survey>>> {
    let resp = survey_service::get_survey(state.store(), id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/surveyresult",
    responses(
        (status = 200, description = "Results visible to the caller", body = ApiResponse<Vec<SurveyResult>>)
    ),
    security(("bearer_auth" = [])),
    tag = "Surveys"
)]
pub async fn list_results(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<SurveyResult>>>> {
    let resp = survey_service::list_results(state.store(), &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/surveyresult",
    request_body = SubmitSurveyResultRequest,
    responses(
        (status = 200, description = "Result recorded", body = ApiResponse<SurveyResult>),
        (status = 400, description = "Rating outside 1..=5"),
        (status = 404, description = "Survey not found"),
        (status = 409, description = "Resident already answered this survey"),
    ),
    security(("bearer_auth" = [])),
    tag = "Surveys"
)]
pub async fn submit_result(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SubmitSurveyResultRequest>,
) -> AppResult<Json<ApiResponse<SurveyResult>>> {
    let resp = survey_service::submit_result(state.store(), &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/surveyresult/{id}",
    params(
        ("id" = Uuid, Path, description = "Survey result ID")
    ),
    responses(
        (status = 200, description = "Survey result", body = ApiResponse<SurveyResult>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Surveys"
)]
pub async fn get_result(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<SurveyResult>>> {
    let resp = survey_service::get_result(state.store(), &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/surveyresult/{id}",
    params(
        ("id" = Uuid, Path, description = "Survey result ID")
    ),
    request_body = UpdateSurveyResultRequest,
    responses(
        (status = 200, description = "Ratings replaced", body = ApiResponse<SurveyResult>),
        (status = 400, description = "Rating outside 1..=5"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Surveys"
)]
pub async fn update_result(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSurveyResultRequest>,
) -> AppResult<Json<ApiResponse<SurveyResult>>> {
    let resp = survey_service::update_result(state.store(), &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/surveyresult/{id}",
    params(
        ("id" = Uuid, Path, description = "Survey result ID")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Surveys"
)]
pub async fn delete_result(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    survey_service::delete_result(state.store(), &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
