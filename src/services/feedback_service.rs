use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::feedback::{CreateFeedbackRequest, FeedbackList},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Feedback,
    policy,
    response::{ApiResponse, Meta},
    store::{NewFeedback, Store},
};

pub async fn create_feedback(
    store: &dyn Store,
    user: &AuthUser,
    payload: CreateFeedbackRequest,
) -> AppResult<ApiResponse<Feedback>> {
    policy::resident(user).enforce()?;
    if payload.title.trim().is_empty() || payload.content.trim().is_empty() {
        return Err(AppError::Validation(
            "title and content must not be empty".into(),
        ));
    }
    let feedback = store
        .insert_feedback(NewFeedback {
            resident_id: user.user_id,
            title: payload.title,
            content: payload.content,
        })
        .await?;
    Ok(ApiResponse::success(
        "Feedback created",
        feedback,
        Some(Meta::empty()),
    ))
}

pub async fn list_feedback(
    store: &dyn Store,
    user: &AuthUser,
) -> AppResult<ApiResponse<FeedbackList>> {
    let items = store.list_feedback(user.user_id).await?;
    let meta = Meta::unpaged(items.len());
    Ok(ApiResponse::success("OK", FeedbackList { items }, Some(meta)))
}

pub async fn resolve_feedback(
    store: &dyn Store,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Feedback>> {
    policy::admin(user).enforce()?;
    let feedback = store
        .resolve_feedback(id)
        .await?
        .ok_or(AppError::NotFound("feedback"))?;

    log_audit(
        store,
        Some(user),
        "feedback_resolved",
        Some("feedback"),
        Some(serde_json::json!({ "feedback_id": id })),
    )
    .await;
    Ok(ApiResponse::success(
        "Feedback resolved",
        feedback,
        Some(Meta::empty()),
    ))
}
