use std::collections::BTreeMap;

use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::surveys::{
        CleanlinessDistribution, CreateSurveyRequest, SubmitSurveyResultRequest,
        SurveyStatistics, UpdateSurveyResultRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Ratings, Role, Survey, SurveyResult},
    policy,
    response::{ApiResponse, Meta},
    store::{NewSurvey, NewSurveyResult, Store},
};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingMaximums {
    pub cleanliness: i32,
    pub facilities: i32,
    pub services: i32,
}

/// Maximum of each rating category taken independently; `None` for no results.
pub fn aggregate_maximums(results: &[SurveyResult]) -> Option<RatingMaximums> {
    let mut ratings = results.iter().map(SurveyResult::ratings);
    let first = ratings.next()?;
    let seed = RatingMaximums {
        cleanliness: first.cleanliness,
        facilities: first.facilities,
        services: first.services,
    };
    Some(ratings.fold(seed, |max, r| RatingMaximums {
        cleanliness: max.cleanliness.max(r.cleanliness),
        facilities: max.facilities.max(r.facilities),
        services: max.services.max(r.services),
    }))
}

pub fn cleanliness_counts(results: &[SurveyResult]) -> BTreeMap<i32, usize> {
    let mut counts = BTreeMap::new();
    for result in results {
        *counts.entry(result.cleanliness_rating).or_insert(0) += 1;
    }
    counts
}

fn validate_ratings(ratings: Ratings) -> AppResult<Ratings> {
    let fields = [
        ("cleanliness_rating", ratings.cleanliness),
        ("facilities_rating", ratings.facilities),
        ("services_rating", ratings.services),
    ];
    for (name, value) in fields {
        if !(MIN_RATING..=MAX_RATING).contains(&value) {
            return Err(AppError::Validation(format!(
                "{name} must be between {MIN_RATING} and {MAX_RATING}"
            )));
        }
    }
    Ok(ratings)
}

pub async fn statistics(
    store: &dyn Store,
    user: &AuthUser,
    survey_id: Uuid,
) -> AppResult<ApiResponse<SurveyStatistics>> {
    policy::admin(user).enforce()?;
    store
        .find_survey(survey_id)
        .await?
        .ok_or(AppError::NotFound("survey"))?;

    let results = store.list_survey_results(Some(survey_id), None).await?;
    let maximums = aggregate_maximums(&results);
    let (message, has_data) = match maximums {
        Some(_) => ("OK", true),
        None => ("No data", false),
    };

    let stats = SurveyStatistics {
        survey_id,
        response_count: results.len(),
        has_data,
        maximum_cleanliness: maximums.map(|m| m.cleanliness),
        maximum_facilities: maximums.map(|m| m.facilities),
        maximum_services: maximums.map(|m| m.services),
    };
    Ok(ApiResponse::success(message, stats, Some(Meta::empty())))
}

pub async fn cleanliness_distribution(
    store: &dyn Store,
    user: &AuthUser,
) -> AppResult<ApiResponse<CleanlinessDistribution>> {
    policy::admin(user).enforce()?;
    let results = store.list_survey_results(None, None).await?;
    Ok(ApiResponse::success(
        "OK",
        CleanlinessDistribution {
            counts: cleanliness_counts(&results),
        },
        Some(Meta::empty()),
    ))
}

pub async fn create_survey(
    store: &dyn Store,
    user: &AuthUser,
    payload: CreateSurveyRequest,
) -> AppResult<ApiResponse<Survey>> {
    policy::admin(user).enforce()?;
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("title must not be empty".into()));
    }
    let survey = store
        .insert_survey(NewSurvey {
            title: title.to_string(),
            description: payload.description,
            created_by: user.user_id,
        })
        .await?;
    Ok(ApiResponse::success("Survey created", survey, Some(Meta::empty())))
}

pub async fn list_surveys(store: &dyn Store) -> AppResult<ApiResponse<Vec<Survey>>> {
    let surveys = store.list_surveys().await?;
    let meta = Meta::unpaged(surveys.len());
    Ok(ApiResponse::success("OK", surveys, Some(meta)))
}

pub async fn get_survey(store: &dyn Store, survey_id: Uuid) -> AppResult<ApiResponse<Survey>> {
    let survey = store
        .find_survey(survey_id)
        .await?
        .ok_or(AppError::NotFound("survey"))?;
    Ok(ApiResponse::success("OK", survey, Some(Meta::empty())))
}

pub async fn submit_result(
    store: &dyn Store,
    user: &AuthUser,
    payload: SubmitSurveyResultRequest,
) -> AppResult<ApiResponse<SurveyResult>> {
    policy::resident(user).enforce()?;
    let ratings = validate_ratings(Ratings {
        cleanliness: payload.cleanliness_rating,
        facilities: payload.facilities_rating,
        services: payload.services_rating,
    })?;

    let result = store
        .insert_survey_result(NewSurveyResult {
            survey_id: payload.survey_id,
            resident_id: user.user_id,
            ratings,
        })
        .await?;

    log_audit(
        store,
        Some(user),
        "survey_result_submitted",
        Some("survey_results"),
        Some(serde_json::json!({ "survey_id": result.survey_id, "result_id": result.id })),
    )
    .await;
    Ok(ApiResponse::success("Result recorded", result, Some(Meta::empty())))
}

pub async fn list_results(
    store: &dyn Store,
    user: &AuthUser,
) -> AppResult<ApiResponse<Vec<SurveyResult>>> {
    let resident_filter = match user.role {
        Role::Admin => None,
        Role::Resident => Some(user.user_id),
    };
    let results = store.list_survey_results(None, resident_filter).await?;
    let meta = Meta::unpaged(results.len());
    Ok(ApiResponse::success("OK", results, Some(meta)))
}

async fn load_result(store: &dyn Store, id: Uuid) -> AppResult<SurveyResult> {
    store
        .find_survey_result(id)
        .await?
        .ok_or(AppError::NotFound("survey result"))
}

pub async fn get_result(
    store: &dyn Store,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<SurveyResult>> {
    let result = load_result(store, id).await?;
    policy::owner(user, result.resident_id)
        .or(|| policy::admin(user))
        .enforce()?;
    Ok(ApiResponse::success("OK", result, Some(Meta::empty())))
}

pub async fn update_result(
    store: &dyn Store,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateSurveyResultRequest,
) -> AppResult<ApiResponse<SurveyResult>> {
    let existing = load_result(store, id).await?;
    policy::resident(user)
        .and(|| policy::owner(user, existing.resident_id))
        .enforce()?;
    let ratings = validate_ratings(Ratings {
        cleanliness: payload.cleanliness_rating,
        facilities: payload.facilities_rating,
        services: payload.services_rating,
    })?;

    let updated = store
        .update_survey_result(id, ratings)
        .await?
        .ok_or(AppError::NotFound("survey result"))?;
    Ok(ApiResponse::success("Result updated", updated, Some(Meta::empty())))
}

pub async fn delete_result(store: &dyn Store, user: &AuthUser, id: Uuid) -> AppResult<()> {
    let existing = load_result(store, id).await?;
    policy::owner(user, existing.resident_id)
        .or(|| policy::admin(user))
        .enforce()?;
    if !store.delete_survey_result(id).await? {
        return Err(AppError::NotFound("survey result"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn result(cleanliness: i32, facilities: i32, services: i32) -> SurveyResult {
        SurveyResult {
            id: Uuid::new_v4(),
            survey_id: Uuid::nil(),
            resident_id: Uuid::new_v4(),
            cleanliness_rating: cleanliness,
            facilities_rating: facilities,
            services_rating: services,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn maximums_are_per_category() {
        let results = [result(3, 1, 2), result(5, 2, 1), result(4, 4, 1)];
        assert_eq!(
            aggregate_maximums(&results),
            Some(RatingMaximums {
                cleanliness: 5,
                facilities: 4,
                services: 2,
            })
        );
        assert_eq!(aggregate_maximums(&[]), None);
    }

    #[test]
    fn counts_group_by_cleanliness() {
        let counts = cleanliness_counts(&[result(3, 1, 1), result(5, 1, 1), result(3, 2, 2)]);
        assert_eq!(counts.get(&3), Some(&2));
        assert_eq!(counts.get(&5), Some(&1));
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn ratings_outside_scale_are_rejected() {
        let bad = Ratings {
            cleanliness: 0,
            facilities: 3,
            services: 3,
        };
        assert!(matches!(validate_ratings(bad), Err(AppError::Validation(_))));
    }
}
