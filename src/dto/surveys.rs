use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSurveyRequest {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitSurveyResultRequest {
    pub survey_id: Uuid,
    pub cleanliness_rating: i32,
    pub facilities_rating: i32,
    pub services_rating: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSurveyResultRequest {
    pub cleanliness_rating: i32,
    pub facilities_rating: i32,
    pub services_rating: i32,
}

/// Per-category maximum ratings of one survey.
///
/// `has_data` is false and every maximum is null when nobody answered yet.
#[derive(Debug, Serialize, ToSchema)]
pub struct SurveyStatistics {
    pub survey_id: Uuid,
    pub response_count: usize,
    pub has_data: bool,
    pub maximum_cleanliness: Option<i32>,
    pub maximum_facilities: Option<i32>,
    pub maximum_services: Option<i32>,
}

/// Number of results per cleanliness rating, across all surveys.
#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CleanlinessDistribution {
    #[schema(value_type = Object)]
    pub counts: BTreeMap<i32, usize>,
}
