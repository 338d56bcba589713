mod common;

use apartment_billing_api::{
    dto::surveys::{SubmitSurveyResultRequest, UpdateSurveyResultRequest},
    error::AppError,
    middleware::auth::AuthUser,
    services::survey_service,
    store::MemoryStore,
};
use uuid::Uuid;

async fn answer(
    store: &MemoryStore,
    resident: &AuthUser,
    survey_id: Uuid,
    ratings: (i32, i32, i32),
) -> Result<Uuid, AppError> {
    let (cleanliness_rating, facilities_rating, services_rating) = ratings;
    let response = survey_service::submit_result(
        store,
        resident,
        SubmitSurveyResultRequest {
            survey_id,
            cleanliness_rating,
            facilities_rating,
            services_rating,
        },
    )
    .await?;
    Ok(response.into_data().map(|r| r.id).unwrap_or_default())
}

#[tokio::test]
async fn statistics_report_per_category_maximums() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let admin = common::admin();
    let survey = common::survey(&store, &admin).await?;

    for ratings in [(3, 1, 2), (5, 2, 1), (4, 4, 1)] {
        answer(&store, &common::resident(), survey.id, ratings).await?;
    }

    let response = survey_service::statistics(&store, &admin, survey.id).await?;
    assert_eq!(response.message, "OK");
    let stats = response.into_data().expect("statistics");
    assert!(stats.has_data);
    assert_eq!(stats.response_count, 3);
    assert_eq!(stats.maximum_cleanliness, Some(5));
    assert_eq!(stats.maximum_facilities, Some(4));
    assert_eq!(stats.maximum_services, Some(2));
    Ok(())
}

#[tokio::test]
async fn results_of_other_surveys_are_ignored() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let admin = common::admin();
    let first = common::survey(&store, &admin).await?;
    let second = common::survey(&store, &admin).await?;
    let resident = common::resident();

    answer(&store, &resident, first.id, (2, 2, 2)).await?;
    answer(&store, &resident, second.id, (5, 5, 5)).await?;

    let stats = survey_service::statistics(&store, &admin, first.id)
        .await?
        .into_data()
        .expect("statistics");
    assert_eq!(stats.response_count, 1);
    assert_eq!(stats.maximum_cleanliness, Some(2));
    Ok(())
}

#[tokio::test]
async fn survey_without_results_reports_no_data() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let admin = common::admin();
    let survey = common::survey(&store, &admin).await?;

    let response = survey_service::statistics(&store, &admin, survey.id).await?;
    assert_eq!(response.message, "No data");
    let stats = response.into_data().expect("statistics");
    assert!(!stats.has_data);
    assert_eq!(stats.response_count, 0);
    assert_eq!(stats.maximum_cleanliness, None);
    assert_eq!(stats.maximum_facilities, None);
    assert_eq!(stats.maximum_services, None);
    Ok(())
}

#[tokio::test]
async fn statistics_need_admin_and_known_survey() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let admin = common::admin();
    let survey = common::survey(&store, &admin).await?;

    let unknown = survey_service::statistics(&store, &admin, Uuid::new_v4()).await;
    assert!(matches!(unknown, Err(AppError::NotFound("survey"))));

    let resident = survey_service::statistics(&store, &common::resident(), survey.id).await;
    assert!(matches!(resident, Err(AppError::Forbidden(_))));
    Ok(())
}

#[tokio::test]
async fn one_answer_per_resident_and_survey() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let admin = common::admin();
    let survey = common::survey(&store, &admin).await?;
    let resident = common::resident();

    answer(&store, &resident, survey.id, (3, 3, 3)).await?;
    let again = answer(&store, &resident, survey.id, (4, 4, 4)).await;
    assert!(matches!(again, Err(AppError::Conflict(_))));

    let unknown = answer(&store, &resident, Uuid::new_v4(), (3, 3, 3)).await;
    assert!(matches!(unknown, Err(AppError::NotFound("survey"))));
    Ok(())
}

#[tokio::test]
async fn ratings_must_stay_on_the_scale() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let admin = common::admin();
    let survey = common::survey(&store, &admin).await?;

    for ratings in [(0, 3, 3), (3, 6, 3), (3, 3, -1)] {
        let result = answer(&store, &common::resident(), survey.id, ratings).await;
        assert!(
            matches!(result, Err(AppError::Validation(_))),
            "{ratings:?} should be rejected"
        );
    }

    let stats = survey_service::statistics(&store, &admin, survey.id)
        .await?
        .into_data()
        .expect("statistics");
    assert!(!stats.has_data);
    Ok(())
}

#[tokio::test]
async fn only_the_author_updates_a_result() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let admin = common::admin();
    let survey = common::survey(&store, &admin).await?;
    let resident = common::resident();
    let result_id = answer(&store, &resident, survey.id, (2, 2, 2)).await?;

    let changes = || UpdateSurveyResultRequest {
        cleanliness_rating: 5,
        facilities_rating: 4,
        services_rating: 3,
    };

    let by_admin = survey_service::update_result(&store, &admin, result_id, changes()).await;
    assert!(matches!(by_admin, Err(AppError::Forbidden(_))));
    let by_other =
        survey_service::update_result(&store, &common::resident(), result_id, changes()).await;
    assert!(matches!(by_other, Err(AppError::Forbidden(_))));

    let updated = survey_service::update_result(&store, &resident, result_id, changes())
        .await?
        .into_data()
        .expect("result");
    assert_eq!(updated.cleanliness_rating, 5);
    assert_eq!(updated.facilities_rating, 4);
    assert_eq!(updated.services_rating, 3);

    let stats = survey_service::statistics(&store, &admin, survey.id)
        .await?
        .into_data()
        .expect("statistics");
    assert_eq!(stats.maximum_cleanliness, Some(5));
    Ok(())
}

#[tokio::test]
async fn residents_only_list_their_own_results() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let admin = common::admin();
    let survey = common::survey(&store, &admin).await?;
    let alice = common::resident();
    let bob = common::resident();
    answer(&store, &alice, survey.id, (1, 1, 1)).await?;
    let bob_result = answer(&store, &bob, survey.id, (2, 2, 2)).await?;

    let own = survey_service::list_results(&store, &alice)
        .await?
        .into_data()
        .expect("results");
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].resident_id, alice.user_id);

    let all = survey_service::list_results(&store, &admin)
        .await?
        .into_data()
        .expect("results");
    assert_eq!(all.len(), 2);

    let peek = survey_service::get_result(&store, &alice, bob_result).await;
    assert!(matches!(peek, Err(AppError::Forbidden(_))));

    survey_service::delete_result(&store, &admin, bob_result).await?;
    let gone = survey_service::get_result(&store, &bob, bob_result).await;
    assert!(matches!(gone, Err(AppError::NotFound("survey result"))));
    Ok(())
}

#[tokio::test]
async fn cleanliness_distribution_counts_ratings() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let admin = common::admin();
    let survey = common::survey(&store, &admin).await?;
    for ratings in [(3, 1, 1), (5, 1, 1), (3, 2, 2)] {
        answer(&store, &common::resident(), survey.id, ratings).await?;
    }

    let distribution = survey_service::cleanliness_distribution(&store, &admin)
        .await?
        .into_data()
        .expect("distribution");
    assert_eq!(distribution.counts.get(&3), Some(&2));
    assert_eq!(distribution.counts.get(&5), Some(&1));
    Ok(())
}
