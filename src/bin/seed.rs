use apartment_billing_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    error::AppError,
    store::{CatalogStore, NewProduct, NewSurvey, SeaOrmStore, SurveyStore},
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;
    let store = SeaOrmStore::new(orm);

    seed_products(&store).await?;
    let survey_id = seed_survey(&store).await?;

    println!("Seed completed. Survey ID: {survey_id}");
    Ok(())
}

async fn seed_products(store: &SeaOrmStore) -> anyhow::Result<()> {
    let products = vec![
        ("Bottled Water 20L", "Delivered to the flat door", 60000),
        ("Laundry Service", "Wash and fold, per bag", 45000),
        ("Parking Card", "Replacement access card", 100000),
        ("Gym Day Pass", "One day of gym access", 30000),
    ];

    for (name, desc, price) in products {
        let result = store
            .insert_product(NewProduct {
                name: name.to_string(),
                description: Some(desc.to_string()),
                price,
            })
            .await;
        match result {
            Ok(product) => println!("Seeded product {} ({})", product.name, product.id),
            Err(AppError::Conflict(_)) => println!("Product {name} already present"),
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

async fn seed_survey(store: &SeaOrmStore) -> anyhow::Result<Uuid> {
    let survey = store
        .insert_survey(NewSurvey {
            title: "Quarterly resident satisfaction".into(),
            description: Some("Rate cleanliness, facilities and services from 1 to 5".into()),
            created_by: Uuid::nil(),
        })
        .await?;
    Ok(survey.id)
}
