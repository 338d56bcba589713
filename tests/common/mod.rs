#![allow(dead_code)]

use apartment_billing_api::{
    middleware::auth::AuthUser,
    models::{Product, Survey},
    store::{CatalogStore, MemoryStore, NewProduct, NewSurvey, SurveyStore},
};
use uuid::Uuid;

pub async fn product(store: &MemoryStore, name: &str, price: i64) -> anyhow::Result<Product> {
    Ok(store
        .insert_product(NewProduct {
            name: name.to_string(),
            description: None,
            price,
        })
        .await?)
}

pub async fn survey(store: &MemoryStore, admin: &AuthUser) -> anyhow::Result<Survey> {
    Ok(store
        .insert_survey(NewSurvey {
            title: "Building satisfaction".into(),
            description: None,
            created_by: admin.user_id,
        })
        .await?)
}

pub fn resident() -> AuthUser {
    AuthUser::resident(Uuid::new_v4())
}

pub fn admin() -> AuthUser {
    AuthUser::admin(Uuid::new_v4())
}
