use axum::Router;

use crate::state::AppState;

pub mod bills;
pub mod cart;
pub mod doc;
pub mod feedback;
pub mod health;
pub mod params;
pub mod payment;
pub mod products;
pub mod statistics;
pub mod surveys;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/products", products::router())
        .nest("/cart", cart::router())
        .nest("/bill", bills::router())
        .nest("/payment", payment::router())
        .nest("/statistics", statistics::router())
        .nest("/survey", surveys::survey_router())
        .nest("/surveyresult", surveys::result_router())
        .nest("/feedback", feedback::router())
}
