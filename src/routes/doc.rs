use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        bills::{BillCreated, BillList},
        cart::{AddProductRequest, CartSummary, UpdateQuantityRequest},
        feedback::{CreateFeedbackRequest, FeedbackList},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
        surveys::{
            CleanlinessDistribution, CreateSurveyRequest, SubmitSurveyResultRequest,
            SurveyStatistics, UpdateSurveyResultRequest,
        },
    },
    models::{
        Bill, BillLine, BillWithLines, CartProduct, Feedback, PaymentStatus, Product, Survey,
        SurveyResult,
    },
    response::{ApiResponse, Meta},
    routes::{bills, cart, feedback, health, params, payment, products, statistics, surveys},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        cart::add_product,
        cart::update_product_quantity,
        cart::delete_product,
        cart::cart_summary,
        bills::create_from_cart,
        bills::list_bills,
        bills::get_bill,
        payment::mark_paid,
        statistics::survey_statistics,
        statistics::cleanliness_distribution,
        surveys::list_surveys,
        surveys::create_survey,
        surveys::get_survey,
        surveys::list_results,
        surveys::submit_result,
        surveys::get_result,
        surveys::update_result,
        surveys::delete_result,
        feedback::list_feedback,
        feedback::create_feedback,
        feedback::resolve_feedback
    ),
    components(
        schemas(
            Product,
            CartProduct,
            Bill,
            BillLine,
            BillWithLines,
            PaymentStatus,
            Survey,
            SurveyResult,
            Feedback,
            AddProductRequest,
            UpdateQuantityRequest,
            CartSummary,
            BillCreated,
            BillList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            CreateSurveyRequest,
            SubmitSurveyResultRequest,
            UpdateSurveyResultRequest,
            SurveyStatistics,
            CleanlinessDistribution,
            CreateFeedbackRequest,
            FeedbackList,
            params::Pagination,
            Meta,
            ApiResponse<CartSummary>,
            ApiResponse<BillCreated>,
            ApiResponse<BillWithLines>,
            ApiResponse<SurveyStatistics>,
            ApiResponse<ProductList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Resident cart endpoints"),
        (name = "Bills", description = "Bill endpoints"),
        (name = "Payment", description = "Payment confirmation endpoints"),
        (name = "Statistics", description = "Survey statistics endpoints"),
        (name = "Surveys", description = "Survey and survey result endpoints"),
        (name = "Feedback", description = "Resident feedback endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
