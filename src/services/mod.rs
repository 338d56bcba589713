use std::future::Future;

use crate::{
    error::{AppError, AppResult},
    routes::params::Pagination,
    store::PageRequest,
};

pub mod bill_service;
pub mod cart_service;
pub mod feedback_service;
pub mod product_service;
pub mod survey_service;

/// Attempts made for operations that may lose an optimistic race.
pub const MAX_CONFLICT_ATTEMPTS: u32 = 3;

/// Run `op` again while it fails with `Conflict`, up to `attempts` times in total.
pub async fn retry_on_conflict<T, F, Fut>(attempts: u32, mut op: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(AppError::Conflict(reason)) if attempt < attempts => {
                tracing::debug!(attempt, %reason, "retrying after conflict");
                attempt += 1;
            }
            outcome => return outcome,
        }
    }
}

pub(crate) fn page_request(pagination: &Pagination) -> (i64, i64, PageRequest) {
    let (page, limit, offset) = pagination.normalize();
    (page, limit, PageRequest { limit, offset })
}
