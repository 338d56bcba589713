use std::sync::Arc;

use crate::{config::AppConfig, store::Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub jwt_secret: Arc<str>,
    pub bill_due_days: i64,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: &AppConfig) -> Self {
        Self {
            store,
            jwt_secret: Arc::from(config.jwt_secret.as_str()),
            bill_due_days: config.bill_due_days,
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
}
