use std::{net::SocketAddr, sync::Arc};

use apartment_billing_api::{
    app::{build_router, init_tracing},
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    state::AppState,
    store::SeaOrmStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let orm = create_orm_conn(&config.database_url).await?;
    let applied = run_migrations(&orm).await?;
    tracing::info!(migrations = applied, "database schema ready");

    let state = AppState::new(Arc::new(SeaOrmStore::new(orm)), &config);
    let app = build_router(state);

    let addr = SocketAddr::from((config.host.parse::<std::net::IpAddr>()?, config.port));
    tracing::info!(bill_due_days = config.bill_due_days, "listening on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}
