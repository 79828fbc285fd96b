use dotenvy::dotenv;
use log::{error, info};
use std::sync::Arc;

use course_catalog::catalog::{CatalogService, PgCatalogStore};
use course_catalog::core::config::AppConfig;
use course_catalog::core::shared::state::AppState;
use course_catalog::core::shared::utils::{create_conn, run_migrations};
use course_catalog::main_module::run_axum_server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .write_style(env_logger::WriteStyle::Always)
        .init();

    info!("Starting course-catalog {}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::from_env()?;

    let pool = match create_conn(&config.database) {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e.into());
        }
    };
    info!(
        "Database pool ready (max {} connections)",
        config.database.max_connections
    );

    if config.database.run_migrations {
        run_migrations(&pool)?;
    }

    let store = Arc::new(PgCatalogStore::new(pool));
    let app_state = Arc::new(AppState::new(CatalogService::new(store)));

    run_axum_server(app_state, &config.server).await?;
    info!("Server stopped");
    Ok(())
}
