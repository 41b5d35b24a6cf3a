use accounts_api::{
    config::AppConfig,
    handlers::{
        db::{check_db_connection, connect_pool},
        user_repository::{PgUserRepository, UserRepository},
    },
    middleware::request_logger::RequestLogger,
    AppState,
};
use actix_cors::Cors;
use actix_web::{
    middleware::{Logger, NormalizePath},
    App, HttpServer,
};
use anyhow::Context;
use dotenvy::dotenv;
use log::{info, warn};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("=== Accounts API Server Starting ===");

    let config = AppConfig::from_env().context("Invalid configuration")?;

    let pool = connect_pool(&config)
        .await
        .context("Failed to connect to Postgres")?;

    if check_db_connection(&pool).await {
        info!("Database connection established and verified");
    } else {
        warn!("Database connection established but verification failed");
    }

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    let repo: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(pool));
    let state = AppState::from_config(&config, repo);

    info!("Listening on {}", config.bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);
        let state = state.clone();

        App::new()
            .wrap(NormalizePath::trim())
            .wrap(cors)
            .wrap(RequestLogger)
            .wrap(Logger::new(
                "%t [%s] \"%r\" %b %D ms \"%{Referer}i\" \"%{User-Agent}i\" %a",
            ))
            .configure(move |cfg| state.configure(cfg))
    })
    .bind(&config.bind_address)
    .with_context(|| format!("Failed to bind {}", config.bind_address))?
    .run()
    .await
    .context("Server terminated with an error")
}
