//! Seeds the initial admin account so there is someone able to log in and
//! create further users.

use accounts_api::{
    config::AppConfig,
    handlers::{
        db::connect_pool,
        password::hash_password,
        user_repository::{PgUserRepository, UserRepository},
    },
    models::all_models::{Name, NewUser, UserRole},
};
use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use dotenvy::dotenv;
use log::info;
use std::env;
use uuid::Uuid;

const ADMIN_ID: &str = "6c3b3609-6fae-4a71-a9fd-94eaabf12c9a";
const ADMIN_USERNAME: &str = "johndoe";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env().context("Invalid configuration")?;
    let password = env::var("ADMIN_PASSWORD").map_err(|_| anyhow!("ADMIN_PASSWORD must be set"))?;
    let email = env::var("ADMIN_EMAIL").unwrap_or_else(|_| "testuser@example.com".to_string());

    let pool = connect_pool(&config)
        .await
        .context("Failed to connect to Postgres")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    let repo = PgUserRepository::new(pool);

    if repo.username_exists(ADMIN_USERNAME).await? {
        info!("User {} already exists", ADMIN_USERNAME);
        return Ok(());
    }

    let admin = NewUser {
        id: Uuid::parse_str(ADMIN_ID)?,
        name: Name {
            title: "Mr".to_string(),
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
        },
        username: ADMIN_USERNAME.to_string(),
        password_hash: hash_password(&password)?,
        role: UserRole::Admin,
        dob: NaiveDate::from_ymd_opt(1995, 5, 20).ok_or_else(|| anyhow!("invalid date"))?,
        city: "New York".to_string(),
        email,
    };

    let user = repo.create(admin).await?;
    info!("User {} added", user.login.username);
    Ok(())
}
