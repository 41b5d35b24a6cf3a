pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;

use actix_web::web;
use config::{AppConfig, AuthConfig};
use handlers::auth::TokenCodec;
use handlers::random_user::RandomUserClient;
use handlers::user_repository::UserRepository;
use std::sync::Arc;

/// Everything handlers pull out of `app_data`. Cheap to clone, one clone per worker.
#[derive(Clone)]
pub struct AppState {
    pub codec: web::Data<TokenCodec>,
    pub repo: web::Data<dyn UserRepository>,
    pub random_users: web::Data<RandomUserClient>,
}

impl AppState {
    pub fn new(
        auth: &AuthConfig,
        repo: Arc<dyn UserRepository>,
        random_users: RandomUserClient,
    ) -> Self {
        AppState {
            codec: web::Data::new(TokenCodec::new(auth)),
            repo: web::Data::from(repo),
            random_users: web::Data::new(random_users),
        }
    }

    pub fn from_config(config: &AppConfig, repo: Arc<dyn UserRepository>) -> Self {
        Self::new(
            &config.auth,
            repo,
            RandomUserClient::new(config.test_service_url.clone()),
        )
    }

    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.codec.clone())
            .app_data(self.repo.clone())
            .app_data(self.random_users.clone())
            .configure(routes::config_routes);
    }
}
