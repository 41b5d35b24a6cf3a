pub mod external_api;
pub mod user_auth;
pub mod user_data;

use crate::error::{form_error_handler, json_error_handler, path_error_handler, query_error_handler};
use actix_web::{web, HttpResponse};
use serde_json::json;

async fn homepage() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "Hello": "World" }))
}

/// Registers every route together with the extractor configs that turn
/// malformed input into 422 responses.
pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::PathConfig::default().error_handler(path_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .app_data(web::FormConfig::default().error_handler(form_error_handler))
        .route("/", web::get().to(homepage))
        .configure(user_auth::config_user_auth_routes)
        .configure(user_data::config_user_data_routes)
        .configure(external_api::config_external_api_routes);
}
