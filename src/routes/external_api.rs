use crate::error::ApiError;
use crate::handlers::auth::Claims;
use crate::handlers::random_user::RandomUserClient;
use crate::handlers::user_repository::UserRepository;
use crate::middleware::auth_middleware::{authorize, AuthMiddleware, Requirement};
use crate::models::all_models::RandomUserParams;
use actix_web::{web, HttpResponse};
use log::info;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub success: bool,
    pub imported_users: usize,
}

//Test External API
//Test External API Input: Query results, gender, nat
//Test External API Output: upstream JSON, untouched
pub async fn external_api_test(
    client: web::Data<RandomUserClient>,
    params: web::Query<RandomUserParams>,
) -> Result<HttpResponse, ApiError> {
    params.validate().map_err(ApiError::validation)?;
    let payload = client.fetch_raw(&params).await?;
    Ok(HttpResponse::Ok().json(payload))
}

//Import Users
//Import Users Input: Query results, gender, nat, admin token
//Import Users Output: ImportResponse
pub async fn import_users(
    repo: web::Data<dyn UserRepository>,
    client: web::Data<RandomUserClient>,
    claims: Claims,
    params: web::Query<RandomUserParams>,
) -> Result<HttpResponse, ApiError> {
    authorize(&claims, &Requirement::admin())
        .map_err(|_| ApiError::forbidden("You do not have permission to import users"))?;
    params.validate().map_err(ApiError::validation)?;

    let users = client.fetch_users(&params).await?;
    let imported_users = repo.create_bulk(users).await?;
    info!("{} imported {} users", claims.sub, imported_users);

    Ok(HttpResponse::Ok().json(ImportResponse {
        success: true,
        imported_users,
    }))
}

//Config External API Routes
// GET /test
// POST /import
pub fn config_external_api_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/test", web::get().to(external_api_test)).service(
        web::resource("/import")
            .wrap(AuthMiddleware)
            .route(web::post().to(import_users)),
    );
}
