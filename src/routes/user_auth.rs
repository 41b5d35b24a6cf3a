use crate::error::{ApiError, INCORRECT_LOGIN, INVALID_CREDENTIALS};
use crate::handlers::auth::{authenticate_user, Claims, TokenCodec};
use crate::handlers::user_repository::UserRepository;
use crate::middleware::auth_middleware::AuthMiddleware;
use crate::models::all_models::{LoginForm, Token, UserPublic};
use actix_web::{web, HttpResponse};
use log::info;

//Login
//Login Input: form username, password
//Login Output: Token
pub async fn login(
    repo: web::Data<dyn UserRepository>,
    codec: web::Data<TokenCodec>,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, ApiError> {
    let LoginForm { username, password } = form.into_inner();

    let principal = authenticate_user(repo.get_ref(), &username, &password)
        .await?
        .ok_or(ApiError::Unauthenticated(INCORRECT_LOGIN))?;

    let access_token = codec.issue(&principal, Some(codec.access_token_ttl()))?;
    info!("Issued access token for {}", principal.username);

    Ok(HttpResponse::Ok().json(Token::bearer(access_token)))
}

//Get Logged In User
//Get Logged In User Input: Bearer token
//Get Logged In User Output: UserPublic
pub async fn read_users_me(
    repo: web::Data<dyn UserRepository>,
    claims: Claims,
) -> Result<HttpResponse, ApiError> {
    // a valid token for an account that no longer exists is treated as invalid
    let user = repo
        .find_by_username(&claims.sub)
        .await?
        .ok_or(ApiError::Unauthenticated(INVALID_CREDENTIALS))?;

    Ok(HttpResponse::Ok().json(UserPublic::from(user)))
}

//Config User Auth Routes
// POST /token
// GET /me
pub fn config_user_auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/token", web::post().to(login)).service(
        web::resource("/me")
            .wrap(AuthMiddleware)
            .route(web::get().to(read_users_me)),
    );
}
