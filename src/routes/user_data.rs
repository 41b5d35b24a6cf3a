use crate::error::ApiError;
use crate::handlers::auth::Claims;
use crate::handlers::password::hash_password;
use crate::handlers::user_repository::UserRepository;
use crate::middleware::auth_middleware::{authorize, AuthMiddleware, Requirement};
use crate::models::all_models::{ListParams, UserCreate, UserPublic, UserUpdate};
use crate::routes::user_auth::read_users_me;
use actix_web::{web, HttpResponse};
use log::info;
use uuid::Uuid;

const USER_NOT_FOUND: &str = "User not found";

//Get Users
//Get Users Input: Query skip, limit
//Get Users Output: Vec<UserPublic>
pub async fn get_users(
    repo: web::Data<dyn UserRepository>,
    params: web::Query<ListParams>,
) -> Result<HttpResponse, ApiError> {
    let users: Vec<UserPublic> = repo
        .list(params.skip, params.limit)
        .await?
        .into_iter()
        .map(UserPublic::from)
        .collect();

    Ok(HttpResponse::Ok().json(users))
}

//Get User By ID
//Get User By ID Input: Path (/users/{user_id})
//Get User By ID Output: UserPublic
pub async fn get_user_by_id(
    repo: web::Data<dyn UserRepository>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let user = repo
        .find_by_id(path.into_inner())
        .await?
        .ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))?;

    Ok(HttpResponse::Ok().json(UserPublic::from(user)))
}

//Create User
//Create User Input: UserCreate, admin token
//Create User Output: UserPublic
pub async fn create_user(
    repo: web::Data<dyn UserRepository>,
    claims: Claims,
    payload: web::Json<UserCreate>,
) -> Result<HttpResponse, ApiError> {
    authorize(&claims, &Requirement::admin())
        .map_err(|_| ApiError::forbidden("You do not have permission to create users"))?;

    let payload = payload.into_inner();
    if repo.email_exists(payload.email.as_str()).await? {
        return Err(ApiError::bad_request("User with this email already exists"));
    }
    if repo.username_exists(&payload.login.username).await? {
        return Err(ApiError::bad_request("Username already taken"));
    }

    let password_hash = hash_password(&payload.login.password)?;
    let user = repo.create(payload.into_new_user(password_hash)).await?;
    info!("{} created user {}", claims.sub, user.login.username);

    Ok(HttpResponse::Ok().json(UserPublic::from(user)))
}

//Update User
//Update User Input: Path (/users/{user_id}), UserUpdate
//Update User Output: UserPublic
pub async fn update_user(
    repo: web::Data<dyn UserRepository>,
    claims: Claims,
    path: web::Path<Uuid>,
    payload: web::Json<UserUpdate>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    authorize(&claims, &Requirement::owner(user_id))
        .map_err(|_| ApiError::forbidden("You do not have permission to update this user"))?;

    let patch = payload.into_inner();
    let mut user = repo
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))?;

    // restating the current role is not a change
    if patch.new_role().is_some_and(|role| role != user.login.role) {
        authorize(&claims, &Requirement::admin())
            .map_err(|_| ApiError::forbidden("Only an admin can change roles"))?;
    }

    if let Some(email) = patch.new_email() {
        if email != user.email && repo.email_exists(email).await? {
            return Err(ApiError::bad_request("User with this email already exists"));
        }
    }
    if let Some(username) = patch.new_username() {
        if username != user.login.username && repo.username_exists(username).await? {
            return Err(ApiError::bad_request("Username already taken"));
        }
    }

    let password_hash = patch.new_password().map(hash_password).transpose()?;
    patch.apply_to(&mut user, password_hash);

    let updated = repo
        .update(&user)
        .await?
        .ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))?;
    info!("{} updated user {}", claims.sub, updated.id);

    Ok(HttpResponse::Ok().json(UserPublic::from(updated)))
}

//Delete User
//Delete User Input: Path (/users/{user_id})
//Delete User Output: UserPublic of the removed user
pub async fn delete_user(
    repo: web::Data<dyn UserRepository>,
    claims: Claims,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    authorize(&claims, &Requirement::owner(user_id))
        .map_err(|_| ApiError::forbidden("You do not have permission to delete this user"))?;

    let deleted = repo
        .delete(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))?;
    info!("{} deleted user {}", claims.sub, deleted.id);

    Ok(HttpResponse::Ok().json(UserPublic::from(deleted)))
}

//Config User Data Routes
// GET /users
// GET /users/me
// POST /users/create
// GET /users/{user_id}
// PUT /users/{user_id}
// DELETE /users/{user_id}
pub fn config_user_data_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .wrap(AuthMiddleware)
            .route("", web::get().to(get_users))
            .route("/me", web::get().to(read_users_me))
            .route("/create", web::post().to(create_user))
            .service(
                web::resource("/{user_id}")
                    .route(web::get().to(get_user_by_id))
                    .route(web::put().to(update_user))
                    .route(web::delete().to(delete_user)),
            ),
    );
}
