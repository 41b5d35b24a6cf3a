//! Shared fixtures for the HTTP tests: an in-memory repository seeded with
//! three accounts and helpers to mint tokens for them.

#![allow(dead_code)]

use accounts_api::{
    config::AuthConfig,
    handlers::{
        auth::TokenCodec,
        password::hash_password,
        random_user::RandomUserClient,
        user_repository::{DbError, DbResult, UserRepository},
    },
    models::all_models::{LoginInDb, Name, NewUser, Principal, UserInDb, UserRole},
    AppState,
};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use jsonwebtoken::Algorithm;
use lazy_static::lazy_static;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const SECRET: &str = "test-secret-key";
pub const PASSWORD: &str = "secret";

pub const ADMIN_ID: &str = "6c3b3609-6fae-4a71-a9fd-94eaabf12c9a";
pub const ALICE_ID: &str = "c647e0c3-d0fb-47fd-bbea-c61b3cd999dd";
pub const BOB_ID: &str = "52cc33c2-7b60-4f8b-bc92-3aa92573c1dd";
pub const UNKNOWN_ID: &str = "52cc33c2-7b60-4f8b-bc92-3aa92573c1cc";

lazy_static! {
    // argon2 is slow in debug builds, hash the shared fixture password once
    static ref PASSWORD_HASH: String = hash_password(PASSWORD).unwrap();
}

/// Builds the app exactly like `main` does, minus logging and CORS.
macro_rules! init_app {
    ($state:expr) => {{
        let state = $state.clone();
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(actix_web::middleware::NormalizePath::trim())
                .configure(move |cfg| state.configure(cfg)),
        )
        .await
    }};
}

/// In-memory user repository for testing. Keeps insertion order.
#[derive(Default, Clone)]
pub struct MemoryUserRepository {
    users: Arc<RwLock<Vec<UserInDb>>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: UserInDb) {
        self.users.write().await.push(user);
    }

    pub async fn count(&self) -> usize {
        self.users.read().await.len()
    }

    fn to_stored(user: NewUser) -> UserInDb {
        UserInDb {
            id: user.id,
            name: user.name,
            login: LoginInDb {
                uuid: user.id,
                username: user.username,
                password: user.password_hash,
                role: user.role,
            },
            dob: user.dob,
            city: user.city,
            email: user.email,
            created_at: Utc::now(),
        }
    }

    fn conflict(users: &[UserInDb], candidate: &UserInDb) -> Option<DbError> {
        users
            .iter()
            .filter(|u| u.id != candidate.id)
            .find(|u| u.email == candidate.email || u.login.username == candidate.login.username)
            .map(|u| DbError::Conflict(format!("duplicate key for user {}", u.id)))
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> DbResult<Option<UserInDb>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.login.username == username).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<UserInDb>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn list(&self, skip: usize, limit: usize) -> DbResult<Vec<UserInDb>> {
        let users = self.users.read().await;
        Ok(users.iter().skip(skip).take(limit).cloned().collect())
    }

    async fn email_exists(&self, email: &str) -> DbResult<bool> {
        let users = self.users.read().await;
        Ok(users.iter().any(|u| u.email == email))
    }

    async fn username_exists(&self, username: &str) -> DbResult<bool> {
        let users = self.users.read().await;
        Ok(users.iter().any(|u| u.login.username == username))
    }

    async fn create(&self, user: NewUser) -> DbResult<UserInDb> {
        let mut users = self.users.write().await;
        let stored = Self::to_stored(user);
        if users.iter().any(|u| u.id == stored.id) {
            return Err(DbError::Conflict(format!("duplicate id {}", stored.id)));
        }
        if let Some(err) = Self::conflict(&users, &stored) {
            return Err(err);
        }
        users.push(stored.clone());
        Ok(stored)
    }

    async fn create_bulk(&self, new_users: Vec<NewUser>) -> DbResult<usize> {
        let mut users = self.users.write().await;
        let mut staged = users.clone();
        for user in new_users.into_iter().map(Self::to_stored) {
            if staged.iter().any(|u| u.id == user.id) {
                return Err(DbError::Conflict(format!("duplicate id {}", user.id)));
            }
            if let Some(err) = Self::conflict(&staged, &user) {
                return Err(err);
            }
            staged.push(user);
        }
        let inserted = staged.len() - users.len();
        *users = staged;
        Ok(inserted)
    }

    async fn update(&self, user: &UserInDb) -> DbResult<Option<UserInDb>> {
        let mut users = self.users.write().await;
        if let Some(err) = Self::conflict(&users, user) {
            return Err(err);
        }
        match users.iter_mut().find(|u| u.id == user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(Some(user.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> DbResult<Option<UserInDb>> {
        let mut users = self.users.write().await;
        let position = users.iter().position(|u| u.id == id);
        Ok(position.map(|i| users.remove(i)))
    }
}

/// Repository whose every call fails as if the database pool were exhausted.
pub struct UnavailableUserRepository;

fn pool_down<T>() -> DbResult<T> {
    Err(DbError::Sqlx(sqlx::Error::PoolTimedOut))
}

#[async_trait]
impl UserRepository for UnavailableUserRepository {
    async fn find_by_username(&self, _: &str) -> DbResult<Option<UserInDb>> {
        pool_down()
    }

    async fn find_by_id(&self, _: Uuid) -> DbResult<Option<UserInDb>> {
        pool_down()
    }

    async fn list(&self, _: usize, _: usize) -> DbResult<Vec<UserInDb>> {
        pool_down()
    }

    async fn email_exists(&self, _: &str) -> DbResult<bool> {
        pool_down()
    }

    async fn username_exists(&self, _: &str) -> DbResult<bool> {
        pool_down()
    }

    async fn create(&self, _: NewUser) -> DbResult<UserInDb> {
        pool_down()
    }

    async fn create_bulk(&self, _: Vec<NewUser>) -> DbResult<usize> {
        pool_down()
    }

    async fn update(&self, _: &UserInDb) -> DbResult<Option<UserInDb>> {
        pool_down()
    }

    async fn delete(&self, _: Uuid) -> DbResult<Option<UserInDb>> {
        pool_down()
    }
}

pub fn uuid(raw: &str) -> Uuid {
    Uuid::parse_str(raw).unwrap()
}

pub fn stored_user(
    id: &str,
    username: &str,
    role: UserRole,
    (title, first, last): (&str, &str, &str),
    email: &str,
    dob: (i32, u32, u32),
) -> UserInDb {
    let id = uuid(id);
    UserInDb {
        id,
        name: Name {
            title: title.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
        },
        login: LoginInDb {
            uuid: id,
            username: username.to_string(),
            password: PASSWORD_HASH.clone(),
            role,
        },
        dob: NaiveDate::from_ymd_opt(dob.0, dob.1, dob.2).unwrap(),
        city: "New York".to_string(),
        email: email.to_string(),
        created_at: Utc.with_ymd_and_hms(2025, 2, 4, 21, 0, 0).unwrap(),
    }
}

/// Repository holding johndoe (admin), alice_smith and bob_brown.
pub async fn seeded_repo() -> MemoryUserRepository {
    let repo = MemoryUserRepository::new();
    repo.insert_user(stored_user(
        ADMIN_ID,
        "johndoe",
        UserRole::Admin,
        ("Mr", "John", "Doe"),
        "testuser@example.com",
        (1995, 5, 20),
    ))
    .await;
    repo.insert_user(stored_user(
        ALICE_ID,
        "alice_smith",
        UserRole::User,
        ("Ms", "Alice", "Smith"),
        "alice@example.com",
        (1992, 3, 15),
    ))
    .await;
    repo.insert_user(stored_user(
        BOB_ID,
        "bob_brown",
        UserRole::User,
        ("Mr", "Bob", "Brown"),
        "bob@example.com",
        (1988, 11, 2),
    ))
    .await;
    repo
}

pub fn auth_config() -> AuthConfig {
    AuthConfig::new(SECRET, Algorithm::HS256, Duration::minutes(30)).unwrap()
}

pub fn state_with<R: UserRepository + 'static>(repo: R, upstream_url: &str) -> AppState {
    AppState::new(
        &auth_config(),
        Arc::new(repo),
        RandomUserClient::new(upstream_url),
    )
}

pub fn token_for(username: &str, role: UserRole, user_id: &str) -> String {
    TokenCodec::new(&auth_config())
        .issue(
            &Principal {
                user_id: uuid(user_id),
                username: username.to_string(),
                role,
            },
            Some(Duration::minutes(30)),
        )
        .unwrap()
}

pub fn admin_header() -> (&'static str, String) {
    (
        "Authorization",
        format!("Bearer {}", token_for("johndoe", UserRole::Admin, ADMIN_ID)),
    )
}

pub fn alice_header() -> (&'static str, String) {
    (
        "Authorization",
        format!("Bearer {}", token_for("alice_smith", UserRole::User, ALICE_ID)),
    )
}
