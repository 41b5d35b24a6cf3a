use crate::handlers::password::hash_password;
use crate::models::all_models::{Name, NewUser, RandomUserParams, UserRole};
use actix_web::web;
use chrono::NaiveDate;
use log::info;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("external API unreachable: {0}")]
    Unavailable(#[from] reqwest::Error),

    #[error("external API answered {0}")]
    UpstreamStatus(StatusCode),

    #[error("invalid response format: {0}")]
    InvalidFormat(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

//Subset of the randomuser.me record this service cares about
#[derive(Debug, Deserialize)]
struct RandomUser {
    name: RandomName,
    location: RandomLocation,
    email: String,
    login: RandomLogin,
    dob: RandomDob,
}

#[derive(Debug, Deserialize)]
struct RandomName {
    title: String,
    first: String,
    last: String,
}

#[derive(Debug, Deserialize)]
struct RandomLocation {
    city: String,
}

#[derive(Debug, Deserialize)]
struct RandomLogin {
    uuid: Uuid,
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct RandomDob {
    date: String,
}

/// HTTP client for the third-party random user source.
#[derive(Clone)]
pub struct RandomUserClient {
    http: reqwest::Client,
    base_url: String,
}

impl RandomUserClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        RandomUserClient {
            http,
            base_url: base_url.into(),
        }
    }

    /// Raw upstream JSON for `params`.
    pub async fn fetch_raw(&self, params: &RandomUserParams) -> Result<Value, ImportError> {
        let response = self.http.get(&self.base_url).query(params).send().await?;

        let status = response.status();
        if status.is_server_error() {
            return Err(ImportError::UpstreamStatus(status));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ImportError::InvalidFormat(e.to_string()))
    }

    /// Fetches users and maps them to insertable records, hashing each password.
    pub async fn fetch_users(&self, params: &RandomUserParams) -> Result<Vec<NewUser>, ImportError> {
        let payload = self.fetch_raw(params).await?;
        let users = parse_users(payload)?;
        info!("Fetched {} users from external API", users.len());

        hash_logins(users).await
    }
}

// argon2 is CPU bound, the batch runs on the blocking pool instead of the worker
async fn hash_logins(users: Vec<RandomUser>) -> Result<Vec<NewUser>, ImportError> {
    web::block(move || {
        users
            .into_iter()
            .map(|user| {
                let password_hash = hash_password(&user.login.password)
                    .map_err(|e| ImportError::Hashing(e.to_string()))?;
                into_new_user(user, password_hash)
            })
            .collect::<Result<Vec<_>, _>>()
    })
    .await
    .map_err(|e| ImportError::Hashing(e.to_string()))?
}

fn parse_users(payload: Value) -> Result<Vec<RandomUser>, ImportError> {
    let results = match payload {
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(ImportError::InvalidFormat(
                    "`results` is missing or not a list".to_string(),
                ))
            }
        },
        _ => {
            return Err(ImportError::InvalidFormat(
                "payload is not an object".to_string(),
            ))
        }
    };

    results
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value::<RandomUser>(item)
                .map_err(|e| ImportError::InvalidFormat(format!("result {}: {}", i, e)))
        })
        .collect()
}

fn into_new_user(user: RandomUser, password_hash: String) -> Result<NewUser, ImportError> {
    // upstream dates look like 1992-03-15T10:20:30.000Z
    let date_part = user.dob.date.get(..10).unwrap_or(&user.dob.date);
    let dob = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| ImportError::InvalidFormat(format!("dob {}: {}", user.dob.date, e)))?;

    Ok(NewUser {
        id: user.login.uuid,
        name: Name {
            title: user.name.title,
            first_name: user.name.first,
            last_name: user.name.last,
        },
        username: user.login.username,
        password_hash,
        role: UserRole::User,
        dob,
        city: user.location.city,
        email: user.email,
    })
}
