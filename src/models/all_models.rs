use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use strum_macros::{Display, EnumString};
use uuid::Uuid;

//  USER & AUTHENTICATION STRUCTS

#[derive(
    Debug, Default, Serialize, Deserialize, Display, EnumString, PartialEq, Eq, Clone, Copy,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

/// An email address that passed a structural check on the way in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Email {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let value = value.trim().to_string();
        let valid = match value.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !value.chars().any(char::is_whitespace)
            }
            None => false,
        };
        if valid {
            Ok(Email(value))
        } else {
            Err(format!("value is not a valid email address: {}", value))
        }
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Name {
    pub title: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginInDb {
    pub uuid: Uuid,
    pub username: String,
    pub password: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginPublic {
    pub uuid: Uuid,
    pub username: String,
    pub role: UserRole,
}

/// A user as stored, password hash included. Never serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct UserInDb {
    pub id: Uuid,
    pub name: Name,
    pub login: LoginInDb,
    pub dob: NaiveDate,
    pub city: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl UserInDb {
    pub fn credential(&self) -> Credential {
        Credential {
            user_id: self.id,
            username: self.login.username.clone(),
            password_hash: self.login.password.clone(),
            role: self.login.role,
        }
    }
}

//Flat row produced by the users/names/logins join
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub dob: NaiveDate,
    pub city: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub password: String,
    pub role: String,
}

impl TryFrom<UserRow> for UserInDb {
    type Error = strum::ParseError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(UserInDb {
            id: row.id,
            name: Name {
                title: row.title,
                first_name: row.first_name,
                last_name: row.last_name,
            },
            login: LoginInDb {
                uuid: row.id,
                username: row.username,
                password: row.password,
                role: UserRole::from_str(&row.role)?,
            },
            dob: row.dob,
            city: row.city,
            email: row.email,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserPublic {
    pub id: Uuid,
    pub name: Name,
    pub login: LoginPublic,
    pub dob: NaiveDate,
    pub city: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserInDb> for UserPublic {
    fn from(user: UserInDb) -> Self {
        UserPublic {
            id: user.id,
            name: user.name,
            login: LoginPublic {
                uuid: user.login.uuid,
                username: user.login.username,
                role: user.login.role,
            },
            dob: user.dob,
            city: user.city,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

/// Stored login material for one identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub user_id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: UserRole,
}

/// The caller identity produced by a successful login.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
}

impl From<Credential> for Principal {
    fn from(credential: Credential) -> Self {
        Principal {
            user_id: credential.user_id,
            username: credential.username,
            role: credential.role,
        }
    }
}

//A fully prepared user, password already hashed, ready to insert
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub name: Name,
    pub username: String,
    pub password_hash: String,
    pub role: UserRole,
    pub dob: NaiveDate,
    pub city: String,
    pub email: String,
}

//  CREATE / UPDATE PAYLOADS

#[derive(Debug, Deserialize)]
pub struct LoginCreate {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<UserRole>,
}

#[derive(Debug, Deserialize)]
pub struct UserCreate {
    pub name: Name,
    pub login: LoginCreate,
    pub dob: NaiveDate,
    pub city: String,
    pub email: Email,
}

impl UserCreate {
    pub fn into_new_user(self, password_hash: String) -> NewUser {
        NewUser {
            id: Uuid::new_v4(),
            name: self.name,
            username: self.login.username,
            password_hash,
            role: self.login.role.unwrap_or_default(),
            dob: self.dob,
            city: self.city,
            email: self.email.into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NameUpdate {
    pub title: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginUpdate {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
}

/// Partial update of a user. Present fields override, absent fields are left alone.
#[derive(Debug, Default, Deserialize)]
pub struct UserUpdate {
    pub email: Option<Email>,
    pub city: Option<String>,
    pub dob: Option<NaiveDate>,
    pub name: Option<NameUpdate>,
    pub login: Option<LoginUpdate>,
}

impl UserUpdate {
    pub fn new_password(&self) -> Option<&str> {
        self.login.as_ref().and_then(|l| l.password.as_deref())
    }

    pub fn new_role(&self) -> Option<UserRole> {
        self.login.as_ref().and_then(|l| l.role)
    }

    pub fn new_email(&self) -> Option<&str> {
        self.email.as_ref().map(Email::as_str)
    }

    pub fn new_username(&self) -> Option<&str> {
        self.login.as_ref().and_then(|l| l.username.as_deref())
    }

    /// Merges the patch into `user`. The password is taken as an already
    /// computed hash since the patch only carries the plain text.
    pub fn apply_to(self, user: &mut UserInDb, password_hash: Option<String>) {
        if let Some(email) = self.email {
            user.email = email.into();
        }
        if let Some(city) = self.city {
            user.city = city;
        }
        if let Some(dob) = self.dob {
            user.dob = dob;
        }
        if let Some(name) = self.name {
            if let Some(title) = name.title {
                user.name.title = title;
            }
            if let Some(first_name) = name.first_name {
                user.name.first_name = first_name;
            }
            if let Some(last_name) = name.last_name {
                user.name.last_name = last_name;
            }
        }
        if let Some(login) = self.login {
            if let Some(username) = login.username {
                user.login.username = username;
            }
            if let Some(role) = login.role {
                user.login.role = role;
            }
        }
        if let Some(hash) = password_hash {
            user.login.password = hash;
        }
    }
}

//  AUTH PAYLOADS

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

impl Token {
    pub fn bearer(access_token: String) -> Self {
        Token {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

//  QUERY PARAMS

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// Query accepted by the external random-user source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomUserParams {
    #[serde(default = "default_results")]
    pub results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nat: Option<String>,
}

fn default_results() -> u32 {
    5
}

impl Default for RandomUserParams {
    fn default() -> Self {
        RandomUserParams {
            results: default_results(),
            gender: None,
            nat: None,
        }
    }
}

impl RandomUserParams {
    pub const MAX_RESULTS: u32 = 20;

    pub fn validate(&self) -> Result<(), String> {
        if self.results < 1 || self.results > Self::MAX_RESULTS {
            return Err(format!(
                "results must be between 1 and {}",
                Self::MAX_RESULTS
            ));
        }
        Ok(())
    }
}
