use crate::handlers::auth::AuthError;
use crate::handlers::random_user::ImportError;
use crate::handlers::user_repository::DbError;
use actix_web::{
    error::{JsonPayloadError, PathError, QueryPayloadError, UrlencodedError},
    http::{header, StatusCode},
    HttpRequest, HttpResponse, ResponseError,
};
use log::{error, warn};
use serde::Serialize;

pub const NOT_AUTHENTICATED: &str = "Not authenticated";
pub const INVALID_CREDENTIALS: &str = "Could not validate credentials";
pub const INCORRECT_LOGIN: &str = "Incorrect username or password";

//Error body, shaped as {"detail": "..."}
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing, invalid or expired token, or a failed login.
    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Upstream(String),

    #[error("External API unavailable")]
    UpstreamUnavailable,

    /// Persistence or hashing backend failure. The cause is logged, never returned.
    #[error("Internal server error")]
    DependencyUnavailable(String),
}

impl ApiError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Upstream(_) | ApiError::DependencyUnavailable(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::DependencyUnavailable(cause) => error!("Dependency failure: {}", cause),
            ApiError::Unauthenticated(msg) => warn!("Authentication failed: {}", msg),
            _ => {}
        }

        let mut response = HttpResponse::build(self.status_code());
        if matches!(self, ApiError::Unauthenticated(_)) {
            response.insert_header((header::WWW_AUTHENTICATE, "Bearer"));
        }
        response.json(ErrorBody {
            detail: self.to_string(),
        })
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Conflict(msg) => ApiError::BadRequest(format!("Integrity error: {}", msg)),
            other => ApiError::DependencyUnavailable(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidToken => ApiError::Unauthenticated(INVALID_CREDENTIALS),
            other => ApiError::DependencyUnavailable(other.to_string()),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(e: ImportError) -> Self {
        match e {
            ImportError::Unavailable(cause) => {
                error!("External API request failed: {}", cause);
                ApiError::UpstreamUnavailable
            }
            ImportError::UpstreamStatus(status) => {
                error!("External API answered with status {}", status);
                ApiError::Upstream("External API error".to_string())
            }
            ImportError::InvalidFormat(cause) => {
                warn!("External API payload rejected: {}", cause);
                ApiError::validation("Invalid response format from external API")
            }
            ImportError::Hashing(cause) => ApiError::DependencyUnavailable(cause),
        }
    }
}

//Extractor error handlers, so malformed input answers 422 with the usual body

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::validation(err.to_string()).into()
}

pub fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::validation(err.to_string()).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::validation(err.to_string()).into()
}

pub fn form_error_handler(err: UrlencodedError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::validation(err.to_string()).into()
}
