use crate::error::{ApiError, INVALID_CREDENTIALS, NOT_AUTHENTICATED};
use crate::handlers::auth::{Claims, TokenCodec};
use crate::models::all_models::UserRole;
use actix_web::{
    body::EitherBody,
    dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, AUTHORIZATION},
    web, Error, FromRequest, HttpMessage, HttpRequest,
};
use futures_util::future::{ok, ready, Ready};
use log::debug;
use std::{
    future::Future,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};
use uuid::Uuid;

/// Reads the bearer token from the `Authorization` header.
pub fn extract_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthenticated(NOT_AUTHENTICATED))?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(ApiError::Unauthenticated(NOT_AUTHENTICATED))?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(ApiError::Unauthenticated(NOT_AUTHENTICATED));
    }
    Ok(token)
}

/// Decodes a token into claims. Any decode failure becomes the same 401.
pub fn authenticate_token(codec: &TokenCodec, token: &str) -> Result<Claims, ApiError> {
    codec
        .decode(token)
        .map_err(|_| ApiError::Unauthenticated(INVALID_CREDENTIALS))
}

/// What a protected operation demands from the caller.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Requirement {
    pub role: Option<UserRole>,
    pub resource_owner_id: Option<Uuid>,
}

impl Requirement {
    pub fn admin() -> Self {
        Requirement {
            role: Some(UserRole::Admin),
            resource_owner_id: None,
        }
    }

    pub fn owner(resource_owner_id: Uuid) -> Self {
        Requirement {
            role: None,
            resource_owner_id: Some(resource_owner_id),
        }
    }
}

/// Role and ownership policy. Admins pass everything, a user passes only
/// for resources it owns.
pub fn authorize(claims: &Claims, required: &Requirement) -> Result<(), ApiError> {
    if required.role == Some(UserRole::Admin) && !claims.is_admin() {
        return Err(ApiError::forbidden("Not enough permissions"));
    }
    if let Some(owner) = required.resource_owner_id {
        if !claims.is_admin() && claims.id != owner {
            return Err(ApiError::forbidden("Not enough permissions"));
        }
    }
    Ok(())
}

fn claims_from_headers(
    codec: Option<&web::Data<TokenCodec>>,
    headers: &HeaderMap,
) -> Result<Claims, ApiError> {
    let token = extract_token(headers)?;
    let codec = codec.ok_or_else(|| {
        ApiError::DependencyUnavailable("token codec is not registered".to_string())
    })?;
    authenticate_token(codec, token)
}

/// Rejects requests without a valid bearer token and stores the decoded
/// `Claims` in the request extensions for handlers. Rejections are answered
/// here, the inner service is never called.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddlewareMiddleware {
            service: Rc::new(service),
        })
    }
}

pub struct AuthMiddlewareMiddleware<S> {
    pub service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        Box::pin(async move {
            let claims =
                match claims_from_headers(req.app_data::<web::Data<TokenCodec>>(), req.headers()) {
                    Ok(claims) => claims,
                    Err(e) => return Ok(req.error_response(e).map_into_right_body()),
                };
            debug!("Authenticated {} ({})", claims.sub, claims.role);
            req.extensions_mut().insert(claims);

            service.call(req).await.map(ServiceResponse::map_into_left_body)
        })
    }
}

/// Handlers take `Claims` as an argument. Behind `AuthMiddleware` the claims
/// are already in the extensions; elsewhere the token is checked here.
impl FromRequest for Claims {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        if let Some(claims) = req.extensions().get::<Claims>() {
            return ready(Ok(claims.clone()));
        }
        ready(claims_from_headers(
            req.app_data::<web::Data<TokenCodec>>(),
            req.headers(),
        ))
    }
}
