/// JWT Authentication Middleware
///
/// Gates protected routes on a bearer access token. The token is checked
/// against the revocation list, then its signature, then its expiry and
/// type, and finally its subject must still exist in the user directory.
/// On success an [`AuthenticatedUser`] is placed in request extensions.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, AUTHORIZATION},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::TokenService;
use crate::error::{AppError, AuthError};
use crate::users::{Identity, UserDirectory};

const BEARER_PREFIX: &str = "Bearer ";

/// Identity attached to a request that passed the gate
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub identity: Identity,
    pub email: String,
    pub user_uuid: Uuid,
    /// Raw bearer token, kept so handlers can revoke it
    pub token: String,
}

/// Extract the raw token from an `Authorization: Bearer <token>` header.
///
/// Returns `None` for a missing header, another scheme, or a blank token.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?.trim();

    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Run every check after the header has yielded a token
pub async fn authorize(
    tokens: &dyn TokenService,
    users: &dyn UserDirectory,
    token: String,
) -> Result<AuthenticatedUser, AuthError> {
    if tokens.is_revoked(&token).await {
        tracing::warn!("Rejected revoked token");
        return Err(AuthError::TokenNotValid);
    }

    let claims = tokens.validate(&token).map_err(|e| {
        tracing::warn!(error = %e, "JWT validation failed");
        AuthError::Unauthorized
    })?;

    if tokens.has_expired(&claims) {
        tracing::info!(user_id = %claims.user_id, "Rejected expired token");
        return Err(AuthError::TokenExpired);
    }

    if !claims.kind().grants_resource_access() {
        tracing::warn!(token_type = %claims.token_type, "Token type not allowed on protected route");
        return Err(AuthError::Unauthorized);
    }

    let user_uuid = claims.subject_id().map_err(|_| AuthError::Unauthorized)?;
    let user = users.find_by_uuid(user_uuid).await.map_err(|e| {
        tracing::warn!(user_uuid = %user_uuid, error = %e, "Token subject not found");
        AuthError::Unauthorized
    })?;

    tracing::debug!(user_uuid = %user_uuid, "JWT validated successfully");

    Ok(AuthenticatedUser {
        email: user.identity.email.clone(),
        user_uuid,
        identity: user.identity,
        token,
    })
}

/// Middleware for protecting routes
pub struct JwtMiddleware {
    tokens: Arc<dyn TokenService>,
    users: Arc<dyn UserDirectory>,
}

impl JwtMiddleware {
    pub fn new(tokens: Arc<dyn TokenService>, users: Arc<dyn UserDirectory>) -> Self {
        Self { tokens, users }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            tokens: self.tokens.clone(),
            users: self.users.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    tokens: Arc<dyn TokenService>,
    users: Arc<dyn UserDirectory>,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = match bearer_token(req.headers()) {
            Some(token) => token,
            None => {
                tracing::warn!(path = %req.path(), "Missing or invalid Authorization header");
                let error: Error = AppError::Auth(AuthError::Unauthorized).into();
                return Box::pin(async move { Err::<ServiceResponse<B>, Error>(error) });
            }
        };

        let service = self.service.clone();
        let tokens = self.tokens.clone();
        let users = self.users.clone();

        Box::pin(async move {
            let user = authorize(tokens.as_ref(), users.as_ref(), token)
                .await
                .map_err(AppError::Auth)?;

            req.extensions_mut().insert(user);
            service.call(req).await
        })
    }
}
