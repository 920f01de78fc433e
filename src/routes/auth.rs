/// Authentication Routes
///
/// Registration, login, token refresh and logout.

use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{generate_pair_nonce, HashError, PasswordHasher, TokenService};
use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::routes::multipart::read_form;
use crate::routes::response::ApiResponse;
use crate::uploads::UploadStore;
use crate::users::{DirectoryError, NewUser, UserDirectory};
use crate::validators::{
    is_valid_email, is_valid_name, is_valid_password, is_valid_phone_number, passwords_match,
};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize, Default)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token_type: String,
    pub expires_in: i64,
    pub access_token: String,
    pub refresh_token: String,
    pub email: String,
    pub user_uuid: Uuid,
    pub name: String,
}

async fn hash_blocking(hasher: Arc<dyn PasswordHasher>, password: String) -> Result<String, AppError> {
    web::block(move || hasher.hash(&password))
        .await
        .map_err(|e| AppError::Internal(format!("hashing task failed: {}", e)))?
        .map_err(AppError::from)
}

async fn verify_blocking(
    hasher: Arc<dyn PasswordHasher>,
    password: String,
    encoded_hash: String,
) -> Result<bool, HashError> {
    web::block(move || hasher.verify(&password, &encoded_hash))
        .await
        .map_err(|e| HashError::Derivation(format!("verification task failed: {}", e)))?
}

/// POST /api/v1/auth/register
///
/// Multipart form: name, email, password, confirmation_password,
/// phone_number and an optional `image` file.
///
/// # Errors
/// - 400: Validation errors
/// - 409: Email already registered
/// - 413: Image too large
/// - 500: Internal server error
pub async fn register(
    payload: Multipart,
    users: web::Data<dyn UserDirectory>,
    hasher: web::Data<dyn PasswordHasher>,
    uploads: web::Data<UploadStore>,
) -> Result<HttpResponse, AppError> {
    let form = read_form(payload, "image", uploads.max_file_size()).await?;

    let name = is_valid_name(form.text("name"))?;
    let email = is_valid_email(form.text("email"))?;
    let password = form.text("password").to_string();
    is_valid_password(&password)?;
    passwords_match(&password, form.text("confirmation_password"))?;
    let phone_number = is_valid_phone_number(form.text("phone_number"))?;

    let password_hash = hash_blocking(hasher.into_inner(), password).await?;

    let photo = match &form.file {
        Some(file) => Some(uploads.save(&file.filename, &file.bytes).await?),
        None => None,
    };

    let registered = users
        .register(NewUser {
            name,
            email,
            password_hash,
            phone_number: Some(phone_number),
            photo: photo.clone(),
        })
        .await;

    let identity = match registered {
        Ok(identity) => identity,
        Err(e) => {
            if let Some(path) = &photo {
                uploads.remove(path).await;
            }
            return Err(e.into());
        }
    };

    tracing::info!(user_uuid = %identity.uuid, "User registered successfully");

    Ok(HttpResponse::Created().json(ApiResponse::with_data("Register successful", identity)))
}

/// POST /api/v1/auth/login
///
/// # Errors
/// - 400: Validation error
/// - 401: Unknown email or wrong password, indistinguishable
/// - 500: Internal server error
pub async fn login(
    body: web::Json<LoginRequest>,
    users: web::Data<dyn UserDirectory>,
    hasher: web::Data<dyn PasswordHasher>,
    tokens: web::Data<dyn TokenService>,
) -> Result<HttpResponse, AppError> {
    let LoginRequest { email, password } = body.into_inner();
    let email = is_valid_email(&email)?;
    is_valid_password(&password)?;

    let user = match users.find_by_email(&email).await {
        Ok(user) => user,
        Err(DirectoryError::NotFound) => {
            // Pay the same argon2 cost as a wrong password.
            let _ = hash_blocking(hasher.into_inner(), password).await;
            return Err(AppError::InvalidCredentials);
        }
        Err(e) => return Err(e.into()),
    };

    let verified = verify_blocking(hasher.into_inner(), password, user.password_hash.clone()).await?;
    if !verified {
        return Err(AppError::InvalidCredentials);
    }

    let pair = tokens.issue_token_pair(user.identity.uuid, &generate_pair_nonce())?;

    tracing::info!(user_uuid = %user.identity.uuid, "User logged in successfully");

    Ok(HttpResponse::Ok().json(ApiResponse::with_data(
        "Login successful",
        LoginResponse {
            token_type: pair.token_type,
            expires_in: pair.expires_in,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            email: user.identity.email,
            user_uuid: user.identity.uuid,
            name: user.identity.name,
        },
    )))
}

/// POST /api/v1/auth/refresh
///
/// Exchanges a refresh token for a new pair. The presented refresh token
/// is revoked.
///
/// # Errors
/// - 401: Invalid, expired, revoked or non-refresh token, or unknown user
/// - 503: Revocation store unavailable
pub async fn refresh(
    body: web::Json<RefreshRequest>,
    users: web::Data<dyn UserDirectory>,
    tokens: web::Data<dyn TokenService>,
) -> Result<HttpResponse, AppError> {
    let refresh_token = body.into_inner().refresh_token;

    let user_uuid = tokens.extract_subject_id(&refresh_token)?;
    users.find_by_uuid(user_uuid).await?;

    let pair = tokens.refresh(&refresh_token).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_data("Token refreshed", pair)))
}

/// POST /api/v1/auth/logout
///
/// Revokes the bearer token and, when supplied and owned by the same user,
/// the refresh token from the body.
///
/// # Errors
/// - 503: Revocation store unavailable
pub async fn logout(
    user: web::ReqData<AuthenticatedUser>,
    body: Option<web::Json<LogoutRequest>>,
    tokens: web::Data<dyn TokenService>,
) -> Result<HttpResponse, AppError> {
    let user = user.into_inner();
    tokens.revoke(&user.token).await?;

    if let Some(refresh_token) = body.and_then(|b| b.into_inner().refresh_token) {
        match tokens.extract_subject_id(&refresh_token) {
            Ok(owner) if owner == user.user_uuid => tokens.revoke(&refresh_token).await?,
            _ => tracing::warn!(user_uuid = %user.user_uuid, "Ignoring refresh token not owned by caller"),
        }
    }

    tracing::info!(user_uuid = %user.user_uuid, "User logged out");

    Ok(HttpResponse::Ok().json(ApiResponse::message("Logout successful")))
}
