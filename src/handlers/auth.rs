use crate::db::user_repository::UserRepository;
use crate::errors::AppError;
use crate::models::user::{
    normalize_email, AuthResponse, Claims, LoginRequest, PublicUser, RegisterRequest, User,
};
use crate::utils::auth::{hash_password, verify_against_dummy, verify_password, TokenService};
use actix_web::{web, HttpResponse};
use tracing::{error, info, warn};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

fn issue_token(tokens: &TokenService, user: &User) -> Result<String, AppError> {
    tokens.issue(&user.id, &user.email).map_err(|e| {
        error!(error = ?e, user_id = %user.id, "Failed to generate JWT");
        AppError::Internal("Failed to generate token".to_string())
    })
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = AuthResponse),
        (status = 400, description = "Invalid input or email already registered", body = crate::errors::ErrorBody)
    ),
    tag = "Authentication"
)]
pub async fn register(
    user_repo: web::Data<UserRepository>,
    tokens: web::Data<TokenService>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner().normalized();
    info!(username = %payload.username, email = %payload.email, "Registration attempt");

    let violations = payload.validate();
    if !violations.is_empty() {
        warn!(email = %payload.email, "Registration failed: invalid input");
        return Err(AppError::Validation(violations));
    }

    let password_hash = hash_password(&payload.password).map_err(|e| {
        error!(error = ?e, "Failed to hash password");
        AppError::Internal("Failed to hash password".to_string())
    })?;

    let now = chrono::Utc::now();
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        username: payload.username,
        email: payload.email,
        password_hash,
        created_at: now,
        updated_at: now,
    };

    let user = user_repo.create(user).await.map_err(|e| {
        if let AppError::Validation(_) = e {
            warn!(error = %e, "Registration failed: already registered");
        }
        e
    })?;

    let token = issue_token(&tokens, &user)?;

    info!(user_id = %user.id, username = %user.username, "User registered successfully");

    Ok(HttpResponse::Created().json(AuthResponse {
        token,
        user: PublicUser::from(&user),
    }))
}

/// Login an existing user
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorBody)
    ),
    tag = "Authentication"
)]
pub async fn login(
    user_repo: web::Data<UserRepository>,
    tokens: web::Data<TokenService>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let email = normalize_email(&payload.email);
    info!(email = %email, "Login attempt");

    // Unknown email and wrong password must be indistinguishable to the caller.
    let user = match user_repo.get_by_email(&email).await? {
        Some(user) if verify_password(&payload.password, &user.password_hash) => user,
        Some(_) => {
            warn!(email = %email, "Login failed: wrong password");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
        None => {
            verify_against_dummy(&payload.password);
            warn!(email = %email, "Login failed: unknown email");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
    };

    let token = issue_token(&tokens, &user)?;

    info!(email = %email, user_id = %user.id, "User logged in successfully");

    Ok(HttpResponse::Ok().json(AuthResponse {
        token,
        user: PublicUser::from(&user),
    }))
}

/// Public profile of the token's owner
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = PublicUser),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Authentication"
)]
pub async fn me(
    claims: web::ReqData<Claims>,
    user_repo: web::Data<UserRepository>,
) -> Result<HttpResponse, AppError> {
    match user_repo.get_by_id(&claims.sub).await? {
        Some(user) => Ok(HttpResponse::Ok().json(PublicUser::from(&user))),
        None => {
            warn!(user_id = %claims.sub, "Valid token for unknown user");
            Err(AppError::Unauthorized("Invalid token".to_string()))
        }
    }
}
