use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::models::account::{normalize_email, LoginRequest};
use crate::models::user::{RegisterUserRequest, Role, User, UserView};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: usize,
}

/// The signed-in account, placed in request extensions by the
/// `Authentication` middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
        }
    }
}

// JWT Creation
pub fn create_token(
    subject: &str,
    role: Role,
    secret: &str,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = Utc::now() + ttl;
    let claims = Claims {
        sub: subject.to_string(),
        role,
        exp: expiration.timestamp().max(0) as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))
}

// JWT Validation
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

pub fn issue_token(config: &Config, subject: &str, role: Role) -> ApiResult<String> {
    Ok(create_token(
        subject,
        role,
        &config.jwt_secret,
        Duration::hours(config.token_ttl_hours),
    )?)
}

/// bcrypt is CPU-bound, so it runs on the blocking pool.
pub async fn hash_password(password: String, cost: u32) -> ApiResult<String> {
    Ok(web::block(move || bcrypt::hash(password, cost)).await??)
}

/// Fails with the generic credentials message when the password is wrong.
pub async fn check_password(password: String, hash: String) -> ApiResult<()> {
    let matches = web::block(move || bcrypt::verify(password, &hash)).await??;
    if matches {
        Ok(())
    } else {
        Err(invalid_credentials())
    }
}

pub fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid credentials".to_string())
}

pub fn require_user(req: &HttpRequest) -> ApiResult<AuthUser> {
    req.extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
}

pub fn require_role(req: &HttpRequest, role: Role) -> ApiResult<AuthUser> {
    let user = require_user(req)?;
    if user.role != role {
        warn!("{} {} tried to reach a {} route", user.role, user.id, role);
        return Err(ApiError::Forbidden(format!("Only {} accounts can access this resource", role)));
    }
    Ok(user)
}

/* -------------------------------------------------------------------------- */
/* Patient / therapist accounts                                               */
/* -------------------------------------------------------------------------- */

/// POST /api/auth/register
pub async fn register(
    data: web::Data<AppState>,
    payload: web::Json<RegisterUserRequest>,
) -> ApiResult<HttpResponse> {
    let mut payload = payload.into_inner();
    payload.name = payload.name.trim().to_string();
    payload.email = normalize_email(&payload.email);
    payload.validate()?;

    if !payload.role.is_clinical() {
        return Err(ApiError::BadRequest(
            "Role must be either patient or therapist".to_string(),
        ));
    }
    if data.store.find_user_by_email(&payload.email).await?.is_some() {
        return Err(ApiError::Conflict("User already exists".to_string()));
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        name: payload.name,
        email: payload.email,
        password: hash_password(payload.password, data.config.bcrypt_cost).await?,
        role: payload.role,
        created_at: Utc::now(),
    };
    data.store.insert_user(&user).await?;
    info!("Registered {} account {}", user.role, user.id);

    Ok(HttpResponse::Created().json(json!({ "user": UserView::from(&user) })))
}

/// POST /api/auth/login
pub async fn login(
    data: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let mut payload = payload.into_inner();
    payload.email = normalize_email(&payload.email);
    payload.validate()?;

    let user = data
        .store
        .find_user_by_email(&payload.email)
        .await?
        .ok_or_else(invalid_credentials)?;
    check_password(payload.password, user.password.clone()).await?;

    let token = issue_token(&data.config, &user.id, user.role)?;
    Ok(HttpResponse::Ok().json(json!({ "token": token, "user": UserView::from(&user) })))
}

/// GET /api/auth/session
pub async fn session(req: HttpRequest, data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let current = require_user(&req)?;
    if !current.role.is_clinical() {
        return Err(ApiError::Forbidden(
            "Sessions are only issued to patient and therapist accounts".to_string(),
        ));
    }

    let user = data
        .store
        .find_user_by_id(&current.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(HttpResponse::Ok().json(json!({ "user": UserView::from(&user) })))
}
