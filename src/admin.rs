//! Admin accounts and the student roster: `/api/admin`.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::info;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::auth::{check_password, hash_password, invalid_credentials, issue_token, require_role};
use crate::error::{ApiError, ApiResult};
use crate::models::account::{normalize_email, LoginRequest, ProfileChanges, RegisterAccountRequest};
use crate::models::admin::{Admin, AdminProfile, UpdateAdminRequest};
use crate::models::student::StudentProfile;
use crate::models::user::Role;

/// POST /api/admin/auth/register
pub async fn register(
    data: web::Data<AppState>,
    payload: web::Json<RegisterAccountRequest>,
) -> ApiResult<HttpResponse> {
    let mut payload = payload.into_inner();
    payload.name = payload.name.trim().to_string();
    payload.email = normalize_email(&payload.email);
    payload.validate()?;

    if data.store.find_admin_by_email(&payload.email).await?.is_some() {
        return Err(ApiError::Conflict("Admin already exists".to_string()));
    }

    let now = Utc::now();
    let admin = Admin {
        id: Uuid::new_v4().to_string(),
        name: payload.name,
        email: payload.email,
        password: hash_password(payload.password, data.config.bcrypt_cost).await?,
        created_at: now,
        updated_at: now,
    };
    data.store.insert_admin(&admin).await?;
    info!("Admin registered: {}", admin.id);

    let token = issue_token(&data.config, &admin.id, Role::Admin)?;
    Ok(HttpResponse::Created().json(json!({ "token": token, "admin": AdminProfile::from(&admin) })))
}

/// POST /api/admin/auth/login
pub async fn login(
    data: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let mut payload = payload.into_inner();
    payload.email = normalize_email(&payload.email);
    payload.validate()?;

    let admin = data
        .store
        .find_admin_by_email(&payload.email)
        .await?
        .ok_or_else(invalid_credentials)?;
    check_password(payload.password, admin.password.clone()).await?;

    let token = issue_token(&data.config, &admin.id, Role::Admin)?;
    Ok(HttpResponse::Ok().json(json!({ "token": token, "admin": AdminProfile::from(&admin) })))
}

/// GET /api/admin/profile
pub async fn get_profile(req: HttpRequest, data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let user = require_role(&req, Role::Admin)?;
    let admin = data
        .store
        .find_admin_by_id(&user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Admin not found".to_string()))?;
    Ok(HttpResponse::Ok().json(json!({ "admin": AdminProfile::from(&admin) })))
}

/// PUT /api/admin/profile
pub async fn update_profile(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<UpdateAdminRequest>,
) -> ApiResult<HttpResponse> {
    let user = require_role(&req, Role::Admin)?;
    let mut payload = payload.into_inner();
    payload.name = payload.name.map(|n| n.trim().to_string());
    payload.email = payload.email.as_deref().map(normalize_email);
    payload.validate()?;

    if payload.name.is_none() && payload.email.is_none() && payload.password.is_none() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }
    if let Some(email) = &payload.email {
        if let Some(other) = data.store.find_admin_by_email(email).await? {
            if other.id != user.id {
                return Err(ApiError::Conflict("Email already in use".to_string()));
            }
        }
    }

    let password = match payload.password {
        Some(password) => Some(hash_password(password, data.config.bcrypt_cost).await?),
        None => None,
    };
    let changes = ProfileChanges {
        name: payload.name,
        email: payload.email,
        password,
    };

    let admin = data
        .store
        .update_admin_profile(&user.id, &changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("Admin not found".to_string()))?;
    info!("Admin profile updated: {}", admin.id);
    Ok(HttpResponse::Ok().json(json!({ "admin": AdminProfile::from(&admin) })))
}

/// GET /api/admin/students
pub async fn list_students(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    require_role(&req, Role::Admin)?;
    let students: Vec<StudentProfile> = data
        .store
        .list_students()
        .await?
        .iter()
        .map(StudentProfile::from)
        .collect();
    Ok(HttpResponse::Ok().json(json!({ "students": students })))
}
