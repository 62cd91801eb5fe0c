//! Student accounts, profile and mood tracking: `/api/student`.

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
use crate::models::student::{Mood, Student, StudentProfile, UpdateMoodRequest, UpdateStudentRequest};
use crate::models::user::Role;

async fn current_student(req: &HttpRequest, data: &AppState) -> ApiResult<Student> {
    let user = require_role(req, Role::Student)?;
    data.store
        .find_student_by_id(&user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))
}

/// POST /api/student/auth/register
pub async fn register(
    data: web::Data<AppState>,
    payload: web::Json<RegisterAccountRequest>,
) -> ApiResult<HttpResponse> {
    let mut payload = payload.into_inner();
    payload.name = payload.name.trim().to_string();
    payload.email = normalize_email(&payload.email);
    payload.validate()?;

    if data.store.find_student_by_email(&payload.email).await?.is_some() {
        return Err(ApiError::Conflict("Student already exists".to_string()));
    }

    let now = Utc::now();
    let student = Student {
        id: Uuid::new_v4().to_string(),
        name: payload.name,
        email: payload.email,
        password: hash_password(payload.password, data.config.bcrypt_cost).await?,
        mood: None,
        created_at: now,
        updated_at: now,
    };
    data.store.insert_student(&student).await?;
    info!("Student registered: {}", student.id);

    let token = issue_token(&data.config, &student.id, Role::Student)?;
    Ok(HttpResponse::Created().json(json!({
        "token": token,
        "student": StudentProfile::from(&student),
    })))
}

/// POST /api/student/auth/login
pub async fn login(
    data: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let mut payload = payload.into_inner();
    payload.email = normalize_email(&payload.email);
    payload.validate()?;

    let student = data
        .store
        .find_student_by_email(&payload.email)
        .await?
        .ok_or_else(invalid_credentials)?;
    check_password(payload.password, student.password.clone()).await?;

    let token = issue_token(&data.config, &student.id, Role::Student)?;
    Ok(HttpResponse::Ok().json(json!({
        "token": token,
        "student": StudentProfile::from(&student),
    })))
}

/// GET /api/student/profile
pub async fn get_profile(req: HttpRequest, data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let student = current_student(&req, &data).await?;
    Ok(HttpResponse::Ok().json(json!({ "student": StudentProfile::from(&student) })))
}

/// PUT /api/student/profile
pub async fn update_profile(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<UpdateStudentRequest>,
) -> ApiResult<HttpResponse> {
    let user = require_role(&req, Role::Student)?;
    let mut payload = payload.into_inner();
    payload.name = payload.name.map(|n| n.trim().to_string());
    payload.email = payload.email.as_deref().map(normalize_email);
    payload.validate()?;

    let changes = ProfileChanges {
        name: payload.name,
        email: payload.email,
        password: None,
    };
    if changes.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }
    if let Some(email) = &changes.email {
        if let Some(other) = data.store.find_student_by_email(email).await? {
            if other.id != user.id {
                return Err(ApiError::Conflict("Email already in use".to_string()));
            }
        }
    }

    let student = data
        .store
        .update_student_profile(&user.id, &changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;
    info!("Student profile updated: {}", student.id);
    Ok(HttpResponse::Ok().json(json!({ "student": StudentProfile::from(&student) })))
}

/// GET /api/student/mood
pub async fn get_mood(req: HttpRequest, data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let student = current_student(&req, &data).await?;
    Ok(HttpResponse::Ok().json(json!({ "mood": student.mood })))
}

/// PUT /api/student/mood
/// Replaces the previous mood entirely.
pub async fn update_mood(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<UpdateMoodRequest>,
) -> ApiResult<HttpResponse> {
    let user = require_role(&req, Role::Student)?;
    let mood = Mood {
        status: payload.status,
        frequency: payload.frequency,
        last_recorded: Utc::now(),
    };

    let student = data
        .store
        .set_student_mood(&user.id, &mood)
        .await?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;
    info!("Mood recorded for student {}", student.id);
    Ok(HttpResponse::Ok().json(json!({ "mood": student.mood })))
}
