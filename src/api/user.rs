use crate::{
    attendance::service::{self, UserStats},
    auth::{
        auth::AuthUser,
        jwt::AuthError,
        password::{hash_password, verify_password},
    },
    error::AppError,
    model::user::User,
    models::{MIN_PASSWORD_LEN, PasswordChangeReq, ProfileUpdateReq, UserSummary, required_field},
    store::AttendanceStore,
    utils::{db_utils::is_unique_violation, email_cache, email_filter},
};
use actix_web::{HttpResponse, web};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: u64,
    pub name: String,
    pub email: String,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

async fn fetch_user(pool: &MySqlPool, user_id: u64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password, created_at, last_login_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// Profile of the calling user
#[utoipa::path(
    get,
    path = "/api/user/profile",
    responses(
        (status = 200, description = "User profile", body = Object, example = json!({
            "user": {"id": 1, "name": "Taro Yamada", "email": "taro@example.com", "createdAt": "2026-01-01T00:00:00Z"}
        })),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "User"
)]
pub async fn get_profile(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, AppError> {
    let user = fetch_user(pool.get_ref(), auth.user_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "user": ProfileResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
        }
    })))
}

/// Update name and email
#[utoipa::path(
    put,
    path = "/api/user/profile",
    request_body = ProfileUpdateReq,
    responses(
        (status = 200, description = "Profile updated", body = Object, example = json!({
            "success": true,
            "message": "Profile updated successfully",
            "user": {"id": 1, "name": "Taro Yamada", "email": "taro@example.com"}
        })),
        (status = 400, description = "Name and email are required"),
        (status = 409, description = "Email already in use"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "User"
)]
#[instrument(name = "user_update_profile", skip(pool, payload), fields(user_id = auth.user_id))]
pub async fn update_profile(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<ProfileUpdateReq>,
) -> Result<HttpResponse, AppError> {
    let (Some(name), Some(email)) = (required_field(&payload.name), required_field(&payload.email))
    else {
        return Err(AppError::Validation("Name and email are required".into()));
    };
    if !email.contains('@') {
        return Err(AppError::Validation("Invalid email address".into()));
    }
    let email = email_filter::normalize(email);

    let current = fetch_user(pool.get_ref(), auth.user_id).await?;

    let taken = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? AND id != ?)",
    )
    .bind(&email)
    .bind(auth.user_id)
    .fetch_one(pool.get_ref())
    .await?;

    if taken {
        return Err(AppError::Conflict("Email already in use".into()));
    }

    sqlx::query("UPDATE users SET name = ?, email = ? WHERE id = ?")
        .bind(name)
        .bind(&email)
        .bind(auth.user_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::Conflict("Email already in use".into());
            }
            AppError::from(e)
        })?;

    if email_filter::normalize(&current.email) != email {
        email_filter::remove(&current.email);
        email_cache::forget(&current.email).await;
        email_filter::insert(&email);
        email_cache::mark_taken(&email).await;
    }

    info!("Profile updated");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Profile updated successfully",
        "user": UserSummary {
            id: auth.user_id,
            name: name.to_string(),
            email,
        }
    })))
}

/// Change password
#[utoipa::path(
    put,
    path = "/api/user/password",
    request_body = PasswordChangeReq,
    responses(
        (status = 200, description = "Password changed", body = Object, example = json!({
            "success": true,
            "message": "Password changed successfully"
        })),
        (status = 400, description = "Missing or too short password"),
        (status = 401, description = "Current password is incorrect")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "User"
)]
#[instrument(name = "user_change_password", skip(pool, payload), fields(user_id = auth.user_id))]
pub async fn change_password(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<PasswordChangeReq>,
) -> Result<HttpResponse, AppError> {
    let current = payload.current_password.as_deref().filter(|p| !p.is_empty());
    let new = payload.new_password.as_deref().filter(|p| !p.is_empty());
    let (Some(current), Some(new)) = (current, new) else {
        return Err(AppError::Validation(
            "Current and new password are required".into(),
        ));
    };

    if new.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let user = fetch_user(pool.get_ref(), auth.user_id).await?;

    if verify_password(current, &user.password).is_err() {
        info!("Password change refused: current password mismatch");
        return Err(AppError::Unauthorized(AuthError::WrongPassword));
    }

    let hashed = hash_password(new).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        AppError::Internal("Failed to hash password".into())
    })?;

    sqlx::query("UPDATE users SET password = ? WHERE id = ?")
        .bind(hashed)
        .bind(auth.user_id)
        .execute(pool.get_ref())
        .await?;

    info!("Password changed");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Password changed successfully"
    })))
}

/// Work statistics for this month, this week and all time
#[utoipa::path(
    get,
    path = "/api/user/stats",
    responses(
        (status = 200, description = "Attendance statistics", body = UserStats),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "User"
)]
pub async fn stats(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
) -> Result<HttpResponse, AppError> {
    let today = Local::now().date_naive();
    let stats = service::stats(store.get_ref(), auth.user_id, today).await?;
    Ok(HttpResponse::Ok().json(stats))
}
