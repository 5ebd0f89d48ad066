use crate::{
    auth::{
        jwt::{AuthError, generate_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::AppError,
    model::user::User,
    models::{LoginReqDto, MIN_PASSWORD_LEN, RegisterReq, UserSummary, required_field},
    utils::{db_utils::is_unique_violation, email_cache, email_filter},
};
use actix_web::{HttpResponse, web};
use serde::Serialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

/// Inserts a new user into the database and updates the Cuckoo filter
async fn insert_user(
    name: &str,
    email: &str,
    password: &str,
    pool: &MySqlPool,
) -> Result<u64, AppError> {
    let hashed = hash_password(password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        AppError::Internal("Failed to register user".into())
    })?;

    let result = sqlx::query(r#"INSERT INTO users (name, email, password) VALUES (?, ?, ?)"#)
        .bind(name)
        .bind(email)
        .bind(hashed)
        .execute(pool)
        .await;

    match result {
        Ok(done) => {
            // if insert succeeds, populate the filter and keep the cache warm.
            email_filter::insert(email);
            email_cache::mark_taken(email).await;
            Ok(done.last_insert_id())
        }
        Err(e) if is_unique_violation(&e) => Err(AppError::Conflict("Email already in use".into())),
        Err(e) => Err(AppError::from(e)),
    }
}

/// Ok(true)  => email AVAILABLE
/// Ok(false) => email TAKEN
///
/// A failed lookup is an error, never an answer: only a confirmed hit is
/// cached.
pub async fn is_email_available(email: &str, pool: &MySqlPool) -> Result<bool, AppError> {
    let email = email_filter::normalize(email);

    // 1️⃣ Cuckoo filter: fast negative
    // if filter says not exist then it is saying true, else it may exist or not.
    if !email_filter::might_exist(&email) {
        return Ok(true);
    }

    // 2️⃣ Moka cache: fast positive
    if email_cache::is_taken(&email).await {
        return Ok(false);
    }

    // 3️⃣ Database fallback
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? LIMIT 1)",
    )
    .bind(&email)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        error!(error = %e, "Email availability lookup failed");
        AppError::from(e)
    })?;

    if exists {
        email_cache::mark_taken(&email).await;
    }

    Ok(!exists)
}

fn validate_registration(req: &RegisterReq) -> Result<(String, String, String), AppError> {
    let name = required_field(&req.name);
    let email = required_field(&req.email);
    let password = req.password.as_deref().filter(|p| !p.is_empty());

    let (Some(name), Some(email), Some(password)) = (name, email, password) else {
        return Err(AppError::Validation(
            "Name, email and password are required".into(),
        ));
    };

    if !email.contains('@') {
        return Err(AppError::Validation("Invalid email address".into()));
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    Ok((name.to_string(), email_filter::normalize(email), password.to_string()))
}

/// User registration handler
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "User registered", body = Object, example = json!({
            "success": true,
            "message": "User registered successfully",
            "userId": 1
        })),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already in use"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(payload, pool))]
pub async fn register(
    payload: web::Json<RegisterReq>,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, AppError> {
    let (name, email, password) = validate_registration(&payload)?;

    if !is_email_available(&email, pool.get_ref()).await? {
        info!("Registration refused: email taken");
        return Err(AppError::Conflict("Email already in use".into()));
    }

    // Safe to insert after DB check; the unique key settles any race.
    let user_id = insert_user(&name, &email, &password, pool.get_ref()).await?;

    info!(user_id, "User registered");

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "User registered successfully",
        "userId": user_id
    })))
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    success: bool,
    message: String,
    token: String,
    user: UserSummary,
}

/// Exchange email and password for a bearer token
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Email and password are required"),
        (status = 401, description = "Invalid email or password")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(pool, config, payload))]
pub async fn login(
    payload: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");

    // 1️⃣ Basic validation
    let (Some(email), Some(password)) = (
        required_field(&payload.email),
        payload.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        info!("Validation failed: empty email or password");
        return Err(AppError::Validation(
            "Email and password are required".into(),
        ));
    };
    let email = email_filter::normalize(email);

    debug!("Fetching user from database");

    // 2️⃣ Fetch user
    let db_user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password, created_at, last_login_at
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(&email)
    .fetch_optional(pool.get_ref())
    .await?;

    let Some(db_user) = db_user else {
        info!("Invalid credentials: user not found");
        return Err(AppError::Unauthorized(AuthError::BadCredentials));
    };
    debug!(user_id = db_user.id, "User found");

    // 3️⃣ Verify password
    if let Err(e) = verify_password(password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(AppError::Unauthorized(AuthError::BadCredentials));
    }

    // 4️⃣ Generate token
    let token = generate_token(
        db_user.id,
        db_user.email.clone(),
        &config.jwt_secret,
        config.token_ttl,
    )
    .map_err(|e| {
        error!(error = %e, "Failed to sign token");
        AppError::Internal("Failed to sign token".into())
    })?;

    // 5️⃣ Update last_login_at (non-fatal)
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
        // intentionally not failing login
    }

    email_cache::mark_taken(&db_user.email).await;

    info!(user_id = db_user.id, "Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        success: true,
        message: "Login successful".into(),
        token,
        user: UserSummary {
            id: db_user.id,
            name: db_user.name,
            email: db_user.email,
        },
    }))
}
