use crate::auth::auth::AuthUser;
use crate::auth::jwt::{AuthError, authenticate};
use crate::config::Config;
use crate::error::AppError;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::{BoxBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let secret = req
        .app_data::<Data<Config>>()
        .map(|c| c.jwt_secret.clone())
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let header = req
        .headers()
        .get("Authorization")
        .map(|h| h.to_str().map(str::to_owned));

    let header = match header {
        Some(Ok(v)) => Some(v),
        Some(Err(_)) => {
            let resp = AppError::from(AuthError::Malformed).error_response();
            return Ok(req.into_response(resp));
        }
        None => None,
    };

    let user_id = match authenticate(header.as_deref(), &secret) {
        Ok(id) => id,
        Err(e) => {
            tracing::debug!(error = %e, path = %req.path(), "Rejected unauthenticated request");
            let resp = AppError::from(e).error_response();
            return Ok(req.into_response(resp));
        }
    };

    req.extensions_mut().insert(AuthUser { user_id });

    Ok(next.call(req).await?.map_into_boxed_body())
}
