use crate::{auth::jwt::authenticate, config::Config, error::AppError};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

/// The caller behind the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: u64,
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Already resolved by `auth_middleware` for protected scopes.
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(*user));
        }

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => return ready(Err(AppError::Internal("Config missing".into()))),
        };

        let header = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok());

        ready(
            authenticate(header, &config.jwt_secret)
                .map(|user_id| AuthUser { user_id })
                .map_err(AppError::from),
        )
    }
}
