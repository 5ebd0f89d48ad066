use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct RegisterReq {
    #[schema(example = "Taro Yamada")]
    pub name: Option<String>,
    #[schema(example = "taro@example.com", format = "email")]
    pub email: Option<String>,
    #[schema(example = "secret123")]
    pub password: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "taro@example.com", format = "email")]
    pub email: Option<String>,
    #[schema(example = "secret123")]
    pub password: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ProfileUpdateReq {
    pub name: Option<String>,
    #[schema(format = "email")]
    pub email: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChangeReq {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// Public part of a user, as returned by login and profile endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserSummary {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Taro Yamada")]
    pub name: String,
    #[schema(example = "taro@example.com")]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    /// Email the token was issued for.
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
}

/// Trims and rejects empty values.
pub fn required_field<'a>(value: &'a Option<String>) -> Option<&'a str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub const MIN_PASSWORD_LEN: usize = 6;
