//! # JWT 인증 추출자
//!
//! `Authorization: Bearer <token>` 헤더를 검증해서 호출자(`AuthUser`)를 꺼냅니다.
//! 토큰 발급은 이 서비스의 일이 아니며, 여기서는 서명과 만료만 검증합니다.
//!
//! ## 사용법
//! - 인증 필수: 핸들러 인자에 `auth: AuthUser` → 토큰이 없거나 틀리면 401
//! - 인증 선택: `auth: Result<AuthUser, AuthError>` → 거절 대신 에러 값을 받음
//! - 관리자 전용: `auth.require_admin()?` → ADMIN이 아니면 403

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AppError;
use crate::models::Role;
use crate::routes::AppState;

/// 토큰에 실린 클레임
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user id (숫자 문자열)
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

/// 인증된 호출자
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
    pub role: Role,
}

impl AuthUser {
    /// ADMIN이 아니면 `Forbidden`.
    pub fn require_admin(&self) -> Result<(), AppError> {
        match self.role {
            Role::Admin => Ok(()),
            Role::User => Err(AppError::Forbidden(
                "administrator role is required".to_string(),
            )),
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::MissingToken)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidToken)?;

        let claims = verify_access_token(token, &state.jwt_secret)?;
        // sub가 숫자가 아니면 이 서비스가 알 수 있는 사용자가 아닙니다.
        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AuthError::InvalidToken)?;

        Ok(AuthUser {
            user_id,
            role: claims.role,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    ExpiredToken,
}

impl AuthError {
    fn parts(self) -> (&'static str, &'static str) {
        match self {
            AuthError::MissingToken => ("missing_token", "Authorization token is required"),
            AuthError::InvalidToken => ("invalid_token", "Invalid authorization token"),
            AuthError::ExpiredToken => ("expired_token", "Authorization token has expired"),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (code, message) = self.parts();
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

/// 선택 인증 경로(`Result<AuthUser, AuthError>`)에서 뒤늦게 인증이 필요해졌을 때
/// `?`로 바로 401을 돌려주기 위한 변환입니다.
impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Unauthorized(err.parts().1.to_string())
    }
}

/// 서명과 만료(`exp`)를 검증하고 클레임을 돌려줍니다.
pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// 테스트용 토큰 발급. 실제 발급은 외부 인증 서버가 합니다.
#[cfg(test)]
pub fn create_access_token(user_id: i64, role: Role, secret: &str) -> String {
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        role,
        iat: now.timestamp(),
        exp: (now + Duration::minutes(15)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("encode test token")
}
