//! Bearer JWT 认证。

use crate::{
    error::{AppError, AppResult},
    handlers::AppState,
    models::{Report, ReportVisibility, Role},
};
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT 载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// 用户ID
    pub sub: Uuid,
    pub role: Role,
    pub institute_id: Option<Uuid>,
    /// 过期时间（Unix 秒）
    pub exp: i64,
}

/// 已认证的调用方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
    pub institute_id: Option<Uuid>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// 创建者或管理员可重新生成、删除报告
    pub fn can_manage(&self, report: &Report) -> bool {
        self.is_admin() || report.requested_by == self.user_id
    }

    pub fn visibility(&self) -> ReportVisibility {
        if self.is_admin() {
            ReportVisibility::All
        } else {
            ReportVisibility::Restricted {
                user_id: self.user_id,
                institute_id: self.institute_id,
            }
        }
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
            institute_id: claims.institute_id,
        }
    }
}

/// 签发令牌
pub fn encode_token(user: &AuthUser, secret: &str, ttl_secs: i64) -> AppResult<String> {
    let claims = Claims {
        sub: user.user_id,
        role: user.role,
        institute_id: user.institute_id,
        exp: Utc::now().timestamp() + ttl_secs,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("签发令牌失败: {}", e)))
}

/// 校验并解析令牌
pub fn decode_token(token: &str, secret: &str) -> AppResult<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| AppError::unauthorized(format!("invalid token: {}", e)))?;

    Ok(data.claims)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing bearer token"))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::unauthorized("missing bearer token"))?;

        let claims = decode_token(token, &state.config.auth.jwt_secret)?;
        Ok(claims.into())
    }
}
