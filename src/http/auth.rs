use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderName};

use crate::app::access::AccessService;
use crate::http::AppError;
use crate::AppState;

const X_AUTHORIZATION: HeaderName = HeaderName::from_static("x-authorization");

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub token: String,
}

/// Caller identity when a valid token is present; anonymous otherwise.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl MaybeAuthUser {
    pub fn user_id(&self) -> Option<i64> {
        self.0.as_ref().map(|auth| auth.user_id)
    }
}

#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user_id: i64,
}

/// `X-Authorization` wins over `Authorization`; a `Bearer ` prefix is optional.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers
        .get(X_AUTHORIZATION)
        .or_else(|| headers.get(header::AUTHORIZATION))
        .and_then(|value| value.to_str().ok())?
        .trim_start();
    let token = match raw.strip_prefix("Bearer") {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest,
        _ => raw,
    }
    .trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

fn resolve(parts: &Parts, state: &AppState) -> Option<AuthUser> {
    let token = bearer_token(&parts.headers)?;
    let user_id = state.tokens.resolve(token)?;
    Some(AuthUser {
        user_id,
        token: token.to_string(),
    })
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if bearer_token(&parts.headers).is_none() {
            return Err(AppError::unauthorized("missing authorization token"));
        }
        resolve(parts, state).ok_or_else(|| AppError::unauthorized("invalid token"))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(resolve(parts, state)))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;

        let is_admin = AccessService::new(state.db.clone())
            .is_admin(auth.user_id)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, user_id = auth.user_id, "failed to check admin role");
                AppError::internal("failed to check admin role")
            })?;

        if !is_admin {
            return Err(AppError::forbidden("admin access required"));
        }

        Ok(AdminUser {
            user_id: auth.user_id,
        })
    }
}
