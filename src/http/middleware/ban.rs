use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;

use crate::app::access::AccessService;
use crate::http::{AppError, MaybeAuthUser};
use crate::AppState;

/// Writes a suspended account may still make.
const ALLOWED_WHILE_BLOCKED: &[&str] = &[
    "/appeal",
    "/auth/logout",
    "/auth/login",
    "/auth/register",
    "/account/remove",
];

/// Rejects writes from suspended accounts with the suspension reason.
pub async fn blocked_account_middleware(
    State(state): State<AppState>,
    auth: MaybeAuthUser,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(user_id) = auth.user_id() else {
        return Ok(next.run(request).await);
    };
    if !is_gated(request.method(), request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let account = AccessService::new(state.db.clone())
        .account_state(user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id, "failed to check account status");
            AppError::internal("failed to check account status")
        })?;

    if let Some(account) = account {
        if account.is_blocked {
            let reason = if account.block_reason.is_empty() {
                "account is blocked".to_string()
            } else {
                format!("account is blocked: {}", account.block_reason)
            };
            return Err(AppError::forbidden(reason));
        }
    }

    Ok(next.run(request).await)
}

fn is_gated(method: &Method, path: &str) -> bool {
    method == Method::POST && !ALLOWED_WHILE_BLOCKED.contains(&path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_posts_are_gated() {
        assert!(is_gated(&Method::POST, "/posts"));
        assert!(!is_gated(&Method::GET, "/feed"));
    }

    #[test]
    fn appeal_and_account_exits_stay_open() {
        for path in ALLOWED_WHILE_BLOCKED {
            assert!(!is_gated(&Method::POST, path));
        }
    }
}
