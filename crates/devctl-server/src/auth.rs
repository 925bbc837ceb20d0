use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use devctl_core::auth::AuthContext;

use crate::error::failure;
use crate::state::AppState;

/// Axum middleware that resolves `Authorization: Bearer <token>` to an
/// [`AuthContext`] and applies the per-user rate limit.
///
/// 1. Missing header, wrong scheme, or unknown token → 401
/// 2. Bucket for the token's user is empty → 429
/// 3. Otherwise the context is inserted as a request extension
pub async fn auth_middleware(State(app): State<AppState>, mut req: Request, next: Next) -> Response {
    let Some(token) = bearer_token(&req) else {
        return failure(StatusCode::UNAUTHORIZED, "unauthorized");
    };
    let Some(entry) = app.gateway.config().token(token) else {
        return failure(StatusCode::UNAUTHORIZED, "unauthorized");
    };
    let ctx = AuthContext::new(entry.user.clone(), entry.capabilities.iter().copied());

    if !app.limiter.check(&ctx.user_id) {
        tracing::warn!(user = %ctx.user_id, "rate limit exceeded");
        return failure(StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded");
    }

    req.extensions_mut().insert(ctx);
    next.run(req).await
}

fn bearer_token(req: &Request) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
