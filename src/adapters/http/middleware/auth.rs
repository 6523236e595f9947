//! Bearer-token authentication middleware and extractor.
//!
//! The middleware validates `Authorization: Bearer <token>` through the
//! `AuthProvider` port and injects the resolved identity into request
//! extensions; `RequireAuth` handlers read it from there.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::ports::{AuthProvider, AuthenticatedUser};

/// Auth middleware state - the token resolver.
pub type AuthState = Arc<dyn AuthProvider>;

/// Validates the bearer token and injects [`AuthenticatedUser`].
///
/// Requests without an Authorization header pass through unauthenticated;
/// routes enforce authentication via [`RequireAuth`]. An invalid or
/// expired token is rejected here with 401.
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    match token {
        Some(token) => match auth.authenticate(token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(user);
                next.run(request).await
            }
            Ok(None) => unauthorized("Invalid or expired token"),
            Err(e) => {
                tracing::error!(error = %e, "Session lookup failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({
                        "code": "INTERNAL_ERROR",
                        "message": "Authentication backend unavailable",
                    })),
                )
                    .into_response()
            }
        },
        None => next.run(request).await,
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "code": "UNAUTHORIZED",
            "message": message,
        })),
    )
        .into_response()
}

/// Extractor that requires an authenticated user.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthenticatedUser);

impl<S> axum::extract::FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .cloned()
                .map(RequireAuth)
                .ok_or(AuthRejection)
        })
    }
}

/// Rejection for requests without a validated identity.
#[derive(Debug, Clone)]
pub struct AuthRejection;

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        unauthorized("Authentication required")
    }
}
