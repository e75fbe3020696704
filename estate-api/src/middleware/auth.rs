use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use estate_core::{Caller, Role};

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// JWT Claims
// ============================================================================

/// Tokens are issued elsewhere; this service only verifies them.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CallerClaims {
    pub sub: String,
    /// `agent`, `vendor` or `client`.
    pub role: String,
    pub exp: usize,
}

impl CallerClaims {
    pub fn caller(&self) -> Result<Caller, AppError> {
        let role: Role = self
            .role
            .parse()
            .map_err(|_| AppError::AuthenticationError(format!("Unknown role in token: {}", self.role)))?;
        Ok(Caller::new(self.sub.clone(), role))
    }
}

// ============================================================================
// Authentication Middleware
// ============================================================================

/// Verifies the bearer token and hands the `Caller` to handlers through
/// request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::AuthenticationError("Missing bearer token".to_string()))?;

    let token_data = decode::<CallerClaims>(
        bearer.token(),
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("Rejected token: {}", e);
        AppError::AuthenticationError("Invalid token".to_string())
    })?;

    let caller = token_data.claims.caller()?;
    if token_data.claims.sub.trim().is_empty() {
        return Err(AppError::AuthenticationError("Token has no subject".to_string()));
    }

    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}
