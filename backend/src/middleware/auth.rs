//! Authentication middleware
//!
//! Bearer tokens are issued by the external identity provider; this layer
//! only verifies them and exposes the caller's id and role to handlers.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::{ManagerRole, UserRole};

use crate::error::AppError;
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Hierarchy position of the caller, if they hold one
    pub fn manager_role(&self) -> Option<ManagerRole> {
        self.role.manager_role()
    }
}

/// Validates the bearer token and stores an [`AuthUser`] in the request
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        Some(token) => token,
        None => return unauthorized_response("Missing or invalid Authorization header"),
    };

    let claims = match decode_jwt(token, &state.config.jwt.secret) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };

    let role = match claims.role.parse::<UserRole>() {
        Ok(role) => role,
        Err(_) => return unauthorized_response("Unknown role in token"),
    };

    if claims.sub.trim().is_empty() {
        return unauthorized_response("Missing subject in token");
    }

    request.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
        role,
    });

    next.run(request).await
}

/// JWT claims structure
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

fn decode_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    use jsonwebtoken::{decode, DecodingKey, Validation};

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        AppError::InvalidToken
    })
}

fn unauthorized_response(message: &str) -> Response {
    AppError::Unauthorized(message.to_string()).into_response()
}

/// Extractor for authenticated user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| unauthorized_response("Authentication required"))
    }
}

/// Caller must hold the admin role
pub fn require_admin(user: &AuthUser) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::InsufficientPermissions)
    }
}

/// Caller must hold a position in the store hierarchy
pub fn require_manager(user: &AuthUser) -> Result<ManagerRole, AppError> {
    user.manager_role().ok_or(AppError::InsufficientPermissions)
}
