use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::warn;

use zflow_types::api::Claims;
use zflow_types::models::User;

use crate::{ApiError, AppState};

/// The signed-in user, attached to the request by [`require_auth`].
#[derive(Debug, Clone)]
pub struct SessionUser(pub User);

/// Validate the session JWT, then confirm the user still exists.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(ApiError::Unauthorized)?;

    let claims = decode_token(&state.jwt_secret, bearer.token())?;

    let email = claims.email.clone();
    let user = match state.db_call(move |db| db.get_user_by_email(&email)).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(ApiError::SessionExpired),
        Err(e) => {
            warn!("Session lookup for {} failed: {}", claims.email, e);
            return Err(ApiError::AuthFailed);
        }
    };

    req.extensions_mut().insert(SessionUser(user));
    Ok(next.run(req).await)
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized)
}
