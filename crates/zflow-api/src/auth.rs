use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};
use uuid::Uuid;

use zflow_types::api::{Claims, GoogleSignInRequest, SignInResponse};
use zflow_types::models::User;

use crate::middleware::SessionUser;
use crate::{ApiError, AppState};

/// Exchange a Google access token for a session, creating the user on first
/// sign-in.
pub async fn google_sign_in(
    State(state): State<AppState>,
    payload: Result<Json<GoogleSignInRequest>, JsonRejection>,
) -> Result<Json<SignInResponse>, ApiError> {
    let Json(req) = payload?;

    let profile = state
        .identity
        .fetch_profile(&req.access_token)
        .await
        .map_err(|e| {
            warn!("Google sign-in failed: {:#}", e);
            ApiError::Upstream {
                context: "Failed to sign in",
                details: e.to_string(),
            }
        })?;

    if profile.email.trim().is_empty() {
        return Err(ApiError::InvalidInput("Identity provider returned no email".into()));
    }

    let email = profile.email.clone();
    let user = state
        .db_call(move |db| {
            let id = db.create_user(
                &Uuid::new_v4().to_string(),
                &profile.name,
                &profile.email,
                &profile.picture,
                &Uuid::new_v4().to_string(),
            )?;
            db.get_user_by_id(&id)
        })
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    let token = create_token(&state.jwt_secret, &user).map_err(ApiError::Persistence)?;
    info!("User {} signed in", email);

    Ok(Json(SignInResponse { user, token }))
}

/// The current session's user. Reaching this handler means the session gate
/// accepted the token and found the account.
pub async fn session(Extension(SessionUser(user)): Extension<SessionUser>) -> Json<User> {
    Json(user)
}

pub fn create_token(secret: &str, user: &User) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user.id.clone(),
        email: user.email.clone(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
