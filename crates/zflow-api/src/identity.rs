use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

/// Profile returned by the OAuth provider's userinfo endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub picture: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange an OAuth access token for the signed-in user's profile.
    async fn fetch_profile(&self, access_token: &str) -> Result<Profile>;
}

pub struct GoogleIdentity {
    client: Client,
    userinfo_url: String,
}

impl GoogleIdentity {
    pub fn new(userinfo_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            client,
            userinfo_url: userinfo_url.into(),
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentity {
    async fn fetch_profile(&self, access_token: &str) -> Result<Profile> {
        let response = self
            .client
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .context("userinfo request failed")?;

        if !response.status().is_success() {
            bail!("userinfo returned HTTP {}", response.status());
        }

        let profile: Profile = response
            .json()
            .await
            .context("userinfo response is not a profile")?;
        if profile.email.trim().is_empty() {
            bail!("userinfo profile has no email");
        }
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::HeaderMap, http::StatusCode, routing::get};
    use serde_json::json;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/userinfo", addr)
    }

    #[tokio::test]
    async fn reads_profile_with_bearer_token() {
        let app = Router::new().route(
            "/userinfo",
            get(|headers: HeaderMap| async move {
                assert_eq!(headers["authorization"], "Bearer access-123");
                Json(json!({
                    "sub": "1234",
                    "name": "Ada",
                    "email": "ada@example.com",
                    "picture": "https://pic"
                }))
            }),
        );
        let identity = GoogleIdentity::new(serve(app).await).unwrap();

        let profile = identity.fetch_profile("access-123").await.unwrap();
        assert_eq!(
            profile,
            Profile {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                picture: "https://pic".into(),
            }
        );
    }

    #[tokio::test]
    async fn rejected_token_is_an_error() {
        let app = Router::new().route(
            "/userinfo",
            get(|| async { (StatusCode::UNAUTHORIZED, "invalid_token") }),
        );
        let identity = GoogleIdentity::new(serve(app).await).unwrap();

        let err = identity.fetch_profile("expired").await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn profile_without_email_is_an_error() {
        let app = Router::new()
            .route("/userinfo", get(|| async { Json(json!({ "name": "Ada" })) }));
        let identity = GoogleIdentity::new(serve(app).await).unwrap();
        let err = identity.fetch_profile("token").await.unwrap_err();
        assert!(err.to_string().contains("not a profile"));

        let app = Router::new().route(
            "/userinfo",
            get(|| async { Json(json!({ "name": "Ada", "email": "" })) }),
        );
        let identity = GoogleIdentity::new(serve(app).await).unwrap();
        let err = identity.fetch_profile("token").await.unwrap_err();
        assert!(err.to_string().contains("no email"));
    }
}
