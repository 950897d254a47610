use crate::OAuthConfig;
use anyhow::{Context, Result};

pub const BASE_URL: &str = "https://api.github.com";
pub const AUTH_URL: &str = "https://github.com/login/oauth/authorize";
pub const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
pub const SCOPES: &[&str] = &["repo", "read:user", "notifications"];

/// GitHub OAuth configuration.
///
/// Loads client ID and secret from environment variables:
/// - `FLUX_OAUTH_GITHUB_CLIENT_ID`
/// - `FLUX_OAUTH_GITHUB_CLIENT_SECRET`
#[derive(Debug)]
pub struct GitHubConfig {
    pub client_id: String,
    pub client_secret: String,
}

impl GitHubConfig {
    /// Load config from environment variables.
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("FLUX_OAUTH_GITHUB_CLIENT_ID")
            .context("FLUX_OAUTH_GITHUB_CLIENT_ID not set")?;
        let client_secret = std::env::var("FLUX_OAUTH_GITHUB_CLIENT_SECRET")
            .context("FLUX_OAUTH_GITHUB_CLIENT_SECRET not set")?;
        Ok(Self {
            client_id,
            client_secret,
        })
    }

    /// Returns the OAuthConfig for GitHub.
    pub fn oauth_config(&self) -> OAuthConfig {
        OAuthConfig {
            auth_url: AUTH_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}
