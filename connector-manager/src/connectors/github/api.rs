use anyhow::{anyhow, Context, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::config::BASE_URL;

/// GitHub repository.
#[derive(Debug, Deserialize)]
pub struct GitHubRepo {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub open_issues_count: u64,
    pub updated_at: String,
    pub private: bool,
}

/// Subject of a GitHub notification.
#[derive(Debug, Deserialize)]
pub struct NotificationSubject {
    pub title: String,
    #[serde(rename = "type")]
    pub subject_type: String,
    pub url: Option<String>,
}

/// GitHub notification.
#[derive(Debug, Deserialize)]
pub struct GitHubNotification {
    pub id: String,
    pub reason: String,
    pub unread: bool,
    pub updated_at: String,
    pub subject: NotificationSubject,
}

/// Author of a GitHub issue.
#[derive(Debug, Deserialize)]
pub struct IssueUser {
    pub login: String,
}

/// GitHub issue.
#[derive(Debug, Deserialize)]
pub struct GitHubIssue {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub state: String,
    pub user: IssueUser,
    pub created_at: String,
    pub updated_at: String,
}

/// HTTP client for the GitHub REST API.
///
/// Authenticates with a Bearer token and sets a User-Agent header.
pub struct GitHubClient {
    access_token: String,
    http_client: Client,
    base_url: String,
}

impl GitHubClient {
    /// Create a client using the default GitHub API base URL.
    pub fn new(access_token: String) -> Self {
        Self::with_base_url(access_token, BASE_URL.to_string())
    }

    /// Create a client with a custom base URL (for testing with a mock server).
    pub fn with_base_url(access_token: String, base_url: String) -> Self {
        let http_client = Client::builder()
            .user_agent("flux-connector/1.0")
            .build()
            .expect("Failed to build HTTP client");
        Self {
            access_token,
            http_client,
            base_url,
        }
    }

    /// Fetch the authenticated user's repositories (sorted by last updated).
    pub async fn fetch_repos(&self) -> Result<Vec<GitHubRepo>> {
        let url = format!("{}/user/repos?sort=updated&per_page=30", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .context("Failed to send fetch_repos request")?;

        check_response_status(&response)?;
        response
            .json::<Vec<GitHubRepo>>()
            .await
            .context("Failed to parse repos response")
    }

    /// Fetch the authenticated user's notifications.
    pub async fn fetch_notifications(&self) -> Result<Vec<GitHubNotification>> {
        let url = format!("{}/notifications?per_page=30", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .context("Failed to send fetch_notifications request")?;

        check_response_status(&response)?;
        response
            .json::<Vec<GitHubNotification>>()
            .await
            .context("Failed to parse notifications response")
    }

    /// Fetch open issues for a repository.
    pub async fn fetch_issues(&self, owner: &str, repo: &str) -> Result<Vec<GitHubIssue>> {
        let url = format!(
            "{}/repos/{}/{}/issues?state=open&per_page=10",
            self.base_url, owner, repo
        );
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .context("Failed to send fetch_issues request")?;

        check_response_status(&response)?;
        response
            .json::<Vec<GitHubIssue>>()
            .await
            .context("Failed to parse issues response")
    }
}

/// Check the response status and map known error codes to descriptive errors.
///
/// - 401 → auth error (token expired or invalid)
/// - 403 → rate limit (logs X-RateLimit-Remaining)
/// - Other non-2xx → generic API error
fn check_response_status(response: &reqwest::Response) -> Result<()> {
    match response.status() {
        StatusCode::UNAUTHORIZED => Err(anyhow!("GitHub auth error: token expired or invalid")),
        StatusCode::FORBIDDEN => {
            let remaining = response
                .headers()
                .get("X-RateLimit-Remaining")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0);
            Err(anyhow!(
                "GitHub rate limit exceeded (X-RateLimit-Remaining: {})",
                remaining
            ))
        }
        s if !s.is_success() => Err(anyhow!("GitHub API error: {}", s)),
        _ => Ok(()),
    }
}
