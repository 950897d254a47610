use chrono::Utc;
use flux::FluxEvent;
use uuid::Uuid;

use super::api::{GitHubIssue, GitHubNotification, GitHubRepo};

/// Transform a GitHub repository into a Flux event.
///
/// Entity key: `github/repo/{full_name}`
pub fn repo_to_event(repo: &GitHubRepo) -> FluxEvent {
    FluxEvent {
        event_id: Some(Uuid::now_v7().to_string()),
        stream: "connectors".to_string(),
        source: "connector-manager".to_string(),
        timestamp: Utc::now().timestamp_millis(),
        key: Some(format!("github/repo/{}", repo.full_name)),
        schema: Some("github.repository".to_string()),
        payload: serde_json::json!({
            "entity_id": format!("github/repo/{}", repo.full_name),
            "properties": {
                "name": repo.name,
                "full_name": repo.full_name,
                "description": repo.description,
                "language": repo.language,
                "stars": repo.stargazers_count,
                "forks": repo.forks_count,
                "open_issues": repo.open_issues_count,
                "private": repo.private,
                "updated_at": repo.updated_at,
            }
        }),
    }
}

/// Transform a GitHub notification into a Flux event.
///
/// Entity key: `github/notification/{id}`
pub fn notification_to_event(notification: &GitHubNotification) -> FluxEvent {
    FluxEvent {
        event_id: Some(Uuid::now_v7().to_string()),
        stream: "connectors".to_string(),
        source: "connector-manager".to_string(),
        timestamp: Utc::now().timestamp_millis(),
        key: Some(format!("github/notification/{}", notification.id)),
        schema: Some("github.notification".to_string()),
        payload: serde_json::json!({
            "entity_id": format!("github/notification/{}", notification.id),
            "properties": {
                "id": notification.id,
                "reason": notification.reason,
                "unread": notification.unread,
                "updated_at": notification.updated_at,
                "subject_title": notification.subject.title,
                "subject_type": notification.subject.subject_type,
                "subject_url": notification.subject.url,
            }
        }),
    }
}

/// Transform a GitHub issue into a Flux event.
///
/// Entity key: `github/issue/{owner}/{repo}/{number}`
pub fn issue_to_event(owner: &str, repo: &str, issue: &GitHubIssue) -> FluxEvent {
    FluxEvent {
        event_id: Some(Uuid::now_v7().to_string()),
        stream: "connectors".to_string(),
        source: "connector-manager".to_string(),
        timestamp: Utc::now().timestamp_millis(),
        key: Some(format!("github/issue/{}/{}/{}", owner, repo, issue.number)),
        schema: Some("github.issue".to_string()),
        payload: serde_json::json!({
            "entity_id": format!("github/issue/{}/{}/{}", owner, repo, issue.number),
            "properties": {
                "number": issue.number,
                "title": issue.title,
                "state": issue.state,
                "author": issue.user.login,
                "created_at": issue.created_at,
                "updated_at": issue.updated_at,
            }
        }),
    }
}
