use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SentryIssue {
    pub id: String,
    pub permalink: String,
    #[serde(default)]
    pub metadata: IssueMetadata,
    #[serde(rename = "shortId", default)]
    pub short_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub culprit: Option<String>,
}

/// Classification Sentry derives from the event, e.g. exception type and message.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IssueMetadata {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub value: String,
}

/// Response of `GET /api/0/`.
#[derive(Debug, Deserialize)]
pub struct SessionInfo {
    #[serde(default)]
    pub user: Option<SessionUser>,
}

#[derive(Debug, Deserialize)]
pub struct SessionUser {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_deserialization() {
        let json = r#"{
            "id": "482",
            "shortId": "WEB-1A",
            "title": "NullPointerException: boom",
            "permalink": "https://sentry.example.com/organizations/acme/issues/482/",
            "metadata": {"type": "NullPointerException", "value": "boom"},
            "status": "unresolved"
        }"#;

        let issue: SentryIssue = serde_json::from_str(json).unwrap();
        assert_eq!(issue.id, "482");
        assert_eq!(issue.metadata.kind, "NullPointerException");
        assert_eq!(issue.metadata.value, "boom");
        assert_eq!(issue.short_id.as_deref(), Some("WEB-1A"));
    }

    #[test]
    fn test_issue_without_exception_metadata() {
        let json = r#"{"id": "7", "permalink": "p", "metadata": {"title": "CSP violation"}}"#;

        let issue: SentryIssue = serde_json::from_str(json).unwrap();
        assert_eq!(issue.metadata.kind, "");
        assert_eq!(issue.metadata.value, "");
    }

    #[test]
    fn test_anonymous_session() {
        let info: SessionInfo = serde_json::from_str(r#"{"version": "0", "user": null}"#).unwrap();
        assert!(info.user.is_none());
    }
}
