use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::Serialize;
use std::time::Duration;

use super::credentials::{CookieJar, CsrfTokenSource};
use super::{request_json, IssueTracker, DEFAULT_TIMEOUT};
use crate::models::issue::{SentryIssue, SessionInfo};

const API_PATH: &str = "/api/0";
const CSRF_HEADER: &str = "X-CSRFToken";

/// An issue page URL split into the parts the client needs.
#[derive(Debug, Clone)]
pub struct IssuePage {
    pub url: String,
    pub origin: String,
    pub path: String,
}

impl IssuePage {
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw.trim()).with_context(|| format!("'{}' is not a valid URL", raw))?;
        if !url.has_host() {
            anyhow::bail!("'{}' has no host", raw);
        }

        Ok(Self {
            url: url.to_string(),
            origin: url.origin().ascii_serialization(),
            path: url.path().to_string(),
        })
    }

    pub fn issue_id(&self) -> Option<String> {
        issue_id_from_path(&self.path)
    }
}

/// Issue id of an issue details path like `/<org>/<project>/issues/<id>/...`.
pub fn issue_id_from_path(path: &str) -> Option<String> {
    let components: Vec<&str> = path.split('/').collect();
    if components.len() < 5 || components[3] != "issues" {
        return None;
    }

    let candidate = components[4];
    match candidate.parse::<u64>() {
        Ok(id) if id > 0 => Some(candidate.to_string()),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
struct AssignPayload<'a> {
    #[serde(rename = "assignedTo")]
    assigned_to: &'a str,
}

#[derive(Debug, Serialize)]
struct CommentPayload {
    text: String,
}

pub struct SentryClient {
    client: Client,
    api_base: String,
    cookies: CookieJar,
    csrf: Box<dyn CsrfTokenSource>,
    auth_token: Option<String>,
    timeout: Duration,
}

impl SentryClient {
    pub fn new(origin: &str, session_cookie: Option<String>, auth_token: Option<String>) -> Self {
        let cookies = CookieJar::new(session_cookie.unwrap_or_default());
        Self {
            client: Client::new(),
            api_base: format!("{}{}", origin.trim_end_matches('/'), API_PATH),
            csrf: Box::new(cookies.clone()),
            cookies,
            auth_token: auth_token.filter(|token| !token.is_empty()),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[cfg(test)]
    pub fn with_csrf_source(mut self, csrf: Box<dyn CsrfTokenSource>) -> Self {
        self.csrf = csrf;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn issue_url(&self, issue_id: &str) -> String {
        format!("{}/issues/{}/", self.api_base, issue_id)
    }

    fn authorize(&self, mut request: RequestBuilder) -> RequestBuilder {
        if let Some(cookie) = self.cookies.header() {
            request = request.header(reqwest::header::COOKIE, cookie);
        }
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        request
    }

    fn with_optional_csrf(&self, request: RequestBuilder) -> RequestBuilder {
        match self.csrf.csrf_token() {
            Some(token) => request.header(CSRF_HEADER, token),
            None => request,
        }
    }

    /// Attaches the CSRF header. Session auth cannot assign without it.
    fn with_csrf(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        if self.auth_token.is_none() && self.csrf.csrf_token().is_none() {
            anyhow::bail!("CSRF token is missing: the session cookie has no 'sc' entry");
        }
        Ok(self.with_optional_csrf(request))
    }
}

#[async_trait]
impl IssueTracker for SentryClient {
    async fn get_issue(&self, issue_id: &str) -> Result<SentryIssue> {
        let url = self.issue_url(issue_id);
        tracing::debug!(%url, "GET issue");

        request_json(self.authorize(self.client.get(&url)), self.timeout, "fetch issue").await
    }

    async fn get_current_user_id(&self) -> Result<String> {
        let url = format!("{}/", self.api_base);
        tracing::debug!(%url, "GET session");

        let info: SessionInfo =
            request_json(self.authorize(self.client.get(&url)), self.timeout, "fetch session").await?;

        info.user
            .map(|user| user.id)
            .context("Not logged in: Sentry returned no user for this session")
    }

    async fn set_issue_owner(&self, user_id: &str, issue_id: &str) -> Result<()> {
        let url = self.issue_url(issue_id);
        tracing::debug!(%url, user_id, "PUT issue owner");

        let request = self
            .authorize(self.client.put(&url))
            .json(&AssignPayload { assigned_to: user_id });
        let _: serde_json::Value =
            request_json(self.with_csrf(request)?, self.timeout, "assign issue").await?;

        Ok(())
    }

    async fn add_comment_with_url(&self, url: &str, issue_id: &str) -> Result<()> {
        let endpoint = format!("{}comments/", self.issue_url(issue_id));
        tracing::debug!(url = %endpoint, "POST issue comment");

        let payload = CommentPayload {
            text: format!("[The related defect in VersionOne]({})", url),
        };
        let request = self.authorize(self.client.post(&endpoint)).json(&payload);
        let _: serde_json::Value =
            request_json(self.with_optional_csrf(request), self.timeout, "post comment").await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    struct FixedToken(Option<&'static str>);

    impl CsrfTokenSource for FixedToken {
        fn csrf_token(&self) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    #[test]
    fn test_issue_id_from_path() {
        assert_eq!(issue_id_from_path("/org/project/issues/482/").as_deref(), Some("482"));
        assert_eq!(
            issue_id_from_path("/organizations/acme/issues/482/events/latest/").as_deref(),
            Some("482")
        );
        assert_eq!(issue_id_from_path("/org/project/issues/0/"), None);
        assert_eq!(issue_id_from_path("/org/project/releases/482/"), None);
        assert_eq!(issue_id_from_path("/org/project/issues/"), None);
        assert_eq!(issue_id_from_path("/org/project/issues/abc/"), None);
        assert_eq!(issue_id_from_path("/org/project/issues/-3/"), None);
    }

    #[test]
    fn test_issue_page_parse() {
        let page = IssuePage::parse("https://sentry.example.com/organizations/acme/issues/482/?project=2").unwrap();
        assert_eq!(page.origin, "https://sentry.example.com");
        assert_eq!(page.path, "/organizations/acme/issues/482/");
        assert_eq!(page.issue_id().as_deref(), Some("482"));

        assert!(IssuePage::parse("not a url").is_err());
    }

    #[test]
    fn test_api_base() {
        let client = SentryClient::new("https://sentry.example.com/", None, None);
        assert_eq!(client.api_base, "https://sentry.example.com/api/0");
        assert_eq!(
            client.issue_url("7"),
            "https://sentry.example.com/api/0/issues/7/"
        );
    }

    #[tokio::test]
    async fn test_get_issue() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/0/issues/482/")
            .match_header("cookie", "sc=tok; sentrysessionid=s1")
            .with_status(200)
            .with_body(
                r#"{"id": "482", "permalink": "https://s.example.com/i/482/",
                    "metadata": {"type": "TypeError", "value": "x is undefined"}}"#,
            )
            .create_async()
            .await;

        let client = SentryClient::new(&server.url(), Some("sc=tok; sentrysessionid=s1".to_string()), None);
        let issue = client.get_issue("482").await.unwrap();

        mock.assert_async().await;
        assert_eq!(issue.id, "482");
        assert_eq!(issue.metadata.kind, "TypeError");
    }

    #[tokio::test]
    async fn test_get_issue_surfaces_status_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/0/issues/9/")
            .with_status(404)
            .with_body(r#"{"detail": "The requested resource does not exist"}"#)
            .create_async()
            .await;

        let client = SentryClient::new(&server.url(), None, None);
        let err = client.get_issue("9").await.unwrap_err();

        assert_eq!(err.to_string(), "Not Found");
    }

    #[tokio::test]
    async fn test_get_current_user_id() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/0/")
            .with_status(200)
            .with_body(r#"{"version": "0", "user": {"id": "31", "name": "Dev"}}"#)
            .create_async()
            .await;

        let client = SentryClient::new(&server.url(), None, None);
        assert_eq!(client.get_current_user_id().await.unwrap(), "31");
    }

    #[tokio::test]
    async fn test_get_current_user_id_anonymous() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/0/")
            .with_status(200)
            .with_body(r#"{"version": "0", "user": null}"#)
            .create_async()
            .await;

        let client = SentryClient::new(&server.url(), None, None);
        assert!(client.get_current_user_id().await.is_err());
    }

    #[tokio::test]
    async fn test_set_issue_owner_sends_csrf_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/api/0/issues/482/")
            .match_header("x-csrftoken", "tok")
            .match_body(Matcher::Json(serde_json::json!({"assignedTo": "31"})))
            .with_status(200)
            .with_body(r#"{"id": "482"}"#)
            .create_async()
            .await;

        let client = SentryClient::new(&server.url(), None, None)
            .with_csrf_source(Box::new(FixedToken(Some("tok"))));
        client.set_issue_owner("31", "482").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_set_issue_owner_without_csrf_token() {
        let server = mockito::Server::new_async().await;

        let client = SentryClient::new(&server.url(), Some("sentrysessionid=s1".to_string()), None);
        let err = client.set_issue_owner("31", "482").await.unwrap_err();

        assert!(err.to_string().contains("CSRF token is missing"));
    }

    #[tokio::test]
    async fn test_api_token_does_not_need_csrf() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/api/0/issues/482/")
            .match_header("authorization", "Bearer sntrys_abc")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = SentryClient::new(&server.url(), None, Some("sntrys_abc".to_string()));
        client.set_issue_owner("31", "482").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_add_comment_with_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/0/issues/482/comments/")
            .match_header("x-csrftoken", "tok")
            .match_body(Matcher::Json(serde_json::json!({
                "text": "[The related defect in VersionOne](https://v1.example.com/assetdetail.v1?oid=Defect:1)"
            })))
            .with_status(201)
            .with_body(r#"{"id": "c1"}"#)
            .create_async()
            .await;

        let client = SentryClient::new(&server.url(), Some("sc=tok".to_string()), None);
        client
            .add_comment_with_url("https://v1.example.com/assetdetail.v1?oid=Defect:1", "482")
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_add_comment_without_csrf_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/0/issues/482/comments/")
            .match_header("x-csrftoken", Matcher::Missing)
            .match_header("cookie", "sentrysessionid=s1")
            .with_status(201)
            .with_body(r#"{"id": "c2"}"#)
            .create_async()
            .await;

        let client = SentryClient::new(&server.url(), Some("sentrysessionid=s1".to_string()), None);
        client
            .add_comment_with_url("https://v1.example.com/assetdetail.v1?oid=Defect:1", "482")
            .await
            .unwrap();

        mock.assert_async().await;
    }
}
