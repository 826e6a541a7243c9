use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;

use super::{request_json, DefectTracker, DEFAULT_TIMEOUT};
use crate::config::fields::Field;
use crate::models::asset::{AssetOption, QueryResponse, QuerySpec, ReferenceLists};
use crate::models::defect::{CreateAssetResponse, DefectDraft, DefectPayload};

const BULK_API_PATH: &str = "/api/asset";
const ASSET_DETAILS_PATH: &str = "/assetdetail.v1";

/// The queries sent for the preferences form, paired with the field each
/// result set feeds. Results come back in this order.
fn reference_queries() -> [(Field, QuerySpec); 8] {
    [
        (Field::Project, QuerySpec::active("Scope", &["Parent.ID", "Order"])),
        (Field::BacklogGroup, QuerySpec::active("Theme", &["Scope.ID", "Order"])),
        (Field::Environment, QuerySpec::active("Custom_Environment", &["Order"])),
        (Field::Priority, QuerySpec::active("WorkitemPriority", &["Order"])),
        (Field::Source, QuerySpec::active("StorySource", &["Order"])),
        (Field::Status, QuerySpec::active("StoryStatus", &["Order"])),
        (Field::Team, QuerySpec::active("Team", &["Name"])),
        (Field::Epic, QuerySpec::active("Epic", &["Name"])),
    ]
}

pub struct VersionOneClient {
    client: Client,
    base_url: String,
    access_token: Option<String>,
    timeout: Duration,
}

impl VersionOneClient {
    pub fn new(base_url: String, access_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.filter(|token| !token.is_empty()),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn bulk_request(&self) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, BULK_API_PATH);
        tracing::debug!(%url, "POST bulk query");

        let request = self.client.post(url);
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Maps positional result sets onto their fields.
fn group_reference_lists(response: QueryResponse) -> Result<ReferenceLists> {
    let queries = reference_queries();
    let results = response.query_result.results;
    if results.len() < queries.len() {
        anyhow::bail!(
            "Expected {} result sets from VersionOne, got {}",
            queries.len(),
            results.len()
        );
    }

    Ok(queries
        .into_iter()
        .zip(results)
        .map(|((field, _), rows)| (field, rows.into_iter().map(AssetOption::from).collect()))
        .collect())
}

#[async_trait]
impl DefectTracker for VersionOneClient {
    async fn get_reference_lists(&self) -> Result<ReferenceLists> {
        let queries: Vec<QuerySpec> = reference_queries()
            .into_iter()
            .map(|(_, spec)| spec)
            .collect();

        let response: QueryResponse = request_json(
            self.bulk_request().json(&queries),
            self.timeout,
            "query VersionOne assets",
        )
        .await?;

        group_reference_lists(response).context("Unexpected bulk query response")
    }

    async fn create_defect(&self, draft: &DefectDraft) -> Result<String> {
        let response: CreateAssetResponse = request_json(
            self.bulk_request().json(&DefectPayload::from(draft)),
            self.timeout,
            "create VersionOne defect",
        )
        .await?;

        response.into_created_oid()
    }

    fn defect_url(&self, oid: &str) -> String {
        format!("{}{}?oid={}", self.base_url, ASSET_DETAILS_PATH, oid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn rows(prefix: &str) -> serde_json::Value {
        serde_json::json!([
            {"Name": format!("{} A", prefix), "_oid": format!("{}:1", prefix)},
            {"Name": format!("{} B", prefix), "_oid": format!("{}:2", prefix)}
        ])
    }

    fn draft() -> DefectDraft {
        DefectDraft {
            name: "[Sentry] boom".to_string(),
            description: "desc".to_string(),
            deployment_instructions: "deploy".to_string(),
            backlog_group: "Theme:10".to_string(),
            environment: "Custom_Environment:11".to_string(),
            epic: "Epic:12".to_string(),
            priority: "WorkitemPriority:137".to_string(),
            project: "Scope:14".to_string(),
            source: "StorySource:15".to_string(),
            status: "StoryStatus:16".to_string(),
            team: "Team:17".to_string(),
        }
    }

    #[test]
    fn test_defect_url() {
        let client = VersionOneClient::new("https://v1.example.com/Acme/".to_string(), None);
        assert_eq!(
            client.defect_url("Defect:9001"),
            "https://v1.example.com/Acme/assetdetail.v1?oid=Defect:9001"
        );
    }

    #[tokio::test]
    async fn test_reference_lists_map_positionally() {
        let mut server = mockito::Server::new_async().await;
        let order = [
            "Scope", "Theme", "Env", "Priority", "Source", "Status", "Team", "Epic",
        ];
        let results: Vec<serde_json::Value> = order.iter().map(|p| rows(p)).collect();
        let mock = server
            .mock("POST", "/Acme/api/asset")
            .match_body(Matcher::PartialJson(serde_json::json!([
                {"from": "Scope", "where": {"AssetState": "64"}, "sort": ["Parent.ID", "Order"]},
                {"from": "Theme", "sort": ["Scope.ID", "Order"]},
                {"from": "Custom_Environment"},
                {"from": "WorkitemPriority"},
                {"from": "StorySource"},
                {"from": "StoryStatus"},
                {"from": "Team", "sort": ["Name"]},
                {"from": "Epic", "sort": ["Name"]}
            ])))
            .with_status(200)
            .with_body(serde_json::json!({"queryResult": {"results": results}}).to_string())
            .create_async()
            .await;

        let client = VersionOneClient::new(format!("{}/Acme", server.url()), None);
        let lists = client.get_reference_lists().await.unwrap();

        mock.assert_async().await;
        let expected = [
            (Field::Project, "Scope"),
            (Field::BacklogGroup, "Theme"),
            (Field::Environment, "Env"),
            (Field::Priority, "Priority"),
            (Field::Source, "Source"),
            (Field::Status, "Status"),
            (Field::Team, "Team"),
            (Field::Epic, "Epic"),
        ];
        for (field, prefix) in expected {
            let options = &lists[&field];
            assert_eq!(options.len(), 2);
            assert_eq!(options[0].to_string(), format!("{} A |@| {}:1", prefix, prefix));
        }
    }

    #[tokio::test]
    async fn test_reference_lists_too_few_results() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/asset")
            .with_status(200)
            .with_body(r#"{"queryResult": {"results": [[], []]}}"#)
            .create_async()
            .await;

        let client = VersionOneClient::new(server.url(), None);
        let err = client.get_reference_lists().await.unwrap_err();

        assert!(format!("{:#}", err).contains("Expected 8 result sets"));
    }

    #[tokio::test]
    async fn test_create_defect() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/asset")
            .match_header("authorization", "Bearer 1.secret")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "AssetType": "Defect",
                "Name": "[Sentry] boom",
                "Scope": "Scope:14",
                "Owners": {"from": "Member", "where": {"IsSelf": true}}
            })))
            .with_status(200)
            .with_body(
                r#"{"commandFailures": {"count": 0, "commands": []},
                    "assetsCreated": {"oidTokens": ["Defect:9001"], "count": 1}}"#,
            )
            .create_async()
            .await;

        let client = VersionOneClient::new(server.url(), Some("1.secret".to_string()));
        let oid = client.create_defect(&draft()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(oid, "Defect:9001");
    }

    #[tokio::test]
    async fn test_create_defect_command_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/asset")
            .with_status(200)
            .with_body(
                r#"{"commandFailures": {"count": 1, "commands": [{"error": {"message": "Scope is closed"}}]},
                    "assetsCreated": {"oidTokens": [], "count": 0}}"#,
            )
            .create_async()
            .await;

        let client = VersionOneClient::new(server.url(), None);
        let err = client.create_defect(&draft()).await.unwrap_err();

        assert_eq!(err.to_string(), "Scope is closed");
    }

    #[tokio::test]
    async fn test_create_defect_http_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/asset")
            .with_status(401)
            .create_async()
            .await;

        let client = VersionOneClient::new(server.url(), None);
        let err = client.create_defect(&draft()).await.unwrap_err();

        assert_eq!(err.to_string(), "Unauthorized");
    }
}
