pub mod credentials;
pub mod sentry;
pub mod versionone;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::settings::DEFAULT_TIMEOUT_MS;
use crate::models::asset::ReferenceLists;
use crate::models::defect::DefectDraft;
use crate::models::issue::SentryIssue;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(DEFAULT_TIMEOUT_MS);

/// The issue-tracking side: where issues are read and linked back.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn get_issue(&self, issue_id: &str) -> Result<SentryIssue>;
    async fn get_current_user_id(&self) -> Result<String>;
    async fn set_issue_owner(&self, user_id: &str, issue_id: &str) -> Result<()>;
    async fn add_comment_with_url(&self, url: &str, issue_id: &str) -> Result<()>;
}

/// The work-tracking side: where defects are created.
#[async_trait]
pub trait DefectTracker: Send + Sync {
    async fn get_reference_lists(&self) -> Result<ReferenceLists>;
    async fn create_defect(&self, draft: &DefectDraft) -> Result<String>;
    fn defect_url(&self, oid: &str) -> String;
}

/// Sends a JSON request and decodes the JSON response.
///
/// Only 200 and 201 count as success; anything else fails with the status
/// reason text.
pub async fn request_json<T: DeserializeOwned>(
    request: RequestBuilder,
    timeout: Duration,
    action: &str,
) -> Result<T> {
    let response = request
        .header(reqwest::header::ACCEPT, "application/json")
        .timeout(timeout)
        .send()
        .await
        .with_context(|| format!("Failed to {}", action))?;

    let status = response.status();
    tracing::debug!(%status, url = %response.url(), "response received");

    if status != StatusCode::OK && status != StatusCode::CREATED {
        anyhow::bail!("{}", status_text(status));
    }

    response
        .json::<T>()
        .await
        .with_context(|| format!("Failed to parse response to '{}'", action))
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}
