use anyhow::Result;
use colored::*;

use crate::api::sentry::IssuePage;
use crate::api::{DefectTracker, IssueTracker};
use crate::config::settings::ConfigStore;
use crate::errors::{self, BridgeError};
use crate::models::defect::DefectDraft;
use crate::models::issue::SentryIssue;
use crate::surface::{Browser, Notifier};

pub const REQUIRED_FIELDS_MESSAGE: &str =
    "Required fields are not set in the preferences! Run 'sentry2v1 preferences' first.";
pub const NOT_AN_ISSUE_PAGE_MESSAGE: &str =
    "A VersionOne defect can be created from an issue details page only!";

/// Outcome of one best-effort branch. Failures are kept, never propagated.
#[derive(Debug, Clone, PartialEq)]
pub enum Settled<T> {
    Fulfilled(T),
    Rejected(String),
}

impl<T> Settled<T> {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Settled::Fulfilled(_))
    }
}

impl<T> From<Result<T>> for Settled<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Settled::Fulfilled(value),
            Err(err) => Settled::Rejected(format!("{:#}", err)),
        }
    }
}

#[derive(Debug)]
pub struct Conversion {
    pub issue_id: String,
    pub defect_oid: String,
    pub defect_url: String,
    pub comment: Settled<()>,
    /// The id of the user the issue was assigned to.
    pub owner: Settled<String>,
}

pub struct Converter<'a> {
    pub prefs: &'a ConfigStore,
    pub issues: &'a dyn IssueTracker,
    pub defects: &'a dyn DefectTracker,
    pub notifier: &'a dyn Notifier,
    pub browser: &'a dyn Browser,
}

impl<'a> Converter<'a> {
    /// `page` is the parsed issue URL. A URL that does not parse is reported
    /// the same way as a page that is not an issue page.
    pub async fn convert(&self, page: Result<IssuePage>) -> errors::Result<Conversion> {
        let missing = self.prefs.missing_fields();
        if !missing.is_empty() {
            self.notifier.alert(REQUIRED_FIELDS_MESSAGE);
            return Err(BridgeError::RequiredFieldsMissing(
                missing.into_iter().map(|field| field.key()).collect(),
            ));
        }

        let page = match page {
            Ok(page) => page,
            Err(err) => {
                tracing::debug!("{:#}", err);
                self.notifier.alert(NOT_AN_ISSUE_PAGE_MESSAGE);
                return Err(BridgeError::NotAnIssuePage(format!("{:#}", err)));
            }
        };
        let Some(issue_id) = page.issue_id() else {
            self.notifier.alert(NOT_AN_ISSUE_PAGE_MESSAGE);
            return Err(BridgeError::NotAnIssuePage(page.url.clone()));
        };

        println!("{}", format!("  Fetching Sentry issue {}...", issue_id).dimmed());
        let issue = match self.issues.get_issue(&issue_id).await {
            Ok(issue) => issue,
            Err(err) => {
                let message = format!("{:#}", err);
                self.notifier
                    .alert(&format!("Unable to get issue details from Sentry: {}", message));
                return Err(BridgeError::IssueFetchFailed(message));
            }
        };
        let summary = issue
            .title
            .as_deref()
            .or(issue.culprit.as_deref())
            .unwrap_or(&issue.permalink);
        match &issue.short_id {
            Some(short_id) => println!("{}", format!("  ✓ Found {}: {}", short_id, summary).green()),
            None => println!("{}", format!("  ✓ Found: {}", summary).green()),
        }

        println!("{}", "  Creating VersionOne defect...".dimmed());
        let defect_oid = match self.create_defect(&issue).await {
            Ok(oid) => oid,
            Err(err) => {
                let message = format!("{:#}", err);
                self.notifier.alert(&format!("Unable to create a defect: {}", message));
                return Err(BridgeError::DefectCreationFailed(message));
            }
        };
        let defect_url = self.defects.defect_url(&defect_oid);
        println!("{}", format!("  ✓ Created {}", defect_oid).green());

        println!("{}", "  Linking defect and taking ownership...".dimmed());
        let (comment, owner) = tokio::join!(
            self.link_defect(&defect_url, &issue.id),
            self.take_ownership(&issue.id),
        );

        self.complete(&defect_url, &page.url);

        Ok(Conversion {
            issue_id: issue.id,
            defect_oid,
            defect_url,
            comment,
            owner,
        })
    }

    async fn create_defect(&self, issue: &SentryIssue) -> Result<String> {
        let draft = DefectDraft::from_issue(self.prefs, issue)?;
        tracing::debug!(name = %draft.name, "rendered defect draft");
        self.defects.create_defect(&draft).await
    }

    async fn link_defect(&self, defect_url: &str, issue_id: &str) -> Settled<()> {
        let result = self.issues.add_comment_with_url(defect_url, issue_id).await;
        if let Err(err) = &result {
            self.notifier
                .alert(&format!("Unable to add a defect URL to the issue: {:#}", err));
        }
        result.into()
    }

    async fn take_ownership(&self, issue_id: &str) -> Settled<String> {
        let user_id = match self.issues.get_current_user_id().await {
            Ok(user_id) => user_id,
            Err(err) => {
                self.notifier
                    .alert(&format!("Unable to get user ID from Sentry: {:#}", err));
                return Settled::Rejected(format!("{:#}", err));
            }
        };

        match self.issues.set_issue_owner(&user_id, issue_id).await {
            Ok(()) => Settled::Fulfilled(user_id),
            Err(err) => {
                self.notifier
                    .alert(&format!("Unable to set owner to the issue: {:#}", err));
                Settled::Rejected(format!("{:#}", err))
            }
        }
    }

    /// Runs once the defect exists, whatever happened to the linking branches.
    fn complete(&self, defect_url: &str, page_url: &str) {
        if let Err(err) = self.browser.open_in_tab(defect_url) {
            tracing::warn!("{:#}", err);
        }
        if let Err(err) = self.browser.reload(page_url) {
            tracing::warn!("{:#}", err);
        }
    }
}
