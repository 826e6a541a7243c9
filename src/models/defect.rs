use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::fields::{parse_max_name_length, Field};
use crate::config::settings::ConfigStore;
use crate::models::issue::SentryIssue;
use crate::template::{self, METADATA_TYPE, METADATA_VALUE, PERMALINK};

/// Everything needed to create a defect, with templates already rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct DefectDraft {
    pub name: String,
    pub description: String,
    pub deployment_instructions: String,
    pub backlog_group: String,
    pub environment: String,
    pub epic: String,
    pub priority: String,
    pub project: String,
    pub source: String,
    pub status: String,
    pub team: String,
}

impl DefectDraft {
    pub fn from_issue(prefs: &ConfigStore, issue: &SentryIssue) -> Result<Self> {
        let max_name_length = parse_max_name_length(require(prefs, Field::MaxNameLength)?)?;

        let name = template::render(
            require(prefs, Field::NameTemplate)?,
            &[
                (METADATA_TYPE, issue.metadata.kind.as_str()),
                (METADATA_VALUE, issue.metadata.value.as_str()),
            ],
        );
        let permalink = [(PERMALINK, issue.permalink.as_str())];

        Ok(Self {
            name: template::truncate_name(&name, max_name_length),
            description: template::render(require(prefs, Field::DescriptionTemplate)?, &permalink),
            deployment_instructions: template::render(
                require(prefs, Field::DeploymentInstructionTemplate)?,
                &permalink,
            ),
            backlog_group: require(prefs, Field::BacklogGroup)?.to_string(),
            environment: require(prefs, Field::Environment)?.to_string(),
            epic: require(prefs, Field::Epic)?.to_string(),
            priority: require(prefs, Field::Priority)?.to_string(),
            project: require(prefs, Field::Project)?.to_string(),
            source: require(prefs, Field::Source)?.to_string(),
            status: require(prefs, Field::Status)?.to_string(),
            team: require(prefs, Field::Team)?.to_string(),
        })
    }
}

fn require(prefs: &ConfigStore, field: Field) -> Result<&str> {
    prefs
        .get_value(field)
        .with_context(|| format!("Preference '{}' is not set", field.label()))
}

/// Request body for creating a Defect asset through the bulk API.
#[derive(Debug, Serialize)]
pub struct DefectPayload<'a> {
    #[serde(rename = "AssetType")]
    pub asset_type: &'static str,
    #[serde(rename = "Custom_DeploymentInstructions")]
    pub deployment_instructions: &'a str,
    #[serde(rename = "Custom_Environment")]
    pub environment: &'a str,
    #[serde(rename = "Description")]
    pub description: &'a str,
    #[serde(rename = "Name")]
    pub name: &'a str,
    #[serde(rename = "Owners")]
    pub owners: OwnersQuery,
    #[serde(rename = "Parent")]
    pub backlog_group: &'a str,
    #[serde(rename = "Priority")]
    pub priority: &'a str,
    #[serde(rename = "Scope")]
    pub project: &'a str,
    #[serde(rename = "Source")]
    pub source: &'a str,
    #[serde(rename = "Status")]
    pub status: &'a str,
    #[serde(rename = "Super")]
    pub epic: &'a str,
    #[serde(rename = "Team")]
    pub team: &'a str,
}

/// Resolves to the member making the request.
#[derive(Debug, Serialize)]
pub struct OwnersQuery {
    pub from: &'static str,
    #[serde(rename = "where")]
    pub filter: SelfFilter,
}

#[derive(Debug, Serialize)]
pub struct SelfFilter {
    #[serde(rename = "IsSelf")]
    pub is_self: bool,
}

impl<'a> From<&'a DefectDraft> for DefectPayload<'a> {
    fn from(draft: &'a DefectDraft) -> Self {
        Self {
            asset_type: "Defect",
            deployment_instructions: &draft.deployment_instructions,
            environment: &draft.environment,
            description: &draft.description,
            name: &draft.name,
            owners: OwnersQuery {
                from: "Member",
                filter: SelfFilter { is_self: true },
            },
            backlog_group: &draft.backlog_group,
            priority: &draft.priority,
            project: &draft.project,
            source: &draft.source,
            status: &draft.status,
            epic: &draft.epic,
            team: &draft.team,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAssetResponse {
    #[serde(rename = "commandFailures")]
    pub command_failures: CommandFailures,
    #[serde(rename = "assetsCreated")]
    pub assets_created: AssetsCreated,
}

#[derive(Debug, Deserialize)]
pub struct CommandFailures {
    pub count: u32,
    #[serde(default)]
    pub commands: Vec<FailedCommand>,
}

#[derive(Debug, Deserialize)]
pub struct FailedCommand {
    pub error: CommandError,
}

#[derive(Debug, Deserialize)]
pub struct CommandError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct AssetsCreated {
    #[serde(rename = "oidTokens", default)]
    pub oid_tokens: Vec<String>,
}

impl CreateAssetResponse {
    /// The created oid, or the first reported command failure.
    pub fn into_created_oid(self) -> Result<String> {
        if self.command_failures.count > 0 {
            let message = self
                .command_failures
                .commands
                .into_iter()
                .next()
                .map(|command| command.error.message)
                .unwrap_or_else(|| "VersionOne reported a command failure".to_string());
            anyhow::bail!(message);
        }

        self.assets_created
            .oid_tokens
            .into_iter()
            .next()
            .context("VersionOne did not report a created asset")
    }
}
