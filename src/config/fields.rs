/// Separates the display name from the VersionOne oid in stored asset values.
pub const ASSET_NAME_ID_DELIMITER: &str = " |@| ";

pub const DEFAULT_NAME_TEMPLATE: &str = "[Sentry] {{metadata.value}}";

pub const DEFAULT_MAX_NAME_LENGTH: u32 = 110;

pub const MAX_NAME_LENGTH_LIMIT: u32 = 999;

pub const DEFAULT_DESCRIPTION_TEMPLATE: &str = r#"<h1>Acceptance criteria</h1>
<ol>
    <li>The <a href="{{permalink}}" target="_blank">issue</a> has been fixed.</li>
</ol>"#;

pub const DEFAULT_DEPLOYMENT_INSTRUCTION_TEMPLATE: &str = r#"<ol>
    <li>Release code changes</li>
    <li>Resolve the <a href="{{permalink}}" target="_blank">issue</a></li>
</ol>"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    LongText,
    UnsignedInt,
    /// A record picked from a VersionOne reference list.
    Asset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    V1BaseUrl,
    BacklogGroup,
    Environment,
    Epic,
    Priority,
    Project,
    Source,
    Status,
    Team,
    NameTemplate,
    MaxNameLength,
    DescriptionTemplate,
    DeploymentInstructionTemplate,
}

impl Field {
    /// Every declared field, in the order the preferences form shows them.
    pub const ALL: [Field; 13] = [
        Field::V1BaseUrl,
        Field::BacklogGroup,
        Field::Environment,
        Field::Epic,
        Field::Priority,
        Field::Project,
        Field::Source,
        Field::Status,
        Field::Team,
        Field::NameTemplate,
        Field::MaxNameLength,
        Field::DescriptionTemplate,
        Field::DeploymentInstructionTemplate,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Field::V1BaseUrl => "v1_base_url",
            Field::BacklogGroup => "backlog_group",
            Field::Environment => "environment",
            Field::Epic => "epic",
            Field::Priority => "priority",
            Field::Project => "project",
            Field::Source => "source",
            Field::Status => "status",
            Field::Team => "team",
            Field::NameTemplate => "name_template",
            Field::MaxNameLength => "max_name_length",
            Field::DescriptionTemplate => "description_template",
            Field::DeploymentInstructionTemplate => "deployment_instruction_template",
        }
    }

    pub fn from_key(key: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|field| field.key() == key)
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::V1BaseUrl => "V1 Base URL",
            Field::BacklogGroup => "Backlog group",
            Field::Environment => "Environment",
            Field::Epic => "Epic",
            Field::Priority => "Priority",
            Field::Project => "Project",
            Field::Source => "Source",
            Field::Status => "Status",
            Field::Team => "Team",
            Field::NameTemplate => "Name template",
            Field::MaxNameLength => "Name length limit",
            Field::DescriptionTemplate => "Description template",
            Field::DeploymentInstructionTemplate => "Deployment instruction template",
        }
    }

    /// Shown next to the prompt.
    pub fn hint(self) -> Option<&'static str> {
        match self {
            Field::V1BaseUrl => Some("e.g. https://www1.domain.com/InstanceName"),
            Field::NameTemplate => {
                Some("placeholders: {{metadata.type}}, {{metadata.value}}")
            }
            Field::DescriptionTemplate | Field::DeploymentInstructionTemplate => {
                Some("placeholders: {{permalink}}")
            }
            _ => None,
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::V1BaseUrl | Field::NameTemplate => FieldKind::Text,
            Field::DescriptionTemplate | Field::DeploymentInstructionTemplate => {
                FieldKind::LongText
            }
            Field::MaxNameLength => FieldKind::UnsignedInt,
            Field::BacklogGroup
            | Field::Environment
            | Field::Epic
            | Field::Priority
            | Field::Project
            | Field::Source
            | Field::Status
            | Field::Team => FieldKind::Asset,
        }
    }

    pub fn is_asset(self) -> bool {
        self.kind() == FieldKind::Asset
    }

    pub fn default_value(self) -> Option<String> {
        match self {
            Field::NameTemplate => Some(DEFAULT_NAME_TEMPLATE.to_string()),
            Field::MaxNameLength => Some(DEFAULT_MAX_NAME_LENGTH.to_string()),
            Field::DescriptionTemplate => Some(DEFAULT_DESCRIPTION_TEMPLATE.to_string()),
            Field::DeploymentInstructionTemplate => {
                Some(DEFAULT_DEPLOYMENT_INSTRUCTION_TEMPLATE.to_string())
            }
            _ => None,
        }
    }
}

/// Parses a name length limit, enforcing `1..=MAX_NAME_LENGTH_LIMIT`.
pub fn parse_max_name_length(raw: &str) -> anyhow::Result<usize> {
    let value: u32 = raw
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("'{}' is not a positive integer", raw))?;

    if value == 0 || value > MAX_NAME_LENGTH_LIMIT {
        anyhow::bail!(
            "Name length limit must be between 1 and {}, got {}",
            MAX_NAME_LENGTH_LIMIT,
            value
        );
    }

    Ok(value as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::from_key(field.key()), Some(field));
        }
        assert_eq!(Field::from_key("unknown"), None);
    }

    #[test]
    fn test_eight_asset_fields() {
        let assets = Field::ALL.iter().filter(|f| f.is_asset()).count();
        assert_eq!(assets, 8);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(
            Field::NameTemplate.default_value().as_deref(),
            Some("[Sentry] {{metadata.value}}")
        );
        assert_eq!(Field::MaxNameLength.default_value().as_deref(), Some("110"));
        assert!(Field::Project.default_value().is_none());
    }

    #[test]
    fn test_parse_max_name_length() {
        assert_eq!(parse_max_name_length("110").unwrap(), 110);
        assert_eq!(parse_max_name_length(" 10 ").unwrap(), 10);
        assert!(parse_max_name_length("0").is_err());
        assert!(parse_max_name_length("1000").is_err());
        assert!(parse_max_name_length("-5").is_err());
        assert!(parse_max_name_length("abc").is_err());
    }
}
