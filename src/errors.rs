use colored::*;
use std::fmt;

#[derive(Debug, Clone)]
pub enum BridgeError {
    // Configuration errors
    ConfigInvalid(String),
    RequiredFieldsMissing(Vec<&'static str>),

    // Conversion stages
    NotAnIssuePage(String),
    IssueFetchFailed(String),
    DefectCreationFailed(String),
    ReferenceListsUnavailable(String),

    // Network errors
    NetworkError(String),

    // Generic error
    Other(String),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Configuration errors
            BridgeError::ConfigInvalid(msg) => {
                write!(f, "{}\n", "Invalid configuration".red().bold())?;
                write!(f, "   {}\n\n", msg.dimmed())?;
                write!(f, "   To fix:\n")?;
                write!(f, "   1. Check your config file: ~/.sentry2v1/config.toml\n")?;
                write!(f, "   2. Or rerun: {}", "sentry2v1 preferences".green())
            }
            BridgeError::RequiredFieldsMissing(fields) => {
                write!(f, "{}\n", "Required fields are not set".red().bold())?;
                write!(f, "   {}\n\n", format!("Missing: {}", fields.join(", ")).dimmed())?;
                write!(f, "   To fix: {}", "sentry2v1 preferences".green())
            }

            // Conversion stages
            BridgeError::NotAnIssuePage(url) => {
                write!(f, "{}\n", "Not an issue details page".red().bold())?;
                write!(f, "   {}\n\n", url.dimmed())?;
                write!(f, "   Expected a URL like: {}", "https://sentry.example.com/organizations/acme/issues/482/".cyan())
            }
            BridgeError::IssueFetchFailed(msg) => {
                write!(f, "{}\n", "Failed to get issue details from Sentry".red().bold())?;
                write!(f, "   {}\n\n", msg.dimmed())?;
                write!(f, "   To fix:\n")?;
                write!(f, "   1. Check the issue still exists\n")?;
                write!(f, "   2. Refresh the session cookie: {}", "sentry2v1 config set sentry.session_cookie \"...\"".green())
            }
            BridgeError::DefectCreationFailed(msg) => {
                write!(f, "{}\n", "Failed to create a defect".red().bold())?;
                write!(f, "   {}\n\n", msg.dimmed())?;
                write!(f, "   To fix:\n")?;
                write!(f, "   1. Check the selected assets are still active in VersionOne\n")?;
                write!(f, "   2. Reselect them: {}", "sentry2v1 preferences".green())
            }
            BridgeError::ReferenceListsUnavailable(msg) => {
                write!(f, "{}\n", "Failed to fetch available values from VersionOne".red().bold())?;
                write!(f, "   {}\n\n", msg.dimmed())?;
                write!(f, "   To fix:\n")?;
                write!(f, "   1. Check the VersionOne base URL\n")?;
                write!(f, "   2. Verify your access token is valid")
            }

            // Network errors
            BridgeError::NetworkError(msg) => {
                write!(f, "{}\n", "Network error".red().bold())?;
                write!(f, "   {}\n\n", msg.dimmed())?;
                write!(f, "   To fix:\n")?;
                write!(f, "   1. Check your internet connection\n")?;
                write!(f, "   2. Verify you can reach the API endpoints\n")?;
                write!(f, "   3. Try again in a moment")
            }

            // Generic
            BridgeError::Other(msg) => {
                write!(f, "{}\n", "Error".red().bold())?;
                write!(f, "   {}", msg.dimmed())
            }
        }
    }
}

impl std::error::Error for BridgeError {}

// Conversion from anyhow::Error
impl From<anyhow::Error> for BridgeError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(bridge) = err.downcast_ref::<BridgeError>() {
            return bridge.clone();
        }
        match err.downcast_ref::<reqwest::Error>() {
            Some(req) if req.is_timeout() || req.is_connect() => {
                BridgeError::NetworkError(format!("{:#}", err))
            }
            _ => BridgeError::Other(format!("{:#}", err)),
        }
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
