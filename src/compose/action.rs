//! Response action types.

use serde::{Deserialize, Serialize};

/// The category of reply staff choose to send. Adding a variant means
/// adding a template and a gateway prompt for it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionType {
    /// Approve the request.
    Accept,
    /// Decline the request.
    Reject,
    /// Ask for missing documentation.
    RequestInfo,
    /// Hand over to another department.
    Forward,
    /// Free-form reply.
    #[default]
    Custom,
    /// Confirm receipt with a reference number.
    Acknowledge,
}

impl ActionType {
    pub const ALL: [ActionType; 6] = [
        Self::Accept,
        Self::Reject,
        Self::RequestInfo,
        Self::Forward,
        Self::Custom,
        Self::Acknowledge,
    ];

    /// Heading shown on the compose dialog.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Accept => "Accept Request",
            Self::Reject => "Reject Request",
            Self::RequestInfo => "Request More Information",
            Self::Forward => "Forward to Another Department",
            Self::Custom => "Custom Reply",
            Self::Acknowledge => "Acknowledge Receipt",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accept => write!(f, "accept"),
            Self::Reject => write!(f, "reject"),
            Self::RequestInfo => write!(f, "request-info"),
            Self::Forward => write!(f, "forward"),
            Self::Custom => write!(f, "custom"),
            Self::Acknowledge => write!(f, "acknowledge"),
        }
    }
}

impl std::str::FromStr for ActionType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accept" => Ok(Self::Accept),
            "reject" => Ok(Self::Reject),
            "request-info" => Ok(Self::RequestInfo),
            "forward" => Ok(Self::Forward),
            "custom" => Ok(Self::Custom),
            "acknowledge" => Ok(Self::Acknowledge),
            _ => Err(format!("Unknown action type: {}", s)),
        }
    }
}
