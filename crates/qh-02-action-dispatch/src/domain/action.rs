//! Action tags and the action contract.

use async_trait::async_trait;
use shared_types::ActionError;
use std::fmt;
use std::str::FromStr;

use crate::ports::UserStore;

/// The closed set of actions this handler serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionTag {
    /// Verify a username/password pair and return the user record.
    LoginUser,
}

impl ActionTag {
    /// Every known tag.
    pub const ALL: [ActionTag; 1] = [ActionTag::LoginUser];

    /// Wire name carried in `Command::action`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoginUser => "LoginUser",
        }
    }
}

impl fmt::Display for ActionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The action name is not one of `ActionTag::ALL`. Matching is case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action {0:?}")]
pub struct UnknownAction(pub String);

impl FromStr for ActionTag {
    type Err = UnknownAction;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str() == name)
            .ok_or_else(|| UnknownAction(name.to_string()))
    }
}

/// A registered operation.
///
/// Returns the encoded success payload, or the error to embed in the result.
#[async_trait]
pub trait Action: Send + Sync {
    async fn execute(&self, store: &dyn UserStore, payload: &[u8]) -> Result<Vec<u8>, ActionError>;
}
