use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{CoreError, CoreResult};

/// Who is acting. Every store operation receives one explicitly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Staff running the liquidation.
    Agent,
    /// Donation or hauling contractor bidding on jobs.
    Vendor,
    /// Estate owner, or a buyer at checkout.
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Agent => "agent",
            Role::Vendor => "vendor",
            Role::Client => "client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "agent" => Ok(Role::Agent),
            "vendor" => Ok(Role::Vendor),
            "client" => Ok(Role::Client),
            other => Err(CoreError::validation(format!("unknown role: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Caller {
    pub id: String,
    pub role: Role,
}

impl Caller {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self { id: id.into(), role }
    }

    pub fn agent(id: impl Into<String>) -> Self {
        Self::new(id, Role::Agent)
    }

    pub fn vendor(id: impl Into<String>) -> Self {
        Self::new(id, Role::Vendor)
    }

    pub fn client(id: impl Into<String>) -> Self {
        Self::new(id, Role::Client)
    }

    pub fn is_agent(&self) -> bool {
        self.role == Role::Agent
    }

    /// Fails with `Forbidden` unless the caller holds one of `roles`.
    pub fn require(&self, roles: &[Role]) -> CoreResult<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(CoreError::forbidden(format!(
                "role {} may not perform this operation",
                self.role
            )))
        }
    }

    /// Agents always pass; anyone else must be `owner`.
    pub fn require_agent_or(&self, owner: Option<&str>) -> CoreResult<()> {
        if self.is_agent() || owner == Some(self.id.as_str()) {
            Ok(())
        } else {
            Err(CoreError::forbidden(format!("{} {} does not own this resource", self.role, self.id)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("AGENT".parse::<Role>().unwrap(), Role::Agent);
        assert_eq!("vendor".parse::<Role>().unwrap(), Role::Vendor);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_require_roles() {
        let vendor = Caller::vendor("v-1");
        assert!(vendor.require(&[Role::Vendor, Role::Agent]).is_ok());
        assert!(matches!(vendor.require(&[Role::Agent]), Err(CoreError::Forbidden(_))));
    }

    #[test]
    fn test_ownership() {
        let client = Caller::client("c-1");
        assert!(client.require_agent_or(Some("c-1")).is_ok());
        assert!(client.require_agent_or(Some("c-2")).is_err());
        assert!(client.require_agent_or(None).is_err());
        assert!(Caller::agent("a-1").require_agent_or(None).is_ok());
    }
}
