//! The nine agent roles

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{
    analyst, architect, dev, master, orchestrator, pm, qa, sm, ux, CommandRegistry,
};

/// A role an agent can play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Analyst,
    Architect,
    Dev,
    Pm,
    Qa,
    Sm,
    Ux,
    Master,
    Orchestrator,
}

impl Role {
    pub const ALL: [Role; 9] = [
        Role::Analyst,
        Role::Architect,
        Role::Pm,
        Role::Sm,
        Role::Dev,
        Role::Qa,
        Role::Ux,
        Role::Master,
        Role::Orchestrator,
    ];

    /// Short machine name, also the persona id
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Analyst => "analyst",
            Role::Architect => "architect",
            Role::Dev => "dev",
            Role::Pm => "pm",
            Role::Qa => "qa",
            Role::Sm => "sm",
            Role::Ux => "ux",
            Role::Master => "master",
            Role::Orchestrator => "orchestrator",
        }
    }

    /// Human-readable title
    pub fn title(&self) -> &'static str {
        match self {
            Role::Analyst => "Business Analyst",
            Role::Architect => "Architect",
            Role::Dev => "Developer",
            Role::Pm => "Product Manager",
            Role::Qa => "QA Engineer",
            Role::Sm => "Scrum Master",
            Role::Ux => "UX Expert",
            Role::Master => "Master",
            Role::Orchestrator => "Orchestrator",
        }
    }

    /// The role's own command table (without `help`)
    pub fn commands(&self) -> CommandRegistry {
        match self {
            Role::Analyst => analyst::commands(),
            Role::Architect => architect::commands(),
            Role::Dev => dev::commands(),
            Role::Pm => pm::commands(),
            Role::Qa => qa::commands(),
            Role::Sm => sm::commands(),
            Role::Ux => ux::commands(),
            Role::Master => master::commands(),
            Role::Orchestrator => orchestrator::commands(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', ' '], "-");
        let role = match normalized.as_str() {
            "analyst" | "business-analyst" => Role::Analyst,
            "architect" => Role::Architect,
            "dev" | "developer" => Role::Dev,
            "pm" | "product-manager" => Role::Pm,
            "qa" | "tester" | "qa-engineer" => Role::Qa,
            "sm" | "scrum-master" => Role::Sm,
            "ux" | "ux-expert" | "designer" => Role::Ux,
            "master" => Role::Master,
            "orchestrator" => Role::Orchestrator,
            _ => return Err(format!("unknown role: {}", s)),
        };
        Ok(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!("Scrum Master".parse::<Role>().unwrap(), Role::Sm);
        assert_eq!("product_manager".parse::<Role>().unwrap(), Role::Pm);
        assert_eq!(" Developer ".parse::<Role>().unwrap(), Role::Dev);
        assert!("janitor".parse::<Role>().is_err());
    }

    #[test]
    fn test_every_role_registers_commands() {
        for role in Role::ALL {
            assert!(!role.commands().is_empty(), "{} has no commands", role);
        }
    }
}
