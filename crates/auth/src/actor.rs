//! Authenticated actor identity and role memberships.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use stocktrail_core::UserId;

/// Role used for RBAC.
///
/// Roles are a set membership, not exclusive: an actor may hold zero, one, or
/// several roles at once.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Employee,
    Auditor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Employee => "employee",
            Role::Auditor => "auditor",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved actor for authorization decisions.
///
/// Construction is intentionally decoupled from storage and transport: the
/// surrounding shell derives identity and memberships from its session/claims
/// layer and hands the result to the services here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub roles: HashSet<Role>,
}

impl Actor {
    pub fn new(id: UserId, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            id,
            roles: roles.into_iter().collect(),
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// Per-request actor context supplied by the surrounding service shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActorContext {
    Authenticated(Actor),
    Anonymous,
}

impl ActorContext {
    pub fn authenticated(id: UserId, roles: impl IntoIterator<Item = Role>) -> Self {
        Self::Authenticated(Actor::new(id, roles))
    }

    pub fn actor(&self) -> Option<&Actor> {
        match self {
            ActorContext::Authenticated(actor) => Some(actor),
            ActorContext::Anonymous => None,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.actor().map(|a| a.id)
    }
}
