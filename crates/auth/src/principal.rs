use serde::Serialize;

use drillstore_core::UserId;

use crate::{Permission, Role};

/// A fully resolved principal for authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: UserId,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

impl Principal {
    /// Resolve a principal from its roles using the static role policy.
    pub fn from_roles(user_id: UserId, roles: Vec<Role>) -> Self {
        let permissions = permissions_from_roles(&roles);
        Self {
            user_id,
            roles,
            permissions,
        }
    }
}

/// Static role → permission policy.
///
/// `admin` grants everything; `store_keeper` grants material store access.
/// Unknown roles grant nothing.
pub fn permissions_from_roles(roles: &[Role]) -> Vec<Permission> {
    if roles.iter().any(|r| r.as_str() == Role::ADMIN.as_str()) {
        return vec![Permission::WILDCARD];
    }

    let mut perms = Vec::new();
    if roles.iter().any(|r| r.as_str() == Role::STORE_KEEPER.as_str()) {
        perms.push(Permission::RESOURCES_ACCESS);
    }
    perms
}
