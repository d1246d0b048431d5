use uuid::Uuid;

use docket_types::models::Role;

use crate::error::AccessError;

/// The authenticated identity behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

/// Capabilities checked by the repository. Each operation evaluates one of
/// these exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// See todos regardless of owner.
    ViewAllTodos,
    /// Update or delete todos regardless of owner.
    ModifyAnyTodo,
    /// List users and change roles.
    ManageUsers,
}

pub fn role_grants(role: Role, permission: Permission) -> bool {
    match (role, permission) {
        (Role::Admin, _) => true,
        (Role::User, Permission::ViewAllTodos)
        | (Role::User, Permission::ModifyAnyTodo)
        | (Role::User, Permission::ManageUsers) => false,
    }
}

impl Principal {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn can(&self, permission: Permission) -> bool {
        role_grants(self.role, permission)
    }

    pub fn require(&self, permission: Permission) -> Result<(), AccessError> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(AccessError::AccessDenied)
        }
    }

    /// Owners may always modify their own todos; everyone else needs
    /// `ModifyAnyTodo`.
    pub fn require_owner_or(&self, owner_id: Uuid, permission: Permission) -> Result<(), AccessError> {
        if owner_id == self.user_id {
            Ok(())
        } else {
            self.require(permission)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_holds_every_permission() {
        let admin = Principal::new(Uuid::new_v4(), Role::Admin);
        assert!(admin.can(Permission::ViewAllTodos));
        assert!(admin.can(Permission::ModifyAnyTodo));
        assert!(admin.can(Permission::ManageUsers));
    }

    #[test]
    fn user_is_limited_to_own_records() {
        let user = Principal::new(Uuid::new_v4(), Role::User);
        assert!(!user.can(Permission::ManageUsers));
        assert!(user.require_owner_or(user.user_id, Permission::ModifyAnyTodo).is_ok());
        assert!(matches!(
            user.require_owner_or(Uuid::new_v4(), Permission::ModifyAnyTodo),
            Err(AccessError::AccessDenied)
        ));
    }
}
