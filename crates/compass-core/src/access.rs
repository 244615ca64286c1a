//! Static role/permission lookup.
//!
//! Used only to decide which features a session exposes. There is no
//! identity behind a role: whoever starts the binary picks one.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CompassError;

/// A user role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    #[default]
    Designer,
    Viewer,
}

/// A feature permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageUsers,
    ViewUsers,
    ManageDataSources,
    ViewDataSources,
    UseChat,
    ViewInsights,
    ExportInsights,
    UseCompass,
    ManageSettings,
    ViewSettings,
}

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::ManageUsers,
    Permission::ViewUsers,
    Permission::ManageDataSources,
    Permission::ViewDataSources,
    Permission::UseChat,
    Permission::ViewInsights,
    Permission::ExportInsights,
    Permission::UseCompass,
    Permission::ManageSettings,
    Permission::ViewSettings,
];

const MANAGER_PERMISSIONS: &[Permission] = &[
    Permission::ViewUsers,
    Permission::ManageDataSources,
    Permission::ViewDataSources,
    Permission::UseChat,
    Permission::ViewInsights,
    Permission::ExportInsights,
    Permission::UseCompass,
    Permission::ViewSettings,
];

const DESIGNER_PERMISSIONS: &[Permission] = &[
    Permission::ViewDataSources,
    Permission::UseChat,
    Permission::ViewInsights,
    Permission::ExportInsights,
    Permission::UseCompass,
];

const VIEWER_PERMISSIONS: &[Permission] = &[Permission::ViewDataSources, Permission::ViewInsights];

impl Role {
    /// All permissions granted to this role.
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Role::Admin => ADMIN_PERMISSIONS,
            Role::Manager => MANAGER_PERMISSIONS,
            Role::Designer => DESIGNER_PERMISSIONS,
            Role::Viewer => VIEWER_PERMISSIONS,
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    /// True if the role holds at least one of `permissions`. False for an
    /// empty slice.
    pub fn has_any_permission(&self, permissions: &[Permission]) -> bool {
        permissions.iter().any(|p| self.has_permission(*p))
    }

    pub fn has_all_permissions(&self, permissions: &[Permission]) -> bool {
        permissions.iter().all(|p| self.has_permission(*p))
    }

    /// Return `Ok(())` if the role holds `permission`, otherwise
    /// [`CompassError::PermissionDenied`].
    pub fn require(&self, permission: Permission) -> Result<(), CompassError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(CompassError::PermissionDenied {
                role: *self,
                permission,
            })
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Designer => "designer",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CompassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "designer" => Ok(Role::Designer),
            "viewer" => Ok(Role::Viewer),
            other => Err(CompassError::Config(format!("unknown role: {}", other))),
        }
    }
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ManageUsers => "manage_users",
            Permission::ViewUsers => "view_users",
            Permission::ManageDataSources => "manage_data_sources",
            Permission::ViewDataSources => "view_data_sources",
            Permission::UseChat => "use_chat",
            Permission::ViewInsights => "view_insights",
            Permission::ExportInsights => "export_insights",
            Permission::UseCompass => "use_compass",
            Permission::ManageSettings => "manage_settings",
            Permission::ViewSettings => "view_settings",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
