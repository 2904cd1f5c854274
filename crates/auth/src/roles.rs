use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Normalized role name (`ROLE_<UPPER>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: Role = Role(Cow::Borrowed("ROLE_ADMIN"));
    pub const EMPLOYEE: Role = Role(Cow::Borrowed("ROLE_EMPLOYEE"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// `admin` → `ROLE_ADMIN`. Names that already carry the prefix keep it once.
    pub fn normalized(raw: &str) -> Self {
        let upper = raw.trim().to_uppercase();
        if upper.starts_with("ROLE_") {
            Self(Cow::Owned(upper))
        } else {
            Self(Cow::Owned(format!("ROLE_{upper}")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role flags the UI gates on.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleFlags {
    pub is_admin: bool,
    pub is_employee: bool,
    /// Neither admin nor employee.
    pub is_guest: bool,
}

impl RoleFlags {
    pub fn from_roles(roles: &[Role]) -> Self {
        let is_admin = roles.contains(&Role::ADMIN);
        let is_employee = roles.contains(&Role::EMPLOYEE);
        Self {
            is_admin,
            is_employee,
            is_guest: !is_admin && !is_employee,
        }
    }

    pub fn access_level(&self) -> AccessLevel {
        if self.is_admin {
            AccessLevel::Admin
        } else if self.is_employee {
            AccessLevel::Employee
        } else {
            AccessLevel::Guest
        }
    }
}

/// Ordered access tiers: each tier includes everything below it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Guest,
    Employee,
    Admin,
}

impl AccessLevel {
    pub fn label(self) -> &'static str {
        match self {
            AccessLevel::Guest => "Guest",
            AccessLevel::Employee => "Employee",
            AccessLevel::Admin => "Admin",
        }
    }
}

impl core::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}
