use serde::Serialize;
use thiserror::Error;

use crate::{AccessLevel, RoleFlags};

/// Who is looking at the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Viewer {
    Anonymous,
    Authenticated { username: String, flags: RoleFlags },
}

impl Viewer {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Viewer::Authenticated { .. })
    }

    pub fn flags(&self) -> RoleFlags {
        match self {
            Viewer::Anonymous => RoleFlags {
                is_guest: true,
                ..RoleFlags::default()
            },
            Viewer::Authenticated { flags, .. } => *flags,
        }
    }

    /// Role label as shown in the navigation bar.
    pub fn role_label(&self) -> &'static str {
        self.flags().access_level().label()
    }

    /// Every capability this viewer may use, in menu order.
    pub fn capabilities(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|cap| authorize(self, *cap).is_ok())
            .collect()
    }
}

/// Something the UI may offer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Browse the catalog (public endpoint when anonymous).
    ViewProducts,
    /// Filter the catalog by stock level.
    FilterByStock,
    /// Browse the movement ledger.
    ViewHistory,
    /// Create, edit and delete products.
    ManageProducts,
    /// Record stock movements.
    MoveStock,
    /// Admin-only screens.
    AdminTools,
}

impl Capability {
    pub const ALL: [Capability; 6] = [
        Capability::ViewProducts,
        Capability::FilterByStock,
        Capability::ViewHistory,
        Capability::ManageProducts,
        Capability::MoveStock,
        Capability::AdminTools,
    ];

    pub fn requires_authentication(self) -> bool {
        self != Capability::ViewProducts
    }

    pub fn minimum_level(self) -> AccessLevel {
        match self {
            Capability::ViewProducts | Capability::ViewHistory => AccessLevel::Guest,
            Capability::FilterByStock | Capability::ManageProducts | Capability::MoveStock => {
                AccessLevel::Employee
            }
            Capability::AdminTools => AccessLevel::Admin,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::ViewProducts => "view_products",
            Capability::FilterByStock => "filter_by_stock",
            Capability::ViewHistory => "view_history",
            Capability::ManageProducts => "manage_products",
            Capability::MoveStock => "move_stock",
            Capability::AdminTools => "admin_tools",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("forbidden: '{0}' requires {1} access")]
    Forbidden(&'static str, AccessLevel),
}

/// Decide whether `viewer` may use `capability`.
///
/// UI gating only: no IO, no panics.
pub fn authorize(viewer: &Viewer, capability: Capability) -> Result<(), AuthzError> {
    if capability.requires_authentication() && !viewer.is_authenticated() {
        return Err(AuthzError::Unauthenticated);
    }

    let required = capability.minimum_level();
    if viewer.flags().access_level() >= required {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(capability.as_str(), required))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer(is_admin: bool, is_employee: bool) -> Viewer {
        Viewer::Authenticated {
            username: "u".to_string(),
            flags: RoleFlags {
                is_admin,
                is_employee,
                is_guest: !is_admin && !is_employee,
            },
        }
    }

    #[test]
    fn anonymous_viewers_only_browse_products() {
        let anon = Viewer::Anonymous;
        assert_eq!(authorize(&anon, Capability::ViewProducts), Ok(()));
        assert_eq!(
            authorize(&anon, Capability::ViewHistory),
            Err(AuthzError::Unauthenticated)
        );
        assert_eq!(anon.role_label(), "Guest");
    }

    #[test]
    fn guests_cannot_manage_or_filter_stock() {
        let guest = viewer(false, false);
        assert_eq!(authorize(&guest, Capability::ViewHistory), Ok(()));
        for cap in [Capability::FilterByStock, Capability::ManageProducts, Capability::MoveStock] {
            assert!(matches!(authorize(&guest, cap), Err(AuthzError::Forbidden(_, AccessLevel::Employee))));
        }
    }

    #[test]
    fn employees_move_stock_but_lack_admin_tools() {
        let employee = viewer(false, true);
        assert_eq!(authorize(&employee, Capability::MoveStock), Ok(()));
        assert_eq!(authorize(&employee, Capability::ManageProducts), Ok(()));
        assert_eq!(
            authorize(&employee, Capability::AdminTools),
            Err(AuthzError::Forbidden("admin_tools", AccessLevel::Admin))
        );
    }

    #[test]
    fn admins_can_do_everything() {
        let admin = viewer(true, false);
        for cap in Capability::ALL {
            assert_eq!(authorize(&admin, cap), Ok(()));
        }
        assert_eq!(admin.capabilities(), Capability::ALL.to_vec());
    }

    #[test]
    fn capability_lists_follow_the_role() {
        assert_eq!(Viewer::Anonymous.capabilities(), vec![Capability::ViewProducts]);
        assert_eq!(
            viewer(false, false).capabilities(),
            vec![Capability::ViewProducts, Capability::ViewHistory]
        );

        let employee = viewer(false, true).capabilities();
        assert!(employee.contains(&Capability::MoveStock));
        assert!(!employee.contains(&Capability::AdminTools));
        assert!(viewer(true, false).capabilities().contains(&Capability::AdminTools));
    }
}
