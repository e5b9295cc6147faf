//! Role-gated routing.
//!
//! Each role has its own route table; a signed-in user can only reach the
//! routes of their role and is redirected to their home for anything else.
//! Route patterns use `:name` for a single path segment.

use crate::records::{Collection, Role};
use crate::session::SessionState;

/// A page reachable by one role
#[derive(Debug, PartialEq, Eq)]
pub struct RouteSpec {
    pub pattern: &'static str,
    pub page: &'static str,
    /// Collections the page shows
    pub collections: &'static [Collection],
    /// Collections the page saves to
    pub writes: &'static [Collection],
}

use Collection::*;

pub const ADMIN_ROUTES: &[RouteSpec] = &[
    RouteSpec {
        pattern: "/admin",
        page: "Dashboard",
        collections: &[Projects, Expenses, Labours, Machines, Stocks],
        writes: &[],
    },
    RouteSpec {
        pattern: "/admin/attendance",
        page: "Attendance",
        collections: &[AttendanceAdmin, Users],
        writes: &[],
    },
    RouteSpec {
        pattern: "/admin/machines",
        page: "Machines",
        collections: &[Machines],
        writes: &[],
    },
    RouteSpec {
        pattern: "/admin/machines/:category",
        page: "Machine Category",
        collections: &[Machines, Projects],
        writes: &[Machines],
    },
    RouteSpec {
        pattern: "/admin/stock",
        page: "Stock",
        collections: &[Stocks, Projects, Vendors],
        writes: &[Stocks],
    },
    RouteSpec {
        pattern: "/admin/projects",
        page: "Projects",
        collections: &[Projects, Expenses],
        writes: &[Projects, Expenses],
    },
    RouteSpec {
        pattern: "/admin/projects/:id",
        page: "Project Detail",
        collections: &[Projects, Expenses, Stocks, Labours],
        writes: &[],
    },
    RouteSpec {
        pattern: "/admin/vendors",
        page: "Vendors",
        collections: &[Vendors],
        writes: &[Vendors],
    },
    RouteSpec {
        pattern: "/admin/contractors",
        page: "Contractors",
        collections: &[Vendors],
        writes: &[Vendors],
    },
    RouteSpec {
        pattern: "/admin/expenses",
        page: "Expenses",
        collections: &[Expenses, Projects],
        writes: &[Expenses],
    },
    RouteSpec {
        pattern: "/admin/transfer",
        page: "Transfer",
        collections: &[Transfers, Projects, Labours],
        writes: &[Transfers],
    },
    RouteSpec {
        pattern: "/admin/accounts",
        page: "Accounts",
        collections: &[Accounts, Expenses, BankTransactions, CashTransactions],
        writes: &[Accounts],
    },
    RouteSpec {
        pattern: "/admin/users",
        page: "Users",
        collections: &[Users],
        writes: &[Users],
    },
    RouteSpec {
        pattern: "/admin/reports",
        page: "Reports",
        collections: &[Projects, Expenses, Payments, DailyReports],
        writes: &[],
    },
    RouteSpec {
        pattern: "/admin/notifications",
        page: "Notifications",
        collections: &[Notifications, Users],
        writes: &[Notifications],
    },
];

pub const SITE_ROUTES: &[RouteSpec] = &[
    RouteSpec {
        pattern: "/site",
        page: "Dashboard",
        collections: &[Projects, Labours, Expenses],
        writes: &[],
    },
    RouteSpec {
        pattern: "/site/attendance",
        page: "Attendance",
        collections: &[AttendanceSite, Projects],
        writes: &[AttendanceSite],
    },
    RouteSpec {
        pattern: "/site/labour",
        page: "Labour",
        collections: &[Labours, Projects],
        writes: &[Labours],
    },
    RouteSpec {
        pattern: "/site/labour-attendance",
        page: "Labour Attendance",
        collections: &[LabourAttendances, Labours, Projects],
        writes: &[LabourAttendances],
    },
    RouteSpec {
        pattern: "/site/stock-in",
        page: "Stock In",
        collections: &[Stocks, Vendors, Projects],
        writes: &[Stocks],
    },
    RouteSpec {
        pattern: "/site/transfer",
        page: "Transfer",
        collections: &[Transfers, Projects, Labours],
        writes: &[Transfers],
    },
    RouteSpec {
        pattern: "/site/daily-report",
        page: "Daily Report",
        collections: &[DailyReports, Projects],
        writes: &[DailyReports],
    },
    RouteSpec {
        pattern: "/site/gallery",
        page: "Gallery",
        collections: &[Gallery, Projects],
        writes: &[Gallery],
    },
    RouteSpec {
        pattern: "/site/expenses",
        page: "Expenses",
        collections: &[Expenses, Projects],
        writes: &[Expenses],
    },
    RouteSpec {
        pattern: "/site/payment",
        page: "Payment",
        collections: &[Payments, Labours],
        writes: &[Payments],
    },
    RouteSpec {
        pattern: "/site/notifications",
        page: "Notifications",
        collections: &[Notifications],
        writes: &[Notifications],
    },
    RouteSpec {
        pattern: "/site/profile",
        page: "Profile",
        collections: &[Users],
        writes: &[],
    },
];

/// What to show for a path
#[derive(Debug, PartialEq, Eq)]
pub enum RouteDecision {
    /// Session restore has not finished
    Loading,
    /// No identity: every path shows the login page
    Login,
    Render(&'static RouteSpec),
    Redirect(&'static str),
}

pub fn home(role: Role) -> &'static str {
    match role {
        Role::Admin => "/admin",
        Role::SiteManager => "/site",
    }
}

pub fn routes_for(role: Role) -> &'static [RouteSpec] {
    match role {
        Role::Admin => ADMIN_ROUTES,
        Role::SiteManager => SITE_ROUTES,
    }
}

/// Check whether a route pattern matches a concrete path
/// Pattern format: "/admin/projects" or "/admin/projects/:id"
fn pattern_matches(pattern: &str, path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or("");
    let path = path.trim_end_matches('/');

    let mut pattern_parts = pattern.split('/');
    let mut path_parts = path.split('/');
    loop {
        match (pattern_parts.next(), path_parts.next()) {
            (None, None) => return true,
            (Some(p), Some(s)) if p.starts_with(':') => {
                if s.is_empty() {
                    return false;
                }
            }
            (Some(p), Some(s)) if p == s => {}
            _ => return false,
        }
    }
}

pub fn find_route(role: Role, path: &str) -> Option<&'static RouteSpec> {
    routes_for(role)
        .iter()
        .find(|route| pattern_matches(route.pattern, path))
}

/// Decide what a path shows for the current session
pub fn resolve(state: &SessionState, path: &str) -> RouteDecision {
    let identity = match state {
        SessionState::Loading => return RouteDecision::Loading,
        SessionState::Unauthenticated => return RouteDecision::Login,
        SessionState::Authenticated(identity) => identity,
    };

    match find_route(identity.role, path) {
        Some(route) => RouteDecision::Render(route),
        None => RouteDecision::Redirect(home(identity.role)),
    }
}

/// Whether any page of the role shows the collection
pub fn role_can_access(role: Role, collection: Collection) -> bool {
    routes_for(role)
        .iter()
        .any(|route| route.collections.contains(&collection))
}

/// Whether any page of the role saves to the collection
pub fn role_can_write(role: Role, collection: Collection) -> bool {
    routes_for(role)
        .iter()
        .any(|route| route.writes.contains(&collection))
}
