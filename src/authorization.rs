//! Role-based route and affordance authorization.
//!
//! Every rule is an allow-list of roles, evaluated purely from the
//! current role:
//! 1. Signed out → DENY (every rule)
//! 2. Empty allow-list → ALLOW (any signed-in identity)
//! 3. Role in allow-list → ALLOW
//! 4. Default → DENY
//!
//! Denied routes redirect; they never render partially.

use serde::{Deserialize, Serialize};

use crate::auth::SessionGate;
use crate::models::Role;

const ANY: &[Role] = &[];
const ADMIN: &[Role] = &[Role::Administrator];
const ADMIN_STAFF: &[Role] = &[Role::Administrator, Role::Staff];
const ADMIN_VET: &[Role] = &[Role::Administrator, Role::Veterinarian];
const VET: &[Role] = &[Role::Veterinarian];

// ═══════════════════════════════════════════════════════════
// Rules
// ═══════════════════════════════════════════════════════════

/// A named route or action paired with the roles allowed to use it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationRule {
    pub name: &'static str,
    /// Empty means any signed-in identity.
    pub allowed: &'static [Role],
}

impl AuthorizationRule {
    pub fn permits(&self, role: Option<Role>) -> bool {
        is_role_allowed(role, self.allowed)
    }
}

/// The core predicate. No identity fails every rule.
pub fn is_role_allowed(role: Option<Role>, required: &[Role]) -> bool {
    match role {
        None => false,
        Some(_) if required.is_empty() => true,
        Some(role) => required.contains(&role),
    }
}

// ═══════════════════════════════════════════════════════════
// Routes
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Login,
    Dashboard,
    Pets,
    Owners,
    Appointments,
    Billing,
    Inventory,
    Staff,
    Reports,
    Settings,
}

/// Where under-privileged users are sent. Reachable by every role.
pub const LANDING_ROUTE: Route = Route::Dashboard;

impl Route {
    /// Routes behind the gate, in navigation order.
    pub const PROTECTED: [Route; 9] = [
        Route::Dashboard,
        Route::Pets,
        Route::Owners,
        Route::Appointments,
        Route::Billing,
        Route::Inventory,
        Route::Staff,
        Route::Reports,
        Route::Settings,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Dashboard => "/",
            Self::Pets => "/pets",
            Self::Owners => "/owners",
            Self::Appointments => "/appointments",
            Self::Billing => "/billing",
            Self::Inventory => "/inventory",
            Self::Staff => "/staff",
            Self::Reports => "/reports",
            Self::Settings => "/settings",
        }
    }

    /// Match a path (ignoring a trailing slash and sub-paths such as
    /// `/pets/42`) to its route.
    pub fn from_path(path: &str) -> Option<Route> {
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            return Some(Self::Dashboard);
        }
        let first = trimmed.trim_start_matches('/').split('/').next()?;
        std::iter::once(Self::Login)
            .chain(Self::PROTECTED)
            .find(|r| r.path().trim_start_matches('/') == first)
    }

    pub fn is_public(self) -> bool {
        matches!(self, Self::Login)
    }

    pub fn rule(self) -> AuthorizationRule {
        let (name, allowed) = match self {
            Self::Login => ("login", ANY),
            Self::Dashboard => ("dashboard", ANY),
            Self::Pets => ("pets", ANY),
            Self::Owners => ("owners", ANY),
            Self::Appointments => ("appointments", ANY),
            Self::Billing => ("billing", ADMIN_STAFF),
            Self::Inventory => ("inventory", ADMIN_VET),
            Self::Staff => ("staff", ADMIN),
            Self::Reports => ("reports", ADMIN),
            Self::Settings => ("settings", ADMIN),
        };
        AuthorizationRule { name, allowed }
    }
}

/// What the router should do with a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    RedirectToLogin,
    RedirectToLanding(Route),
}

/// Route protection for a given role. Pure.
pub fn decide(role: Option<Role>, route: Route) -> RouteDecision {
    if route.is_public() {
        // Signed-in users have no business on the login view.
        return match role {
            Some(_) => RouteDecision::RedirectToLanding(LANDING_ROUTE),
            None => RouteDecision::Allow,
        };
    }
    match role {
        None => RouteDecision::RedirectToLogin,
        Some(_) if route.rule().permits(role) => RouteDecision::Allow,
        Some(_) => RouteDecision::RedirectToLanding(LANDING_ROUTE),
    }
}

/// Route protection against the gate's current identity.
pub fn guard(gate: &SessionGate, route: Route) -> RouteDecision {
    let role = gate.current_role();
    let decision = decide(role, route);
    if decision != RouteDecision::Allow {
        tracing::debug!(route = route.path(), ?role, ?decision, "Navigation redirected");
    }
    decision
}

/// Navigation entries the role may see. Empty when signed out.
pub fn visible_routes(role: Option<Role>) -> Vec<Route> {
    Route::PROTECTED
        .into_iter()
        .filter(|r| r.rule().permits(role))
        .collect()
}

// ═══════════════════════════════════════════════════════════
// Affordances
// ═══════════════════════════════════════════════════════════

/// In-page actions that are hidden (not disabled) for other roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Affordance {
    DeleteRecords,
    ManageStaff,
    IssueRefund,
    AdjustInventory,
    EditMedicalNotes,
    BookAppointment,
    ExportReports,
}

impl Affordance {
    pub fn rule(self) -> AuthorizationRule {
        let (name, allowed) = match self {
            Self::DeleteRecords => ("delete_records", ADMIN),
            Self::ManageStaff => ("manage_staff", ADMIN),
            Self::IssueRefund => ("issue_refund", ADMIN_STAFF),
            Self::AdjustInventory => ("adjust_inventory", ADMIN_VET),
            Self::EditMedicalNotes => ("edit_medical_notes", VET),
            Self::BookAppointment => ("book_appointment", ANY),
            Self::ExportReports => ("export_reports", ADMIN),
        };
        AuthorizationRule { name, allowed }
    }
}

pub fn can(gate: &SessionGate, affordance: Affordance) -> bool {
    gate.is_authorized(affordance.rule().allowed)
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
