use crate::models::Role;
use crate::session::SessionState;

pub const LOGIN_PATH: &str = "/login";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";
pub const PROFILE_PATH: &str = "/profile";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Identity check still running; show a waiting indicator.
    Wait,
    Render,
    Redirect { to: &'static str, replace: bool },
}

/// A guarded page and the roles that may open it. An empty role list means
/// any signed-in user.
#[derive(Debug, Clone, Copy)]
pub struct ProtectedRoute {
    pub path: &'static str,
    pub roles: &'static [&'static str],
}

pub const CHANTING_ROUTE: ProtectedRoute = ProtectedRoute {
    path: "/chanting",
    roles: &[Role::USER, Role::ADMIN],
};

pub const DASHBOARD_ROUTE: ProtectedRoute = ProtectedRoute {
    path: "/dashboard",
    roles: &[Role::USER, Role::ADMIN],
};

pub const PROFILE_ROUTE: ProtectedRoute = ProtectedRoute {
    path: PROFILE_PATH,
    roles: &[],
};

impl ProtectedRoute {
    pub fn evaluate(&self, session: &SessionState) -> GuardDecision {
        let roles: Vec<Role> = self.roles.iter().map(|name| Role::new(*name)).collect();
        evaluate(session, &roles, self.path)
    }
}

pub fn evaluate(session: &SessionState, required_roles: &[Role], path: &str) -> GuardDecision {
    let user = match session {
        SessionState::Loading => return GuardDecision::Wait,
        SessionState::Anonymous => {
            return GuardDecision::Redirect {
                to: LOGIN_PATH,
                replace: true,
            };
        }
        SessionState::Authenticated(user) => user,
    };

    if !required_roles.is_empty() && !required_roles.iter().any(|role| user.has_role(role)) {
        return GuardDecision::Redirect {
            to: UNAUTHORIZED_PATH,
            replace: true,
        };
    }

    // Inactive accounts must complete their profile first.
    if user.is_inactive() && path != PROFILE_PATH {
        return GuardDecision::Redirect {
            to: PROFILE_PATH,
            replace: true,
        };
    }

    GuardDecision::Render
}
