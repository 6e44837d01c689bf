//! Role-gated route table.
//!
//! A route is matched by its longest registered prefix on a segment
//! boundary: `/admin/tickets` falls under `/admin`, `/administrator` does not.

use crate::types::{Role, UserProfile};
use serde::{Deserialize, Serialize};

/// Where anonymous users are sent
pub const LOGIN_PATH: &str = "/login";

/// Where signed-in users without the right role are sent
pub const HOME_PATH: &str = "/";

/// Who may open a route
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    /// Anyone
    Public,
    /// Any signed-in user
    SignedIn,
    /// Signed-in users holding one of these roles
    Roles(&'static [Role]),
}

/// Outcome of a guard check
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RouteDecision {
    /// Render the route
    Allow,
    /// Not signed in; go to [`LOGIN_PATH`]
    RedirectToLogin,
    /// Signed in with the wrong role; go to [`HOME_PATH`]
    RedirectHome,
}

impl RouteDecision {
    /// Path to render for `requested` under this decision
    #[must_use]
    pub const fn target(self, requested: &str) -> &str {
        match self {
            Self::Allow => requested,
            Self::RedirectToLogin => LOGIN_PATH,
            Self::RedirectHome => HOME_PATH,
        }
    }
}

const STAFF: &[Role] = &[Role::Player, Role::Manager, Role::Admin];
const MANAGEMENT: &[Role] = &[Role::Manager, Role::Admin];
const ADMIN: &[Role] = &[Role::Admin];

/// Protected prefixes. Anything not listed is public.
pub const ROUTE_TABLE: &[(&str, Access)] = &[
    ("/admin", Access::Roles(ADMIN)),
    ("/manager", Access::Roles(MANAGEMENT)),
    ("/player", Access::Roles(STAFF)),
    ("/cart", Access::SignedIn),
    ("/checkout", Access::SignedIn),
    ("/profile", Access::SignedIn),
    ("/orders", Access::SignedIn),
];

fn under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Access rule for a path
#[must_use]
pub fn access_for(path: &str) -> Access {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    ROUTE_TABLE
        .iter()
        .filter(|(prefix, _)| under(path, prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map_or(Access::Public, |(_, access)| *access)
}

/// Decide whether `user` may open `path`
#[must_use]
pub fn guard(path: &str, user: Option<&UserProfile>) -> RouteDecision {
    match (access_for(path), user) {
        (Access::Public, _) => RouteDecision::Allow,
        (_, None) => RouteDecision::RedirectToLogin,
        (Access::SignedIn, Some(_)) => RouteDecision::Allow,
        (Access::Roles(roles), Some(user)) if roles.contains(&user.role) => RouteDecision::Allow,
        (Access::Roles(_), Some(_)) => RouteDecision::RedirectHome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;

    fn user(role: Role) -> UserProfile {
        UserProfile {
            id: UserId::new(),
            username: "sam".into(),
            email: "sam@example.com".into(),
            role,
        }
    }

    #[test]
    fn anonymous_users_are_sent_to_login() {
        assert_eq!(guard("/admin", None), RouteDecision::RedirectToLogin);
        assert_eq!(guard("/cart", None), RouteDecision::RedirectToLogin);
        assert_eq!(guard("/tickets", None), RouteDecision::Allow);
        assert_eq!(guard("/", None), RouteDecision::Allow);
    }

    #[test]
    fn role_table() {
        let cases = [
            ("/admin/tickets", Role::Admin, RouteDecision::Allow),
            ("/admin/tickets", Role::Manager, RouteDecision::RedirectHome),
            ("/manager", Role::Manager, RouteDecision::Allow),
            ("/manager", Role::Admin, RouteDecision::Allow),
            ("/manager", Role::Player, RouteDecision::RedirectHome),
            ("/player/training", Role::Player, RouteDecision::Allow),
            ("/player", Role::Fan, RouteDecision::RedirectHome),
            ("/orders", Role::Fan, RouteDecision::Allow),
            ("/checkout?step=2", Role::Fan, RouteDecision::Allow),
        ];
        for (path, role, expected) in cases {
            assert_eq!(guard(path, Some(&user(role))), expected, "{path} as {role:?}");
        }
    }

    #[test]
    fn prefixes_match_on_segment_boundaries() {
        assert_eq!(access_for("/administrator"), Access::Public);
        assert_eq!(access_for("/cartography"), Access::Public);
        assert_eq!(access_for("/cart/"), Access::SignedIn);
    }

    #[test]
    fn decision_targets() {
        assert_eq!(RouteDecision::Allow.target("/cart"), "/cart");
        assert_eq!(RouteDecision::RedirectToLogin.target("/cart"), LOGIN_PATH);
        assert_eq!(RouteDecision::RedirectHome.target("/admin"), HOME_PATH);
    }
}
