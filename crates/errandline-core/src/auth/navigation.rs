use super::{Role, SessionState};

/// Top-level route group the front end should be showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavRoot {
    Welcome,
    Dispatcher,
    Vendor,
}

/// Route groups that never trigger a redirect while logged out.
const AUTH_SEGMENTS: [&str; 2] = ["welcome", "login"];
const NOT_FOUND_SEGMENT: &str = "+not-found";

impl NavRoot {
    pub fn for_session(state: &SessionState) -> Self {
        match state.logged_in_role() {
            Some(Role::Dispatcher) => NavRoot::Dispatcher,
            Some(Role::Vendor) => NavRoot::Vendor,
            None => NavRoot::Welcome,
        }
    }

    pub fn segment(&self) -> &'static str {
        match self {
            NavRoot::Welcome => "welcome",
            NavRoot::Dispatcher => "dispatcher",
            NavRoot::Vendor => "vendor",
        }
    }

    pub fn path(&self) -> String {
        format!("/{}", self.segment())
    }

    fn contains(&self, segment: &str) -> bool {
        match self {
            NavRoot::Welcome => AUTH_SEGMENTS.contains(&segment),
            _ => segment == self.segment(),
        }
    }
}

/// Where to send the user when the first route segment doesn't belong to
/// the session's root. `None` means stay put.
pub fn redirect(state: &SessionState, current_segment: Option<&str>) -> Option<NavRoot> {
    let segment = current_segment.unwrap_or("");
    if segment == NOT_FOUND_SEGMENT {
        return None;
    }
    let root = NavRoot::for_session(state);
    if root.contains(segment) {
        None
    } else {
        Some(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logged_in(role: Role) -> SessionState {
        SessionState {
            is_logged_in: true,
            role: Some(role),
            user: None,
            token: Some("tok".to_string()),
        }
    }

    #[test]
    fn test_for_session() {
        assert_eq!(NavRoot::for_session(&SessionState::logged_out()), NavRoot::Welcome);
        assert_eq!(NavRoot::for_session(&logged_in(Role::Vendor)), NavRoot::Vendor);
        assert_eq!(NavRoot::for_session(&logged_in(Role::Dispatcher)), NavRoot::Dispatcher);

        // A role without a login is still logged out
        let stale = SessionState { role: Some(Role::Vendor), ..SessionState::default() };
        assert_eq!(NavRoot::for_session(&stale), NavRoot::Welcome);
    }

    #[test]
    fn test_redirect_logged_out() {
        let state = SessionState::logged_out();
        assert_eq!(redirect(&state, Some("welcome")), None);
        assert_eq!(redirect(&state, Some("login")), None);
        assert_eq!(redirect(&state, Some("+not-found")), None);
        assert_eq!(redirect(&state, Some("vendor")), Some(NavRoot::Welcome));
        assert_eq!(redirect(&state, None), Some(NavRoot::Welcome));
    }

    #[test]
    fn test_redirect_logged_in() {
        let vendor = logged_in(Role::Vendor);
        assert_eq!(redirect(&vendor, Some("vendor")), None);
        assert_eq!(redirect(&vendor, Some("login")), Some(NavRoot::Vendor));
        assert_eq!(redirect(&vendor, Some("dispatcher")), Some(NavRoot::Vendor));
        assert_eq!(NavRoot::Vendor.path(), "/vendor");

        let dispatcher = logged_in(Role::Dispatcher);
        assert_eq!(redirect(&dispatcher, Some("welcome")), Some(NavRoot::Dispatcher));
        assert_eq!(redirect(&dispatcher, Some("+not-found")), None);
    }
}
