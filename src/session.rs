//! Auth session manager: the one place that decides who is logged in.
//!
//! State lives in a `watch` channel so readers can observe it. Every write
//! takes a generation ticket first; an identity lookup only lands if no other
//! write happened while it was in flight.

use crate::events::{AuthEvents, Subscription};
use crate::http::{ApiClient, RequestOptions};
use crate::models::{Role, UserProfile};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{info, warn};

pub const IDENTITY_PATH: &str = "/api/users/auth";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const LOGOUT_ALL_PATH: &str = "/auth/logoutAll";

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Loading,
    Authenticated(UserProfile),
    Anonymous,
}

impl SessionState {
    /// A user without an email is no identity at all.
    pub fn from_user(user: Option<UserProfile>) -> Self {
        match user {
            Some(user) if user.has_identity() => SessionState::Authenticated(user),
            _ => SessionState::Anonymous,
        }
    }

    pub fn user(&self) -> Option<&UserProfile> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn roles(&self) -> BTreeSet<Role> {
        self.user().map(|user| user.roles.clone()).unwrap_or_default()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.user().is_some_and(|user| user.has_role(role))
    }
}

struct Inner {
    client: ApiClient,
    state: watch::Sender<SessionState>,
    generation: AtomicU64,
}

impl Inner {
    fn ticket(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn set(&self, state: SessionState) {
        self.ticket();
        self.state.send_replace(state);
    }

    /// Writes `state` only if `ticket` is still the latest one.
    fn set_if_current(&self, ticket: u64, state: SessionState) -> bool {
        self.state.send_if_modified(|current| {
            if self.generation.load(Ordering::SeqCst) != ticket {
                return false;
            }
            *current = state;
            true
        })
    }

    fn expire(&self) {
        if self.state.borrow().is_authenticated() {
            info!("session expired, clearing user");
        }
        self.set(SessionState::Anonymous);
    }
}

pub struct SessionManager {
    inner: Arc<Inner>,
    _expiry: Subscription,
}

impl SessionManager {
    /// Starts in `Loading`; call [`SessionManager::load`] once at startup.
    pub fn new(client: ApiClient, events: &Arc<AuthEvents>) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        let inner = Arc::new(Inner {
            client,
            state,
            generation: AtomicU64::new(0),
        });

        let weak: Weak<Inner> = Arc::downgrade(&inner);
        let expiry = events.subscribe(move || {
            if let Some(inner) = weak.upgrade() {
                inner.expire();
            }
        });

        Self {
            inner,
            _expiry: expiry,
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.inner.state.borrow().user().cloned()
    }

    pub fn roles(&self) -> BTreeSet<Role> {
        self.inner.state.borrow().roles()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading()
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.inner.state.borrow().has_role(role)
    }

    /// Startup identity check: `Loading` becomes `Authenticated` or
    /// `Anonymous`.
    pub async fn load(&self) -> SessionState {
        self.resync().await
    }

    /// Re-runs the identity check, e.g. after a profile change. The current
    /// state stays visible until the answer arrives.
    pub async fn refresh(&self) -> SessionState {
        self.resync().await
    }

    /// Trusts the sign-in response directly; no identity round-trip.
    pub fn login(&self, user: UserProfile) {
        let state = SessionState::from_user(Some(user));
        if let SessionState::Authenticated(user) = &state {
            info!("logged in as {}", user.email);
        }
        self.inner.set(state);
    }

    pub async fn logout(&self) {
        self.end_session(LOGOUT_PATH).await;
    }

    pub async fn logout_all(&self) {
        self.end_session(LOGOUT_ALL_PATH).await;
    }

    async fn end_session(&self, path: &str) {
        if let Err(err) = self.inner.client.post_unit(path, &serde_json::json!({})).await {
            warn!("{path} failed, clearing local session anyway: {err}");
        }
        info!("logged out");
        self.inner.set(SessionState::Anonymous);
    }

    async fn resync(&self) -> SessionState {
        let ticket = self.inner.ticket();
        let state = match self
            .inner
            .client
            .get::<UserProfile>(IDENTITY_PATH, RequestOptions::new())
            .await
        {
            Ok(user) => SessionState::from_user(Some(user)),
            Err(err) => {
                info!("identity check failed: {err}");
                SessionState::Anonymous
            }
        };

        if !self.inner.set_if_current(ticket, state) {
            info!("discarding stale identity response");
        }
        self.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str, roles: &[&str]) -> UserProfile {
        UserProfile {
            email: email.to_string(),
            roles: roles.iter().map(|r| Role::new(*r)).collect(),
            ..UserProfile::default()
        }
    }

    #[test]
    fn no_user_has_no_roles() {
        for state in [SessionState::Loading, SessionState::Anonymous] {
            assert!(!state.has_role(&Role::user()));
            assert!(!state.has_role(&Role::admin()));
            assert!(state.roles().is_empty());
        }
    }

    #[test]
    fn has_role_is_membership() {
        let state = SessionState::from_user(Some(user("a@b.com", &["USER"])));
        assert!(state.is_authenticated());
        assert!(state.has_role(&Role::user()));
        assert!(!state.has_role(&Role::admin()));
    }

    #[test]
    fn empty_email_is_anonymous() {
        assert_eq!(
            SessionState::from_user(Some(user("  ", &["USER"]))),
            SessionState::Anonymous
        );
        assert_eq!(SessionState::from_user(None), SessionState::Anonymous);
    }
}
