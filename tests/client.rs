mod common;

use chanting_tracker::chanting::{ChantingApi, PageRequest};
use chanting_tracker::guard::{self, GuardDecision};
use chanting_tracker::models::{NewChantingEntry, Role, UserProfile};
use chanting_tracker::notify::{NoticeBoard, NoticeLevel, Notifier};
use chanting_tracker::stats::DashboardRange;
use chanting_tracker::users::{AuthApi, UserApi};
use chanting_tracker::{
    ApiClient, ApiError, AuthEvents, AuthExpiredNotifier, CookieJar, RequestOptions,
    SessionManager, SessionState, Subscription,
};
use chrono::NaiveDate;
use common::{AuthMode, MockBackend, GOOD_ID_TOKEN};
use reqwest::StatusCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    backend: MockBackend,
    client: ApiClient,
    events: Arc<AuthEvents>,
    notices: Arc<NoticeBoard>,
    expired: Arc<AtomicUsize>,
    _counter: Subscription,
}

impl Harness {
    async fn start() -> Self {
        let backend = MockBackend::start().await;
        Self::against(backend)
    }

    fn against(backend: MockBackend) -> Self {
        let events = AuthEvents::new();
        let notifier: Arc<dyn AuthExpiredNotifier> = events.clone();
        let client = ApiClient::new(
            &backend.base_url,
            Arc::new(CookieJar::in_memory()),
            notifier,
            Duration::from_secs(5),
        )
        .expect("build client");

        let expired = Arc::new(AtomicUsize::new(0));
        let counter = {
            let expired = Arc::clone(&expired);
            events.subscribe(move || {
                expired.fetch_add(1, Ordering::SeqCst);
            })
        };

        Self {
            backend,
            client,
            events,
            notices: Arc::new(NoticeBoard::default()),
            expired,
            _counter: counter,
        }
    }

    fn notifier(&self) -> Arc<dyn Notifier> {
        self.notices.clone()
    }

    fn auth(&self) -> AuthApi {
        AuthApi::new(self.client.clone(), self.notifier())
    }

    fn chanting(&self) -> ChantingApi {
        ChantingApi::new(self.client.clone(), self.notifier())
    }

    fn session(&self) -> SessionManager {
        SessionManager::new(self.client.clone(), &self.events)
    }

    async fn sign_in(&self) -> UserProfile {
        self.auth().google_login(GOOD_ID_TOKEN).await.expect("google login")
    }

    fn expired_count(&self) -> usize {
        self.expired.load(Ordering::SeqCst)
    }
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn expired_session_is_refreshed_once_and_retried() {
    let harness = Harness::start().await;
    harness.sign_in().await;
    harness.backend.expire_session().await;

    let user: UserProfile = harness
        .client
        .get("/api/users", RequestOptions::new())
        .await
        .expect("retried request succeeds");

    assert_eq!(user.email, "a@b.com");
    assert_eq!(harness.backend.refresh_calls().await, 1);
    assert_eq!(harness.expired_count(), 0);
}

#[tokio::test]
async fn second_unauthorized_publishes_expiry_once() {
    let harness = Harness::start().await;
    harness.sign_in().await;
    harness.backend.set_mode(AuthMode::AlwaysUnauthorized).await;

    let err = harness
        .client
        .get::<UserProfile>("/api/users", RequestOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized { .. }));
    assert_eq!(harness.backend.refresh_calls().await, 1);
    assert_eq!(harness.expired_count(), 1);
}

#[tokio::test]
async fn terminal_code_skips_refresh() {
    let harness = Harness::start().await;
    harness.sign_in().await;
    harness.backend.set_mode(AuthMode::Revoked).await;

    let err = harness
        .client
        .get::<UserProfile>("/api/users", RequestOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized { ref envelope } if envelope.is_terminal()));
    assert_eq!(harness.backend.refresh_calls().await, 0);
    assert_eq!(harness.expired_count(), 1);
}

#[tokio::test]
async fn failed_refresh_is_returned_to_caller() {
    let harness = Harness::start().await;
    harness.sign_in().await;
    harness.backend.expire_session().await;
    harness.backend.set_mode(AuthMode::RefreshBroken).await;

    let err = harness
        .client
        .get::<UserProfile>("/api/users", RequestOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ApiError::RefreshFailed { status: StatusCode::UNAUTHORIZED, .. }
    ));
    assert_eq!(harness.backend.refresh_calls().await, 1);
    assert_eq!(harness.expired_count(), 0);
}

#[tokio::test]
async fn domain_errors_are_not_retried() {
    let harness = Harness::start().await;
    harness.sign_in().await;

    let err = harness.chanting().delete(999).await.unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(harness.backend.refresh_calls().await, 0);
    let notices = harness.notices.drain();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert_eq!(notices[0].message, "Record not found");
}

#[tokio::test]
async fn startup_without_cookies_is_anonymous_until_login() {
    let harness = Harness::start().await;
    let session = harness.session();
    assert!(session.is_loading());

    let state = session.load().await;
    assert_eq!(state, SessionState::Anonymous);
    assert_eq!(
        guard::CHANTING_ROUTE.evaluate(&state),
        GuardDecision::Redirect { to: guard::LOGIN_PATH, replace: true }
    );

    let user = harness.sign_in().await;
    session.login(user);

    let state = session.snapshot();
    assert!(state.is_authenticated());
    assert!(session.has_role(&Role::user()));
    assert_eq!(guard::CHANTING_ROUTE.evaluate(&state), GuardDecision::Render);
    assert_eq!(
        guard::evaluate(&state, &[Role::admin()], "/admin"),
        GuardDecision::Redirect { to: guard::UNAUTHORIZED_PATH, replace: true }
    );
}

#[tokio::test]
async fn startup_with_live_cookies_restores_the_user() {
    let harness = Harness::start().await;
    harness.sign_in().await;

    let session = harness.session();
    let state = session.load().await;

    assert_eq!(state.user().map(|user| user.email.as_str()), Some("a@b.com"));
    assert_eq!(harness.backend.identity_calls().await, 1);
}

#[tokio::test]
async fn logout_clears_session_even_when_backend_is_down() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let events = AuthEvents::new();
    let client = ApiClient::new(
        &dead_url,
        Arc::new(CookieJar::in_memory()),
        events.clone(),
        Duration::from_secs(2),
    )
    .unwrap();
    let session = SessionManager::new(client, &events);
    session.login(UserProfile {
        email: "a@b.com".to_string(),
        roles: [Role::user()].into_iter().collect(),
        ..UserProfile::default()
    });
    assert!(session.is_authenticated());

    session.logout().await;

    assert_eq!(session.snapshot(), SessionState::Anonymous);
    assert!(session.roles().is_empty());
}

#[tokio::test]
async fn logout_all_revokes_refresh() {
    let harness = Harness::start().await;
    let session = harness.session();
    session.login(harness.sign_in().await);

    session.logout_all().await;
    assert_eq!(session.snapshot(), SessionState::Anonymous);

    let state = session.refresh().await;
    assert_eq!(state, SessionState::Anonymous);
}

#[tokio::test]
async fn auth_expiry_clears_the_session() {
    let harness = Harness::start().await;
    let session = harness.session();
    session.login(harness.sign_in().await);
    harness.backend.set_mode(AuthMode::Revoked).await;

    let err = harness.chanting().list(&PageRequest::default()).await.unwrap_err();

    assert!(err.is_auth_failure());
    assert_eq!(session.snapshot(), SessionState::Anonymous);
    // Auth failures are handled by the redirect, not a toast.
    assert!(harness.notices.drain().is_empty());
}

#[tokio::test]
async fn stale_identity_response_does_not_override_login() {
    let harness = Harness::start().await;
    let session = harness.session();
    session.login(harness.sign_in().await);
    harness
        .backend
        .set_identity_delay(Duration::from_millis(300))
        .await;

    let newer = UserProfile {
        email: "other@b.com".to_string(),
        roles: [Role::admin()].into_iter().collect(),
        ..UserProfile::default()
    };
    let (state, ()) = tokio::join!(session.refresh(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.login(newer.clone());
    });

    assert_eq!(state.user().map(|user| user.email.as_str()), Some("other@b.com"));
    assert!(session.has_role(&Role::admin()));
}

#[tokio::test]
async fn added_entry_leads_a_descending_list() {
    let harness = Harness::start().await;
    harness.sign_in().await;
    let chanting = harness.chanting();

    chanting
        .add(&NewChantingEntry {
            chanting_date: day(2024, 1, 1),
            chanting_rounds: 16,
        })
        .await
        .expect("add entry");

    let page = chanting.list(&PageRequest::default()).await.expect("list");
    assert_eq!(page.content[0].chanting_date, day(2024, 1, 1));
    assert_eq!(page.content[0].chanting_rounds, 16);
    assert_eq!(page.content.len(), 3);
    assert_eq!(page.total_pages(), 1);

    let notices = harness.notices.drain();
    assert_eq!(notices.last().map(|n| n.message.as_str()), Some("Record added"));
}

#[tokio::test]
async fn update_and_delete_round_through_the_backend() {
    let harness = Harness::start().await;
    harness.sign_in().await;
    let chanting = harness.chanting();
    let id = harness.backend.insert_entry("2024-02-01", 4).await;

    let page = chanting.list(&PageRequest::default()).await.unwrap();
    let mut entry = page
        .content
        .into_iter()
        .find(|entry| entry.chanting_id == id)
        .unwrap();
    entry.chanting_rounds = 8;
    let updated = chanting.update(&entry).await.unwrap();
    assert_eq!(updated.chanting_rounds, 8);

    chanting.delete(id).await.unwrap();
    assert!(harness.backend.entries().await.iter().all(|e| e.id != id));

    let messages: Vec<String> = harness
        .notices
        .drain()
        .into_iter()
        .map(|notice| notice.message)
        .collect();
    assert_eq!(messages, ["Record updated", "Record deleted"]);
}

#[tokio::test]
async fn invalid_rounds_never_reach_the_backend() {
    let harness = Harness::start().await;
    harness.sign_in().await;
    let before = harness.backend.entries().await.len();

    let err = harness
        .chanting()
        .add(&NewChantingEntry {
            chanting_date: day(2024, 1, 1),
            chanting_rounds: 0,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Validation(_)));
    assert_eq!(harness.backend.entries().await.len(), before);
}

#[tokio::test]
async fn dashboard_asks_for_the_selected_window() {
    let harness = Harness::start().await;
    harness.sign_in().await;
    harness.backend.insert_entry("2024-03-09", 20).await;
    harness.backend.insert_entry("2023-11-01", 8).await;

    let stats = harness
        .chanting()
        .dashboard(DashboardRange::Week, day(2024, 3, 10))
        .await
        .unwrap();

    assert_eq!(stats.committed_rounds, 16);
    assert_eq!(stats.chanting_dto_list.len(), 1);
    assert_eq!(stats.chanting_dto_list[0].chanting_date, day(2024, 3, 9));
    assert_eq!(stats.average_rounds, 20.0);
}

#[tokio::test]
async fn unknown_google_account_is_rejected() {
    let harness = Harness::start().await;

    let err = harness.auth().google_login("forged").await.unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
    assert_eq!(harness.backend.refresh_calls().await, 0);
    let notices = harness.notices.drain();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, "Unauthorized user: Unknown Google account");
}

#[tokio::test]
async fn profile_update_returns_server_copy() {
    let harness = Harness::start().await;
    let current = harness.sign_in().await;
    let users = UserApi::new(harness.client.clone(), harness.notifier());

    let form = chanting_tracker::validation::ProfileForm {
        first_name: "Radha".into(),
        last_name: "Devi".into(),
        country_code: "+91".into(),
        phone_number: "9876500000".into(),
        committed_rounds: "32".into(),
    };
    let updated = users.update(&current, form.validate().unwrap()).await.unwrap();

    assert_eq!(updated.last_name, "Devi");
    assert_eq!(updated.committed_rounds, 32);
    assert_eq!(updated.email, "a@b.com");
    let fetched = users.get().await.unwrap();
    assert_eq!(fetched.phone_number, "9876500000");
}
