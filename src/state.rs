use crate::chanting::ChantingApi;
use crate::config::Config;
use crate::cookies::CookieJar;
use crate::errors::ApiError;
use crate::events::{AuthEvents, AuthExpiredNotifier};
use crate::http::ApiClient;
use crate::notify::{NoticeBoard, Notifier};
use crate::session::SessionManager;
use crate::users::{AuthApi, UserApi};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: Arc<SessionManager>,
    pub chanting: ChantingApi,
    pub users: UserApi,
    pub auth: AuthApi,
    pub notices: Arc<NoticeBoard>,
}

impl AppState {
    /// Wires the request client, session manager and resource clients
    /// around one cookie jar and one auth-expired channel.
    pub fn new(config: Config, cookies: Arc<CookieJar>) -> Result<Self, ApiError> {
        let events = AuthEvents::new();
        let expiry: Arc<dyn AuthExpiredNotifier> = events.clone();
        let client = ApiClient::from_config(&config, cookies, expiry)?;

        let notices = Arc::new(NoticeBoard::default());
        let notifier: Arc<dyn Notifier> = notices.clone();

        Ok(Self {
            session: Arc::new(SessionManager::new(client.clone(), &events)),
            chanting: ChantingApi::new(client.clone(), notifier.clone()),
            users: UserApi::new(client.clone(), notifier.clone()),
            auth: AuthApi::new(client, notifier),
            notices,
            config: Arc::new(config),
        })
    }
}
