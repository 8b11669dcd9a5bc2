pub mod app;
pub mod chanting;
pub mod config;
pub mod cookies;
pub mod errors;
pub mod events;
pub mod guard;
pub mod handlers;
pub mod http;
pub mod models;
pub mod notify;
pub mod session;
pub mod state;
pub mod stats;
pub mod ui;
pub mod users;
pub mod validation;

pub use app::router;
pub use config::Config;
pub use cookies::CookieJar;
pub use errors::{ApiError, AppError};
pub use events::{AuthEvents, AuthExpiredNotifier, Subscription};
pub use guard::GuardDecision;
pub use http::{ApiClient, RequestOptions};
pub use session::{SessionManager, SessionState};
pub use state::AppState;
