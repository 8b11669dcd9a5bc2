use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/login", get(handlers::login_page))
        .route("/login/google", post(handlers::google_login))
        .route("/signup", get(handlers::signup_page).post(handlers::signup))
        .route("/logout", post(handlers::logout))
        .route("/logout-all", post(handlers::logout_all))
        .route("/chanting", get(handlers::chanting_page).post(handlers::add_entry))
        .route("/chanting/:id/edit", post(handlers::edit_entry))
        .route("/chanting/:id/delete", post(handlers::delete_entry))
        .route("/dashboard", get(handlers::dashboard_page))
        .route("/profile", get(handlers::profile_page).post(handlers::update_profile))
        .route("/unauthorized", get(handlers::unauthorized_page))
        .fallback(handlers::not_found)
        .with_state(state)
}
