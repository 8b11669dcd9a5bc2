use crate::chanting::{can_modify, selectable_dates, HistoryTable, SortDirection};
use crate::errors::{ApiError, AppError};
use crate::guard::{
    GuardDecision, ProtectedRoute, CHANTING_ROUTE, DASHBOARD_ROUTE, LOGIN_PATH, PROFILE_PATH,
    PROFILE_ROUTE,
};
use crate::models::{ChantingEntry, DashboardStats, NewChantingEntry, Page, UserProfile};
use crate::notify::Notifier;
use crate::state::AppState;
use crate::stats::{summarize, DashboardRange};
use crate::ui::{
    render_chanting, render_dashboard, render_login, render_profile, render_signup,
    render_unauthorized, render_waiting, ChantingView, ProfileView,
};
use crate::validation::{
    parse_rounds, FieldErrors, ProfileForm, SignupForm, DEFAULT_COUNTRY_CODE,
};
use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use tracing::warn;

const CHANTING_PAGE: &str = "/chanting";
const STILL_SIGNING_IN: &str = "Still signing in, please try again";

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    page: Option<u32>,
    size: Option<u32>,
    direction: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EntryForm {
    #[serde(default)]
    rounds: String,
    #[serde(default)]
    date: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    #[serde(default)]
    date: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    range: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileQuery {
    edit: Option<String>,
}

/// Google Identity Services posts the ID token as `credential`.
#[derive(Debug, Deserialize)]
pub struct GoogleCredential {
    #[serde(default)]
    credential: String,
}

pub async fn index() -> Redirect {
    Redirect::to(CHANTING_PAGE)
}

pub async fn login_page(State(state): State<AppState>) -> Response {
    if state.session.is_authenticated() {
        return Redirect::to(CHANTING_PAGE).into_response();
    }
    let notices = state.notices.drain();
    Html(render_login(state.config.google_client_id.as_deref(), &notices)).into_response()
}

pub async fn google_login(
    State(state): State<AppState>,
    Form(form): Form<GoogleCredential>,
) -> Redirect {
    if form.credential.trim().is_empty() {
        state.notices.error("Google sign-in did not return a credential");
        return Redirect::to(LOGIN_PATH);
    }
    match state.auth.google_login(form.credential.trim()).await {
        Ok(user) => {
            state.session.login(user);
            Redirect::to(CHANTING_PAGE)
        }
        Err(err) => {
            warn!("google login failed: {err}");
            Redirect::to(LOGIN_PATH)
        }
    }
}

pub async fn signup_page(State(state): State<AppState>) -> Html<String> {
    let notices = state.notices.drain();
    Html(render_signup(&SignupForm::default(), &FieldErrors::default(), &notices))
}

pub async fn signup(State(state): State<AppState>, Form(form): Form<SignupForm>) -> Response {
    match state.auth.signup(&form).await {
        Ok(_) => Redirect::to(LOGIN_PATH).into_response(),
        Err(ApiError::Validation(errors)) => {
            let notices = state.notices.drain();
            Html(render_signup(&form, &errors, &notices)).into_response()
        }
        Err(_) => {
            // The form stays filled in so the user can retry.
            let notices = state.notices.drain();
            Html(render_signup(&form, &FieldErrors::default(), &notices)).into_response()
        }
    }
}

pub async fn logout(State(state): State<AppState>) -> Redirect {
    state.session.logout().await;
    Redirect::to(LOGIN_PATH)
}

pub async fn logout_all(State(state): State<AppState>) -> Redirect {
    state.session.logout_all().await;
    Redirect::to(LOGIN_PATH)
}

pub async fn chanting_page(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let user = match guard(&state, CHANTING_ROUTE) {
        Ok(user) => user,
        Err(response) => return response,
    };

    let direction = query
        .direction
        .as_deref()
        .and_then(SortDirection::parse)
        .unwrap_or_default();
    let mut table = HistoryTable::new(
        query.page.unwrap_or(1),
        query.size.unwrap_or_default(),
        direction,
    );

    let page = match state.chanting.list(&table.to_request()).await {
        Ok(page) => page,
        Err(err) if err.is_auth_failure() => return signed_out(&state).await,
        Err(_) => Page::new(Vec::new(), 1),
    };
    table.observe(&page);

    let view = ChantingView {
        user: &user,
        table: &table,
        entries: &page.content,
        today: today(),
        notices: state.notices.drain(),
    };
    Html(render_chanting(&view)).into_response()
}

pub async fn add_entry(State(state): State<AppState>, Form(form): Form<EntryForm>) -> Response {
    if let Err(response) = guard_submit(&state, CHANTING_ROUTE) {
        return response;
    }

    let today = today();
    let Some(date) = parse_date(&form.date).filter(|date| selectable_dates(today).contains(date))
    else {
        state.notices.error("Pick a date within the last five days");
        return Redirect::to(CHANTING_PAGE).into_response();
    };
    let rounds = match parse_rounds(&form.rounds) {
        Ok(rounds) => rounds,
        Err(errors) => return reject(&state, &errors, CHANTING_PAGE),
    };

    let entry = NewChantingEntry {
        chanting_date: date,
        chanting_rounds: rounds,
    };
    match state.chanting.add(&entry).await {
        Err(err) if err.is_auth_failure() => signed_out(&state).await,
        // Success and domain errors both land back on the first page.
        _ => Redirect::to(CHANTING_PAGE).into_response(),
    }
}

pub async fn edit_entry(
    State(state): State<AppState>,
    Path(chanting_id): Path<i64>,
    Form(form): Form<EntryForm>,
) -> Response {
    if let Err(response) = guard_submit(&state, CHANTING_ROUTE) {
        return response;
    }

    let Some(date) = parse_date(&form.date).filter(|date| can_modify(*date, today())) else {
        state.notices.error("Only entries from the last five days can be changed");
        return Redirect::to(CHANTING_PAGE).into_response();
    };
    let rounds = match parse_rounds(&form.rounds) {
        Ok(rounds) => rounds,
        Err(errors) => return reject(&state, &errors, CHANTING_PAGE),
    };

    let entry = ChantingEntry {
        chanting_id,
        chanting_date: date,
        chanting_rounds: rounds,
    };
    match state.chanting.update(&entry).await {
        Err(err) if err.is_auth_failure() => signed_out(&state).await,
        _ => Redirect::to(CHANTING_PAGE).into_response(),
    }
}

pub async fn delete_entry(
    State(state): State<AppState>,
    Path(chanting_id): Path<i64>,
    Form(form): Form<DeleteForm>,
) -> Response {
    if let Err(response) = guard_submit(&state, CHANTING_ROUTE) {
        return response;
    }

    if !parse_date(&form.date).is_some_and(|date| can_modify(date, today())) {
        state.notices.error("Only entries from the last five days can be deleted");
        return Redirect::to(CHANTING_PAGE).into_response();
    }

    match state.chanting.delete(chanting_id).await {
        Err(err) if err.is_auth_failure() => signed_out(&state).await,
        _ => Redirect::to(CHANTING_PAGE).into_response(),
    }
}

pub async fn dashboard_page(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Response {
    let user = match guard(&state, DASHBOARD_ROUTE) {
        Ok(user) => user,
        Err(response) => return response,
    };

    let range = query
        .range
        .as_deref()
        .and_then(DashboardRange::from_key)
        .unwrap_or_default();
    let stats = match state.chanting.dashboard(range, today()).await {
        Ok(stats) => stats,
        Err(err) if err.is_auth_failure() => return signed_out(&state).await,
        Err(_) => DashboardStats::default(),
    };

    let summary = summarize(&stats);
    let notices = state.notices.drain();
    Html(render_dashboard(&user, range, &summary, &notices)).into_response()
}

pub async fn profile_page(
    State(state): State<AppState>,
    Query(query): Query<ProfileQuery>,
) -> Response {
    let cached = match guard(&state, PROFILE_ROUTE) {
        Ok(user) => user,
        Err(response) => return response,
    };

    let user = match state.users.get().await {
        Ok(user) => user,
        Err(err) if err.is_auth_failure() => return signed_out(&state).await,
        Err(_) => cached,
    };

    // Inactive accounts land here to finish their profile.
    let editing = query.edit.is_some() || user.is_inactive();
    let view = ProfileView {
        form: profile_form(&user),
        user: &user,
        errors: FieldErrors::default(),
        editing,
        notices: state.notices.drain(),
    };
    Html(render_profile(&view)).into_response()
}

pub async fn update_profile(
    State(state): State<AppState>,
    Form(form): Form<ProfileForm>,
) -> Response {
    let cached = match guard_submit(&state, PROFILE_ROUTE) {
        Ok(user) => user,
        Err(response) => return response,
    };

    let changes = match form.validate() {
        Ok(changes) => changes,
        Err(errors) => {
            let view = ProfileView {
                user: &cached,
                form,
                errors,
                editing: true,
                notices: state.notices.drain(),
            };
            return Html(render_profile(&view)).into_response();
        }
    };

    let current = match state.users.get().await {
        Ok(user) => user,
        Err(err) if err.is_auth_failure() => return signed_out(&state).await,
        Err(_) => cached,
    };

    match state.users.update(&current, changes).await {
        Ok(_) => {
            // Status or roles may have changed server-side.
            state.session.refresh().await;
            Redirect::to(PROFILE_PATH).into_response()
        }
        Err(err) if err.is_auth_failure() => signed_out(&state).await,
        Err(_) => {
            let view = ProfileView {
                user: &current,
                form,
                errors: FieldErrors::default(),
                editing: true,
                notices: state.notices.drain(),
            };
            Html(render_profile(&view)).into_response()
        }
    }
}

pub async fn not_found() -> AppError {
    AppError::not_found("Page not found")
}

pub async fn unauthorized_page(State(state): State<AppState>) -> Html<String> {
    let user = state.session.user();
    Html(render_unauthorized(user.as_ref()))
}

/// Runs the route guard for a page view; `Err` carries the response to send
/// instead of the page.
fn guard(state: &AppState, route: ProtectedRoute) -> Result<UserProfile, Response> {
    admit(state, route, || Html(render_waiting(route.path)).into_response())
}

/// The guard for form posts. A submission made while the identity check is
/// still running goes back to its page with a notice instead of a reload.
fn guard_submit(state: &AppState, route: ProtectedRoute) -> Result<UserProfile, Response> {
    admit(state, route, || {
        state.notices.error(STILL_SIGNING_IN);
        Redirect::to(route.path).into_response()
    })
}

fn admit(
    state: &AppState,
    route: ProtectedRoute,
    waiting: impl FnOnce() -> Response,
) -> Result<UserProfile, Response> {
    let session = state.session.snapshot();
    match route.evaluate(&session) {
        GuardDecision::Render => session
            .user()
            .cloned()
            .ok_or_else(|| Redirect::to(LOGIN_PATH).into_response()),
        GuardDecision::Wait => Err(waiting()),
        GuardDecision::Redirect { to, .. } => Err(Redirect::to(to).into_response()),
    }
}

/// The session could not be recovered. Resynchronise with the server (which
/// clears it) and send the user to sign in again.
async fn signed_out(state: &AppState) -> Response {
    if state.session.is_authenticated() {
        state.session.refresh().await;
    }
    Redirect::to(LOGIN_PATH).into_response()
}

fn reject(state: &AppState, errors: &FieldErrors, back: &str) -> Response {
    for (_, message) in errors.iter() {
        state.notices.error(message);
    }
    Redirect::to(back).into_response()
}

fn profile_form(user: &UserProfile) -> ProfileForm {
    ProfileForm {
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        country_code: if user.country_code.is_empty() {
            DEFAULT_COUNTRY_CODE.to_string()
        } else {
            user.country_code.clone()
        },
        phone_number: user.phone_number.clone(),
        committed_rounds: user.committed_rounds.to_string(),
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
