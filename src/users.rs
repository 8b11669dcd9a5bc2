use crate::errors::ApiError;
use crate::http::{ApiClient, RequestOptions};
use crate::models::{GoogleLoginRequest, LoginResponse, UserProfile};
use crate::notify::{surface_error, Notifier};
use crate::validation::{ProfileUpdate, SignupForm};
use std::sync::Arc;

pub const USERS_PATH: &str = "/api/users";
pub const GOOGLE_LOGIN_PATH: &str = "/auth/google";
pub const SIGNUP_PATH: &str = "/auth/user";

#[derive(Clone)]
pub struct UserApi {
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
}

impl UserApi {
    pub fn new(client: ApiClient, notifier: Arc<dyn Notifier>) -> Self {
        Self { client, notifier }
    }

    pub async fn get(&self) -> Result<UserProfile, ApiError> {
        self.client
            .get(USERS_PATH, RequestOptions::new())
            .await
            .inspect_err(|err| surface_error(&*self.notifier, err, "Failed to fetch user"))
    }

    /// Sends the whole profile back with the edited fields applied and returns
    /// the server's copy.
    pub async fn update(
        &self,
        current: &UserProfile,
        changes: ProfileUpdate,
    ) -> Result<UserProfile, ApiError> {
        let profile = UserProfile {
            first_name: changes.first_name,
            last_name: changes.last_name,
            country_code: changes.country_code,
            phone_number: changes.phone_number,
            committed_rounds: changes.committed_rounds,
            ..current.clone()
        };
        let updated = self
            .client
            .put(USERS_PATH, &profile)
            .await
            .inspect_err(|err| surface_error(&*self.notifier, err, "Failed to update user"))?;
        self.notifier.success("User updated");
        Ok(updated)
    }
}

#[derive(Clone)]
pub struct AuthApi {
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
}

impl AuthApi {
    pub fn new(client: ApiClient, notifier: Arc<dyn Notifier>) -> Self {
        Self { client, notifier }
    }

    /// Exchanges a Google ID token for a backend session. The caller hands
    /// the returned user to the session manager.
    pub async fn google_login(&self, id_token: &str) -> Result<UserProfile, ApiError> {
        let response: LoginResponse = self
            .client
            .post(GOOGLE_LOGIN_PATH, &GoogleLoginRequest { id_token })
            .await
            .inspect_err(|err| {
                self.notifier.error(&format!(
                    "Unauthorized user: {}",
                    err.user_message("sign-in failed")
                ))
            })?;
        Ok(response.into_user())
    }

    pub async fn signup(&self, form: &SignupForm) -> Result<UserProfile, ApiError> {
        let form = form.validate().map_err(ApiError::Validation)?;
        let user: UserProfile = self
            .client
            .post(SIGNUP_PATH, &form)
            .await
            .inspect_err(|err| surface_error(&*self.notifier, err, "Failed to add user"))?;
        self.notifier.success(&format!("{} user created", user.email));
        Ok(user)
    }
}
