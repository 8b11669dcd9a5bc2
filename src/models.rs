use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Error code the backend sends when the user is fully logged out and a
/// session refresh must not be attempted.
pub const TERMINAL_AUTH_ERROR_CODE: &str = "00001";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    pub const USER: &'static str = "USER";
    pub const ADMIN: &'static str = "ADMIN";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn user() -> Self {
        Self::new(Self::USER)
    }

    pub fn admin() -> Self {
        Self::new(Self::ADMIN)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

impl UserStatus {
    pub fn label(self) -> &'static str {
        match self {
            UserStatus::Active => "ACTIVE",
            UserStatus::Inactive => "INACTIVE",
        }
    }
}

/// Server-owned profile. Fields the client does not know about are kept in
/// `extra` so an update sends them back untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub email: String,
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: BTreeSet<Role>,
    pub status: UserStatus,
    pub committed_rounds: u32,
    pub country_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    pub fn has_identity(&self) -> bool {
        !self.email.trim().is_empty()
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    pub fn is_inactive(&self) -> bool {
        self.status == UserStatus::Inactive
    }

    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_string()
        }
    }

    /// Calendar date of `createdAt`, whatever time and zone suffix the server
    /// appends.
    pub fn signed_up_on(&self) -> Option<NaiveDate> {
        let raw = self.created_at.as_deref()?;
        let date = raw.get(..10)?;
        NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
    }
}

/// The sign-in endpoint has answered both with the bare user and with the user
/// wrapped in `userDto`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LoginResponse {
    Wrapped {
        #[serde(rename = "userDto")]
        user_dto: UserProfile,
    },
    Bare(UserProfile),
}

impl LoginResponse {
    pub fn into_user(self) -> UserProfile {
        match self {
            LoginResponse::Wrapped { user_dto } => user_dto,
            LoginResponse::Bare(user) => user,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChantingEntry {
    pub chanting_id: i64,
    pub chanting_date: NaiveDate,
    pub chanting_rounds: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChantingEntry {
    pub chanting_date: NaiveDate,
    pub chanting_rounds: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    #[serde(default)]
    total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, total_pages: u32) -> Self {
        Self {
            content,
            total_pages,
        }
    }

    /// An empty result still has one (empty) page.
    pub fn total_pages(&self) -> u32 {
        self.total_pages.max(1)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub committed_rounds: u32,
    pub ideal_rounds: u32,
    pub average_rounds: f64,
    pub current_streak: u32,
    pub chanting_dto_list: Vec<ChantingEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorEnvelope {
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl ErrorEnvelope {
    /// Non-JSON or empty bodies yield an empty envelope.
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    pub fn is_terminal(&self) -> bool {
        self.error_code.as_deref() == Some(TERMINAL_AUTH_ERROR_CODE)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleLoginRequest<'a> {
    pub id_token: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_response_accepts_wrapped_and_bare_users() {
        let wrapped: LoginResponse =
            serde_json::from_str(r#"{"userDto":{"email":"a@b.com","roles":["USER"]}}"#).unwrap();
        assert_eq!(wrapped.into_user().email, "a@b.com");

        let bare: LoginResponse =
            serde_json::from_str(r#"{"email":"c@d.com","roles":["ADMIN"]}"#).unwrap();
        let user = bare.into_user();
        assert_eq!(user.email, "c@d.com");
        assert!(user.has_role(&Role::admin()));
    }

    #[test]
    fn profile_keeps_unknown_fields_for_updates() {
        let user: UserProfile = serde_json::from_str(
            r#"{"email":"a@b.com","status":"INACTIVE","facilitatorName":"Guru","createdAt":"2024-03-02T10:11:12"}"#,
        )
        .unwrap();
        assert!(user.is_inactive());
        assert_eq!(user.signed_up_on(), NaiveDate::from_ymd_opt(2024, 3, 2));

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["facilitatorName"], "Guru");
        assert_eq!(json["status"], "INACTIVE");
    }

    #[test]
    fn page_with_no_total_still_has_one_page() {
        let page: Page<ChantingEntry> = serde_json::from_str(r#"{"content":[]}"#).unwrap();
        assert_eq!(page.total_pages(), 1);
    }

    #[test]
    fn only_the_distinguished_code_is_terminal() {
        assert!(ErrorEnvelope::parse(r#"{"errorCode":"00001"}"#).is_terminal());
        assert!(!ErrorEnvelope::parse(r#"{"errorCode":"00002"}"#).is_terminal());
        assert!(!ErrorEnvelope::parse("<html>").is_terminal());
    }
}
