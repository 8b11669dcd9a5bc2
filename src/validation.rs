//! Client-side form checks. Anything rejected here never reaches the network.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

pub const MAX_COMMITTED_ROUNDS: u32 = 500;
pub const DEFAULT_COUNTRY_CODE: &str = "+91";

static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{10}$").expect("valid phone regex"));
static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex")
});

/// Inline messages keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

/// Parses the rounds input the way the entry form does: non-digits are
/// dropped, and the remaining number must be positive.
pub fn parse_rounds(input: &str) -> Result<u32, FieldErrors> {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    let mut errors = FieldErrors::default();
    if digits.is_empty() {
        errors.add("rounds", "Please enter rounds");
        return Err(errors);
    }
    match digits.parse::<u32>() {
        Ok(0) => errors.add("rounds", "Rounds must be a positive number"),
        Ok(rounds) => return Ok(rounds),
        Err(_) => errors.add("rounds", "Rounds value is too large"),
    }
    Err(errors)
}

pub fn check_rounds(rounds: u32) -> Result<u32, FieldErrors> {
    let mut errors = FieldErrors::default();
    if rounds == 0 {
        errors.add("rounds", "Rounds must be a positive number");
    }
    errors.into_result(rounds)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    pub country_code: String,
    pub phone_number: String,
    pub committed_rounds: String,
}

/// A profile form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub country_code: String,
    pub phone_number: String,
    pub committed_rounds: u32,
}

impl ProfileForm {
    pub fn validate(&self) -> Result<ProfileUpdate, FieldErrors> {
        let mut errors = FieldErrors::default();
        let first_name = self.first_name.trim();
        let last_name = self.last_name.trim();
        let phone_number = self.phone_number.trim();
        let country_code = self.country_code.trim();

        if first_name.chars().count() < 2 {
            errors.add("first_name", "Minimum 2 characters");
        }
        if last_name.chars().count() < 2 {
            errors.add("last_name", "Minimum 2 characters");
        }
        if country_code.is_empty() {
            errors.add("country_code", "Country code required");
        }
        if !PHONE.is_match(phone_number) {
            errors.add("phone_number", "Phone number must be 10 digits");
        }

        // An empty field counts as zero, leading zeros are ignored.
        let raw = self.committed_rounds.trim().trim_start_matches('0');
        let committed_rounds = if raw.is_empty() {
            0
        } else {
            match raw.parse::<u32>() {
                Ok(value) if value <= MAX_COMMITTED_ROUNDS => value,
                Ok(_) => {
                    errors.add("committed_rounds", "Maximum 500 rounds");
                    0
                }
                Err(_) => {
                    errors.add("committed_rounds", "Committed rounds must be a number");
                    0
                }
            }
        };

        errors.into_result(ProfileUpdate {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            country_code: country_code.to_string(),
            phone_number: phone_number.to_string(),
            committed_rounds,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct SignupForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub country_code: String,
    pub phone_number: String,
    pub facilitator_name: String,
}

impl Default for SignupForm {
    fn default() -> Self {
        Self {
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
            phone_number: String::new(),
            facilitator_name: String::new(),
        }
    }
}

impl SignupForm {
    /// Returns the trimmed form when every field passes.
    pub fn validate(&self) -> Result<SignupForm, FieldErrors> {
        let mut errors = FieldErrors::default();
        let form = SignupForm {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            country_code: self.country_code.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
            facilitator_name: self.facilitator_name.trim().to_string(),
        };

        if form.first_name.chars().count() < 2 {
            errors.add("first_name", "First name is required");
        }
        if form.last_name.chars().count() < 2 {
            errors.add("last_name", "Last name is required");
        }
        if !EMAIL.is_match(&form.email) {
            errors.add("email", "Invalid email address");
        }
        if form.country_code.is_empty() {
            errors.add("country_code", "Country code required");
        }
        if !PHONE.is_match(&form.phone_number) {
            errors.add("phone_number", "Phone number must be 10 digits");
        }
        if form.facilitator_name.chars().count() < 2 {
            errors.add("facilitator_name", "Facilitator name is required");
        }

        errors.into_result(form)
    }
}
