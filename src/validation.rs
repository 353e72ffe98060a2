use chrono::{NaiveDate, NaiveTime};
use lazy_static::lazy_static;
use regex::Regex;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::errors::AppError;

lazy_static! {
    /// Characters allowed in a username: word characters plus @/./+/-
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[\w.@+-]+$").unwrap();
}

/// Tasks submitted without an explicit time are treated as due at the
/// very end of the day.
pub const DEFAULT_DUE_TIME: NaiveTime = match NaiveTime::from_hms_opt(23, 59, 0) {
    Some(t) => t,
    None => panic!("23:59 is a valid wall-clock time"),
};

/// Parses the `YYYY-MM-DD` value produced by the date picker. Anything
/// unparsable is an error for the caller to surface; it is never
/// replaced with a default.
pub fn parse_due_date(value: &str) -> Result<NaiveDate, AppError> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::InvalidTemporalValue(value.to_string()))
}

/// Parses the `HH:MM` value produced by the time picker. An empty
/// field means "no preference" and gets the end-of-day default; a
/// non-empty value that does not parse is rejected.
pub fn parse_due_time(value: &str) -> Result<NaiveTime, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(DEFAULT_DUE_TIME);
    }
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| AppError::InvalidTemporalValue(value.to_string()))
}

/// Registration form rules.
#[derive(Debug, Validate)]
pub struct RegisterFormValidation {
    #[validate(
        length(min = 1, max = 150, message = "Username must be 1 to 150 characters long."),
        custom(
            function = validate_username_chars,
            message = "Usernames may only contain letters, digits and @/./+/-/_ characters."
        )
    )]
    pub username: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters long."))]
    pub password: String,
}

impl RegisterFormValidation {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    pub fn validate_form(&self) -> Result<(), Vec<String>> {
        collect_messages(self.validate())
    }
}

/// Task create/edit form rules. Emptiness of the required fields is
/// checked by the controller first, with one combined message; these
/// rules bound the lengths.
#[derive(Debug, Validate)]
pub struct TaskFormValidation {
    #[validate(length(min = 1, max = 100, message = "Module must be at most 100 characters."))]
    pub module_name: String,

    #[validate(length(min = 1, max = 200, message = "Title must be at most 200 characters."))]
    pub title: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters."))]
    pub description: String,
}

impl TaskFormValidation {
    pub fn new(module_name: &str, title: &str, description: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            title: title.to_string(),
            description: description.to_string(),
        }
    }

    pub fn validate_form(&self) -> Result<(), Vec<String>> {
        collect_messages(self.validate())
    }
}

/// Settings form rules. The invariant is only `due_soon_days >= 0`;
/// the upper bound just keeps the lookahead window sane.
#[derive(Debug, Validate)]
pub struct SettingsFormValidation {
    #[validate(range(min = 0, max = 365, message = "Due-soon window must be 0 to 365 days."))]
    pub due_soon_days: i32,
}

impl SettingsFormValidation {
    pub fn new(due_soon_days: i32) -> Self {
        Self { due_soon_days }
    }

    pub fn validate_form(&self) -> Result<(), Vec<String>> {
        collect_messages(self.validate())
    }
}

fn validate_username_chars(username: &str) -> Result<(), ValidationError> {
    if USERNAME_REGEX.is_match(username) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_username_chars"))
    }
}

/// Flattens validator's field/error map into the flash-ready messages
/// the controllers show.
fn collect_messages(result: Result<(), ValidationErrors>) -> Result<(), Vec<String>> {
    match result {
        Ok(()) => Ok(()),
        Err(errors) => {
            let mut messages = Vec::new();
            for (field, field_errors) in errors.field_errors() {
                for error in field_errors {
                    let msg = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field));
                    messages.push(msg);
                }
            }
            Err(messages)
        }
    }
}
