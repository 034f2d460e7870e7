//! Request validation — explicit schemas that turn a loose JSON body into a
//! typed request or a set of field errors.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::model::{LoginRequest, ProcessRequest, RegisterRequest};

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const NOT_A_STRING: &str = "Not a valid string.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";

pub const MESSAGE_MAX_LEN: usize = 255;
pub const EMAIL_MAX_LEN: usize = 254;
pub const USERNAME_MAX_LEN: usize = 150;
pub const PASSWORD_MIN_LEN: usize = 8;

/// Key used for errors that are not tied to one field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password12", "password123", "passw0rd", "12345678",
    "123456789", "1234567890", "qwerty123", "qwertyuiop", "iloveyou", "sunshine",
    "princess", "football", "baseball", "welcome1", "letmein1", "abc12345",
    "trustno1", "superman", "starwars", "whatever", "11111111", "00000000",
    "1q2w3e4r", "zaq12wsx", "asdfghjk", "michael1", "dragon123", "monkey123",
];

/// Field name → list of messages. Serializes as `{"field": ["msg", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single non-field error.
    pub fn non_field(message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(NON_FIELD_ERRORS, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{}: {}", field, messages.join(" "))?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

// ── Schemas ───────────────────────────────────────────────────────────────────

/// `{email, message}` for `/process/`.
pub fn validate_process(body: &Value) -> Result<ProcessRequest, FieldErrors> {
    let mut errors = FieldErrors::new();

    let email = required_str(body, "email", true, &mut errors);
    if let Some(ref email) = email {
        check_email(email, &mut errors);
    }

    let message = required_str(body, "message", true, &mut errors);
    if let Some(ref message) = message {
        if message.chars().count() > MESSAGE_MAX_LEN {
            errors.add(
                "message",
                format!("Ensure this field has no more than {MESSAGE_MAX_LEN} characters."),
            );
        }
    }

    errors.into_result(|| ProcessRequest {
        email: email.unwrap_or_default(),
        message: message.unwrap_or_default(),
    })
}

/// `{username, email, password}` for `/register/`.
pub fn validate_registration(body: &Value) -> Result<RegisterRequest, FieldErrors> {
    let mut errors = FieldErrors::new();

    let username = required_str(body, "username", true, &mut errors);
    if let Some(ref username) = username {
        check_username(username, &mut errors);
    }

    let email = optional_str(body, "email", &mut errors).unwrap_or_default();
    if !email.is_empty() {
        check_email(&email, &mut errors);
    }

    let password = required_str(body, "password", false, &mut errors);
    if let Some(ref password) = password {
        for problem in password_problems(password, username.as_deref().unwrap_or(""), &email) {
            errors.add("password", problem);
        }
    }

    errors.into_result(|| RegisterRequest {
        username: username.unwrap_or_default(),
        email,
        password: password.unwrap_or_default(),
    })
}

/// `{username, password}` for `/login/`.
pub fn validate_login(body: &Value) -> Result<LoginRequest, FieldErrors> {
    let mut errors = FieldErrors::new();
    let username = required_str(body, "username", true, &mut errors);
    let password = required_str(body, "password", false, &mut errors);
    errors.into_result(|| LoginRequest {
        username: username.unwrap_or_default(),
        password: password.unwrap_or_default(),
    })
}

// ── Field checks ──────────────────────────────────────────────────────────────

fn required_str(body: &Value, field: &str, trim: bool, errors: &mut FieldErrors) -> Option<String> {
    match body.get(field) {
        None | Some(Value::Null) => {
            errors.add(field, REQUIRED);
            None
        }
        Some(Value::String(s)) => {
            let s = if trim { s.trim() } else { s.as_str() };
            if s.is_empty() {
                errors.add(field, BLANK);
                None
            } else {
                Some(s.to_string())
            }
        }
        Some(_) => {
            errors.add(field, NOT_A_STRING);
            None
        }
    }
}

fn optional_str(body: &Value, field: &str, errors: &mut FieldErrors) -> Option<String> {
    match body.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(_) => {
            errors.add(field, NOT_A_STRING);
            None
        }
    }
}

fn check_username(username: &str, errors: &mut FieldErrors) {
    if username.chars().count() > USERNAME_MAX_LEN {
        errors.add(
            "username",
            format!("Ensure this field has no more than {USERNAME_MAX_LEN} characters."),
        );
    }
    let valid = username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));
    if !valid {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
}

fn check_email(email: &str, errors: &mut FieldErrors) {
    if email.chars().count() > EMAIL_MAX_LEN {
        errors.add(
            "email",
            format!("Ensure this field has no more than {EMAIL_MAX_LEN} characters."),
        );
    }
    if !is_valid_email(email) {
        errors.add("email", INVALID_EMAIL);
    }
}

/// Structural address check: one `@`, a non-empty local part, and a dotted
/// domain made of non-empty alphanumeric/hyphen labels.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.contains('@') || local.len() > 64 {
        return false;
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    let local_ok = local.chars().all(|c| {
        c.is_ascii_alphanumeric() || "!#$%&'*+/=?^_`{|}~.-".contains(c)
    });
    if !local_ok {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    labels.iter().all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_alphanumeric() || c == '-')
    })
}

/// Every password-policy violation for `password`, given the account's
/// other attributes.
pub fn password_problems(password: &str, username: &str, email: &str) -> Vec<String> {
    let mut problems = Vec::new();

    if password.chars().count() < PASSWORD_MIN_LEN {
        problems.push(format!(
            "This password is too short. It must contain at least {PASSWORD_MIN_LEN} characters."
        ));
    }

    let lowered = password.to_lowercase();
    let email_local = email.split('@').next().unwrap_or("");
    let similar = [("username", username), ("email address", email_local)]
        .into_iter()
        .find(|(_, attr)| {
            let attr = attr.to_lowercase();
            attr.chars().count() >= 3 && (lowered.contains(&attr) || attr.contains(&lowered))
        });
    if let Some((label, _)) = similar {
        problems.push(format!("The password is too similar to the {label}."));
    }

    if COMMON_PASSWORDS.contains(&lowered.trim()) {
        problems.push("This password is too common.".to_string());
    }

    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }

    problems
}
