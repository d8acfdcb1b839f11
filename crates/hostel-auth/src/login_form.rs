//! Login form types and client-side identifier checks.

use crate::{AuthError, AuthResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Institute email domain required for staff logins.
pub const INSTITUTE_EMAIL_DOMAIN: &str = "@iiitkottayam.ac.in";

const STUDENT_FAILURE_MESSAGE: &str =
    "Invalid roll number or password. Format: YYYYgroupXXXX (e.g., 2023bcy1234)";
const STAFF_FAILURE_MESSAGE: &str =
    "Invalid email or password. Use your @iiitkottayam.ac.in email";

fn roll_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(2021|2022|2023|2024)(bcs|bcd|bcy|bec)\d{4}$").expect("valid roll number regex")
    })
}

/// Which login form the credentials came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginType {
    /// Roll number login.
    Student,
    /// Institute email login for wardens, hostel staff and workers.
    Staff,
}

impl LoginType {
    /// Value sent as `login_type`.
    pub fn wire_name(&self) -> &'static str {
        match self {
            LoginType::Student => "student",
            LoginType::Staff => "staff",
        }
    }

    /// Message shown when the server rejects a login without saying why.
    pub fn generic_failure_message(&self) -> &'static str {
        match self {
            LoginType::Student => STUDENT_FAILURE_MESSAGE,
            LoginType::Staff => STAFF_FAILURE_MESSAGE,
        }
    }

    /// Check the identifier's shape before anything is sent.
    pub fn validate_identifier(&self, identifier: &str) -> AuthResult<()> {
        let identifier = identifier.trim();
        let valid = match self {
            LoginType::Student => is_roll_number(identifier),
            LoginType::Staff => is_institute_email(identifier),
        };
        if valid {
            Ok(())
        } else {
            Err(AuthError::Validation(
                self.generic_failure_message().to_string(),
            ))
        }
    }

    /// Full form check: identifier shape plus a non-empty password.
    pub fn validate(&self, identifier: &str, password: &str) -> AuthResult<()> {
        self.validate_identifier(identifier)?;
        if password.is_empty() {
            return Err(AuthError::Validation("Password is required".to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for LoginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for LoginType {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "student" => Ok(LoginType::Student),
            "staff" => Ok(LoginType::Staff),
            other => Err(AuthError::Validation(format!(
                "Unknown login type: {}",
                other
            ))),
        }
    }
}

/// Roll numbers look like `2023bcy1234`: intake year, programme, serial.
pub fn is_roll_number(value: &str) -> bool {
    roll_number_pattern().is_match(value)
}

pub fn is_institute_email(value: &str) -> bool {
    match value.strip_suffix(INSTITUTE_EMAIL_DOMAIN) {
        Some(local) => !local.is_empty() && !local.contains('@') && !local.contains(char::is_whitespace),
        None => false,
    }
}
