//! Persisted user record.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of an authenticated user. Decides which dashboards they may open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Student,
    Warden,
    HostelStaff,
    Worker,
}

impl UserType {
    pub const ALL: [UserType; 4] = [
        UserType::Student,
        UserType::Warden,
        UserType::HostelStaff,
        UserType::Worker,
    ];

    /// Wire name, as sent by the backend in `user_type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Student => "student",
            UserType::Warden => "warden",
            UserType::HostelStaff => "hostel_staff",
            UserType::Worker => "worker",
        }
    }

    /// Landing dashboard route for this role.
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            UserType::Student => "/SDash",
            UserType::Warden => "/Wmain",
            UserType::HostelStaff => "/HDash",
            UserType::Worker => "/PDash",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a `user_type` string names no known role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownUserType(pub String);

impl fmt::Display for UnknownUserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown user type: {}", self.0)
    }
}

impl std::error::Error for UnknownUserType {}

impl FromStr for UserType {
    type Err = UnknownUserType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserType::ALL
            .into_iter()
            .find(|user_type| user_type.as_str() == s)
            .ok_or_else(|| UnknownUserType(s.to_string()))
    }
}

/// The cached identity of the logged-in user, stored under `user_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub user_type: UserType,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roll_number: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_type_wire_names() {
        for user_type in UserType::ALL {
            assert_eq!(user_type.as_str().parse::<UserType>().unwrap(), user_type);
            assert_eq!(
                serde_json::to_string(&user_type).unwrap(),
                format!("\"{}\"", user_type.as_str())
            );
        }
    }

    #[test]
    fn test_unknown_user_type() {
        let err = "admin".parse::<UserType>().unwrap_err();
        assert_eq!(err, UnknownUserType("admin".to_string()));
    }

    #[test]
    fn test_dashboard_paths() {
        assert_eq!(UserType::Student.dashboard_path(), "/SDash");
        assert_eq!(UserType::Warden.dashboard_path(), "/Wmain");
        assert_eq!(UserType::HostelStaff.dashboard_path(), "/HDash");
        assert_eq!(UserType::Worker.dashboard_path(), "/PDash");
    }

    #[test]
    fn test_user_record_json_layout() {
        let user = UserRecord {
            username: "2023bcy1234".to_string(),
            user_type: UserType::Student,
            email: Some("student@iiitkottayam.ac.in".to_string()),
            roll_number: Some("2023bcy1234".to_string()),
        };

        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["username"], "2023bcy1234");
        assert_eq!(value["user_type"], "student");
        assert_eq!(value["email"], "student@iiitkottayam.ac.in");
        assert_eq!(value["roll_number"], "2023bcy1234");
    }

    #[test]
    fn test_user_record_optional_fields_default() {
        let user: UserRecord =
            serde_json::from_str(r#"{"username":"w1","user_type":"worker"}"#).unwrap();
        assert_eq!(user.user_type, UserType::Worker);
        assert!(user.email.is_none());
        assert!(user.roll_number.is_none());
    }
}
