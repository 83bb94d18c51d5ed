// src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,

    /// Unique username.
    pub username: String,

    /// Unique email, used as the login identifier.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password_hash: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of a user, as returned by registration and embedded as a comment author.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    #[validate(length(
        min = 3,
        max = 30,
        message = "Username must be between 3 and 30 characters long"
    ))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_rules() {
        let ok = RegisterRequest {
            username: "abc".into(),
            email: "abc@example.com".into(),
            password: "123456".into(),
        };
        assert!(ok.validate().is_ok());

        let short_name = RegisterRequest { username: "ab".into(), ..ok_clone(&ok) };
        assert!(short_name.validate().is_err());

        let long_name = RegisterRequest { username: "a".repeat(31), ..ok_clone(&ok) };
        assert!(long_name.validate().is_err());

        let bad_email = RegisterRequest { email: "nope".into(), ..ok_clone(&ok) };
        assert!(bad_email.validate().is_err());

        let short_password = RegisterRequest { password: "12345".into(), ..ok_clone(&ok) };
        assert!(short_password.validate().is_err());
    }

    fn ok_clone(req: &RegisterRequest) -> RegisterRequest {
        RegisterRequest {
            username: req.username.clone(),
            email: req.email.clone(),
            password: req.password.clone(),
        }
    }

    #[test]
    fn serialized_user_has_no_hash() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: "carol".into(),
            email: "carol@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&user).unwrap();

        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "carol");
    }

    #[test]
    fn login_response_uses_camel_case_token() {
        let json = serde_json::to_value(LoginResponse { access_token: "t".into() }).unwrap();
        assert_eq!(json["accessToken"], "t");
    }
}
