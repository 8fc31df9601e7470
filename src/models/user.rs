use crate::errors::FieldViolation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::ValidateEmail;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 30;
pub const PASSWORD_MIN_LEN: usize = 8;

/// Stored user. Never serialized to clients; see [`PublicUser`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        PublicUser {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct Claims {
    pub sub: String,   // Subject (user ID)
    pub email: String, // User email
    pub exp: i64,      // Expiration time
    pub iat: i64,      // Issued at
}

#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct RegisterRequest {
    // Absent fields deserialize empty and are reported by `validate`.
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl RegisterRequest {
    /// Trims the username and canonicalizes the email. The password is left as typed.
    pub fn normalized(self) -> Self {
        RegisterRequest {
            username: self.username.trim().to_string(),
            email: normalize_email(&self.email),
            password: self.password,
        }
    }

    pub fn validate(&self) -> Vec<FieldViolation> {
        let mut violations = Vec::new();

        let username_len = self.username.chars().count();
        if self.username.is_empty() {
            violations.push(FieldViolation::new("username", "Username is required"));
        } else if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&username_len) {
            violations.push(FieldViolation::new(
                "username",
                format!(
                    "Username must be between {} and {} characters long",
                    USERNAME_MIN_LEN, USERNAME_MAX_LEN
                ),
            ));
        }

        if self.email.is_empty() {
            violations.push(FieldViolation::new("email", "Email is required"));
        } else if !self.email.validate_email() {
            violations.push(FieldViolation::new("email", "Email is not a valid address"));
        }

        if self.password.is_empty() {
            violations.push(FieldViolation::new("password", "Password is required"));
        } else if self.password.chars().count() < PASSWORD_MIN_LEN {
            violations.push(FieldViolation::new(
                "password",
                format!("Password must be at least {} characters long", PASSWORD_MIN_LEN),
            ));
        }

        violations
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
