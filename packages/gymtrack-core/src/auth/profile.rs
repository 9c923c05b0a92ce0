//! Identity types: user profile, bearer token and profile updates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum length accepted for a new password
pub(crate) const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Avatar file name on the server, if the user uploaded one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Opaque bearer credential. Never empty.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a raw token, rejecting empty or blank strings.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

// Tokens must not end up in logs
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

/// Mutable subset of the profile sent to the profile-update endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_confirmation: Option<String>,
}

impl ProfileUpdate {
    /// Update that only renames the user.
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a password change to the update.
    pub fn with_password(
        mut self,
        old_password: impl Into<String>,
        password: impl Into<String>,
        confirmation: impl Into<String>,
    ) -> Self {
        self.old_password = Some(old_password.into());
        self.password = Some(password.into());
        self.password_confirmation = Some(confirmation.into());
        self
    }

    /// Drop empty optional fields so they are not sent at all.
    pub fn normalized(self) -> Self {
        fn non_empty(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.is_empty())
        }
        Self {
            name: self.name.trim().to_string(),
            password: non_empty(self.password),
            old_password: non_empty(self.old_password),
            password_confirmation: non_empty(self.password_confirmation),
        }
    }

    /// Check the update the same way the profile form does.
    ///
    /// Returns the first user-facing problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Name is required.".to_string());
        }

        let password = self.password.as_deref().filter(|p| !p.is_empty());
        let confirmation = self
            .password_confirmation
            .as_deref()
            .filter(|p| !p.is_empty());

        if let Some(password) = password {
            if password.chars().count() < MIN_PASSWORD_LEN {
                return Err(format!(
                    "Password must be at least {} characters.",
                    MIN_PASSWORD_LEN
                ));
            }
            match confirmation {
                None => return Err("Password confirmation is required.".to_string()),
                Some(c) if c != password => return Err("Passwords do not match.".to_string()),
                Some(_) => {}
            }
        } else if confirmation.is_some() {
            return Err("Passwords do not match.".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_rejects_blank() {
        assert!(SessionToken::new("").is_none());
        assert!(SessionToken::new("   ").is_none());
        assert_eq!(SessionToken::new("abc123").unwrap().bearer(), "Bearer abc123");
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = SessionToken::new("secret-value").unwrap();
        assert!(!format!("{:?}", token).contains("secret"));
    }

    #[test]
    fn test_profile_without_avatar_deserializes() {
        let profile: UserProfile = serde_json::from_str(
            r#"{"id":"1","name":"Lucas","email":"lucass.mark@gmail.com","avatar":null}"#,
        )
        .unwrap();
        assert_eq!(profile.avatar, None);

        let json = serde_json::to_string(&profile).unwrap();
        assert!(!json.contains("avatar"));
    }

    #[test]
    fn test_rename_is_valid() {
        assert!(ProfileUpdate::rename("Lucas").validate().is_ok());
        assert!(ProfileUpdate::rename("  ").validate().is_err());
    }

    #[test]
    fn test_password_rules() {
        let short = ProfileUpdate::rename("Lucas").with_password("old", "123", "123");
        assert_eq!(
            short.validate().unwrap_err(),
            "Password must be at least 6 characters."
        );

        let mismatch = ProfileUpdate::rename("Lucas").with_password("old", "123456", "654321");
        assert_eq!(mismatch.validate().unwrap_err(), "Passwords do not match.");

        let missing = ProfileUpdate::rename("Lucas").with_password("old", "123456", "");
        assert_eq!(
            missing.validate().unwrap_err(),
            "Password confirmation is required."
        );

        let ok = ProfileUpdate::rename("Lucas").with_password("old", "123456", "123456");
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_normalized_drops_empty_fields() {
        let update = ProfileUpdate::rename(" Lucas ")
            .with_password("", "", "")
            .normalized();
        assert_eq!(update, ProfileUpdate::rename("Lucas"));

        let body = serde_json::to_value(&update).unwrap();
        assert_eq!(body, serde_json::json!({ "name": "Lucas" }));
    }
}
