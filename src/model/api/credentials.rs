use argon2::Config;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::db::NewUser;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Raw user credentials, received from a login or sign-up form. These are
/// never stored directly, since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize, FromForm)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl TryFrom<Credentials> for NewUser {
    type Error = Error;

    /// Convert [`Credentials`] to a new user by hashing the password.
    /// The username must be non-empty and the password must meet the minimum length.
    fn try_from(cred: Credentials) -> Result<Self> {
        let username = cred.username.trim();
        if username.is_empty() {
            return Err(Error::BadRequest("Username cannot be empty".to_string()));
        }
        if cred.password.len() < MIN_PASSWORD_LENGTH {
            return Err(Error::BadRequest(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        // 16 bytes is the recommended salt length for Argon2.
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash =
            argon2::hash_encoded(cred.password.as_bytes(), &salt, &Config::default())?;
        Ok(Self {
            username: username.to_string(),
            password_hash,
        })
    }
}

#[cfg(test)]
mod examples {
    use super::*;

    impl Credentials {
        pub fn example() -> Self {
            Self {
                username: "alice112".into(),
                password: "polls4lyfe".into(),
            }
        }

        pub fn example2() -> Self {
            Self {
                username: "bobthevoter".into(),
                password: "totallysecurepassword".into(),
            }
        }

        pub fn empty() -> Self {
            Self {
                username: "".into(),
                password: "".into(),
            }
        }

        /// URL-encoded form body, as a browser would submit it.
        pub fn to_form(&self) -> String {
            format!("username={}&password={}", self.username, self.password)
        }
    }
}
