use std::fmt;

use log::error;
use serde::Deserialize;

/// bcrypt work factor for new accounts.
pub const COST: u32 = 10;

#[derive(Clone, Deserialize)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    #[cfg(test)]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.username
    }

    pub fn pass(&self) -> &str {
        &self.password
    }

    /// Salted one-way hash of the password. bcrypt is deliberately
    /// slow, so this runs on the blocking pool.
    pub async fn calc_pwhash(&self) -> Result<String, ()> {
        let pass = self.pass().to_string();

        tokio::task::spawn_blocking(move || bcrypt::hash(pass, COST))
            .await
            .map_err(|e| error!("hashing task failed: {e:?}"))?
            .map_err(|e| error!("couldn't hash password: {e:?}"))
    }

    /// Checks the password against a stored hash. A malformed hash
    /// is an error, distinct from a plain mismatch.
    pub async fn verify(&self, pwhash: &str) -> Result<bool, ()> {
        let pass = self.pass().to_string();
        let pwhash = pwhash.to_string();

        tokio::task::spawn_blocking(move || bcrypt::verify(pass, &pwhash))
            .await
            .map_err(|e| error!("verify task failed: {e:?}"))?
            .map_err(|e| error!("couldn't verify password: {e:?}"))
    }
}

// never let the password reach a log line
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
