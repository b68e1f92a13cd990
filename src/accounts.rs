use std::result;

use log::{error, info};

use crate::auth::Credentials;
use crate::backend::{Backend, StoreError};
use crate::user::User;

pub struct Accounts(Backend);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    DuplicateUser,
    UserNotFound,
    IncorrectPassword,
    Internal,
}

pub type Result<T> = result::Result<T, Error>;

impl Error {
    /// Text sent back to the client.
    pub fn message(self) -> &'static str {
        match self {
            Self::DuplicateUser => "Username already exists",
            Self::UserNotFound => "User not found",
            Self::IncorrectPassword => "Incorrect password",
            Self::Internal => "Internal server error",
        }
    }
}

impl From<StoreError> for Error {
    fn from(_: StoreError) -> Self {
        Error::Internal
    }
}

impl Accounts {
    pub fn new(backend: Backend) -> Self {
        Self(backend)
    }

    pub async fn signup(&self, creds: &Credentials) -> Result<()> {
        let username = creds.user();
        let mut users = self.0.load().await?;

        if users.contains_key(username) {
            info!("signup rejected, {username} already exists");
            return Err(Error::DuplicateUser);
        }

        let pwhash = creds.calc_pwhash().await.map_err(|()| {
            error!("couldn't hash password for new user {username}");
            Error::Internal
        })?;

        users.insert(username.to_string(), User { pwhash });
        self.0.save(&users).await?;

        info!("{username} signed up");
        Ok(())
    }

    /// A stateless credential check, nothing is issued on success.
    pub async fn login(&self, creds: &Credentials) -> Result<()> {
        let username = creds.user();
        let users = self.0.load().await?;

        let Some(user) = users.get(username) else {
            info!("login for non-existent user {username}");
            return Err(Error::UserNotFound);
        };

        let matches = creds.verify(&user.pwhash).await.map_err(|()| {
            error!("stored hash for {username} is unusable");
            Error::Internal
        })?;

        if matches {
            info!("{username} logged in");
            Ok(())
        } else {
            info!("wrong password for user {username}");
            Err(Error::IncorrectPassword)
        }
    }
}
