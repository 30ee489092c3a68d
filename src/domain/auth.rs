use crate::domain::auth::driving_ports::AuthError;
use crate::domain::user::User;
use crate::domain::user::driven_ports::{UserReader, UserWriter};
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Email and password submitted on sign-in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// A signed session token along with the user it was issued to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// Reasons a presented session token is refused
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionRejection {
    #[error("the session has expired")]
    Expired,
    #[error("the session token is invalid: {0}")]
    Invalid(String),
}

pub mod driven_ports {
    use super::*;

    /// Checks an email/password pair against some source of accounts
    pub trait CredentialVerifier {
        /// Returns the matching user, or None if the credentials are wrong. The email has
        /// already been trimmed and lowercased.
        async fn verify_credentials(
            &self,
            credentials: &Credentials,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<User>, anyhow::Error>;
    }

    /// Encodes and decodes signed session tokens
    pub trait SessionCodec {
        fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<(String, DateTime<Utc>), anyhow::Error>;
        fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<User, SessionRejection>;
    }
}

pub mod driving_ports {
    use super::*;

    #[derive(Debug, Error)]
    pub enum AuthError {
        #[error("Invalid email or password.")]
        InvalidCredentials,
        #[error(transparent)]
        InvalidSession(#[from] SessionRejection),
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    #[cfg(test)]
    #[allow(clippy::items_after_test_module)]
    mod auth_error_clone {
        use super::AuthError;
        use anyhow::anyhow;

        impl Clone for AuthError {
            fn clone(&self) -> Self {
                match self {
                    Self::InvalidCredentials => Self::InvalidCredentials,
                    Self::InvalidSession(rejection) => Self::InvalidSession(rejection.clone()),
                    Self::PortError(err) => Self::PortError(anyhow!(format!("{}", err))),
                }
            }
        }
    }

    pub trait AuthPort {
        /// Exchanges credentials for a signed session token. The verified user is synced into
        /// local storage so tasks can reference it.
        async fn sign_in(
            &self,
            credentials: &Credentials,
            ext_cxn: &mut impl ExternalConnectivity,
            verifier: &impl driven_ports::CredentialVerifier,
            user_write: &impl UserWriter,
            sessions: &impl driven_ports::SessionCodec,
        ) -> Result<IssuedSession, AuthError>;

        /// Validates a session token and returns the user it was issued to
        fn authenticate(
            &self,
            token: &str,
            sessions: &impl driven_ports::SessionCodec,
        ) -> Result<User, AuthError>;

        /// Loads the stored record for the user behind a valid session
        async fn current_user(
            &self,
            user_id: Uuid,
            ext_cxn: &mut impl ExternalConnectivity,
            user_read: &impl UserReader,
        ) -> Result<User, AuthError>;
    }
}

pub struct AuthService {}

impl driving_ports::AuthPort for AuthService {
    #[instrument(skip_all)]
    async fn sign_in(
        &self,
        credentials: &Credentials,
        ext_cxn: &mut impl ExternalConnectivity,
        verifier: &impl driven_ports::CredentialVerifier,
        user_write: &impl UserWriter,
        sessions: &impl driven_ports::SessionCodec,
    ) -> Result<IssuedSession, AuthError> {
        if credentials.email.trim().is_empty() || credentials.password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }
        let normalized = Credentials {
            email: credentials.email.trim().to_lowercase(),
            password: credentials.password.clone(),
        };

        let Some(user) = verifier
            .verify_credentials(&normalized, &mut *ext_cxn)
            .await
            .context("verifying sign-in credentials")?
        else {
            warn!(email = %normalized.email, "Rejected sign-in");
            return Err(AuthError::InvalidCredentials);
        };

        user_write
            .upsert_user(&user, &mut *ext_cxn)
            .await
            .context("syncing signed-in user")?;

        let (token, expires_at) = sessions
            .issue(&user, Utc::now())
            .context("issuing a session token")?;
        info!(user_id = %user.id, "User signed in");

        Ok(IssuedSession {
            token,
            expires_at,
            user,
        })
    }

    fn authenticate(
        &self,
        token: &str,
        sessions: &impl driven_ports::SessionCodec,
    ) -> Result<User, AuthError> {
        Ok(sessions.decode(token, Utc::now())?)
    }

    #[instrument(skip(self, ext_cxn, user_read))]
    async fn current_user(
        &self,
        user_id: Uuid,
        ext_cxn: &mut impl ExternalConnectivity,
        user_read: &impl UserReader,
    ) -> Result<User, AuthError> {
        user_read
            .user_by_id(user_id, &mut *ext_cxn)
            .await
            .context("loading the session's user")?
            .ok_or_else(|| {
                AuthError::InvalidSession(SessionRejection::Invalid(
                    "the session's user no longer exists".to_owned(),
                ))
            })
    }
}
