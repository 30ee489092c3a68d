use crate::domain;
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::SessionUser;

/// DTO for signing in with an email and password
#[derive(Deserialize, Display, Validate, ToSchema)]
#[display("{email}")]
#[cfg_attr(test, derive(Serialize))]
pub struct SignIn {
    #[validate(email, length(max = 254))]
    #[schema(example = "lola@mail.com")]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    #[schema(example = "qweqwe")]
    pub password: String,
}

impl From<SignIn> for domain::auth::Credentials {
    fn from(value: SignIn) -> Self {
        domain::auth::Credentials {
            email: value.email,
            password: value.password,
        }
    }
}

/// DTO returned after a successful sign-in. The token goes in the `Authorization: Bearer` header.
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, Debug))]
pub struct SessionInfo {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: SessionUser,
}

impl From<domain::auth::IssuedSession> for SessionInfo {
    fn from(value: domain::auth::IssuedSession) -> Self {
        SessionInfo {
            token: value.token,
            expires_at: value.expires_at,
            user: SessionUser::from(value.user),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_email_and_empty_password() {
        let bad_sign_in = SignIn {
            email: "not an email".to_owned(),
            password: String::new(),
        };
        let validation_result = bad_sign_in.validate();
        assert!(validation_result.is_err());
        let validation_errors = validation_result.unwrap_err();
        let field_validations = validation_errors.field_errors();
        assert!(field_validations.contains_key("email"));
        assert!(field_validations.contains_key("password"));
    }

    #[test]
    fn display_hides_password() {
        let sign_in = SignIn {
            email: "leo@mail.com".to_owned(),
            password: "qweqwe".to_owned(),
        };
        assert_eq!("leo@mail.com", sign_in.to_string());
    }
}
