use crate::domain::auth::SessionRejection;
use crate::domain::auth::driven_ports::SessionCodec;
use crate::domain::user::User;
use anyhow::{Context, anyhow};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by a session token
#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    /// User ID
    sub: Uuid,
    email: String,
    name: String,
    iat: i64,
    exp: i64,
}

/// HS256 keys for signing and verifying session tokens
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl SessionKeys {
    pub fn new(secret: &[u8], lifetime: Duration) -> SessionKeys {
        SessionKeys {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            lifetime,
        }
    }
}

/// Converts a configured lifetime in minutes to a [Duration], refusing lifetimes that would
/// issue already-expired tokens or overflow the clock
pub fn session_lifetime(minutes: i64) -> Result<Duration, anyhow::Error> {
    if minutes <= 0 {
        return Err(anyhow!("session lifetime must be at least one minute, got {minutes}"));
    }

    Duration::try_minutes(minutes)
        .with_context(|| format!("session lifetime of {minutes} minutes is too large"))
}

impl SessionCodec for SessionKeys {
    fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<(String, DateTime<Utc>), anyhow::Error> {
        let expires_at = now
            .checked_add_signed(self.lifetime)
            .context("computing session expiry")?;
        let claims = SessionClaims {
            sub: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .context("signing session token")?;

        Ok((token, expires_at))
    }

    fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<User, SessionRejection> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the caller's clock below
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let claims = decode::<SessionClaims>(token, &self.decoding, &validation)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => SessionRejection::Expired,
                _ => SessionRejection::Invalid(err.to_string()),
            })?
            .claims;

        if claims.exp <= now.timestamp() {
            return Err(SessionRejection::Expired);
        }

        Ok(User {
            id: claims.sub,
            email: claims.email,
            name: claims.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::test_util::lola;
    use speculoos::prelude::*;

    fn keys() -> SessionKeys {
        SessionKeys::new(b"a-test-secret-that-is-long-enough", Duration::minutes(30))
    }

    #[test]
    fn issued_token_decodes_to_same_user() {
        let now = Utc::now();
        let (token, expires_at) = keys().issue(&lola(), now).expect("issuing should succeed");

        assert_eq!(now.timestamp() + 30 * 60, expires_at.timestamp());
        assert_that!(keys().decode(&token, now)).is_ok_containing(lola());
    }

    #[test]
    fn expired_token_is_rejected() {
        let issued_at = Utc::now() - Duration::hours(2);
        let (token, _) = keys().issue(&lola(), issued_at).expect("issuing should succeed");

        assert_that!(keys().decode(&token, Utc::now())).is_err_containing(SessionRejection::Expired);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let other_keys = SessionKeys::new(b"some-other-secret-entirely", Duration::minutes(30));
        let now = Utc::now();
        let (token, _) = other_keys.issue(&lola(), now).expect("issuing should succeed");

        let decoded = keys().decode(&token, now);
        let Err(SessionRejection::Invalid(_)) = decoded else {
            panic!("Expected the token to be refused, got {decoded:#?}");
        };
    }

    #[test]
    fn lifetime_past_the_calendar_is_an_error() {
        let keys = SessionKeys::new(b"a-test-secret", Duration::days(365 * 500_000));

        assert_that!(keys.issue(&lola(), Utc::now())).is_err();
    }

    mod session_lifetime {
        use super::*;

        #[test]
        fn accepts_positive_minutes() {
            assert_that!(session_lifetime(720).ok()).is_equal_to(Some(Duration::hours(12)));
        }

        #[test]
        fn rejects_zero_and_negative() {
            assert_that!(session_lifetime(0)).is_err();
            assert_that!(session_lifetime(-5)).is_err();
        }

        #[test]
        fn rejects_overflowing_minutes() {
            assert_that!(session_lifetime(i64::MAX)).is_err();
            assert_that!(session_lifetime(1_000_000_000_000_000)).is_err();
        }
    }

    #[test]
    fn garbage_is_rejected() {
        let decoded = keys().decode("definitely.not.ajwt", Utc::now());
        let Err(SessionRejection::Invalid(_)) = decoded else {
            panic!("Expected the token to be refused, got {decoded:#?}");
        };
    }
}
