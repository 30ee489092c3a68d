//! Credential checks delegated to a hosted auth service that speaks the GoTrue password grant
//! (`POST /auth/v1/token?grant_type=password`).

use crate::domain;
use crate::domain::auth::Credentials;
use crate::domain::user::User;
use crate::external_connections::ExternalConnectivity;
use anyhow::{Context, Error, anyhow};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

#[derive(Serialize)]
struct PasswordGrant<'creds> {
    email: &'creds str,
    password: &'creds str,
}

#[derive(Deserialize)]
struct GrantResponse {
    user: HostedUser,
}

#[derive(Deserialize)]
struct HostedUser {
    id: Uuid,
    email: String,
    #[serde(default)]
    user_metadata: HostedUserMetadata,
}

#[derive(Deserialize, Default)]
struct HostedUserMetadata {
    name: Option<String>,
}

impl From<HostedUser> for User {
    fn from(value: HostedUser) -> Self {
        // Fall back to the local part of the email when the account has no display name
        let name = value.user_metadata.name.unwrap_or_else(|| {
            value
                .email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_owned()
        });

        User {
            id: value.id,
            email: value.email.to_lowercase(),
            name,
        }
    }
}

/// Verifies credentials against the hosted auth service
pub struct HostedCredentialVerifier {
    pub base_url: String,
    pub api_key: String,
}

impl HostedCredentialVerifier {
    fn token_url(&self) -> String {
        format!(
            "{}/auth/v1/token?grant_type=password",
            self.base_url.trim_end_matches('/')
        )
    }
}

impl domain::auth::driven_ports::CredentialVerifier for HostedCredentialVerifier {
    #[tracing::instrument(skip_all)]
    async fn verify_credentials(
        &self,
        credentials: &Credentials,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<User>, Error> {
        let response = ext_cxn
            .http_client()
            .post(self.token_url())
            .header("apikey", &self.api_key)
            .json(&PasswordGrant {
                email: &credentials.email,
                password: &credentials.password,
            })
            .send()
            .await
            .context("calling the hosted auth service")?;

        match response.status() {
            status if status.is_success() => {
                let grant: GrantResponse = response
                    .json()
                    .await
                    .context("reading the hosted auth service's response")?;
                Ok(Some(User::from(grant.user)))
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                debug!("Hosted auth service refused the credentials");
                Ok(None)
            }
            status => Err(anyhow!("hosted auth service responded with {status}")),
        }
    }
}
