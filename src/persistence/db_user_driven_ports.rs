use crate::domain;
use crate::domain::auth::Credentials;
use crate::domain::user::User;
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::{Context, Error};
use sqlx::{FromRow, query, query_as};
use tracing::{instrument, warn};
use uuid::Uuid;

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
}

impl From<UserRow> for User {
    fn from(value: UserRow) -> Self {
        User {
            id: value.id,
            email: value.email,
            name: value.name,
        }
    }
}

pub struct DbReadUsers;

impl domain::user::driven_ports::UserReader for DbReadUsers {
    #[instrument(skip(self, ext_cxn))]
    async fn user_by_id(
        &self,
        user_id: Uuid,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<User>, Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let user = query_as::<_, UserRow>("SELECT id, email, name FROM app_user u WHERE u.id = $1")
            .bind(user_id)
            .fetch_optional(cxn_handle.borrow_connection())
            .await
            .context("Fetching a user by id")?;

        Ok(user.map(User::from))
    }
}

pub struct DbWriteUsers;

impl domain::user::driven_ports::UserWriter for DbWriteUsers {
    #[instrument(skip_all, fields(user_id = %user.id))]
    async fn upsert_user(
        &self,
        user: &User,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<(), Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        query(
            "INSERT INTO app_user(id, email, name) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email, name = EXCLUDED.name, updated_at = now()",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .execute(cxn_handle.borrow_connection())
        .await
        .context("Upserting user")?;

        Ok(())
    }
}

#[derive(FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    name: String,
    password_hash: Option<String>,
}

/// Checks credentials against the bcrypt hashes stored in the account table
pub struct DbCredentialVerifier;

impl domain::auth::driven_ports::CredentialVerifier for DbCredentialVerifier {
    #[instrument(skip_all)]
    async fn verify_credentials(
        &self,
        credentials: &Credentials,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<User>, Error> {
        let account = {
            let mut cxn_handle = ext_cxn.database_cxn().await?;
            query_as::<_, AccountRow>(
                "SELECT id, email, name, password_hash FROM app_user u WHERE lower(u.email) = $1",
            )
            .bind(&credentials.email)
            .fetch_optional(cxn_handle.borrow_connection())
            .await
            .context("Looking up account by email")?
        };

        let Some(account) = account else {
            return Ok(None);
        };
        let Some(password_hash) = account.password_hash else {
            warn!(user_id = %account.id, "Account has no local password, cannot sign in locally");
            return Ok(None);
        };

        let password = credentials.password.clone();
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &password_hash))
            .await
            .context("joining password verification task")?
            .context("verifying password hash")?;

        Ok(matches.then(|| User {
            id: account.id,
            email: account.email,
            name: account.name,
        }))
    }
}
