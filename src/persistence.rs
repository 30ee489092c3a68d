pub mod db_task_driven_ports;
pub mod db_terms_driven_ports;
pub mod db_user_driven_ports;
pub mod hosted_auth_driven_ports;

use crate::domain::auth::Credentials;
use crate::domain::auth::driven_ports::CredentialVerifier;
use crate::domain::user::User;
use crate::external_connections;
use crate::external_connections::ConnectionHandle;
use anyhow::Context;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use sqlx::pool::PoolConnection;
use sqlx::{Acquire, PgConnection, PgPool, Postgres, Transaction};

/// Database pool plus the traced HTTP client used for the hosted auth service.
/// Cloned into every request handler.
#[derive(Clone)]
pub struct ExternalConnectivity {
    db: PgPool,
    http_client: ClientWithMiddleware,
}

impl ExternalConnectivity {
    /// Takes ownership of the database pool and builds a traced HTTP client alongside it
    pub fn new(db: PgPool) -> Result<Self, anyhow::Error> {
        let base_client = reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .context("building the outgoing HTTP client")?;
        let http_client = ClientBuilder::new(base_client)
            .with(TracingMiddleware::default())
            .build();

        Ok(ExternalConnectivity { db, http_client })
    }
}

/// Connection checked out of the pool for the duration of one adapter call
pub struct PooledDb {
    conn: PoolConnection<Postgres>,
}

impl ConnectionHandle for PooledDb {
    fn borrow_connection(&mut self) -> &mut PgConnection {
        &mut self.conn
    }
}

impl external_connections::ExternalConnectivity for ExternalConnectivity {
    type DbHandle<'cxn_borrow> = PooledDb;

    async fn database_cxn(&mut self) -> Result<PooledDb, anyhow::Error> {
        let conn = self
            .db
            .acquire()
            .await
            .context("checking a connection out of the pool")?;

        Ok(PooledDb { conn })
    }

    fn http_client(&self) -> &ClientWithMiddleware {
        &self.http_client
    }
}

impl external_connections::Transactable for ExternalConnectivity {
    type Handle = TransactionalConnectivity;

    async fn start_transaction(&self) -> Result<TransactionalConnectivity, anyhow::Error> {
        let txn = self.db.begin().await.context("beginning task transaction")?;

        Ok(TransactionalConnectivity {
            txn,
            http_client: self.http_client.clone(),
        })
    }
}

/// Same clients as [ExternalConnectivity], except every database call runs inside one
/// open transaction. Dropping it without [commit][external_connections::TransactionHandle::commit]
/// rolls the work back.
pub struct TransactionalConnectivity {
    txn: Transaction<'static, Postgres>,
    http_client: ClientWithMiddleware,
}

/// Borrow of the open transaction's connection
pub struct TxnDb<'tx> {
    conn: &'tx mut PgConnection,
}

impl ConnectionHandle for TxnDb<'_> {
    fn borrow_connection(&mut self) -> &mut PgConnection {
        &mut *self.conn
    }
}

impl external_connections::ExternalConnectivity for TransactionalConnectivity {
    type DbHandle<'tx_borrow>
        = TxnDb<'tx_borrow>
    where
        Self: 'tx_borrow;

    async fn database_cxn(&mut self) -> Result<TxnDb<'_>, anyhow::Error> {
        let conn = self
            .txn
            .acquire()
            .await
            .context("borrowing the transaction's connection")?;

        Ok(TxnDb { conn })
    }

    fn http_client(&self) -> &ClientWithMiddleware {
        &self.http_client
    }
}

impl external_connections::TransactionHandle for TransactionalConnectivity {
    async fn commit(self) -> Result<(), anyhow::Error> {
        self.txn.commit().await.context("committing task transaction")
    }
}

/// Whichever credential verifier the service was configured with at startup
pub enum ConfiguredCredentialVerifier {
    Database(db_user_driven_ports::DbCredentialVerifier),
    Hosted(hosted_auth_driven_ports::HostedCredentialVerifier),
}

impl CredentialVerifier for ConfiguredCredentialVerifier {
    async fn verify_credentials(
        &self,
        credentials: &Credentials,
        ext_cxn: &mut impl external_connections::ExternalConnectivity,
    ) -> Result<Option<User>, anyhow::Error> {
        match self {
            Self::Database(verifier) => verifier.verify_credentials(credentials, ext_cxn).await,
            Self::Hosted(verifier) => verifier.verify_credentials(credentials, ext_cxn).await,
        }
    }
}
