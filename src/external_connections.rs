use sqlx::PgConnection;

/// A live database connection handed out by [ExternalConnectivity]. Driven adapters borrow
/// the underlying connection to run their queries.
pub trait ConnectionHandle {
    fn borrow_connection(&mut self) -> &mut PgConnection;
}

/// Abstraction over the clients the service uses to reach external systems (the task database
/// and the hosted auth service) so business logic never depends on a concrete client.
pub trait ExternalConnectivity: Send {
    type DbHandle<'cxn_borrow>: ConnectionHandle + Send
    where
        Self: 'cxn_borrow;

    /// Acquires a database connection for the lifetime of the returned handle
    async fn database_cxn(&mut self) -> Result<Self::DbHandle<'_>, anyhow::Error>;

    /// HTTP client with tracing middleware attached
    fn http_client(&self) -> &reqwest_middleware::ClientWithMiddleware;
}

/// Connectivity which is able to start a database transaction
pub trait Transactable {
    type Handle: TransactionHandle;

    async fn start_transaction(&self) -> Result<Self::Handle, anyhow::Error>;
}

/// Connectivity scoped to an open transaction. Work is discarded unless [commit](TransactionHandle::commit) is called.
pub trait TransactionHandle: ExternalConnectivity {
    async fn commit(self) -> Result<(), anyhow::Error>;
}

#[cfg(test)]
pub mod test_util {
    use super::*;
    use anyhow::anyhow;

    /// Connection handle that can never be constructed, since there is no database in unit tests
    pub enum NoDatabase {}

    impl ConnectionHandle for NoDatabase {
        fn borrow_connection(&mut self) -> &mut PgConnection {
            match *self {}
        }
    }

    /// Stand-in connectivity for unit tests. Domain tests swap every driven port for an in-memory
    /// fake, so asking it for a real database connection is always an error.
    pub struct FakeExternalConnectivity {
        http_client: reqwest_middleware::ClientWithMiddleware,
    }

    impl FakeExternalConnectivity {
        pub fn new() -> Self {
            FakeExternalConnectivity {
                http_client: reqwest_middleware::ClientBuilder::new(reqwest::Client::new()).build(),
            }
        }
    }

    impl ExternalConnectivity for FakeExternalConnectivity {
        type DbHandle<'cxn_borrow> = NoDatabase;

        async fn database_cxn(&mut self) -> Result<Self::DbHandle<'_>, anyhow::Error> {
            Err(anyhow!("unit tests do not have a database"))
        }

        fn http_client(&self) -> &reqwest_middleware::ClientWithMiddleware {
            &self.http_client
        }
    }
}
