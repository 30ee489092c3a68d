use uuid::Uuid;

/// A person who can sign in and own tasks
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

pub mod driven_ports {
    use super::*;
    use crate::external_connections::ExternalConnectivity;

    pub trait UserReader {
        async fn user_by_id(
            &self,
            user_id: Uuid,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<User>, anyhow::Error>;
    }

    pub trait UserWriter {
        /// Inserts the user, or refreshes the email and name of an existing user with the same ID
        async fn upsert_user(
            &self,
            user: &User,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;
    }
}
