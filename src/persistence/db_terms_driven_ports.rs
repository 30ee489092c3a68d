use crate::domain;
use crate::domain::terms::TermsDocument;
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::{Context, Error};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, query_as};
use tracing::instrument;

#[derive(FromRow)]
struct TermsRow {
    id: String,
    version: String,
    title: String,
    content: String,
    effective_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
    is_active: bool,
}

impl From<TermsRow> for TermsDocument {
    fn from(value: TermsRow) -> Self {
        TermsDocument {
            id: value.id,
            version: value.version,
            title: value.title,
            content: value.content,
            effective_date: value.effective_date,
            created_at: value.created_at,
            is_active: value.is_active,
        }
    }
}

pub struct DbTermsReader;

impl domain::terms::driven_ports::TermsReader for DbTermsReader {
    #[instrument(skip_all)]
    async fn all_documents(
        &self,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Vec<TermsDocument>, Error> {
        let mut cxn = ext_cxn.database_cxn().await?;

        let documents = query_as::<_, TermsRow>(
            "SELECT id, version, title, content, effective_date, created_at, is_active FROM terms_of_service",
        )
        .fetch_all(cxn.borrow_connection())
        .await
        .context("fetching terms of service documents")?
        .into_iter()
        .map(TermsDocument::from)
        .collect();

        Ok(documents)
    }
}
