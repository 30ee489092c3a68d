use crate::domain::terms::driven_ports::TermsReader;
use crate::domain::terms::driving_ports::TermsError;
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use chrono::{DateTime, Utc};

/// A published version of the terms of service
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct TermsDocument {
    pub id: String,
    pub version: String,
    pub title: String,
    pub content: String,
    pub effective_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

pub mod driven_ports {
    use super::*;

    pub trait TermsReader {
        async fn all_documents(
            &self,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<TermsDocument>, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum TermsError {
        #[error("No terms of service have been published.")]
        NoneFound,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    pub trait TermsPort {
        /// The active document, or the most recently created one if none is marked active
        async fn latest_terms(
            &self,
            ext_cxn: &mut impl ExternalConnectivity,
            terms_read: &impl driven_ports::TermsReader,
        ) -> Result<TermsDocument, TermsError>;

        /// Every document, newest first
        async fn terms_history(
            &self,
            ext_cxn: &mut impl ExternalConnectivity,
            terms_read: &impl driven_ports::TermsReader,
        ) -> Result<Vec<TermsDocument>, TermsError>;
    }
}

pub struct TermsService {}

impl TermsService {
    async fn newest_first(
        ext_cxn: &mut impl ExternalConnectivity,
        terms_read: &impl TermsReader,
    ) -> Result<Vec<TermsDocument>, anyhow::Error> {
        let mut documents = terms_read
            .all_documents(ext_cxn)
            .await
            .context("fetching terms of service documents")?;
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(documents)
    }
}

impl driving_ports::TermsPort for TermsService {
    async fn latest_terms(
        &self,
        ext_cxn: &mut impl ExternalConnectivity,
        terms_read: &impl TermsReader,
    ) -> Result<TermsDocument, TermsError> {
        let documents = Self::newest_first(ext_cxn, terms_read).await?;
        let active = documents.iter().position(|doc| doc.is_active).unwrap_or(0);

        documents
            .into_iter()
            .nth(active)
            .ok_or(TermsError::NoneFound)
    }

    async fn terms_history(
        &self,
        ext_cxn: &mut impl ExternalConnectivity,
        terms_read: &impl TermsReader,
    ) -> Result<Vec<TermsDocument>, TermsError> {
        Ok(Self::newest_first(ext_cxn, terms_read).await?)
    }
}
