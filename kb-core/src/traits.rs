use crate::error::CatalogError;
use crate::types::{Resource, Subject, SubjectId};
use async_trait::async_trait;

/// Contract for the remote subject catalog.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Fetch the full subject list. No caching; every call re-fetches.
    async fn list_subjects(&self) -> Result<Vec<Subject>, CatalogError>;

    /// Fetch every resource page for a subject, concatenated in server
    /// order. All-or-nothing: a failure on any page fails the whole call,
    /// so a partial list is never returned.
    async fn list_resources(&self, subject_id: &SubjectId) -> Result<Vec<Resource>, CatalogError>;
}
