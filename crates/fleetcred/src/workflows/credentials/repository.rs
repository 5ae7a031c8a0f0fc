use super::domain::{
    CredentialId, CredentialRecord, CredentialSubject, CredentialType, CredentialTypeId,
    HistoryEntry,
};

pub use crate::workflows::fleet::RepositoryError;

/// Persistence seam for the catalog, credential instances, and their audit
/// trail. The reference implementation is in-memory; a database-backed one
/// slots in without touching the service.
pub trait CredentialRepository: Send + Sync {
    fn insert_type(&self, row: CredentialType) -> Result<CredentialType, RepositoryError>;
    fn update_type(&self, row: CredentialType) -> Result<(), RepositoryError>;
    fn fetch_type(&self, id: &CredentialTypeId)
        -> Result<Option<CredentialType>, RepositoryError>;
    fn types(&self) -> Result<Vec<CredentialType>, RepositoryError>;

    fn insert(&self, record: CredentialRecord) -> Result<CredentialRecord, RepositoryError>;
    fn update(&self, record: CredentialRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &CredentialId) -> Result<Option<CredentialRecord>, RepositoryError>;
    fn for_subject(
        &self,
        subject: &CredentialSubject,
    ) -> Result<Vec<CredentialRecord>, RepositoryError>;
    fn records(&self) -> Result<Vec<CredentialRecord>, RepositoryError>;

    fn append_history(&self, entry: HistoryEntry) -> Result<(), RepositoryError>;
    fn history(&self, id: &CredentialId) -> Result<Vec<HistoryEntry>, RepositoryError>;
}
