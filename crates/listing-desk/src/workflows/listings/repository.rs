use super::domain::{
    DeletionRequest, DeletionRequestId, DeletionTarget, EditRequestId, Property, PropertyEditRequest,
    PropertyId, PropertyRequest, RequestId,
};
use super::lifecycle::{RequestStatus, ReviewStatus};

/// Side effect committed together with a deletion review.
#[derive(Debug, Clone, PartialEq)]
pub enum DeletionEffect {
    /// Soft-delete the published listing.
    ArchiveProperty(PropertyId),
    /// Move a property request to its next status, conditional on `expected`.
    UpdateRequest {
        expected: RequestStatus,
        request: PropertyRequest,
    },
    Nothing,
}

/// Persistence boundary for the listing workflow.
///
/// Every `commit_*` method mirrors one backend procedure and must apply all of its
/// writes atomically. Conditional writes compare the stored status (or revision)
/// with the expected value and fail with [`RepositoryError::Conflict`] when another
/// writer got there first.
pub trait ListingRepository: Send + Sync {
    fn insert_request(&self, request: PropertyRequest) -> Result<PropertyRequest, RepositoryError>;
    fn fetch_request(&self, id: &RequestId) -> Result<Option<PropertyRequest>, RepositoryError>;
    fn requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<PropertyRequest>, RepositoryError>;
    /// Replace a request while its stored status still equals `expected`.
    fn update_request(
        &self,
        expected: RequestStatus,
        request: PropertyRequest,
    ) -> Result<PropertyRequest, RepositoryError>;

    /// `approve_property_request`: resolve the request and materialize its property.
    fn commit_approval(
        &self,
        expected: RequestStatus,
        request: PropertyRequest,
        property: Property,
    ) -> Result<Property, RepositoryError>;

    fn insert_property(&self, property: Property) -> Result<Property, RepositoryError>;
    fn fetch_property(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError>;
    fn properties(&self) -> Result<Vec<Property>, RepositoryError>;
    /// Replace a property while its stored revision still equals `expected_revision`.
    fn update_property(
        &self,
        expected_revision: u64,
        property: Property,
    ) -> Result<Property, RepositoryError>;
    /// Remove a property and close the pending deletion and edit reviews that target it.
    fn delete_property(&self, id: &PropertyId) -> Result<Property, RepositoryError>;

    /// `request_property_deletion`: record the deletion request and, for request
    /// targets, move the request in the same write.
    fn commit_deletion_request(
        &self,
        deletion: DeletionRequest,
        request_update: Option<(RequestStatus, PropertyRequest)>,
    ) -> Result<DeletionRequest, RepositoryError>;
    fn fetch_deletion(
        &self,
        id: &DeletionRequestId,
    ) -> Result<Option<DeletionRequest>, RepositoryError>;
    fn deletions(
        &self,
        status: Option<ReviewStatus>,
    ) -> Result<Vec<DeletionRequest>, RepositoryError>;
    fn pending_deletion_for(
        &self,
        target: &DeletionTarget,
    ) -> Result<Option<DeletionRequest>, RepositoryError>;
    /// `approve_property_deletion` and its rejection counterpart: resolve a pending
    /// deletion request and apply `effect`.
    fn commit_deletion_review(
        &self,
        deletion: DeletionRequest,
        effect: DeletionEffect,
    ) -> Result<DeletionRequest, RepositoryError>;

    fn insert_edit(
        &self,
        edit: PropertyEditRequest,
    ) -> Result<PropertyEditRequest, RepositoryError>;
    fn fetch_edit(&self, id: &EditRequestId)
        -> Result<Option<PropertyEditRequest>, RepositoryError>;
    fn edits(
        &self,
        status: Option<ReviewStatus>,
    ) -> Result<Vec<PropertyEditRequest>, RepositoryError>;
    /// `approve_property_edit_request`: resolve a pending edit and store the merged
    /// property, conditional on the property revision the merge was computed from.
    fn commit_edit_approval(
        &self,
        edit: PropertyEditRequest,
        base_revision: u64,
        merged: Property,
    ) -> Result<Property, RepositoryError>;
    /// `reject_property_edit_request`.
    fn commit_edit_rejection(
        &self,
        edit: PropertyEditRequest,
    ) -> Result<PropertyEditRequest, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record was modified concurrently or already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
