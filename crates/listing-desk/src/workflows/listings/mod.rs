//! Property request intake, admin review, and the published listing lifecycle.
//!
//! Submissions land as `pending` property requests. Admins approve them (publishing a
//! property in the same write) or reject them; owners may later ask for a listing to be
//! deleted or propose sparse edits, both of which go through their own review queue.

pub mod domain;
pub mod lifecycle;
pub mod memory;
pub mod notify;
pub mod patch;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;
pub(crate) mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    DeletionRequest, DeletionRequestId, DeletionTarget, EditRequestId, Emirate, Identity,
    ListingDetails, ListingKind, Property, PropertyEditRequest, PropertyFilter, PropertyId,
    PropertyRequest, PropertySubmission, RequestId, Role, SubmitterContact, SubmitterType, UserId,
};
pub use lifecycle::{
    allowed_events, transition, Lifecycle, RequestEvent, RequestStatus, ReviewEvent,
    ReviewStatus, TransitionError,
};
pub use memory::MemoryListingStore;
pub use notify::{
    ListingNotifier, NoopNotifier, NotifyError, SubmissionNotice, WebhookNotifier,
};
pub use patch::{FieldChange, FieldValue, ListingChanges, ListingField, PropertyPatch};
pub use report::{requests_csv, ExportError};
pub use repository::{DeletionEffect, ListingRepository, RepositoryError};
pub use router::{identity_from_headers, listing_router, ApiError};
pub use service::{
    ApprovalOutcome, AuthorizationError, EditReview, ListingServiceError,
    ListingWorkflowService,
};
pub use validation::{IntakeGuard, IntakePolicy, ValidationError};
