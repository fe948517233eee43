use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{
    DeletionRequest, DeletionRequestId, DeletionTarget, EditRequestId, Identity, ListingDetails,
    Property, PropertyEditRequest, PropertyFilter, PropertyId, PropertyRequest,
    PropertySubmission, RequestId,
};
use super::lifecycle::{
    transition, RequestEvent, RequestStatus, ReviewEvent, ReviewStatus, TransitionError,
};
use super::notify::{ListingNotifier, SubmissionNotice};
use super::patch::{FieldChange, ListingChanges, ListingField};
use super::report::{requests_csv, ExportError};
use super::repository::{DeletionEffect, ListingRepository, RepositoryError};
use super::validation::{IntakeGuard, IntakePolicy, ValidationError};

/// Service composing the intake guard, repository, and submission notifier.
pub struct ListingWorkflowService<R, N> {
    guard: Arc<IntakeGuard>,
    repository: Arc<R>,
    notifier: Arc<N>,
}

/// Result of approving a property request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalOutcome {
    pub request: PropertyRequest,
    pub property: Property,
}

/// Side-by-side view an admin reviews before resolving an edit request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditReview {
    pub edit: PropertyEditRequest,
    pub property: Property,
    pub changes: Vec<FieldChange>,
}

impl<R, N> ListingWorkflowService<R, N>
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>, policy: IntakePolicy) -> Self {
        Self {
            guard: Arc::new(IntakeGuard::with_policy(policy)),
            repository,
            notifier,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Store a new `pending` request and notify the admin channel.
    pub fn submit(
        &self,
        submitter: Option<&Identity>,
        submission: PropertySubmission,
    ) -> Result<PropertyRequest, ListingServiceError> {
        let PropertySubmission { details, contact } = self.guard.check_submission(submission)?;
        let now = Utc::now();

        let request = PropertyRequest {
            id: RequestId::new(),
            details,
            contact,
            submitted_by: submitter.map(|identity| identity.id),
            status: RequestStatus::Pending,
            approved_by: None,
            approved_at: None,
            property_id: None,
            admin_notes: None,
            created_at: now,
            updated_at: now,
        };

        let stored = self.repository.insert_request(request)?;
        info!(
            request_id = %stored.id,
            submitter_type = stored.contact.submitter_type.label(),
            "property request submitted"
        );

        if let Err(err) = self
            .notifier
            .submission_received(SubmissionNotice::from_request(&stored))
        {
            warn!(request_id = %stored.id, error = %err, "submission notification not sent");
        }

        Ok(stored)
    }

    /// Approve a pending request, optionally editing it first, and publish its property.
    pub fn approve(
        &self,
        admin: &Identity,
        request_id: &RequestId,
        changes: Option<ListingChanges>,
        admin_notes: Option<String>,
    ) -> Result<ApprovalOutcome, ListingServiceError> {
        require_admin(admin)?;
        let mut request = self.load_request(request_id)?;
        let expected = request.status;
        let next = transition(expected, RequestEvent::Approve)?;

        if let Some(changes) = changes {
            changes.into_patch().apply_to(&mut request.details);
        }
        request.details = self.guard.check_details(request.details)?;
        self.guard.require_qr_code(&request.details)?;

        let now = Utc::now();
        let property_id = PropertyId::new();
        request.status = next;
        request.approved_by = Some(admin.id);
        request.approved_at = Some(now);
        request.property_id = Some(property_id);
        request.admin_notes = clean_note(admin_notes).or(request.admin_notes);
        request.updated_at = now;

        let property = Property {
            id: property_id,
            details: request.details.clone(),
            owner_id: request.submitted_by,
            source_request_id: Some(request.id),
            is_approved: true,
            is_archived: false,
            admin_notes: request.admin_notes.clone(),
            revision: 1,
            created_at: now,
            updated_at: now,
        };

        let property = self
            .repository
            .commit_approval(expected, request.clone(), property)?;
        info!(
            request_id = %request.id,
            property_id = %property.id,
            admin = %admin.id,
            "property request approved"
        );

        Ok(ApprovalOutcome { request, property })
    }

    pub fn reject(
        &self,
        admin: &Identity,
        request_id: &RequestId,
        reason: Option<String>,
    ) -> Result<PropertyRequest, ListingServiceError> {
        require_admin(admin)?;
        let mut request = self.load_request(request_id)?;
        let expected = request.status;
        request.status = transition(expected, RequestEvent::Reject)?;
        request.admin_notes = clean_note(reason).or(request.admin_notes);
        request.updated_at = Utc::now();

        let stored = self.repository.update_request(expected, request)?;
        info!(request_id = %stored.id, admin = %admin.id, "property request rejected");
        Ok(stored)
    }

    /// Open a deletion request against a request or a published property.
    pub fn request_deletion(
        &self,
        actor: &Identity,
        target: DeletionTarget,
        reason: Option<String>,
    ) -> Result<DeletionRequest, ListingServiceError> {
        let request_update = match target {
            DeletionTarget::PropertyRequest(request_id) => {
                let mut request = self.load_request(&request_id)?;
                if !actor.is_admin() && request.submitted_by != Some(actor.id) {
                    return Err(AuthorizationError::NotOwner.into());
                }
                let expected = request.status;
                request.status = transition(expected, RequestEvent::RequestDeletion)?;
                request.updated_at = Utc::now();
                Some((expected, request))
            }
            DeletionTarget::Property(property_id) => {
                let property = self.load_live_property(&property_id)?;
                if !actor.is_admin() && property.owner_id != Some(actor.id) {
                    return Err(AuthorizationError::NotOwner.into());
                }
                None
            }
        };
        if self.repository.pending_deletion_for(&target)?.is_some() {
            return Err(RepositoryError::Conflict.into());
        }

        let deletion = DeletionRequest {
            id: DeletionRequestId::new(),
            target,
            user_id: actor.id,
            reason: clean_note(reason),
            status: ReviewStatus::Pending,
            approved_by: None,
            approved_at: None,
            admin_notes: None,
            created_at: Utc::now(),
        };

        let stored = self
            .repository
            .commit_deletion_request(deletion, request_update)?;
        info!(
            deletion_id = %stored.id,
            target = ?stored.target,
            user = %actor.id,
            "deletion requested"
        );
        Ok(stored)
    }

    /// Resolve a pending deletion request and archive its target.
    pub fn approve_deletion(
        &self,
        admin: &Identity,
        deletion_id: &DeletionRequestId,
    ) -> Result<DeletionRequest, ListingServiceError> {
        require_admin(admin)?;
        let mut deletion = self.load_deletion(deletion_id)?;
        deletion.status = transition(deletion.status, ReviewEvent::Approve)?;

        let now = Utc::now();
        let effect = match deletion.target {
            DeletionTarget::Property(property_id) => DeletionEffect::ArchiveProperty(property_id),
            DeletionTarget::PropertyRequest(request_id) => {
                self.request_effect(&request_id, RequestEvent::ApproveDeletion)?
            }
        };
        deletion.approved_by = Some(admin.id);
        deletion.approved_at = Some(now);

        let stored = self.repository.commit_deletion_review(deletion, effect)?;
        info!(
            deletion_id = %stored.id,
            target = ?stored.target,
            admin = %admin.id,
            "deletion approved, target archived"
        );
        Ok(stored)
    }

    pub fn reject_deletion(
        &self,
        admin: &Identity,
        deletion_id: &DeletionRequestId,
        reason: Option<String>,
    ) -> Result<DeletionRequest, ListingServiceError> {
        require_admin(admin)?;
        let mut deletion = self.load_deletion(deletion_id)?;
        deletion.status = transition(deletion.status, ReviewEvent::Reject)?;

        let effect = match deletion.target {
            DeletionTarget::Property(_) => DeletionEffect::Nothing,
            DeletionTarget::PropertyRequest(request_id) => {
                self.request_effect(&request_id, RequestEvent::RejectDeletion)?
            }
        };
        deletion.admin_notes = clean_note(reason);

        let stored = self.repository.commit_deletion_review(deletion, effect)?;
        info!(deletion_id = %stored.id, admin = %admin.id, "deletion rejected");
        Ok(stored)
    }

    /// Permanently remove a property. Never reached through deletion approval.
    pub fn hard_delete_property(
        &self,
        admin: &Identity,
        property_id: &PropertyId,
    ) -> Result<Property, ListingServiceError> {
        require_admin(admin)?;
        let removed = self.repository.delete_property(property_id)?;
        warn!(property_id = %removed.id, admin = %admin.id, "property hard deleted");
        Ok(removed)
    }

    /// Direct insert by an authenticated owner; the listing waits for an admin to publish it.
    pub fn create_property(
        &self,
        owner: &Identity,
        details: ListingDetails,
    ) -> Result<Property, ListingServiceError> {
        let details = self.guard.check_details(details)?;
        let now = Utc::now();

        let property = Property {
            id: PropertyId::new(),
            details,
            owner_id: Some(owner.id),
            source_request_id: None,
            is_approved: false,
            is_archived: false,
            admin_notes: None,
            revision: 1,
            created_at: now,
            updated_at: now,
        };

        let stored = self.repository.insert_property(property)?;
        info!(property_id = %stored.id, owner = %owner.id, "property created, awaiting publication");
        Ok(stored)
    }

    pub fn publish_property(
        &self,
        admin: &Identity,
        property_id: &PropertyId,
    ) -> Result<Property, ListingServiceError> {
        require_admin(admin)?;
        let mut property = self.load_live_property(property_id)?;
        if property.is_approved {
            return Err(TransitionError::new("published", "publish").into());
        }
        self.guard.require_qr_code(&property.details)?;

        let expected_revision = property.revision;
        property.is_approved = true;
        property.revision += 1;
        property.updated_at = Utc::now();

        let stored = self.repository.update_property(expected_revision, property)?;
        info!(property_id = %stored.id, admin = %admin.id, "property published");
        Ok(stored)
    }

    /// Approved, non-archived listings matching `filter`, newest first.
    pub fn browse(&self, filter: &PropertyFilter) -> Result<Vec<Property>, ListingServiceError> {
        Ok(self
            .repository
            .properties()?
            .into_iter()
            .filter(|property| property.is_live() && filter.matches(property))
            .collect())
    }

    /// Every non-archived listing owned by `owner`, published or not.
    pub fn owned_properties(&self, owner: &Identity) -> Result<Vec<Property>, ListingServiceError> {
        Ok(self
            .repository
            .properties()?
            .into_iter()
            .filter(|property| !property.is_archived && property.owner_id == Some(owner.id))
            .collect())
    }

    pub fn get_request(&self, request_id: &RequestId) -> Result<PropertyRequest, ListingServiceError> {
        self.load_request(request_id)
    }

    /// Live listings are public; unpublished ones are visible to their owner and admins.
    pub fn get_property(
        &self,
        viewer: Option<&Identity>,
        property_id: &PropertyId,
    ) -> Result<Property, ListingServiceError> {
        let property = self
            .repository
            .fetch_property(property_id)?
            .ok_or(RepositoryError::NotFound)?;

        let visible = property.is_live()
            || viewer.is_some_and(|viewer| {
                viewer.is_admin() || (!property.is_archived && property.owner_id == Some(viewer.id))
            });
        if visible {
            Ok(property)
        } else {
            Err(RepositoryError::NotFound.into())
        }
    }

    pub fn requests(
        &self,
        admin: &Identity,
        status: Option<RequestStatus>,
    ) -> Result<Vec<PropertyRequest>, ListingServiceError> {
        require_admin(admin)?;
        Ok(self.repository.requests(status)?)
    }

    pub fn deletion_requests(
        &self,
        admin: &Identity,
        status: Option<ReviewStatus>,
    ) -> Result<Vec<DeletionRequest>, ListingServiceError> {
        require_admin(admin)?;
        Ok(self.repository.deletions(status)?)
    }

    pub fn edit_requests(
        &self,
        admin: &Identity,
        status: Option<ReviewStatus>,
    ) -> Result<Vec<PropertyEditRequest>, ListingServiceError> {
        require_admin(admin)?;
        Ok(self.repository.edits(status)?)
    }

    /// Request queue as CSV, one row per request.
    pub fn export_requests_csv(
        &self,
        admin: &Identity,
        status: Option<RequestStatus>,
    ) -> Result<String, ListingServiceError> {
        require_admin(admin)?;
        let requests = self.repository.requests(status)?;
        let csv = requests_csv(&requests)?;
        info!(admin = %admin.id, rows = requests.len(), "property requests exported");
        Ok(csv)
    }

    /// Record a sparse change set against a published listing for admin review.
    pub fn submit_edit(
        &self,
        owner: &Identity,
        property_id: &PropertyId,
        changes: ListingChanges,
        message: Option<String>,
    ) -> Result<PropertyEditRequest, ListingServiceError> {
        let property = self.load_live_property(property_id)?;
        if !owner.is_admin() && property.owner_id != Some(owner.id) {
            return Err(AuthorizationError::NotOwner.into());
        }

        let changes = changes.into_patch();
        if changes.is_empty() {
            return Err(ValidationError::EmptyPatch.into());
        }

        let mut preview = property.details.clone();
        changes.apply_to(&mut preview);
        self.guard.validate_details(&preview)?;
        if changes.get(ListingField::QrCode).is_some() {
            self.guard.require_qr_code(&preview)?;
        }

        let edit = PropertyEditRequest {
            id: EditRequestId::new(),
            property_id: property.id,
            user_id: owner.id,
            changes,
            status: ReviewStatus::Pending,
            user_message: clean_note(message),
            admin_notes: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: Utc::now(),
        };

        let stored = self.repository.insert_edit(edit)?;
        info!(
            edit_id = %stored.id,
            property_id = %stored.property_id,
            fields = stored.changes.len(),
            "edit request submitted"
        );
        Ok(stored)
    }

    pub fn review_edit(
        &self,
        admin: &Identity,
        edit_id: &EditRequestId,
    ) -> Result<EditReview, ListingServiceError> {
        require_admin(admin)?;
        let edit = self.load_edit(edit_id)?;
        let property = self
            .repository
            .fetch_property(&edit.property_id)?
            .ok_or(RepositoryError::NotFound)?;
        let changes = edit.changes.compare(&property.details);
        Ok(EditReview {
            edit,
            property,
            changes,
        })
    }

    /// Merge a pending edit into its property. Fields absent from the patch are untouched.
    pub fn approve_edit(
        &self,
        admin: &Identity,
        edit_id: &EditRequestId,
    ) -> Result<Property, ListingServiceError> {
        require_admin(admin)?;
        let mut edit = self.load_edit(edit_id)?;
        let next = transition(edit.status, ReviewEvent::Approve)?;
        let property = self.load_live_property(&edit.property_id)?;

        let mut merged = property.clone();
        edit.changes.apply_to(&mut merged.details);
        self.guard.validate_details(&merged.details)?;

        let now = Utc::now();
        merged.revision = property.revision + 1;
        merged.updated_at = now;
        edit.status = next;
        edit.reviewed_by = Some(admin.id);
        edit.reviewed_at = Some(now);

        let changed = edit.changes.changed_fields(&property.details).len();
        let stored = self
            .repository
            .commit_edit_approval(edit, property.revision, merged)?;
        info!(
            edit_id = %edit_id,
            property_id = %stored.id,
            changed_fields = changed,
            admin = %admin.id,
            "edit request approved"
        );
        Ok(stored)
    }

    pub fn reject_edit(
        &self,
        admin: &Identity,
        edit_id: &EditRequestId,
        reason: Option<String>,
    ) -> Result<PropertyEditRequest, ListingServiceError> {
        require_admin(admin)?;
        let mut edit = self.load_edit(edit_id)?;
        edit.status = transition(edit.status, ReviewEvent::Reject)?;
        edit.admin_notes = clean_note(reason);
        edit.reviewed_by = Some(admin.id);
        edit.reviewed_at = Some(Utc::now());

        let stored = self.repository.commit_edit_rejection(edit)?;
        info!(edit_id = %stored.id, admin = %admin.id, "edit request rejected");
        Ok(stored)
    }

    fn load_request(&self, id: &RequestId) -> Result<PropertyRequest, ListingServiceError> {
        Ok(self
            .repository
            .fetch_request(id)?
            .ok_or(RepositoryError::NotFound)?)
    }

    fn load_live_property(&self, id: &PropertyId) -> Result<Property, ListingServiceError> {
        match self.repository.fetch_property(id)? {
            Some(property) if !property.is_archived => Ok(property),
            _ => Err(RepositoryError::NotFound.into()),
        }
    }

    fn load_deletion(&self, id: &DeletionRequestId) -> Result<DeletionRequest, ListingServiceError> {
        Ok(self
            .repository
            .fetch_deletion(id)?
            .ok_or(RepositoryError::NotFound)?)
    }

    fn load_edit(&self, id: &EditRequestId) -> Result<PropertyEditRequest, ListingServiceError> {
        Ok(self
            .repository
            .fetch_edit(id)?
            .ok_or(RepositoryError::NotFound)?)
    }

    fn request_effect(
        &self,
        request_id: &RequestId,
        event: RequestEvent,
    ) -> Result<DeletionEffect, ListingServiceError> {
        let mut request = self.load_request(request_id)?;
        let expected = request.status;
        request.status = transition(expected, event)?;
        request.updated_at = Utc::now();
        Ok(DeletionEffect::UpdateRequest { expected, request })
    }
}

fn require_admin(identity: &Identity) -> Result<(), AuthorizationError> {
    if identity.is_admin() {
        Ok(())
    } else {
        Err(AuthorizationError::AdminRequired)
    }
}

fn clean_note(note: Option<String>) -> Option<String> {
    note.map(|note| note.trim().to_string())
        .filter(|note| !note.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    #[error("admin role required")]
    AdminRequired,
    #[error("only the submitter or owner may do this")]
    NotOwner,
}

/// Error raised by the listing workflow service.
#[derive(Debug, thiserror::Error)]
pub enum ListingServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl ListingServiceError {
    /// Status precondition failures, whether caught before or during the write.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::Transition(_) | Self::Repository(RepositoryError::Conflict)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Repository(RepositoryError::NotFound))
    }
}
