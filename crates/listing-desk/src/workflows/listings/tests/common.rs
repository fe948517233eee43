use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use serde_json::Value;

use crate::workflows::listings::domain::{
    DeletionRequest, DeletionRequestId, DeletionTarget, EditRequestId, Identity, ListingDetails,
    ListingKind, Property, PropertyEditRequest, PropertyId, PropertyRequest, PropertySubmission,
    RequestId, Role, SubmitterContact, SubmitterType, UserId,
};
use crate::workflows::listings::lifecycle::{RequestStatus, ReviewStatus};
use crate::workflows::listings::notify::{ListingNotifier, NotifyError, SubmissionNotice};
use crate::workflows::listings::repository::{
    DeletionEffect, ListingRepository, RepositoryError,
};
use crate::workflows::listings::router::{USER_EMAIL_HEADER, USER_ID_HEADER, USER_ROLE_HEADER};
use crate::workflows::listings::{IntakePolicy, ListingWorkflowService, MemoryListingStore};

pub(super) type TestService = ListingWorkflowService<MemoryListingStore, RecordingNotifier>;

pub(super) fn admin() -> Identity {
    Identity {
        id: UserId::new(),
        email: "admin@listings.ae".to_string(),
        role: Role::Admin,
    }
}

pub(super) fn member() -> Identity {
    Identity {
        id: UserId::new(),
        email: "ana@x.com".to_string(),
        role: Role::User,
    }
}

pub(super) fn details() -> ListingDetails {
    ListingDetails {
        title: "Sea View Flat".to_string(),
        description: String::new(),
        price: 500_000,
        emirate: None,
        location: String::new(),
        latitude: None,
        longitude: None,
        bedrooms: 2,
        bathrooms: 2,
        area_sqft: None,
        property_type: String::new(),
        kind: ListingKind::Sale,
        amenities: Default::default(),
        images: Vec::new(),
        videos: Vec::new(),
        qr_code: Some("QR123".to_string()),
    }
}

pub(super) fn submission() -> PropertySubmission {
    PropertySubmission {
        details: details(),
        contact: SubmitterContact {
            contact_name: "Ana".to_string(),
            contact_email: "ana@x.com".to_string(),
            contact_phone: None,
            submitter_type: SubmitterType::Owner,
        },
    }
}

pub(super) fn submission_without_qr() -> PropertySubmission {
    let mut submission = submission();
    submission.details.qr_code = None;
    submission
}

pub(super) fn build_service() -> (TestService, Arc<MemoryListingStore>, Arc<RecordingNotifier>) {
    let store = Arc::new(MemoryListingStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let service =
        ListingWorkflowService::new(store.clone(), notifier.clone(), IntakePolicy::default());
    (service, store, notifier)
}

/// Submit as `owner` and approve, returning the live property.
pub(super) fn published(service: &TestService, owner: &Identity) -> Property {
    let request = service
        .submit(Some(owner), submission())
        .expect("submission accepted");
    service
        .approve(&admin(), &request.id, None, None)
        .expect("approval succeeds")
        .property
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    notices: Mutex<Vec<SubmissionNotice>>,
}

impl RecordingNotifier {
    pub(super) fn notices(&self) -> Vec<SubmissionNotice> {
        self.notices.lock().expect("notifier mutex poisoned").clone()
    }
}

impl ListingNotifier for RecordingNotifier {
    fn submission_received(&self, notice: SubmissionNotice) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .expect("notifier mutex poisoned")
            .push(notice);
        Ok(())
    }
}

pub(super) struct FailingNotifier;

impl ListingNotifier for FailingNotifier {
    fn submission_received(&self, _notice: SubmissionNotice) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("webhook returned 502".to_string()))
    }
}

pub(super) struct UnavailableStore;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl ListingRepository for UnavailableStore {
    fn insert_request(&self, _request: PropertyRequest) -> Result<PropertyRequest, RepositoryError> {
        offline()
    }

    fn fetch_request(&self, _id: &RequestId) -> Result<Option<PropertyRequest>, RepositoryError> {
        offline()
    }

    fn requests(
        &self,
        _status: Option<RequestStatus>,
    ) -> Result<Vec<PropertyRequest>, RepositoryError> {
        offline()
    }

    fn update_request(
        &self,
        _expected: RequestStatus,
        _request: PropertyRequest,
    ) -> Result<PropertyRequest, RepositoryError> {
        offline()
    }

    fn commit_approval(
        &self,
        _expected: RequestStatus,
        _request: PropertyRequest,
        _property: Property,
    ) -> Result<Property, RepositoryError> {
        offline()
    }

    fn insert_property(&self, _property: Property) -> Result<Property, RepositoryError> {
        offline()
    }

    fn fetch_property(&self, _id: &PropertyId) -> Result<Option<Property>, RepositoryError> {
        offline()
    }

    fn properties(&self) -> Result<Vec<Property>, RepositoryError> {
        offline()
    }

    fn update_property(
        &self,
        _expected_revision: u64,
        _property: Property,
    ) -> Result<Property, RepositoryError> {
        offline()
    }

    fn delete_property(&self, _id: &PropertyId) -> Result<Property, RepositoryError> {
        offline()
    }

    fn commit_deletion_request(
        &self,
        _deletion: DeletionRequest,
        _request_update: Option<(RequestStatus, PropertyRequest)>,
    ) -> Result<DeletionRequest, RepositoryError> {
        offline()
    }

    fn fetch_deletion(
        &self,
        _id: &DeletionRequestId,
    ) -> Result<Option<DeletionRequest>, RepositoryError> {
        offline()
    }

    fn deletions(
        &self,
        _status: Option<ReviewStatus>,
    ) -> Result<Vec<DeletionRequest>, RepositoryError> {
        offline()
    }

    fn pending_deletion_for(
        &self,
        _target: &DeletionTarget,
    ) -> Result<Option<DeletionRequest>, RepositoryError> {
        offline()
    }

    fn commit_deletion_review(
        &self,
        _deletion: DeletionRequest,
        _effect: DeletionEffect,
    ) -> Result<DeletionRequest, RepositoryError> {
        offline()
    }

    fn insert_edit(
        &self,
        _edit: PropertyEditRequest,
    ) -> Result<PropertyEditRequest, RepositoryError> {
        offline()
    }

    fn fetch_edit(
        &self,
        _id: &EditRequestId,
    ) -> Result<Option<PropertyEditRequest>, RepositoryError> {
        offline()
    }

    fn edits(
        &self,
        _status: Option<ReviewStatus>,
    ) -> Result<Vec<PropertyEditRequest>, RepositoryError> {
        offline()
    }

    fn commit_edit_approval(
        &self,
        _edit: PropertyEditRequest,
        _base_revision: u64,
        _merged: Property,
    ) -> Result<Property, RepositoryError> {
        offline()
    }

    fn commit_edit_rejection(
        &self,
        _edit: PropertyEditRequest,
    ) -> Result<PropertyEditRequest, RepositoryError> {
        offline()
    }
}

pub(super) fn request_as(
    method: Method,
    uri: &str,
    identity: Option<&Identity>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(identity) = identity {
        let role = match identity.role {
            Role::Admin => "admin",
            Role::User => "user",
        };
        builder = builder
            .header(USER_ID_HEADER, identity.id.to_string())
            .header(USER_EMAIL_HEADER, identity.email.as_str())
            .header(USER_ROLE_HEADER, role);
    }

    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).expect("json body")))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
