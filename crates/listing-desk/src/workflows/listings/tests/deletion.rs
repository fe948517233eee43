use super::common::*;
use crate::workflows::listings::domain::{DeletionRequestId, DeletionTarget, PropertyId};
use crate::workflows::listings::lifecycle::{RequestStatus, ReviewStatus};
use crate::workflows::listings::patch::ListingChanges;
use crate::workflows::listings::repository::ListingRepository;
use crate::workflows::listings::service::{AuthorizationError, ListingServiceError};
use crate::workflows::listings::PropertyFilter;

#[test]
fn owner_deletion_of_a_pending_request_marks_it_and_archives_on_approval() {
    let (service, _, _) = build_service();
    let owner = member();
    let admin = admin();
    let request = service
        .submit(Some(&owner), submission())
        .expect("submission accepted");

    let deletion = service
        .request_deletion(
            &owner,
            DeletionTarget::PropertyRequest(request.id),
            Some("sold privately".to_string()),
        )
        .expect("deletion requested");
    assert_eq!(deletion.status, ReviewStatus::Pending);
    assert_eq!(deletion.user_id, owner.id);
    assert_eq!(
        service.get_request(&request.id).expect("readable").status,
        RequestStatus::DeletionRequested
    );

    let approved = service
        .approve_deletion(&admin, &deletion.id)
        .expect("deletion approved");
    assert_eq!(approved.status, ReviewStatus::Approved);
    assert_eq!(approved.approved_by, Some(admin.id));
    assert!(approved.approved_at.is_some());
    assert_eq!(
        service.get_request(&request.id).expect("readable").status,
        RequestStatus::Archived
    );
}

#[test]
fn rejecting_a_request_deletion_returns_the_request_to_pending() {
    let (service, _, _) = build_service();
    let owner = member();
    let admin = admin();
    let request = service
        .submit(Some(&owner), submission())
        .expect("submission accepted");
    let deletion = service
        .request_deletion(&owner, DeletionTarget::PropertyRequest(request.id), None)
        .expect("deletion requested");

    assert!(service
        .reject(&admin, &request.id, None)
        .expect_err("cannot reject while deletion is pending")
        .is_conflict());

    let rejected = service
        .reject_deletion(&admin, &deletion.id, Some("still listed".to_string()))
        .expect("deletion rejected");
    assert_eq!(rejected.status, ReviewStatus::Rejected);
    assert_eq!(rejected.admin_notes.as_deref(), Some("still listed"));
    assert_eq!(
        service.get_request(&request.id).expect("readable").status,
        RequestStatus::Pending
    );

    service
        .approve(&admin, &request.id, None, None)
        .expect("request can be approved again");
}

#[test]
fn approving_a_property_deletion_archives_it_once() {
    let (service, store, _) = build_service();
    let owner = member();
    let admin = admin();
    let property = published(&service, &owner);

    let deletion = service
        .request_deletion(&owner, DeletionTarget::Property(property.id), None)
        .expect("deletion requested");
    let untouched = store
        .fetch_property(&property.id)
        .expect("store available")
        .expect("property present");
    assert!(!untouched.is_archived);

    service
        .approve_deletion(&admin, &deletion.id)
        .expect("deletion approved");
    let archived = store
        .fetch_property(&property.id)
        .expect("store available")
        .expect("archived, not removed");
    assert!(archived.is_archived);
    assert_eq!(archived.revision, property.revision + 1);

    let err = service
        .approve_deletion(&admin, &deletion.id)
        .expect_err("second approval");
    assert!(err.is_conflict());

    let after = store
        .fetch_property(&property.id)
        .expect("store available")
        .expect("still archived");
    assert_eq!(after.revision, archived.revision);
    assert_eq!(after.updated_at, archived.updated_at);
    assert!(service
        .browse(&PropertyFilter::default())
        .expect("browse")
        .is_empty());
}

#[test]
fn only_the_owner_or_an_admin_may_request_deletion() {
    let (service, _, _) = build_service();
    let owner = member();
    let stranger = member();
    let property = published(&service, &owner);

    let err = service
        .request_deletion(&stranger, DeletionTarget::Property(property.id), None)
        .expect_err("stranger refused");
    assert!(matches!(
        err,
        ListingServiceError::Authorization(AuthorizationError::NotOwner)
    ));

    service
        .request_deletion(&admin(), DeletionTarget::Property(property.id), None)
        .expect("admin may request deletion");
}

#[test]
fn duplicate_pending_deletions_conflict() {
    let (service, _, _) = build_service();
    let owner = member();
    let property = published(&service, &owner);

    service
        .request_deletion(&owner, DeletionTarget::Property(property.id), None)
        .expect("first deletion request");
    assert!(service
        .request_deletion(&owner, DeletionTarget::Property(property.id), None)
        .expect_err("duplicate")
        .is_conflict());
}

#[test]
fn ownership_is_checked_before_pending_deletions_are_revealed() {
    let (service, _, _) = build_service();
    let owner = member();
    let stranger = member();
    let property = published(&service, &owner);
    service
        .request_deletion(&owner, DeletionTarget::Property(property.id), None)
        .expect("owner deletion request");

    let err = service
        .request_deletion(&stranger, DeletionTarget::Property(property.id), None)
        .expect_err("stranger refused");
    assert!(matches!(
        err,
        ListingServiceError::Authorization(AuthorizationError::NotOwner)
    ));

    let request = service.submit(Some(&owner), submission()).expect("accepted");
    service
        .request_deletion(&owner, DeletionTarget::PropertyRequest(request.id), None)
        .expect("owner deletion request");
    let err = service
        .request_deletion(&stranger, DeletionTarget::PropertyRequest(request.id), None)
        .expect_err("stranger refused");
    assert!(matches!(
        err,
        ListingServiceError::Authorization(AuthorizationError::NotOwner)
    ));
}

#[test]
fn deletion_targets_must_exist_and_be_live() {
    let (service, _, _) = build_service();
    let owner = member();
    let admin = admin();

    assert!(service
        .request_deletion(&owner, DeletionTarget::Property(PropertyId::new()), None)
        .expect_err("missing property")
        .is_not_found());

    let property = published(&service, &owner);
    let deletion = service
        .request_deletion(&owner, DeletionTarget::Property(property.id), None)
        .expect("deletion requested");
    service
        .approve_deletion(&admin, &deletion.id)
        .expect("archived");
    assert!(service
        .request_deletion(&owner, DeletionTarget::Property(property.id), None)
        .expect_err("archived property")
        .is_not_found());

    let rejected = service.submit(Some(&owner), submission()).expect("accepted");
    service
        .reject(&admin, &rejected.id, None)
        .expect("rejected");
    assert!(service
        .request_deletion(&owner, DeletionTarget::PropertyRequest(rejected.id), None)
        .expect_err("rejected request is already resolved")
        .is_conflict());
}

#[test]
fn deletion_review_requires_admin_and_a_known_request() {
    let (service, _, _) = build_service();
    let owner = member();
    let property = published(&service, &owner);
    let deletion = service
        .request_deletion(&owner, DeletionTarget::Property(property.id), None)
        .expect("deletion requested");

    assert!(matches!(
        service.approve_deletion(&owner, &deletion.id),
        Err(ListingServiceError::Authorization(_))
    ));
    assert!(service
        .approve_deletion(&admin(), &DeletionRequestId::new())
        .expect_err("unknown deletion")
        .is_not_found());

    let queue = service
        .deletion_requests(&admin(), Some(ReviewStatus::Pending))
        .expect("queue readable");
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].id, deletion.id);
}

#[test]
fn hard_delete_is_separate_from_deletion_approval() {
    let (service, store, _) = build_service();
    let owner = member();
    let admin = admin();
    let property = published(&service, &owner);

    assert!(matches!(
        service.hard_delete_property(&owner, &property.id),
        Err(ListingServiceError::Authorization(_))
    ));

    let removed = service
        .hard_delete_property(&admin, &property.id)
        .expect("hard delete");
    assert_eq!(removed.id, property.id);
    assert!(store
        .fetch_property(&property.id)
        .expect("store available")
        .is_none());
    assert!(service
        .hard_delete_property(&admin, &property.id)
        .expect_err("already gone")
        .is_not_found());
}

#[test]
fn hard_delete_closes_pending_reviews_of_the_property() {
    let (service, store, _) = build_service();
    let owner = member();
    let admin = admin();
    let property = published(&service, &owner);

    let deletion = service
        .request_deletion(&owner, DeletionTarget::Property(property.id), None)
        .expect("deletion requested");
    let edit = service
        .submit_edit(
            &owner,
            &property.id,
            ListingChanges {
                price: Some(480_000),
                ..ListingChanges::default()
            },
            None,
        )
        .expect("edit submitted");

    service
        .hard_delete_property(&admin, &property.id)
        .expect("hard delete");

    let closed = store
        .fetch_deletion(&deletion.id)
        .expect("store available")
        .expect("deletion kept");
    assert_eq!(closed.status, ReviewStatus::Rejected);
    assert!(closed.admin_notes.is_some());
    let closed_edit = store
        .fetch_edit(&edit.id)
        .expect("store available")
        .expect("edit kept");
    assert_eq!(closed_edit.status, ReviewStatus::Rejected);

    assert!(service
        .approve_deletion(&admin, &deletion.id)
        .expect_err("already closed")
        .is_conflict());
    assert!(service
        .deletion_requests(&admin, Some(ReviewStatus::Pending))
        .expect("queue readable")
        .is_empty());
}
