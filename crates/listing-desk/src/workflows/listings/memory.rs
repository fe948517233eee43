use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::domain::{
    DeletionRequest, DeletionRequestId, DeletionTarget, EditRequestId, Property, PropertyEditRequest,
    PropertyId, PropertyRequest, RequestId,
};
use super::lifecycle::{RequestStatus, ReviewStatus};
use super::repository::{DeletionEffect, ListingRepository, RepositoryError};

const PROPERTY_REMOVED_NOTE: &str = "property was permanently deleted";

#[derive(Debug, Default)]
struct StoreState {
    requests: HashMap<RequestId, PropertyRequest>,
    properties: HashMap<PropertyId, Property>,
    deletions: HashMap<DeletionRequestId, DeletionRequest>,
    edits: HashMap<EditRequestId, PropertyEditRequest>,
}

impl StoreState {
    fn check_request(
        &self,
        id: &RequestId,
        expected: RequestStatus,
    ) -> Result<(), RepositoryError> {
        match self.requests.get(id) {
            None => Err(RepositoryError::NotFound),
            Some(stored) if stored.status != expected => Err(RepositoryError::Conflict),
            Some(_) => Ok(()),
        }
    }
}

/// Process-local store. One mutex guards every table, so each `commit_*` call is
/// applied as a single unit.
#[derive(Debug, Default)]
pub struct MemoryListingStore {
    state: Mutex<StoreState>,
}

impl MemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("listing store lock poisoned".to_string()))
    }
}

fn newest_first<T, F>(mut items: Vec<T>, created_at: F) -> Vec<T>
where
    F: Fn(&T) -> chrono::DateTime<chrono::Utc>,
{
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    items
}

impl ListingRepository for MemoryListingStore {
    fn insert_request(&self, request: PropertyRequest) -> Result<PropertyRequest, RepositoryError> {
        let mut state = self.state()?;
        if state.requests.contains_key(&request.id) {
            return Err(RepositoryError::Conflict);
        }
        state.requests.insert(request.id, request.clone());
        Ok(request)
    }

    fn fetch_request(&self, id: &RequestId) -> Result<Option<PropertyRequest>, RepositoryError> {
        Ok(self.state()?.requests.get(id).cloned())
    }

    fn requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<PropertyRequest>, RepositoryError> {
        let state = self.state()?;
        let matching = state
            .requests
            .values()
            .filter(|request| status.map_or(true, |wanted| request.status == wanted))
            .cloned()
            .collect();
        Ok(newest_first(matching, |request: &PropertyRequest| {
            request.created_at
        }))
    }

    fn update_request(
        &self,
        expected: RequestStatus,
        request: PropertyRequest,
    ) -> Result<PropertyRequest, RepositoryError> {
        let mut state = self.state()?;
        state.check_request(&request.id, expected)?;
        state.requests.insert(request.id, request.clone());
        Ok(request)
    }

    fn commit_approval(
        &self,
        expected: RequestStatus,
        request: PropertyRequest,
        property: Property,
    ) -> Result<Property, RepositoryError> {
        let mut state = self.state()?;
        state.check_request(&request.id, expected)?;
        if state.properties.contains_key(&property.id) {
            return Err(RepositoryError::Conflict);
        }
        state.requests.insert(request.id, request);
        state.properties.insert(property.id, property.clone());
        Ok(property)
    }

    fn insert_property(&self, property: Property) -> Result<Property, RepositoryError> {
        let mut state = self.state()?;
        if state.properties.contains_key(&property.id) {
            return Err(RepositoryError::Conflict);
        }
        state.properties.insert(property.id, property.clone());
        Ok(property)
    }

    fn fetch_property(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError> {
        Ok(self.state()?.properties.get(id).cloned())
    }

    fn properties(&self) -> Result<Vec<Property>, RepositoryError> {
        let state = self.state()?;
        let all = state.properties.values().cloned().collect();
        Ok(newest_first(all, |property: &Property| property.created_at))
    }

    fn update_property(
        &self,
        expected_revision: u64,
        property: Property,
    ) -> Result<Property, RepositoryError> {
        let mut state = self.state()?;
        match state.properties.get(&property.id) {
            None => return Err(RepositoryError::NotFound),
            Some(stored) if stored.revision != expected_revision => {
                return Err(RepositoryError::Conflict)
            }
            Some(_) => {}
        }
        state.properties.insert(property.id, property.clone());
        Ok(property)
    }

    fn delete_property(&self, id: &PropertyId) -> Result<Property, RepositoryError> {
        let mut state = self.state()?;
        let removed = state.properties.remove(id).ok_or(RepositoryError::NotFound)?;

        let now = chrono::Utc::now();
        let target = DeletionTarget::Property(*id);
        for deletion in state.deletions.values_mut() {
            if deletion.target == target && deletion.status == ReviewStatus::Pending {
                deletion.status = ReviewStatus::Rejected;
                deletion.admin_notes = Some(PROPERTY_REMOVED_NOTE.to_string());
            }
        }
        for edit in state.edits.values_mut() {
            if edit.property_id == *id && edit.status == ReviewStatus::Pending {
                edit.status = ReviewStatus::Rejected;
                edit.admin_notes = Some(PROPERTY_REMOVED_NOTE.to_string());
                edit.reviewed_at = Some(now);
            }
        }
        Ok(removed)
    }

    fn commit_deletion_request(
        &self,
        deletion: DeletionRequest,
        request_update: Option<(RequestStatus, PropertyRequest)>,
    ) -> Result<DeletionRequest, RepositoryError> {
        let mut state = self.state()?;
        let duplicate = state.deletions.values().any(|existing| {
            existing.target == deletion.target && existing.status == ReviewStatus::Pending
        });
        if duplicate || state.deletions.contains_key(&deletion.id) {
            return Err(RepositoryError::Conflict);
        }

        match &deletion.target {
            DeletionTarget::Property(id) => match state.properties.get(id) {
                Some(property) if !property.is_archived => {}
                _ => return Err(RepositoryError::NotFound),
            },
            DeletionTarget::PropertyRequest(id) => {
                if !state.requests.contains_key(id) {
                    return Err(RepositoryError::NotFound);
                }
            }
        }

        if let Some((expected, request)) = request_update {
            state.check_request(&request.id, expected)?;
            state.requests.insert(request.id, request);
        }
        state.deletions.insert(deletion.id, deletion.clone());
        Ok(deletion)
    }

    fn fetch_deletion(
        &self,
        id: &DeletionRequestId,
    ) -> Result<Option<DeletionRequest>, RepositoryError> {
        Ok(self.state()?.deletions.get(id).cloned())
    }

    fn deletions(
        &self,
        status: Option<ReviewStatus>,
    ) -> Result<Vec<DeletionRequest>, RepositoryError> {
        let state = self.state()?;
        let matching = state
            .deletions
            .values()
            .filter(|deletion| status.map_or(true, |wanted| deletion.status == wanted))
            .cloned()
            .collect();
        Ok(newest_first(matching, |deletion: &DeletionRequest| {
            deletion.created_at
        }))
    }

    fn pending_deletion_for(
        &self,
        target: &DeletionTarget,
    ) -> Result<Option<DeletionRequest>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .deletions
            .values()
            .find(|deletion| &deletion.target == target && deletion.status == ReviewStatus::Pending)
            .cloned())
    }

    fn commit_deletion_review(
        &self,
        deletion: DeletionRequest,
        effect: DeletionEffect,
    ) -> Result<DeletionRequest, RepositoryError> {
        let mut state = self.state()?;
        match state.deletions.get(&deletion.id) {
            None => return Err(RepositoryError::NotFound),
            Some(stored) if stored.status != ReviewStatus::Pending => {
                return Err(RepositoryError::Conflict)
            }
            Some(_) => {}
        }

        match effect {
            DeletionEffect::ArchiveProperty(id) => {
                let property = state
                    .properties
                    .get_mut(&id)
                    .ok_or(RepositoryError::NotFound)?;
                if property.is_archived {
                    return Err(RepositoryError::Conflict);
                }
                property.is_archived = true;
                property.revision += 1;
                if let Some(at) = deletion.approved_at {
                    property.updated_at = at;
                }
            }
            DeletionEffect::UpdateRequest { expected, request } => {
                state.check_request(&request.id, expected)?;
                state.requests.insert(request.id, request);
            }
            DeletionEffect::Nothing => {}
        }

        state.deletions.insert(deletion.id, deletion.clone());
        Ok(deletion)
    }

    fn insert_edit(
        &self,
        edit: PropertyEditRequest,
    ) -> Result<PropertyEditRequest, RepositoryError> {
        let mut state = self.state()?;
        if state.edits.contains_key(&edit.id) {
            return Err(RepositoryError::Conflict);
        }
        state.edits.insert(edit.id, edit.clone());
        Ok(edit)
    }

    fn fetch_edit(
        &self,
        id: &EditRequestId,
    ) -> Result<Option<PropertyEditRequest>, RepositoryError> {
        Ok(self.state()?.edits.get(id).cloned())
    }

    fn edits(
        &self,
        status: Option<ReviewStatus>,
    ) -> Result<Vec<PropertyEditRequest>, RepositoryError> {
        let state = self.state()?;
        let matching = state
            .edits
            .values()
            .filter(|edit| status.map_or(true, |wanted| edit.status == wanted))
            .cloned()
            .collect();
        Ok(newest_first(matching, |edit: &PropertyEditRequest| {
            edit.created_at
        }))
    }

    fn commit_edit_approval(
        &self,
        edit: PropertyEditRequest,
        base_revision: u64,
        merged: Property,
    ) -> Result<Property, RepositoryError> {
        let mut state = self.state()?;
        match state.edits.get(&edit.id) {
            None => return Err(RepositoryError::NotFound),
            Some(stored) if stored.status != ReviewStatus::Pending => {
                return Err(RepositoryError::Conflict)
            }
            Some(_) => {}
        }
        match state.properties.get(&merged.id) {
            Some(stored) if stored.is_archived => return Err(RepositoryError::NotFound),
            Some(stored) if stored.revision != base_revision => {
                return Err(RepositoryError::Conflict)
            }
            Some(_) => {}
            None => return Err(RepositoryError::NotFound),
        }

        state.edits.insert(edit.id, edit);
        state.properties.insert(merged.id, merged.clone());
        Ok(merged)
    }

    fn commit_edit_rejection(
        &self,
        edit: PropertyEditRequest,
    ) -> Result<PropertyEditRequest, RepositoryError> {
        let mut state = self.state()?;
        match state.edits.get(&edit.id) {
            None => return Err(RepositoryError::NotFound),
            Some(stored) if stored.status != ReviewStatus::Pending => {
                return Err(RepositoryError::Conflict)
            }
            Some(_) => {}
        }
        state.edits.insert(edit.id, edit.clone());
        Ok(edit)
    }
}
