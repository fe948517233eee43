//! Status machines for property requests and the two review queues.
//!
//! Every status change in the workflow goes through [`transition`], which looks the
//! move up in a static table. Anything not listed is rejected with a
//! [`TransitionError`], surfaced to callers as a conflict.

use serde::{Deserialize, Serialize};

/// Status of a submitted property request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    DeletionRequested,
    Archived,
}

impl RequestStatus {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Pending,
            Self::Approved,
            Self::Rejected,
            Self::DeletionRequested,
            Self::Archived,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::DeletionRequested => "deletion_requested",
            Self::Archived => "archived",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ordered()
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(label))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestEvent {
    Approve,
    Reject,
    RequestDeletion,
    ApproveDeletion,
    RejectDeletion,
}

impl RequestEvent {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::RequestDeletion => "request deletion of",
            Self::ApproveDeletion => "approve deletion of",
            Self::RejectDeletion => "reject deletion of",
        }
    }
}

/// Status shared by edit requests and deletion requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub const fn ordered() -> [Self; 3] {
        [Self::Pending, Self::Approved, Self::Rejected]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ordered()
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(label))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewEvent {
    Approve,
    Reject,
}

impl ReviewEvent {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

/// A status type driven by a fixed transition table.
pub trait Lifecycle: Copy + Eq + 'static {
    type Event: Copy + Eq + 'static;

    fn table() -> &'static [(Self, Self::Event, Self)];
    fn state_label(self) -> &'static str;
    fn event_label(event: Self::Event) -> &'static str;
}

const REQUEST_TRANSITIONS: &[(RequestStatus, RequestEvent, RequestStatus)] = &[
    (
        RequestStatus::Pending,
        RequestEvent::Approve,
        RequestStatus::Approved,
    ),
    (
        RequestStatus::Pending,
        RequestEvent::Reject,
        RequestStatus::Rejected,
    ),
    (
        RequestStatus::Pending,
        RequestEvent::RequestDeletion,
        RequestStatus::DeletionRequested,
    ),
    (
        RequestStatus::DeletionRequested,
        RequestEvent::ApproveDeletion,
        RequestStatus::Archived,
    ),
    (
        RequestStatus::DeletionRequested,
        RequestEvent::RejectDeletion,
        RequestStatus::Pending,
    ),
];

const REVIEW_TRANSITIONS: &[(ReviewStatus, ReviewEvent, ReviewStatus)] = &[
    (
        ReviewStatus::Pending,
        ReviewEvent::Approve,
        ReviewStatus::Approved,
    ),
    (
        ReviewStatus::Pending,
        ReviewEvent::Reject,
        ReviewStatus::Rejected,
    ),
];

impl Lifecycle for RequestStatus {
    type Event = RequestEvent;

    fn table() -> &'static [(Self, Self::Event, Self)] {
        REQUEST_TRANSITIONS
    }

    fn state_label(self) -> &'static str {
        self.label()
    }

    fn event_label(event: Self::Event) -> &'static str {
        event.label()
    }
}

impl Lifecycle for ReviewStatus {
    type Event = ReviewEvent;

    fn table() -> &'static [(Self, Self::Event, Self)] {
        REVIEW_TRANSITIONS
    }

    fn state_label(self) -> &'static str {
        self.label()
    }

    fn event_label(event: Self::Event) -> &'static str {
        event.label()
    }
}

/// Raised when an event is not allowed from the current status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot {event} a {state} record")]
pub struct TransitionError {
    pub state: &'static str,
    pub event: &'static str,
}

impl TransitionError {
    pub const fn new(state: &'static str, event: &'static str) -> Self {
        Self { state, event }
    }
}

/// Resolve the status reached by applying `event` to `current`.
pub fn transition<S: Lifecycle>(current: S, event: S::Event) -> Result<S, TransitionError> {
    S::table()
        .iter()
        .find(|(from, on, _)| *from == current && *on == event)
        .map(|(_, _, to)| *to)
        .ok_or_else(|| TransitionError::new(current.state_label(), S::event_label(event)))
}

/// Events accepted from `current`, in table order.
pub fn allowed_events<S: Lifecycle>(current: S) -> Vec<S::Event> {
    S::table()
        .iter()
        .filter(|(from, _, _)| *from == current)
        .map(|(_, event, _)| *event)
        .collect()
}
