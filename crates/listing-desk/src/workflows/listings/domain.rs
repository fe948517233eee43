use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::lifecycle::{RequestStatus, ReviewStatus};
use super::patch::PropertyPatch;
use super::validation::ValidationError;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.hyphenated())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(raw.trim())
                    .map(Self)
                    .map_err(|_| ValidationError::InvalidIdentifier {
                        value: raw.to_string(),
                    })
            }
        }
    };
}

record_id!(
    /// Identifier of a submitted property request.
    RequestId
);
record_id!(
    /// Identifier of a published listing.
    PropertyId
);
record_id!(EditRequestId);
record_id!(DeletionRequestId);
record_id!(
    /// Identity-provider user id.
    UserId
);

/// UAE emirates a listing can be located in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Emirate {
    AbuDhabi,
    Dubai,
    Sharjah,
    Ajman,
    UmmAlQuwain,
    RasAlKhaimah,
    Fujairah,
}

impl Emirate {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::AbuDhabi,
            Self::Dubai,
            Self::Sharjah,
            Self::Ajman,
            Self::UmmAlQuwain,
            Self::RasAlKhaimah,
            Self::Fujairah,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::AbuDhabi => "Abu Dhabi",
            Self::Dubai => "Dubai",
            Self::Sharjah => "Sharjah",
            Self::Ajman => "Ajman",
            Self::UmmAlQuwain => "Umm Al Quwain",
            Self::RasAlKhaimah => "Ras Al Khaimah",
            Self::Fujairah => "Fujairah",
        }
    }
}

impl fmt::Display for Emirate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Emirate {
    type Err = ValidationError;

    /// Accepts display labels as well as snake/kebab-case spellings.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        Self::ordered()
            .into_iter()
            .find(|emirate| {
                let label: String = emirate
                    .label()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .map(|c| c.to_ascii_lowercase())
                    .collect();
                label == wanted
            })
            .ok_or_else(|| ValidationError::UnknownEmirate(raw.trim().to_string()))
    }
}

impl TryFrom<String> for Emirate {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Emirate> for String {
    fn from(value: Emirate) -> Self {
        value.label().to_string()
    }
}

/// Whether a listing is offered for rent or for sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    Rent,
    Sale,
}

impl ListingKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rent => "rent",
            Self::Sale => "sale",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitterType {
    Owner,
    Broker,
    Referral,
}

impl SubmitterType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Broker => "broker",
            Self::Referral => "referral",
        }
    }
}

/// Descriptive fields shared by requests, published properties, and edit patches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingDetails {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: u64,
    #[serde(default)]
    pub emirate: Option<Emirate>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub bedrooms: u8,
    #[serde(default)]
    pub bathrooms: u8,
    #[serde(default)]
    pub area_sqft: Option<u32>,
    #[serde(default)]
    pub property_type: String,
    #[serde(rename = "type")]
    pub kind: ListingKind,
    #[serde(default)]
    pub amenities: BTreeSet<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub videos: Vec<String>,
    #[serde(default)]
    pub qr_code: Option<String>,
}

impl ListingDetails {
    /// The compliance QR code, if one with visible characters is present.
    pub fn qr_code(&self) -> Option<&str> {
        self.qr_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }

    pub fn location_label(&self) -> String {
        match (self.location.is_empty(), self.emirate) {
            (false, Some(emirate)) => format!("{}, {}", self.location, emirate.label()),
            (false, None) => self.location.clone(),
            (true, Some(emirate)) => emirate.label().to_string(),
            (true, None) => "unspecified".to_string(),
        }
    }
}

/// Contact block captured from the person submitting a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitterContact {
    pub contact_name: String,
    pub contact_email: String,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default = "default_submitter_type")]
    pub submitter_type: SubmitterType,
}

fn default_submitter_type() -> SubmitterType {
    SubmitterType::Owner
}

/// Inbound listing submission awaiting admin review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySubmission {
    #[serde(flatten)]
    pub details: ListingDetails,
    #[serde(flatten)]
    pub contact: SubmitterContact,
}

/// Persisted submission and its review trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRequest {
    pub id: RequestId,
    #[serde(flatten)]
    pub details: ListingDetails,
    #[serde(flatten)]
    pub contact: SubmitterContact,
    pub submitted_by: Option<UserId>,
    pub status: RequestStatus,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub property_id: Option<PropertyId>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A browsable listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    #[serde(flatten)]
    pub details: ListingDetails,
    pub owner_id: Option<UserId>,
    pub source_request_id: Option<RequestId>,
    pub is_approved: bool,
    pub is_archived: bool,
    pub admin_notes: Option<String>,
    /// Bumped on every write; conditional updates compare against it.
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Property {
    pub fn is_live(&self) -> bool {
        self.is_approved && !self.is_archived
    }
}

/// Sparse change set proposed by a property owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyEditRequest {
    pub id: EditRequestId,
    pub property_id: PropertyId,
    pub user_id: UserId,
    pub changes: PropertyPatch,
    pub status: ReviewStatus,
    pub user_message: Option<String>,
    pub admin_notes: Option<String>,
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// The entity a deletion request removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionTarget {
    PropertyRequest(RequestId),
    Property(PropertyId),
}

impl DeletionTarget {
    /// Build a target from the two mutually exclusive wire references.
    pub fn from_parts(
        property_request_id: Option<RequestId>,
        property_id: Option<PropertyId>,
    ) -> Result<Self, ValidationError> {
        match (property_request_id, property_id) {
            (Some(request_id), None) => Ok(Self::PropertyRequest(request_id)),
            (None, Some(property_id)) => Ok(Self::Property(property_id)),
            _ => Err(ValidationError::AmbiguousDeletionTarget),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionRequest {
    pub id: DeletionRequestId,
    pub target: DeletionTarget,
    pub user_id: UserId,
    pub reason: Option<String>,
    pub status: ReviewStatus,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

/// Caller identity handed over by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub email: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Browse filter for published listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyFilter {
    #[serde(default, rename = "type")]
    pub kind: Option<ListingKind>,
    #[serde(default)]
    pub emirate: Option<Emirate>,
    #[serde(default)]
    pub min_price: Option<u64>,
    #[serde(default)]
    pub max_price: Option<u64>,
    #[serde(default)]
    pub min_bedrooms: Option<u8>,
    #[serde(default)]
    pub search: Option<String>,
}

impl PropertyFilter {
    pub fn matches(&self, property: &Property) -> bool {
        let details = &property.details;

        if self.kind.is_some_and(|kind| kind != details.kind) {
            return false;
        }
        if self.emirate.is_some() && self.emirate != details.emirate {
            return false;
        }
        if self.min_price.is_some_and(|min| details.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| details.price > max) {
            return false;
        }
        if self.min_bedrooms.is_some_and(|min| details.bedrooms < min) {
            return false;
        }

        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                details.title.to_lowercase().contains(&needle)
                    || details.location.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emirate_parses_labels_and_slugs() {
        assert_eq!("Abu Dhabi".parse::<Emirate>().unwrap(), Emirate::AbuDhabi);
        assert_eq!("abu_dhabi".parse::<Emirate>().unwrap(), Emirate::AbuDhabi);
        assert_eq!(
            "ras-al-khaimah".parse::<Emirate>().unwrap(),
            Emirate::RasAlKhaimah
        );
        match "Muscat".parse::<Emirate>() {
            Err(ValidationError::UnknownEmirate(value)) => assert_eq!(value, "Muscat"),
            other => panic!("expected unknown emirate, got {other:?}"),
        }
    }

    #[test]
    fn identifiers_reject_malformed_uuids() {
        assert!("not-a-uuid".parse::<RequestId>().is_err());
        let id = PropertyId::new();
        assert_eq!(id.to_string().parse::<PropertyId>().unwrap(), id);
    }

    #[test]
    fn deletion_target_requires_exactly_one_reference() {
        let request_id = RequestId::new();
        let property_id = PropertyId::new();

        assert_eq!(
            DeletionTarget::from_parts(Some(request_id), None).unwrap(),
            DeletionTarget::PropertyRequest(request_id)
        );
        assert!(matches!(
            DeletionTarget::from_parts(Some(request_id), Some(property_id)),
            Err(ValidationError::AmbiguousDeletionTarget)
        ));
        assert!(matches!(
            DeletionTarget::from_parts(None, None),
            Err(ValidationError::AmbiguousDeletionTarget)
        ));
    }

    #[test]
    fn details_serialize_kind_as_type() {
        let json = serde_json::json!({
            "title": "Marina Loft",
            "price": 120000,
            "type": "rent",
            "emirate": "dubai"
        });
        let details: ListingDetails = serde_json::from_value(json).expect("details parse");
        assert_eq!(details.kind, ListingKind::Rent);
        assert_eq!(details.emirate, Some(Emirate::Dubai));

        let back = serde_json::to_value(&details).expect("serialize");
        assert_eq!(back["type"], "rent");
        assert_eq!(back["emirate"], "Dubai");
    }
}
