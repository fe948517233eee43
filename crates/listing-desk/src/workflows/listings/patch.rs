use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::{Emirate, ListingDetails, ListingKind};

/// Fields an owner may ask to change on a published listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingField {
    Title,
    Description,
    Price,
    Emirate,
    Location,
    Latitude,
    Longitude,
    Bedrooms,
    Bathrooms,
    AreaSqft,
    PropertyType,
    #[serde(rename = "type")]
    Kind,
    Amenities,
    Images,
    Videos,
    QrCode,
}

impl ListingField {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Price => "price",
            Self::Emirate => "emirate",
            Self::Location => "location",
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
            Self::Bedrooms => "bedrooms",
            Self::Bathrooms => "bathrooms",
            Self::AreaSqft => "area_sqft",
            Self::PropertyType => "property_type",
            Self::Kind => "type",
            Self::Amenities => "amenities",
            Self::Images => "images",
            Self::Videos => "videos",
            Self::QrCode => "qr_code",
        }
    }
}

/// A single proposed value. Serialized without a tag so review payloads read naturally.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Amount(u64),
    Coordinate(f64),
    Count(u32),
    Emirate(Emirate),
    Kind(ListingKind),
    Tags(BTreeSet<String>),
    Media(Vec<String>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Amount(amount) => write!(f, "{amount}"),
            Self::Coordinate(value) => write!(f, "{value}"),
            Self::Count(count) => write!(f, "{count}"),
            Self::Emirate(emirate) => f.write_str(emirate.label()),
            Self::Kind(kind) => f.write_str(kind.label()),
            Self::Tags(tags) => {
                let joined: Vec<&str> = tags.iter().map(String::as_str).collect();
                f.write_str(&joined.join(", "))
            }
            Self::Media(uris) => write!(f, "{} file(s)", uris.len()),
        }
    }
}

impl ListingDetails {
    /// Current value of `field`, `None` when an optional field is unset.
    pub fn field(&self, field: ListingField) -> Option<FieldValue> {
        match field {
            ListingField::Title => Some(FieldValue::Text(self.title.clone())),
            ListingField::Description => Some(FieldValue::Text(self.description.clone())),
            ListingField::Price => Some(FieldValue::Amount(self.price)),
            ListingField::Emirate => self.emirate.map(FieldValue::Emirate),
            ListingField::Location => Some(FieldValue::Text(self.location.clone())),
            ListingField::Latitude => self.latitude.map(FieldValue::Coordinate),
            ListingField::Longitude => self.longitude.map(FieldValue::Coordinate),
            ListingField::Bedrooms => Some(FieldValue::Count(u32::from(self.bedrooms))),
            ListingField::Bathrooms => Some(FieldValue::Count(u32::from(self.bathrooms))),
            ListingField::AreaSqft => self.area_sqft.map(FieldValue::Count),
            ListingField::PropertyType => Some(FieldValue::Text(self.property_type.clone())),
            ListingField::Kind => Some(FieldValue::Kind(self.kind)),
            ListingField::Amenities => Some(FieldValue::Tags(self.amenities.clone())),
            ListingField::Images => Some(FieldValue::Media(self.images.clone())),
            ListingField::Videos => Some(FieldValue::Media(self.videos.clone())),
            ListingField::QrCode => self.qr_code.clone().map(FieldValue::Text),
        }
    }
}

/// Sparse change set: only fields present in the map are changed.
///
/// Patches are built from [`ListingChanges`], which keeps each field paired with a
/// value of the matching shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PropertyPatch {
    values: BTreeMap<ListingField, FieldValue>,
}

/// Side-by-side comparison row for admin review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: ListingField,
    pub current: Option<FieldValue>,
    pub proposed: FieldValue,
    pub changed: bool,
}

impl PropertyPatch {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, field: ListingField) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    pub fn fields(&self) -> impl Iterator<Item = ListingField> + '_ {
        self.values.keys().copied()
    }

    /// Compare every proposed value against `current`, by value.
    pub fn compare(&self, current: &ListingDetails) -> Vec<FieldChange> {
        self.values
            .iter()
            .map(|(field, proposed)| {
                let existing = current.field(*field);
                let changed = existing.as_ref() != Some(proposed);
                FieldChange {
                    field: *field,
                    current: existing,
                    proposed: proposed.clone(),
                    changed,
                }
            })
            .collect()
    }

    /// Fields whose proposed value differs from `current`.
    pub fn changed_fields(&self, current: &ListingDetails) -> Vec<ListingField> {
        self.compare(current)
            .into_iter()
            .filter(|change| change.changed)
            .map(|change| change.field)
            .collect()
    }

    /// Overwrite the patched fields on `target`; everything else is left untouched.
    pub fn apply_to(&self, target: &mut ListingDetails) {
        for (field, value) in &self.values {
            match (field, value) {
                (ListingField::Title, FieldValue::Text(text)) => target.title = text.clone(),
                (ListingField::Description, FieldValue::Text(text)) => {
                    target.description = text.clone()
                }
                (ListingField::Price, FieldValue::Amount(amount)) => target.price = *amount,
                (ListingField::Emirate, FieldValue::Emirate(emirate)) => {
                    target.emirate = Some(*emirate)
                }
                (ListingField::Location, FieldValue::Text(text)) => target.location = text.clone(),
                (ListingField::Latitude, FieldValue::Coordinate(value)) => {
                    target.latitude = Some(*value)
                }
                (ListingField::Longitude, FieldValue::Coordinate(value)) => {
                    target.longitude = Some(*value)
                }
                (ListingField::Bedrooms, FieldValue::Count(count)) => {
                    target.bedrooms = saturate_u8(*count)
                }
                (ListingField::Bathrooms, FieldValue::Count(count)) => {
                    target.bathrooms = saturate_u8(*count)
                }
                (ListingField::AreaSqft, FieldValue::Count(area)) => target.area_sqft = Some(*area),
                (ListingField::PropertyType, FieldValue::Text(text)) => {
                    target.property_type = text.clone()
                }
                (ListingField::Kind, FieldValue::Kind(kind)) => target.kind = *kind,
                (ListingField::Amenities, FieldValue::Tags(tags)) => {
                    target.amenities = tags.clone()
                }
                (ListingField::Images, FieldValue::Media(uris)) => target.images = uris.clone(),
                (ListingField::Videos, FieldValue::Media(uris)) => target.videos = uris.clone(),
                (ListingField::QrCode, FieldValue::Text(code)) => {
                    target.qr_code = Some(code.clone())
                }
                (field, _) => {
                    tracing::warn!(field = field.name(), "skipping patch value of wrong shape")
                }
            }
        }
    }
}

fn saturate_u8(value: u32) -> u8 {
    u8::try_from(value).unwrap_or(u8::MAX)
}

/// Wire form of a sparse edit: every field optional, absence means "no change".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingChanges {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<u64>,
    #[serde(default)]
    pub emirate: Option<Emirate>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub bedrooms: Option<u8>,
    #[serde(default)]
    pub bathrooms: Option<u8>,
    #[serde(default)]
    pub area_sqft: Option<u32>,
    #[serde(default)]
    pub property_type: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<ListingKind>,
    #[serde(default)]
    pub amenities: Option<BTreeSet<String>>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub videos: Option<Vec<String>>,
    #[serde(default)]
    pub qr_code: Option<String>,
}

impl ListingChanges {
    /// Trim text values and keep only the fields that were provided.
    pub fn into_patch(self) -> PropertyPatch {
        let mut values = BTreeMap::new();
        let mut put = |field: ListingField, value: Option<FieldValue>| {
            if let Some(value) = value {
                values.insert(field, value);
            }
        };

        put(ListingField::Title, self.title.map(trimmed).map(FieldValue::Text));
        put(
            ListingField::Description,
            self.description.map(trimmed).map(FieldValue::Text),
        );
        put(ListingField::Price, self.price.map(FieldValue::Amount));
        put(ListingField::Emirate, self.emirate.map(FieldValue::Emirate));
        put(
            ListingField::Location,
            self.location.map(trimmed).map(FieldValue::Text),
        );
        put(
            ListingField::Latitude,
            self.latitude.map(FieldValue::Coordinate),
        );
        put(
            ListingField::Longitude,
            self.longitude.map(FieldValue::Coordinate),
        );
        put(
            ListingField::Bedrooms,
            self.bedrooms.map(|count| FieldValue::Count(u32::from(count))),
        );
        put(
            ListingField::Bathrooms,
            self.bathrooms.map(|count| FieldValue::Count(u32::from(count))),
        );
        put(ListingField::AreaSqft, self.area_sqft.map(FieldValue::Count));
        put(
            ListingField::PropertyType,
            self.property_type.map(trimmed).map(FieldValue::Text),
        );
        put(ListingField::Kind, self.kind.map(FieldValue::Kind));
        put(
            ListingField::Amenities,
            self.amenities
                .map(|tags| tags.into_iter().map(trimmed).collect())
                .map(FieldValue::Tags),
        );
        put(
            ListingField::Images,
            self.images
                .map(|uris| uris.into_iter().map(trimmed).collect())
                .map(FieldValue::Media),
        );
        put(
            ListingField::Videos,
            self.videos
                .map(|uris| uris.into_iter().map(trimmed).collect())
                .map(FieldValue::Media),
        );
        put(
            ListingField::QrCode,
            self.qr_code.map(trimmed).map(FieldValue::Text),
        );

        PropertyPatch { values }
    }
}

fn trimmed(value: String) -> String {
    value.trim().to_string()
}
