use super::domain::{ListingDetails, PropertySubmission, SubmitterContact};

/// Validation errors raised before any write is attempted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("price must be greater than zero")]
    NonPositivePrice,
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("contact email '{0}' is not a valid address")]
    InvalidEmail(String),
    #[error("unknown emirate '{0}'")]
    UnknownEmirate(String),
    #[error("QR code required for legal compliance")]
    MissingQrCode,
    #[error("'{value}' is not a valid identifier")]
    InvalidIdentifier { value: String },
    #[error("exactly one of property_request_id or property_id must be set")]
    AmbiguousDeletionTarget,
    #[error("edit request does not change any field")]
    EmptyPatch,
    #[error("{field} contains a blank entry")]
    BlankEntry { field: &'static str },
    #[error("{field} accepts at most {max} entries")]
    TooManyEntries { field: &'static str, max: usize },
}

const DEFAULT_MAX_IMAGES: usize = 30;
const DEFAULT_MAX_VIDEOS: usize = 5;

/// Intake limits applied to every listing payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakePolicy {
    max_images: usize,
    max_videos: usize,
}

impl IntakePolicy {
    pub fn new(max_images: usize, max_videos: usize) -> Self {
        Self {
            max_images: if max_images == 0 {
                DEFAULT_MAX_IMAGES
            } else {
                max_images
            },
            max_videos,
        }
    }

    pub fn max_images(&self) -> usize {
        self.max_images
    }

    pub fn max_videos(&self) -> usize {
        self.max_videos
    }
}

impl Default for IntakePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IMAGES, DEFAULT_MAX_VIDEOS)
    }
}

/// Guard responsible for normalizing and checking listing payloads.
#[derive(Debug, Clone, Default)]
pub struct IntakeGuard {
    policy: IntakePolicy,
}

impl IntakeGuard {
    pub fn with_policy(policy: IntakePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &IntakePolicy {
        &self.policy
    }

    /// Trim string fields and validate a new submission.
    pub fn check_submission(
        &self,
        submission: PropertySubmission,
    ) -> Result<PropertySubmission, ValidationError> {
        let details = self.check_details(submission.details)?;
        let contact = check_contact(submission.contact)?;
        Ok(PropertySubmission { details, contact })
    }

    /// Trim string fields and validate the descriptive field set.
    pub fn check_details(&self, details: ListingDetails) -> Result<ListingDetails, ValidationError> {
        let details = trim_details(details);
        self.validate_details(&details)?;
        Ok(details)
    }

    pub fn validate_details(&self, details: &ListingDetails) -> Result<(), ValidationError> {
        if details.title.is_empty() {
            return Err(ValidationError::MissingField { field: "title" });
        }

        if details.price == 0 {
            return Err(ValidationError::NonPositivePrice);
        }

        if let Some(latitude) = details.latitude {
            check_range("latitude", latitude, -90.0, 90.0)?;
        }
        if let Some(longitude) = details.longitude {
            check_range("longitude", longitude, -180.0, 180.0)?;
        }

        if details.amenities.iter().any(String::is_empty) {
            return Err(ValidationError::BlankEntry { field: "amenities" });
        }

        check_media("images", &details.images, self.policy.max_images)?;
        check_media("videos", &details.videos, self.policy.max_videos)?;

        Ok(())
    }

    /// Approval precondition: the listing carries a visible compliance QR code.
    pub fn require_qr_code(&self, details: &ListingDetails) -> Result<(), ValidationError> {
        details
            .qr_code()
            .map(|_| ())
            .ok_or(ValidationError::MissingQrCode)
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange { field, min, max })
    }
}

fn check_media(field: &'static str, uris: &[String], max: usize) -> Result<(), ValidationError> {
    if uris.iter().any(String::is_empty) {
        return Err(ValidationError::BlankEntry { field });
    }
    if uris.len() > max {
        return Err(ValidationError::TooManyEntries { field, max });
    }
    Ok(())
}

fn check_contact(contact: SubmitterContact) -> Result<SubmitterContact, ValidationError> {
    let contact = SubmitterContact {
        contact_name: contact.contact_name.trim().to_string(),
        contact_email: contact.contact_email.trim().to_string(),
        contact_phone: contact.contact_phone.map(|phone| phone.trim().to_string()),
        submitter_type: contact.submitter_type,
    };

    if contact.contact_name.is_empty() {
        return Err(ValidationError::MissingField {
            field: "contact_name",
        });
    }
    if contact.contact_email.is_empty() {
        return Err(ValidationError::MissingField {
            field: "contact_email",
        });
    }
    if !looks_like_email(&contact.contact_email) {
        return Err(ValidationError::InvalidEmail(contact.contact_email));
    }

    Ok(contact)
}

fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

fn trim_details(details: ListingDetails) -> ListingDetails {
    ListingDetails {
        title: details.title.trim().to_string(),
        description: details.description.trim().to_string(),
        location: details.location.trim().to_string(),
        property_type: details.property_type.trim().to_string(),
        amenities: details
            .amenities
            .into_iter()
            .map(|amenity| amenity.trim().to_string())
            .collect(),
        images: details
            .images
            .into_iter()
            .map(|uri| uri.trim().to_string())
            .collect(),
        videos: details
            .videos
            .into_iter()
            .map(|uri| uri.trim().to_string())
            .collect(),
        qr_code: details.qr_code.map(|code| code.trim().to_string()),
        ..details
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::listings::domain::{ListingKind, SubmitterType};

    fn submission() -> PropertySubmission {
        PropertySubmission {
            details: ListingDetails {
                title: "  Sea View Flat ".to_string(),
                description: String::new(),
                price: 500_000,
                emirate: None,
                location: String::new(),
                latitude: Some(25.2),
                longitude: Some(55.27),
                bedrooms: 2,
                bathrooms: 2,
                area_sqft: None,
                property_type: "apartment".to_string(),
                kind: ListingKind::Sale,
                amenities: Default::default(),
                images: Vec::new(),
                videos: Vec::new(),
                qr_code: Some("QR123".to_string()),
            },
            contact: SubmitterContact {
                contact_name: "Ana".to_string(),
                contact_email: "ana@x.com".to_string(),
                contact_phone: None,
                submitter_type: SubmitterType::Owner,
            },
        }
    }

    #[test]
    fn trims_string_fields() {
        let checked = IntakeGuard::default()
            .check_submission(submission())
            .expect("valid submission");
        assert_eq!(checked.details.title, "Sea View Flat");
    }

    #[test]
    fn rejects_zero_price_and_blank_title() {
        let guard = IntakeGuard::default();

        let mut free = submission();
        free.details.price = 0;
        assert_eq!(
            guard.check_submission(free).unwrap_err(),
            ValidationError::NonPositivePrice
        );

        let mut untitled = submission();
        untitled.details.title = "   ".to_string();
        assert_eq!(
            guard.check_submission(untitled).unwrap_err(),
            ValidationError::MissingField { field: "title" }
        );
    }

    #[test]
    fn rejects_invalid_contact_details() {
        let guard = IntakeGuard::default();

        let mut anonymous = submission();
        anonymous.contact.contact_name = String::new();
        assert!(matches!(
            guard.check_submission(anonymous),
            Err(ValidationError::MissingField {
                field: "contact_name"
            })
        ));

        for email in ["ana", "ana@", "@x.com", "ana@x", "ana@@x.com", "a na@x.com"] {
            let mut bad = submission();
            bad.contact.contact_email = email.to_string();
            assert!(
                matches!(
                    guard.check_submission(bad),
                    Err(ValidationError::InvalidEmail(_))
                ),
                "{email} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let mut submission = submission();
        submission.details.latitude = Some(120.0);
        assert!(matches!(
            IntakeGuard::default().check_submission(submission),
            Err(ValidationError::OutOfRange {
                field: "latitude",
                ..
            })
        ));
    }

    #[test]
    fn enforces_media_limits() {
        let guard = IntakeGuard::with_policy(IntakePolicy::new(2, 0));
        let mut submission = submission();
        submission.details.images = vec!["a".into(), "b".into(), "c".into()];
        assert_eq!(
            guard.check_submission(submission.clone()).unwrap_err(),
            ValidationError::TooManyEntries {
                field: "images",
                max: 2
            }
        );

        submission.details.images = vec!["a".into()];
        submission.details.videos = vec!["v".into()];
        assert_eq!(
            guard.check_submission(submission).unwrap_err(),
            ValidationError::TooManyEntries {
                field: "videos",
                max: 0
            }
        );
    }

    #[test]
    fn qr_code_must_have_visible_characters() {
        let guard = IntakeGuard::default();
        let mut details = submission().details;
        assert!(guard.require_qr_code(&details).is_ok());

        details.qr_code = Some("   ".to_string());
        assert_eq!(
            guard.require_qr_code(&details),
            Err(ValidationError::MissingQrCode)
        );

        details.qr_code = None;
        assert_eq!(
            guard.require_qr_code(&details),
            Err(ValidationError::MissingQrCode)
        );
    }
}
