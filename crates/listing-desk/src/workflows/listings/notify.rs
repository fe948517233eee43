use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use super::domain::{Emirate, ListingKind, PropertyRequest, RequestId, SubmitterType};

/// Outbound hook fired after a property request is stored.
pub trait ListingNotifier: Send + Sync {
    fn submission_received(&self, notice: SubmissionNotice) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
    #[error("no async runtime available to deliver notification")]
    NoRuntime,
}

/// Summary of a new submission for the admin channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionNotice {
    pub request_id: RequestId,
    pub title: String,
    pub kind: ListingKind,
    pub price: u64,
    pub emirate: Option<Emirate>,
    pub location: String,
    pub bedrooms: u8,
    pub bathrooms: u8,
    pub area_sqft: Option<u32>,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub submitter_type: SubmitterType,
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionNotice {
    pub fn from_request(request: &PropertyRequest) -> Self {
        Self {
            request_id: request.id,
            title: request.details.title.clone(),
            kind: request.details.kind,
            price: request.details.price,
            emirate: request.details.emirate,
            location: request.details.location_label(),
            bedrooms: request.details.bedrooms,
            bathrooms: request.details.bathrooms,
            area_sqft: request.details.area_sqft,
            contact_name: request.contact.contact_name.clone(),
            contact_email: request.contact.contact_email.clone(),
            contact_phone: request.contact.contact_phone.clone(),
            submitter_type: request.contact.submitter_type,
            submitted_at: request.created_at,
        }
    }

    /// Plain-text body posted to the messaging channel.
    pub fn render_message(&self) -> String {
        let mut message = String::new();
        let _ = writeln!(message, "New property request: {}", self.title);
        let _ = writeln!(
            message,
            "Type: {} | Price: AED {}",
            self.kind.label(),
            group_thousands(self.price)
        );
        let _ = writeln!(message, "Location: {}", self.location);
        let _ = writeln!(
            message,
            "Bedrooms: {} | Bathrooms: {}",
            self.bedrooms, self.bathrooms
        );
        if let Some(area) = self.area_sqft {
            let _ = writeln!(message, "Area: {} sqft", group_thousands(u64::from(area)));
        }
        let _ = writeln!(
            message,
            "Submitted by: {} ({}) <{}>{}",
            self.contact_name,
            self.submitter_type.label(),
            self.contact_email,
            self.contact_phone
                .as_deref()
                .map(|phone| format!(" {phone}"))
                .unwrap_or_default()
        );
        let _ = writeln!(message, "Request ID: {}", self.request_id);
        let _ = write!(
            message,
            "Submitted at: {}",
            self.submitted_at.format("%Y-%m-%d %H:%M UTC")
        );
        message
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

/// Posts notices to a chat webhook from a background task; delivery failures are
/// logged and never reach the submitter.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ListingNotifier for WebhookNotifier {
    fn submission_received(&self, notice: SubmissionNotice) -> Result<(), NotifyError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| NotifyError::NoRuntime)?;
        let client = self.client.clone();
        let url = self.url.clone();
        let request_id = notice.request_id;
        let payload = json!({
            "content": notice.render_message(),
            "request_id": request_id,
        });

        handle.spawn(async move {
            let outcome = client
                .post(&url)
                .json(&payload)
                .send()
                .await
                .and_then(reqwest::Response::error_for_status);
            match outcome {
                Ok(response) => {
                    debug!(%request_id, status = %response.status(), "submission notice delivered")
                }
                Err(err) => warn!(%request_id, error = %err, "submission notice failed"),
            }
        });

        Ok(())
    }
}

/// Drops notices; used when no webhook is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl ListingNotifier for NoopNotifier {
    fn submission_received(&self, notice: SubmissionNotice) -> Result<(), NotifyError> {
        debug!(request_id = %notice.request_id, "no webhook configured, notice dropped");
        Ok(())
    }
}
