use super::domain::PropertyRequest;

const HEADER: [&str; 16] = [
    "id",
    "status",
    "title",
    "type",
    "price",
    "emirate",
    "location",
    "bedrooms",
    "bathrooms",
    "area_sqft",
    "contact_name",
    "contact_email",
    "contact_phone",
    "submitter_type",
    "created_at",
    "approved_at",
];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write csv row: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush csv output: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv output is not valid utf-8")]
    Encoding,
}

/// Render the admin request queue as CSV.
pub fn requests_csv(requests: &[PropertyRequest]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER)?;

    for request in requests {
        let details = &request.details;
        let contact = &request.contact;
        writer.write_record([
            request.id.to_string(),
            request.status.label().to_string(),
            details.title.clone(),
            details.kind.label().to_string(),
            details.price.to_string(),
            details
                .emirate
                .map(|emirate| emirate.label().to_string())
                .unwrap_or_default(),
            details.location.clone(),
            details.bedrooms.to_string(),
            details.bathrooms.to_string(),
            details
                .area_sqft
                .map(|area| area.to_string())
                .unwrap_or_default(),
            contact.contact_name.clone(),
            contact.contact_email.clone(),
            contact.contact_phone.clone().unwrap_or_default(),
            contact.submitter_type.label().to_string(),
            request.created_at.to_rfc3339(),
            request
                .approved_at
                .map(|at| at.to_rfc3339())
                .unwrap_or_default(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| ExportError::Io(err.into_error()))?;
    String::from_utf8(bytes).map_err(|_| ExportError::Encoding)
}
