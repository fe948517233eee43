use clap::Args;
use listing_desk::error::AppError;
use listing_desk::workflows::listings::{
    DeletionTarget, Identity, IntakePolicy, ListingChanges, ListingDetails, ListingKind,
    ListingNotifier, ListingWorkflowService, MemoryListingStore, NotifyError, PropertyFilter,
    PropertySubmission, Role, SubmissionNotice, SubmitterContact, SubmitterType, UserId,
};
use listing_desk::workflows::media::{MediaUpload, MediaUploader, MemoryBlobStore, RetryPolicy};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Write the request queue CSV export to this path.
    #[arg(long)]
    pub(crate) export_csv: Option<PathBuf>,
    /// Skip the media upload portion of the demo.
    #[arg(long)]
    pub(crate) skip_media: bool,
}

/// Prints the admin channel message instead of posting it.
struct ConsoleNotifier;

impl ListingNotifier for ConsoleNotifier {
    fn submission_received(&self, notice: SubmissionNotice) -> Result<(), NotifyError> {
        println!("\nAdmin channel notice");
        for line in notice.render_message().lines() {
            println!("  | {line}");
        }
        Ok(())
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        export_csv,
        skip_media,
    } = args;

    let admin = Identity {
        id: UserId::new(),
        email: "review@listing-desk.ae".to_string(),
        role: Role::Admin,
    };
    let owner = Identity {
        id: UserId::new(),
        email: "ana@x.com".to_string(),
        role: Role::User,
    };

    println!("Listing desk demo");

    let mut images = Vec::new();
    if !skip_media {
        let store = Arc::new(MemoryBlobStore::new("http://localhost:3000/media"));
        let uploader = MediaUploader::new(store, RetryPolicy::default());
        let uploads = vec![
            MediaUpload::new("front.jpg", vec![0xff, 0xd8, 0xff, 0xe0]),
            MediaUpload::new("floorplan.pdf", b"%PDF-1.7".to_vec()),
            MediaUpload::new("notes", b"no extension".to_vec()),
        ];

        println!("\nMedia uploads");
        for outcome in uploader.upload_batch(&owner.id, uploads).await {
            match outcome {
                Ok(uploaded) => {
                    println!(
                        "- {} ({}) stored at {}",
                        uploaded.file_name,
                        uploaded.kind.label(),
                        uploaded.uri
                    );
                    if uploaded.content_type.starts_with("image/") {
                        images.push(uploaded.uri);
                    }
                }
                Err(err) => println!("- skipped: {err}"),
            }
        }
    }

    let service = ListingWorkflowService::new(
        Arc::new(MemoryListingStore::new()),
        Arc::new(ConsoleNotifier),
        IntakePolicy::default(),
    );

    let submission = sample_submission(images);
    let request = service.submit(Some(&owner), submission.clone())?;
    println!(
        "\nSubmitted request {} | status {}",
        request.id,
        request.status.label()
    );

    let mut missing_qr = submission.clone();
    missing_qr.details.qr_code = None;
    let blocked = service.submit(Some(&owner), missing_qr)?;
    match service.approve(&admin, &blocked.id, None, None) {
        Ok(_) => println!("Unexpected approval without QR code"),
        Err(err) => println!("Approval blocked for {}: {err}", blocked.id),
    }
    let rejected = service.reject(
        &admin,
        &blocked.id,
        Some("Resubmit with the permit QR code".to_string()),
    )?;
    println!(
        "Request {} marked {}",
        rejected.id,
        rejected.status.label()
    );

    let outcome = service.approve(
        &admin,
        &request.id,
        None,
        Some("Permit verified".to_string()),
    )?;
    let property = outcome.property;
    println!(
        "\nApproved {} -> property {} ({} AED, {} bed / {} bath)",
        outcome.request.id,
        property.id,
        property.details.price,
        property.details.bedrooms,
        property.details.bathrooms
    );
    if let Some(approved_at) = outcome.request.approved_at {
        println!(
            "Approved at {}",
            approved_at.format("%Y-%m-%d %H:%M UTC")
        );
    }
    if let Err(err) = service.approve(&admin, &request.id, None, None) {
        println!("Second approval refused: {err}");
    }

    let edit = service.submit_edit(
        &owner,
        &property.id,
        ListingChanges {
            price: Some(475_000),
            ..ListingChanges::default()
        },
        Some("Price reduced for a quick sale".to_string()),
    )?;
    let review = service.review_edit(&admin, &edit.id)?;
    println!("\nEdit request {} review", edit.id);
    for change in &review.changes {
        let marker = if change.changed { "*" } else { " " };
        println!(
            " {marker} {}: {} -> {}",
            change.field.name(),
            change
                .current
                .as_ref()
                .map(|value| value.to_string())
                .unwrap_or_else(|| "(unset)".to_string()),
            change.proposed
        );
    }
    let merged = service.approve_edit(&admin, &edit.id)?;
    println!(
        "Listing now at {} AED (revision {})",
        merged.details.price, merged.revision
    );

    let live = service.browse(&PropertyFilter {
        kind: Some(ListingKind::Sale),
        ..PropertyFilter::default()
    })?;
    println!("\nBrowsable sale listings: {}", live.len());

    let deletion =
        service.request_deletion(&owner, DeletionTarget::Property(property.id), None)?;
    service.approve_deletion(&admin, &deletion.id)?;
    let remaining = service.browse(&PropertyFilter::default())?;
    println!(
        "Deletion {} approved; {} listing(s) still browsable",
        deletion.id,
        remaining.len()
    );

    let csv = service.export_requests_csv(&admin, None)?;
    match export_csv {
        Some(path) => {
            std::fs::write(&path, csv)?;
            println!("\nRequest export written to {}", path.display());
        }
        None => {
            println!("\nRequest export");
            print!("{csv}");
        }
    }

    Ok(())
}

fn sample_submission(images: Vec<String>) -> PropertySubmission {
    PropertySubmission {
        details: ListingDetails {
            title: "Sea View Flat".to_string(),
            description: "Two bedroom apartment with a corniche view".to_string(),
            price: 500_000,
            emirate: "Sharjah".parse().ok(),
            location: "Al Khan".to_string(),
            latitude: None,
            longitude: None,
            bedrooms: 2,
            bathrooms: 2,
            area_sqft: Some(1_150),
            property_type: "apartment".to_string(),
            kind: ListingKind::Sale,
            amenities: ["parking".to_string(), "pool".to_string()]
                .into_iter()
                .collect(),
            images,
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
