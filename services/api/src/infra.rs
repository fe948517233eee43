use listing_desk::config::{MediaConfig, NotificationConfig};
use listing_desk::workflows::listings::{
    IntakePolicy, ListingNotifier, ListingWorkflowService, MemoryListingStore, NoopNotifier,
    NotifyError, SubmissionNotice, WebhookNotifier,
};
use listing_desk::workflows::media::{MediaUploader, MemoryBlobStore};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type ListingService = ListingWorkflowService<MemoryListingStore, ConfiguredNotifier>;
pub(crate) type Uploader = MediaUploader<MemoryBlobStore>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Notifier selected from configuration.
#[derive(Debug, Clone)]
pub(crate) enum ConfiguredNotifier {
    Webhook(WebhookNotifier),
    Disabled(NoopNotifier),
}

impl ConfiguredNotifier {
    pub(crate) fn from_config(config: &NotificationConfig) -> Self {
        match config.webhook_url.as_deref() {
            Some(url) => Self::Webhook(WebhookNotifier::new(url)),
            None => Self::Disabled(NoopNotifier),
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Webhook(_) => "webhook",
            Self::Disabled(_) => "disabled",
        }
    }
}

impl ListingNotifier for ConfiguredNotifier {
    fn submission_received(&self, notice: SubmissionNotice) -> Result<(), NotifyError> {
        match self {
            Self::Webhook(notifier) => notifier.submission_received(notice),
            Self::Disabled(notifier) => notifier.submission_received(notice),
        }
    }
}

pub(crate) fn listing_service(notifier: ConfiguredNotifier) -> Arc<ListingService> {
    Arc::new(ListingWorkflowService::new(
        Arc::new(MemoryListingStore::new()),
        Arc::new(notifier),
        IntakePolicy::default(),
    ))
}

pub(crate) fn media_uploader(media: &MediaConfig) -> Arc<Uploader> {
    let store = Arc::new(MemoryBlobStore::new(media.public_base_url.clone()));
    Arc::new(MediaUploader::new(store, media.retry_policy()))
}
