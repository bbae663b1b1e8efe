use metrics_exporter_prometheus::PrometheusHandle;
use quote_funnel::config::{AppConfig, StorageConfig};
use quote_funnel::error::AppError;
use quote_funnel::funnel::submission::{
    StructuredApiChannel, SubmissionCoordinator, TemplatedEmailChannel,
};
use quote_funnel::funnel::{
    Answers, Catalog, FileStorage, FunnelStorage, MemoryStorage, PricingModel,
};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Durable snapshot storage when a state directory is configured.
pub(crate) fn funnel_storage(config: &StorageConfig) -> Arc<dyn FunnelStorage> {
    match &config.state_dir {
        Some(dir) => Arc::new(FileStorage::new(dir)),
        None => Arc::new(MemoryStorage::default()),
    }
}

pub(crate) fn submission_coordinator(config: &AppConfig) -> SubmissionCoordinator {
    let client = reqwest::Client::new();
    let delivery = &config.delivery;
    SubmissionCoordinator::new(
        Arc::new(TemplatedEmailChannel::new(
            client.clone(),
            delivery.email_template.clone(),
        )),
        Arc::new(StructuredApiChannel::new(
            client,
            delivery.api_endpoint.clone(),
        )),
        PricingModel::standard(),
        delivery.fallback_email.clone(),
    )
}

/// Read a JSON answers document; unknown or mistyped fields are dropped.
pub(crate) fn read_answers(path: &Path, catalog: &Catalog) -> Result<Answers, AppError> {
    let raw = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    Ok(Answers::from_untrusted(&value, catalog))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn answers_file_is_read_leniently() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"websiteType":"corporate","features":["seo","teleport"],"timeline":7}}"#
        )
        .expect("write answers");

        let answers = read_answers(file.path(), &Catalog::standard()).expect("answers parse");
        assert_eq!(answers.website_type, "corporate");
        assert!(answers.features.contains("seo"));
        assert!(!answers.features.contains("teleport"));
        assert!(answers.timeline.is_empty());
    }

    #[test]
    fn storage_defaults_to_memory() {
        let storage = funnel_storage(&StorageConfig::default());
        assert!(storage.load().expect("memory storage loads").is_none());
    }
}
