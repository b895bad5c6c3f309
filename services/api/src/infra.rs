use doc_intake::config::AppConfig;
use doc_intake::error::AppError;
use doc_intake::workflows::intake::{
    CatalogImporter, DocumentStore, HttpDocumentStore, HttpIntakeEndpoint, ImportedCatalog,
    InMemoryDocumentStore, InMemoryIntakeStore, InputSlot, IntakeBackends, IntakeEndpoint, IntakeError,
    LocalizedText, RecordingIntakeEndpoint, Service, ServiceId, SlotId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Catalog used when no export is configured: one visa package and one translation order.
pub(crate) fn seed_catalog() -> ImportedCatalog {
    let visa = ServiceId("work-visa".to_string());
    let translation = ServiceId("translation".to_string());

    let slot = |service_id: &ServiceId, id: &str, en: &str, ru: &str, required: bool| InputSlot {
        id: SlotId(id.to_string()),
        service_id: service_id.clone(),
        name: LocalizedText::new("en", en).with("ru", ru),
        description: LocalizedText::default(),
        required,
    };

    let slots = vec![
        slot(&visa, "passport", "Passport", "Паспорт", true),
        slot(&visa, "photo", "Photo 3x4", "Фото 3x4", true),
        slot(&visa, "diploma", "Diploma", "Диплом", true),
        slot(&visa, "cv", "CV", "Резюме", false),
        slot(&translation, "source", "Source document", "Исходный документ", true),
    ];

    let services = vec![
        Service {
            id: visa.clone(),
            title: LocalizedText::new("en", "Work visa").with("ru", "Рабочая виза"),
            description: LocalizedText::new("en", "Document package for a work visa"),
            price: 45_000,
            slot_order: ["passport", "photo", "diploma", "cv"]
                .iter()
                .map(|id| SlotId(id.to_string()))
                .collect(),
        },
        Service {
            id: translation,
            title: LocalizedText::new("en", "Certified translation")
                .with("ru", "Нотариальный перевод"),
            description: LocalizedText::default(),
            price: 1_200,
            slot_order: vec![SlotId("source".to_string())],
        },
    ];

    ImportedCatalog { services, slots }
}

/// Store loaded from the configured catalog export, or from the seed catalog.
pub(crate) fn load_store(config: &AppConfig) -> Result<InMemoryIntakeStore, AppError> {
    let catalog = match &config.integrations.catalog_csv {
        Some(path) => {
            let catalog = CatalogImporter::from_path(path)?;
            info!(path = %path.display(), services = catalog.services.len(), "catalog imported");
            catalog
        }
        None => seed_catalog(),
    };

    let store = InMemoryIntakeStore::default();
    store.load_catalog(catalog).map_err(IntakeError::from)?;
    Ok(store)
}

/// Wire repositories and remote collaborators.
///
/// Builds blocking HTTP clients, so call it outside the async runtime.
pub(crate) fn build_backends(config: &AppConfig) -> Result<IntakeBackends, AppError> {
    let store = load_store(config)?;
    let timeout = config.integrations.http_timeout;

    let documents: Arc<dyn DocumentStore> = match &config.integrations.document_store_url {
        Some(url) => {
            info!(%url, "using HTTP document store");
            Arc::new(HttpDocumentStore::new(url, timeout)?)
        }
        None => Arc::new(InMemoryDocumentStore::default()),
    };
    let intake: Arc<dyn IntakeEndpoint> = match &config.integrations.intake_url {
        Some(url) => {
            info!(%url, "using HTTP intake endpoint");
            Arc::new(HttpIntakeEndpoint::new(url, timeout)?)
        }
        None => Arc::new(RecordingIntakeEndpoint::default()),
    };

    Ok(IntakeBackends {
        catalog: Arc::new(store.clone()),
        applications: Arc::new(store.clone()),
        documents: Arc::new(store),
        store: documents,
        intake,
    })
}
