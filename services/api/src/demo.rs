use crate::infra::seed_catalog;
use clap::Args;
use doc_intake::error::AppError;
use doc_intake::workflows::intake::{
    can_submit_in, ApplicationFilter, ApplicationIntakeService, ApplicationStatus, CatalogImporter,
    ChecklistSnapshot, ChecklistView, ClientId, FileUpload, InMemoryDocumentStore,
    InMemoryIntakeStore, IntakeBackends, IntakeError, RecordingIntakeEndpoint, ServiceId, SlotId,
    UploadConstraints, DEFAULT_LOCALE,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Locale used for checklist labels (falls back to English)
    #[arg(long)]
    pub(crate) locale: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct CatalogCheckArgs {
    /// Catalog CSV export to validate
    #[arg(long)]
    pub(crate) path: PathBuf,
}

pub(crate) fn run_catalog_check(args: CatalogCheckArgs) -> Result<(), AppError> {
    let catalog = CatalogImporter::from_path(&args.path)?;

    println!("Catalog {}", args.path.display());
    for service in &catalog.services {
        let slots: Vec<_> = catalog.slots_for(&service.id).collect();
        let required = slots.iter().filter(|slot| slot.required).count();
        println!(
            "- {} ({}): {} slots, {} required, price {}",
            service.id,
            service.title.primary(),
            slots.len(),
            required,
            service.price
        );
        for slot in slots {
            let locales: Vec<&str> = slot.name.locales().collect();
            println!(
                "    {} {} [{}]",
                if slot.required { "*" } else { " " },
                slot.name.primary(),
                locales.join(", ")
            );
        }
    }

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let locale = args.locale.unwrap_or_else(|| DEFAULT_LOCALE.to_string());

    let store = InMemoryIntakeStore::default();
    store
        .load_catalog(seed_catalog())
        .map_err(IntakeError::from)?;
    let objects = InMemoryDocumentStore::default();
    let intake = RecordingIntakeEndpoint::default();
    let service = ApplicationIntakeService::new(
        IntakeBackends {
            catalog: Arc::new(store.clone()),
            applications: Arc::new(store.clone()),
            documents: Arc::new(store),
            store: Arc::new(objects.clone()),
            intake: Arc::new(intake.clone()),
        },
        UploadConstraints::default(),
    );

    println!("Document intake demo (locale: {locale})");
    let application = service.create_application(
        ClientId("demo-client".to_string()),
        ServiceId("work-visa".to_string()),
    )?;
    println!("\nOpened application {} for work-visa", application.id);
    render_checklist(&service.checklist(&application.id)?, &locale);

    println!("\nLocal checks before anything is transmitted");
    let attempts = [
        ("passport", FileUpload::new("passport.pdf", vec![0; 12 * 1024 * 1024])),
        ("photo", FileUpload::new("photo.bmp", vec![0; 2048])),
    ];
    for (slot_id, file) in attempts {
        let name = file.file_name.clone();
        match service.upload(&application.id, &SlotId(slot_id.to_string()), file) {
            Ok(_) => println!("- {name}: accepted"),
            Err(err) => println!("- {name}: {err}"),
        }
    }
    println!("Objects stored so far: {}", objects.len());

    let uploads = [
        ("passport", "passport.pdf", 180_000),
        ("photo", "photo.jpg", 45_000),
    ];
    println!("\nUploading documents");
    for (slot_id, name, size) in uploads {
        let document = service.upload(
            &application.id,
            &SlotId(slot_id.to_string()),
            FileUpload::new(name, vec![1; size]),
        )?;
        println!("- {slot_id}: {}", document.file_reference);
    }

    let view = service.checklist(&application.id)?;
    match service.submit(&application.id, &ChecklistSnapshot::from_items(&view.items)) {
        Ok(_) => println!("\nSubmitted early (unexpected)"),
        Err(err) => println!("\nSubmit blocked: {err}"),
    }

    service.upload(
        &application.id,
        &SlotId("diploma".to_string()),
        FileUpload::new("diploma.pdf", vec![2; 90_000]),
    )?;
    let view = service.checklist(&application.id)?;
    render_checklist(&view, &locale);

    let submitted = service.submit(&application.id, &ChecklistSnapshot::from_items(&view.items))?;
    println!(
        "\nSubmitted: status {} ({} submission(s) received downstream)",
        submitted.status,
        intake.submissions().len()
    );

    println!("\nStaff review");
    let queue = service.list_applications(&ApplicationFilter {
        client_id: None,
        status: Some(ApplicationStatus::Pending),
    })?;
    for pending in &queue {
        println!("- {} from {} ({})", pending.id, pending.client_id, pending.status);
    }
    let approved = service.change_status(&application.id, ApplicationStatus::Approved)?;
    println!("Application {} is now {}", approved.id, approved.status);

    Ok(())
}

fn render_checklist(view: &ChecklistView, locale: &str) {
    println!("Checklist for {} ({})", view.application.id, view.application.status);
    for item in &view.items {
        let marker = if item.is_satisfied() { "[x]" } else { "[ ]" };
        let requirement = if item.required { "required" } else { "optional" };
        let file = item
            .uploaded_document
            .as_ref()
            .map(|document| format!(" <- {}", document.file_name))
            .unwrap_or_default();
        println!(
            "  {marker} {} ({requirement}){file}",
            item.label.resolve(locale)
        );
    }
    let readiness = can_submit_in(&view.items, locale);
    if readiness.ok {
        println!("  ready to submit");
    } else {
        println!("  missing: {}", readiness.missing.join(", "));
    }
}
