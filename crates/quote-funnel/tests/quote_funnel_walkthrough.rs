//! End-to-end walks through the project calculator using only the public
//! funnel API, with snapshots written to a real directory.

use std::sync::Arc;

use quote_funnel::funnel::{
    AnswerStore, Catalog, ContactField, FileStorage, FunnelEvent, FunnelStorage, PersistenceMode,
    PricingModel, StepKey, TransitionError,
};

fn store_in(dir: &std::path::Path) -> (AnswerStore, Arc<FileStorage>) {
    let storage = Arc::new(FileStorage::new(dir));
    let store = AnswerStore::load(Arc::new(Catalog::standard()), storage.clone());
    (store, storage)
}

fn select_and_advance(store: &mut AnswerStore, values: &[&str]) {
    for value in values {
        store
            .dispatch(FunnelEvent::Select(value.to_string()))
            .expect("option accepted");
    }
    store.dispatch(FunnelEvent::Next).expect("step validates");
}

#[test]
fn progress_survives_a_reload() {
    let dir = tempfile::tempdir().expect("temp dir");
    {
        let (mut store, _) = store_in(dir.path());
        assert_eq!(store.mode(), PersistenceMode::Durable);
        select_and_advance(&mut store, &["tourism"]);
        select_and_advance(&mut store, &["corporate"]);
        store
            .dispatch(FunnelEvent::Select("team".to_string()))
            .expect("page toggled");
    }

    let (store, _) = store_in(dir.path());
    assert_eq!(store.state().current_step_index, 2);
    assert_eq!(store.state().history, vec![0, 1]);
    let answers = store.get();
    assert_eq!(answers.business_type, "tourism");
    assert_eq!(answers.website_type, "corporate");
    assert!(answers.pages.contains("team"));
}

#[test]
fn other_option_requires_its_description() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (mut store, _) = store_in(dir.path());

    store
        .dispatch(FunnelEvent::Select("other".to_string()))
        .expect("other accepted");
    let view = store.view().expect("view");
    assert_eq!(
        view.other_input.as_ref().map(|input| input.field),
        Some("businessTypeOther")
    );

    match store.dispatch(FunnelEvent::Next) {
        Err(TransitionError::Invalid(report)) => {
            assert!(report.field_errors.contains_key("businessTypeOther"))
        }
        other => panic!("expected validation failure, got {other:?}"),
    }

    store
        .dispatch(FunnelEvent::OtherText("Wine cellar".to_string()))
        .expect("text accepted");
    store.dispatch(FunnelEvent::Next).expect("now valid");

    store.dispatch(FunnelEvent::Back).expect("back");
    store
        .dispatch(FunnelEvent::Select("retail".to_string()))
        .expect("switch away from other");
    assert!(store.get().business_type_other.is_empty());
}

#[test]
fn branding_none_is_exclusive_in_both_directions() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (mut store, _) = store_in(dir.path());
    select_and_advance(&mut store, &["services"]);
    select_and_advance(&mut store, &["landing"]);
    select_and_advance(&mut store, &["home"]);
    select_and_advance(&mut store, &["none"]);
    assert_eq!(
        store.state().current_step_index,
        Catalog::standard()
            .steps()
            .iter()
            .position(|step| step.key == StepKey::Branding)
            .expect("branding step")
    );

    for value in ["logo", "copywriting", "none"] {
        store
            .dispatch(FunnelEvent::Select(value.to_string()))
            .expect("branding toggled");
    }
    assert_eq!(
        store.get().branding.iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["none"]
    );

    store
        .dispatch(FunnelEvent::Select("photography".to_string()))
        .expect("branding toggled");
    assert_eq!(
        store.get().branding.iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["photography"]
    );
}

#[test]
fn final_step_reports_contact_errors_and_prices_the_lead() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (mut store, _) = store_in(dir.path());
    select_and_advance(&mut store, &["medical"]);
    select_and_advance(&mut store, &["informational"]);
    select_and_advance(&mut store, &["home", "about", "services", "team", "contact"]);
    select_and_advance(&mut store, &["seo"]);
    select_and_advance(&mut store, &["none"]);
    select_and_advance(&mut store, &["flexible"]);

    let view = store.view().expect("contact view");
    assert!(view.is_final);
    assert_eq!(view.progress_percent, 100);

    for (field, value) in [
        (ContactField::Name, "G"),
        (ContactField::Phone, "123"),
        (ContactField::PreferredContact, "email"),
    ] {
        store
            .dispatch(FunnelEvent::ContactField {
                field,
                value: value.to_string(),
            })
            .expect("contact field stored");
    }
    let report = store.state().validate_current(store.catalog()).expect("report");
    assert!(!report.valid);
    for field in ["name", "phone", "email"] {
        assert!(report.field_errors.contains_key(field), "{field} should fail");
    }

    for (field, value) in [
        (ContactField::Name, "Giorgi"),
        (ContactField::Phone, "+995 555 12 34 56"),
        (ContactField::Email, "giorgi@clinic.ge"),
    ] {
        store
            .dispatch(FunnelEvent::ContactField {
                field,
                value: value.to_string(),
            })
            .expect("contact field stored");
    }
    let report = store.state().validate_current(store.catalog()).expect("report");
    assert!(report.valid, "{:?}", report.field_errors);

    let estimate = store
        .estimate(&PricingModel::standard())
        .expect("estimate available");
    // (900 + 200 + 80 + 250 - 50) * 0.85 = 1173 -> 1170
    assert_eq!(estimate.current_min, 1170);
    assert!(estimate.current_max >= estimate.current_min + 200);
    assert_eq!(estimate.current_min % 10, 0);
}

#[test]
fn reset_removes_the_snapshot_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (mut store, storage) = store_in(dir.path());
    select_and_advance(&mut store, &["education"]);
    assert!(storage.path().exists());

    store.dispatch(FunnelEvent::Reset).expect("reset");
    assert!(!storage.path().exists());
    assert!(storage.load().expect("load").is_none());
}

#[test]
fn corrupt_snapshot_starts_fresh() {
    let dir = tempfile::tempdir().expect("temp dir");
    let storage = FileStorage::new(dir.path());
    storage.save("{\"version\":1,\"stepIndex\":").expect("write");

    let (store, _) = store_in(dir.path());
    assert_eq!(store.state().current_step_index, 0);
    assert_eq!(store.get(), Default::default());
}
