use crate::infra::{funnel_storage, read_answers, submission_coordinator};
use crate::routes::estimate_response;
use clap::Args;
use quote_funnel::config::AppConfig;
use quote_funnel::error::AppError;
use quote_funnel::funnel::submission::SubmissionOutcome;
use quote_funnel::funnel::{
    AnswerStore, Catalog, ContactField, FunnelEvent, PricingModel, StepView,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct EstimateArgs {
    /// JSON file with funnel answers, keyed like the funnel steps
    #[arg(long)]
    pub(crate) answers: PathBuf,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Deliver the sample lead through the configured channels
    #[arg(long)]
    pub(crate) submit: bool,
}

pub(crate) fn run_estimate(args: EstimateArgs) -> Result<(), AppError> {
    let catalog = Catalog::standard();
    let answers = read_answers(&args.answers, &catalog)?;
    let response = estimate_response(&answers, &PricingModel::standard());

    println!("Pages counted: {}", response.page_count);
    match response.description {
        Some(description) => println!("Estimate: {description}"),
        None => println!("Estimate: not available (choose a website type first)"),
    }
    Ok(())
}

/// Sample lead: one option list per choice step, in funnel order.
const SAMPLE_CHOICES: [&[&str]; 6] = [
    &["beauty"],
    &["informational"],
    &["home", "about", "services", "gallery", "contact"],
    &["booking", "google_maps"],
    &["logo"],
    &["standard"],
];

const SAMPLE_CONTACT: [(ContactField, &str); 5] = [
    (ContactField::Name, "Mariam Beridze"),
    (ContactField::BusinessName, "Salon Mzia"),
    (ContactField::City, "Tbilisi"),
    (ContactField::Phone, "599 12 34 56"),
    (ContactField::PreferredContact, "telegram"),
];

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let catalog = Arc::new(Catalog::standard());
    let mut store = AnswerStore::load(catalog, funnel_storage(&config.storage));

    println!("Project calculator demo");
    if store.state().current_step_index > 0 {
        println!(
            "Found a saved funnel at step {}; starting over with the sample lead",
            store.state().current_step_index + 1
        );
    }
    store.dispatch(FunnelEvent::Reset)?;

    for choices in SAMPLE_CHOICES {
        for value in choices {
            store.dispatch(FunnelEvent::Select(value.to_string()))?;
        }
        if let Some(view) = store.view() {
            render_choice_step(&view);
        }
        store.dispatch(FunnelEvent::Next)?;
    }

    for (field, value) in SAMPLE_CONTACT {
        store.dispatch(FunnelEvent::ContactField {
            field,
            value: value.to_string(),
        })?;
    }
    if let Some(view) = store.view() {
        println!("[{}/{}] {}", view.position, view.total, view.question);
        for field in view.contact_fields.iter().filter(|field| !field.value.is_empty()) {
            println!("  - {}: {}", field.label, field.value);
        }
    }

    let pricing = PricingModel::standard();
    match store.estimate(&pricing) {
        Some(range) => println!("\nEstimate: {}", range.describe(&pricing.currency)),
        None => println!("\nEstimate: not available"),
    }

    if !args.submit {
        println!("Run with --submit to deliver this lead through the configured channels.");
        return Ok(());
    }

    let mut coordinator = submission_coordinator(&config);
    match coordinator.submit(&mut store).await? {
        SubmissionOutcome::Delivered { failures, .. } => {
            println!("\nLead delivered. Thank you screen shown; navigation is locked.");
            for failure in failures {
                println!("  (one channel failed: {failure})");
            }
        }
        SubmissionOutcome::Fallback(view) => {
            println!("\n{}", view.message);
            for failure in &view.failures {
                println!("  - {failure}");
            }
            println!("\n{}", view.summary);
            println!("Send manually: {}", view.mailto_link);
        }
    }
    Ok(())
}

fn render_choice_step(view: &StepView) {
    let selected: Vec<&str> = view
        .options
        .iter()
        .filter(|option| option.selected)
        .map(|option| option.label)
        .collect();
    println!(
        "[{}/{}] {} ({}%)",
        view.position, view.total, view.question, view.progress_percent
    );
    println!("  -> {}", selected.join(", "));
}
