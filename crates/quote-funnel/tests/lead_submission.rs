//! Delivering a finished funnel through real HTTP channels against a local
//! relay, and the manual fallback when nothing is reachable.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use quote_funnel::config::{EmailTemplateConfig, EMAILJS_SEND_ENDPOINT};
use quote_funnel::funnel::submission::{
    StructuredApiChannel, SubmissionCoordinator, SubmissionOutcome, SubmissionPhase,
    TemplatedEmailChannel,
};
use quote_funnel::funnel::{
    AnswerStore, Catalog, ContactField, FunnelEvent, FunnelStorage, MemoryStorage, PricingModel,
};
use quote_funnel::relay::{
    relay_router, MailRelayService, MailTransport, OutgoingMail, TransportError,
};

#[derive(Clone, Default)]
struct Inbox {
    mails: Arc<Mutex<Vec<OutgoingMail>>>,
}

#[async_trait]
impl MailTransport for Inbox {
    async fn send(&self, mail: OutgoingMail) -> Result<String, TransportError> {
        let mut mails = self.mails.lock().expect("inbox poisoned");
        mails.push(mail);
        Ok(format!("<lead-{}@relay.test>", mails.len()))
    }
}

async fn spawn_relay(inbox: Inbox) -> String {
    let service = Arc::new(MailRelayService::new(inbox, "sales@studio.ge"));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind local relay");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, relay_router(service))
            .await
            .expect("relay serves");
    });
    format!("http://{addr}/api/v1/quote/leads")
}

fn unconfigured_template() -> EmailTemplateConfig {
    EmailTemplateConfig {
        endpoint: EMAILJS_SEND_ENDPOINT.to_string(),
        public_key: Some("YOUR_PUBLIC_KEY_HERE".to_string()),
        service_id: Some("YOUR_SERVICE_ID_HERE".to_string()),
        template_id: Some("YOUR_TEMPLATE_ID_HERE".to_string()),
    }
}

fn finished_funnel(storage: Arc<MemoryStorage>) -> AnswerStore {
    let mut store = AnswerStore::new(Arc::new(Catalog::standard()), storage);
    let choices: [&[&str]; 6] = [
        &["realestate"],
        &["corporate"],
        &["home", "about", "gallery", "contact"],
        &["multilingual", "google_maps"],
        &["brand_identity"],
        &["urgent"],
    ];
    for values in choices {
        for value in values {
            store
                .dispatch(FunnelEvent::Select(value.to_string()))
                .expect("option accepted");
        }
        store.dispatch(FunnelEvent::Next).expect("step validates");
    }
    for (field, value) in [
        (ContactField::Name, "Tamar"),
        (ContactField::BusinessName, "Batumi Homes"),
        (ContactField::Phone, "0555 123 456"),
        (ContactField::Email, "tamar@homes.ge"),
        (ContactField::PreferredContact, "email"),
    ] {
        store
            .dispatch(FunnelEvent::ContactField {
                field,
                value: value.to_string(),
            })
            .expect("contact stored");
    }
    store
}

#[tokio::test]
async fn lead_reaches_the_inbox_through_the_structured_api() {
    let inbox = Inbox::default();
    let endpoint = spawn_relay(inbox.clone()).await;
    let client = reqwest::Client::new();

    let storage = Arc::new(MemoryStorage::default());
    let mut store = finished_funnel(storage.clone());
    let mut coordinator = SubmissionCoordinator::new(
        Arc::new(TemplatedEmailChannel::new(
            client.clone(),
            unconfigured_template(),
        )),
        Arc::new(StructuredApiChannel::new(client, Some(endpoint))),
        PricingModel::standard(),
        "sales@studio.ge",
    );

    let outcome = coordinator.submit(&mut store).await.expect("submission runs");
    let SubmissionOutcome::Delivered { failures, payload } = outcome else {
        panic!("lead should be delivered");
    };
    assert_eq!(failures.len(), 1);
    assert!(failures[0].is_not_configured());
    assert_eq!(payload.contact.phone, "+995555123456");
    assert_eq!(coordinator.phase(), SubmissionPhase::Succeeded);
    assert!(store.state().completed);
    assert!(storage.load().expect("load").is_none());

    let mails = inbox.mails.lock().expect("inbox poisoned");
    assert_eq!(mails.len(), 1);
    assert_eq!(mails[0].to, "sales@studio.ge");
    assert_eq!(mails[0].reply_to.as_deref(), Some("tamar@homes.ge"));
    assert!(mails[0].subject.contains("Tamar"));
    assert!(mails[0].text_body.contains("Brand identity"));
}

#[tokio::test]
async fn unreachable_channels_fall_back_to_manual_sending() {
    let client = reqwest::Client::new();
    let storage = Arc::new(MemoryStorage::default());
    let mut store = finished_funnel(storage.clone());
    let before = storage.load().expect("load");

    let mut coordinator = SubmissionCoordinator::new(
        Arc::new(TemplatedEmailChannel::new(
            client.clone(),
            unconfigured_template(),
        )),
        Arc::new(StructuredApiChannel::new(
            client,
            Some("http://127.0.0.1:9/api/v1/quote/leads".to_string()),
        )),
        PricingModel::standard(),
        "sales@studio.ge",
    );

    let outcome = coordinator.submit(&mut store).await.expect("submission runs");
    let SubmissionOutcome::Fallback(view) = outcome else {
        panic!("both channels should fail");
    };

    let estimate = store
        .estimate(&PricingModel::standard())
        .expect("estimate available");
    for label in ["Real estate", "Corporate website", "Multiple languages", "Tamar"] {
        assert!(view.summary.contains(label), "summary misses {label}");
    }
    assert!(view
        .summary
        .contains(&format!("{}-{} GEL", estimate.current_min, estimate.current_max)));
    assert!(view.mailto_link.starts_with("mailto:sales@studio.ge?subject="));

    assert_eq!(coordinator.phase(), SubmissionPhase::Failed);
    assert!(!store.state().submitting);
    assert_eq!(storage.load().expect("load"), before);
}
