//! Shutterdesk closing walkthrough
//!
//! Runs the whole contract and invoice completion workflow against the
//! in-memory contract service: draft prefill and editing, contract
//! creation, the signing link, status polling, the completion gate
//! refusing early, a failed delivery resent by hand, and resume after
//! leaving mid-draft.

use closing_client::MemoryContractService;
use closing_engine::{
    CompletionConfig, DraftSources, FixedSignaturePad, PollerConfig, SaleOrchestrator,
    StaticDirectory,
};
use closing_store::MemoryDraftStore;
use closing_types::{
    CustomerFields, LeadId, LineItem, OrderFields, PaymentFields, PaymentStatus, SaleEvent,
    StudioFields,
};
use std::sync::Arc;
use std::time::Duration;

use colored::*;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!(
        "{}",
        "╔══════════════════════════════════════════════════════════════════╗".cyan()
    );
    println!(
        "{}",
        "║        Shutterdesk Contract & Invoice Closing Walkthrough        ║".cyan()
    );
    println!(
        "{}",
        "╚══════════════════════════════════════════════════════════════════╝".cyan()
    );

    let service = Arc::new(MemoryContractService::new());
    let drafts = Arc::new(MemoryDraftStore::new());
    let lead = LeadId::new("lead-aurora-wedding");

    let orchestrator = SaleOrchestrator::new(
        CompletionConfig {
            poller: PollerConfig { interval_ms: 200 },
            event_capacity: 64,
        },
        drafts,
        service.clone(),
        make_sources(&lead),
        Arc::new(FixedSignaturePad::default()),
    );

    // Narrate broadcast events as they arrive
    let mut events = orchestrator.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            let line = match event {
                SaleEvent::DraftResumed { step, .. } => format!("draft resumed at {step}"),
                SaleEvent::DraftDiscarded { lead_id } => {
                    format!("draft for {} discarded", lead_id.short())
                }
                SaleEvent::ContractCreated { contract } => {
                    format!("contract {} created", contract.id.short())
                }
                SaleEvent::ContractSent { to, .. } => format!("signing link sent to {to}"),
                SaleEvent::SignatureObserved { status, .. } => format!("signature now {status:?}"),
                SaleEvent::PaymentObserved { status, .. } => format!("payment now {status:?}"),
                SaleEvent::DeliveryResolved { delivered, .. } => {
                    if delivered {
                        "delivery email delivered".to_string()
                    } else {
                        "delivery email failed".to_string()
                    }
                }
                SaleEvent::Completed { contract } => {
                    format!("sale {} completed", contract.id.short())
                }
                SaleEvent::NavigatedBack { target } => format!("left toward {target:?}"),
            };
            println!("  {} {}", "event:".cyan(), line);
        }
    });

    section("1. Draft to signing link");

    orchestrator.open(lead.clone()).await.unwrap();
    let view = orchestrator.snapshot().await;
    let draft = view.phase.draft().unwrap();
    println!(
        "  Prefilled draft: {} / {} / {} cents",
        draft.fields.customer.name,
        draft.fields.order.package_name,
        draft.fields.payment.total_cents
    );

    orchestrator.to_review().await.unwrap();
    let contract = orchestrator.create_contract().await.unwrap();
    println!("  Signing link: {}", contract.signing_url);
    orchestrator
        .send_contract("dana@example.com")
        .await
        .unwrap();
    pause().await;

    section("2. The gate holds until paid and signed");

    if let Err(refusal) = orchestrator.complete().await {
        println!("  {} {}", "refused:".red(), refusal);
    }

    section("3. Remote progress is observed");

    service.mark_signed(&contract.id).await;
    service
        .mark_payment(&contract.id, PaymentStatus::Paid)
        .await;
    tokio::time::sleep(Duration::from_millis(500)).await;

    let view = orchestrator.snapshot().await;
    let current = view.contract().unwrap();
    println!(
        "  Poller caught up: status {:?}, payment {:?}",
        current.status, current.payment_status
    );

    section("4. Delivery fails and is resent by hand");

    service
        .resolve_delivery(&contract.id, false, Some("mailbox full"))
        .await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    println!(
        "  Delivery state: {:?}",
        orchestrator.delivery_status().await
    );

    let receipt = orchestrator
        .resend_delivery("dana@example.com")
        .await
        .unwrap();
    println!(
        "  Resent with {} attachment(s) to {}",
        receipt.attachments, receipt.sent_to
    );

    section("5. Completion");

    let finished = orchestrator.complete().await.unwrap();
    println!("{}", serde_json::to_string_pretty(&finished).unwrap());
    pause().await;

    section("6. Drafts survive leaving");

    let lead2 = LeadId::new("lead-family-portrait");
    orchestrator.open(lead2.clone()).await.unwrap();
    let mut customer = CustomerFields::default();
    customer.name = "Marcus Webb".to_string();
    orchestrator.update_customer(customer).await.unwrap();
    orchestrator.close().await;
    println!("  Left the workflow mid-edit; the draft is stored");

    let outcome = orchestrator.open(lead2).await.unwrap();
    println!("  Reopened: {outcome:?}");
    let step = orchestrator.resume().await.unwrap();
    println!("  Resumed at the {step} step");
    pause().await;

    println!();
    println!("{}", "Walkthrough complete!".green().bold());
}

fn make_sources(lead: &LeadId) -> DraftSources {
    let mut profile = CustomerFields::default();
    profile.name = "Dana Reyes".to_string();
    profile.email = Some("dana@example.com".to_string());
    profile.phone = Some("+1 555 0134".to_string());

    let mut order = OrderFields::default();
    order.package_name = "Gold Wedding".to_string();
    order.line_items.push(LineItem {
        label: "Full-day coverage".to_string(),
        amount_cents: 180_000,
    });
    order.line_items.push(LineItem {
        label: "Premium album".to_string(),
        amount_cents: 70_000,
    });

    let mut invoice = PaymentFields::default();
    invoice.total_cents = 250_000;
    invoice.deposit_cents = Some(50_000);

    let directory = Arc::new(
        StaticDirectory::new()
            .with_profile(lead.clone(), profile)
            .with_package(lead.clone(), order)
            .with_invoice(lead.clone(), invoice),
    );

    let mut studio = StudioFields::default();
    studio.name = "Northlight Studio".to_string();
    studio.representative = Some("Imani Park".to_string());

    DraftSources::new(directory.clone(), directory.clone(), directory, studio)
}

fn section(title: &str) {
    println!();
    println!(
        "{}",
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━".yellow()
    );
    println!("  {}", title.yellow().bold());
    println!(
        "{}",
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━".yellow()
    );
    println!();
}

/// Give the event task a moment to print before the next section.
async fn pause() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
