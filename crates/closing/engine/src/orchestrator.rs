//! One sale at a time, front to back
//!
//! The orchestrator is the single entry point host surfaces drive. It
//! guards every operation with the current phase, persists the draft
//! after each change, owns the poller's lifetime, and broadcasts events
//! as the sale moves. Phase transitions happen under the view's write
//! lock; remote calls never hold it.

use crate::config::CompletionConfig;
use crate::delivery::DeliveryDispatcher;
use crate::lifecycle::LifecycleController;
use crate::poller::{PollerHandle, StatusPoller};
use crate::providers::{DraftSources, SignaturePad};
use crate::view::{SalePhase, SaleView};
use chrono::Utc;
use closing_client::{CompletionAttestation, ContractService, DeliveryReceipt};
use closing_store::DraftStore;
use closing_types::{
    ClosingError, ClosingResult, Contract, ContractDraft, ContractId, CustomerFields,
    DeliveryState, ExitTarget, LeadId, OrderFields, PaymentFields, SaleEvent, StudioFields,
    WorkflowStep,
};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};

/// What `open` found for the lead
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenOutcome {
    /// A stored draft exists; resume or discard before anything else
    ResumePrompt,
    /// No usable draft; a fresh prefilled one was created
    FreshDraft,
}

/// Drives the contract and invoice completion workflow for one lead.
pub struct SaleOrchestrator {
    config: CompletionConfig,
    drafts: Arc<dyn DraftStore>,
    service: Arc<dyn ContractService>,
    sources: DraftSources,
    pad: Arc<dyn SignaturePad>,
    lifecycle: LifecycleController,
    dispatcher: DeliveryDispatcher,
    view: Arc<RwLock<SaleView>>,
    poller: Mutex<Option<PollerHandle>>,
    event_tx: broadcast::Sender<SaleEvent>,
}

impl SaleOrchestrator {
    pub fn new(
        config: CompletionConfig,
        drafts: Arc<dyn DraftStore>,
        service: Arc<dyn ContractService>,
        sources: DraftSources,
        pad: Arc<dyn SignaturePad>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity);
        let view = Arc::new(RwLock::new(SaleView::new()));
        let lifecycle = LifecycleController::new(service.clone());
        let dispatcher = DeliveryDispatcher::new(service.clone(), view.clone(), event_tx.clone());

        Self {
            config,
            drafts,
            service,
            sources,
            pad,
            lifecycle,
            dispatcher,
            view,
            poller: Mutex::new(None),
            event_tx,
        }
    }

    /// Subscribe to workflow events.
    pub fn subscribe(&self) -> broadcast::Receiver<SaleEvent> {
        self.event_tx.subscribe()
    }

    /// Current state for rendering.
    pub async fn snapshot(&self) -> SaleView {
        self.view.read().await.clone()
    }

    /// Delivery standing of the current contract.
    pub async fn delivery_status(&self) -> DeliveryState {
        self.dispatcher.state().await
    }

    // ── Session ──────────────────────────────────────────────────────

    /// Open the workflow for a lead.
    ///
    /// Any previous session is torn down first. A stored draft for the
    /// lead puts the workflow into the resume prompt; otherwise a fresh
    /// draft is prefilled from the host sources. The store is untouched
    /// until the first edit.
    pub async fn open(&self, lead_id: LeadId) -> ClosingResult<OpenOutcome> {
        self.teardown().await;

        if let Some(draft) = self.drafts.load(&lead_id).await? {
            tracing::info!(lead_id = %lead_id, step = %draft.step, "Stored draft found");
            let mut view = self.view.write().await;
            view.phase = SalePhase::ResumePrompt { draft };
            return Ok(OpenOutcome::ResumePrompt);
        }

        let draft = self.fresh_draft(&lead_id).await?;
        let mut view = self.view.write().await;
        view.phase = SalePhase::Drafting { draft };
        Ok(OpenOutcome::FreshDraft)
    }

    /// Take the stored draft up where it left off.
    ///
    /// A draft saved at the Send step re-attaches to its remote contract:
    /// the current snapshot is fetched and the poller re-armed. If that
    /// fetch fails the workflow stays at the prompt so the operator can
    /// retry or discard. A Send draft that lost its contract link falls
    /// back to Review.
    pub async fn resume(&self) -> ClosingResult<WorkflowStep> {
        let mut draft = {
            let view = self.view.read().await;
            match &view.phase {
                SalePhase::ResumePrompt { draft } => draft.clone(),
                other => {
                    return Err(ClosingError::InvalidPhase {
                        action: "resume".to_string(),
                        phase: other.name().to_string(),
                    })
                }
            }
        };

        if draft.step.is_send() {
            match draft.contract_id.clone() {
                Some(contract_id) => {
                    let contract = self.service.get(&contract_id).await?;
                    let step = draft.step;
                    let lead_id = draft.lead_id.clone();
                    {
                        let mut view = self.view.write().await;
                        view.phase = SalePhase::Created { draft, contract };
                    }
                    self.start_poller().await;
                    self.emit(SaleEvent::DraftResumed { lead_id, step });
                    return Ok(step);
                }
                None => {
                    tracing::warn!(
                        lead_id = %draft.lead_id,
                        "Draft at the send step has no contract link, falling back to review"
                    );
                    draft.step = WorkflowStep::Review;
                    draft.touch();
                    self.persist(&draft).await;
                }
            }
        }

        let step = draft.step;
        let lead_id = draft.lead_id.clone();
        {
            let mut view = self.view.write().await;
            view.phase = SalePhase::Drafting { draft };
        }
        self.emit(SaleEvent::DraftResumed { lead_id, step });
        Ok(step)
    }

    /// Throw the stored draft away and start over from prefill.
    pub async fn discard(&self) -> ClosingResult<()> {
        let lead_id = {
            let view = self.view.read().await;
            match &view.phase {
                SalePhase::ResumePrompt { draft } => draft.lead_id.clone(),
                other => {
                    return Err(ClosingError::InvalidPhase {
                        action: "discard".to_string(),
                        phase: other.name().to_string(),
                    })
                }
            }
        };

        self.drafts.discard(&lead_id).await?;
        let draft = self.fresh_draft(&lead_id).await?;
        {
            let mut view = self.view.write().await;
            view.phase = SalePhase::Drafting { draft };
        }
        self.emit(SaleEvent::DraftDiscarded { lead_id });
        Ok(())
    }

    /// Leave the workflow without completing.
    ///
    /// The stored draft stays for a later resume. The poller stops and
    /// session-only state, the local signature included, is dropped.
    pub async fn close(&self) {
        self.teardown().await;
    }

    /// Leave the workflow for another screen.
    pub async fn exit(&self, target: ExitTarget) {
        self.close().await;
        self.emit(SaleEvent::NavigatedBack { target });
    }

    // ── Draft Editing ────────────────────────────────────────────────

    /// Update the customer block of the draft.
    pub async fn update_customer(&self, customer: CustomerFields) -> ClosingResult<()> {
        self.edit_draft("update_customer", |draft| draft.fields.customer = customer)
            .await
    }

    /// Update the studio block of the draft.
    pub async fn update_studio(&self, studio: StudioFields) -> ClosingResult<()> {
        self.edit_draft("update_studio", |draft| draft.fields.studio = studio)
            .await
    }

    /// Update the order block of the draft.
    pub async fn update_order(&self, order: OrderFields) -> ClosingResult<()> {
        self.edit_draft("update_order", |draft| draft.fields.order = order)
            .await
    }

    /// Update the payment block of the draft.
    pub async fn update_payment(&self, payment: PaymentFields) -> ClosingResult<()> {
        self.edit_draft("update_payment", |draft| draft.fields.payment = payment)
            .await
    }

    /// Move the draft from editing to review. Validation must pass.
    pub async fn to_review(&self) -> ClosingResult<()> {
        let snapshot = {
            let mut view = self.view.write().await;
            let SalePhase::Drafting { draft } = &mut view.phase else {
                return Err(ClosingError::InvalidPhase {
                    action: "to_review".to_string(),
                    phase: view.phase.name().to_string(),
                });
            };
            if draft.step != WorkflowStep::Edit {
                return Err(ClosingError::InvalidPhase {
                    action: "to_review".to_string(),
                    phase: format!("{} step", draft.step),
                });
            }
            draft.validate()?;
            draft.step = WorkflowStep::Review;
            draft.touch();
            draft.clone()
        };
        self.persist(&snapshot).await;
        Ok(())
    }

    /// Return from review to editing.
    pub async fn back_to_edit(&self) -> ClosingResult<()> {
        let snapshot = {
            let mut view = self.view.write().await;
            let SalePhase::Drafting { draft } = &mut view.phase else {
                return Err(ClosingError::InvalidPhase {
                    action: "back_to_edit".to_string(),
                    phase: view.phase.name().to_string(),
                });
            };
            if draft.step != WorkflowStep::Review {
                return Err(ClosingError::InvalidPhase {
                    action: "back_to_edit".to_string(),
                    phase: format!("{} step", draft.step),
                });
            }
            draft.step = WorkflowStep::Edit;
            draft.touch();
            draft.clone()
        };
        self.persist(&snapshot).await;
        Ok(())
    }

    // ── Contract ─────────────────────────────────────────────────────

    /// Create the authoritative contract from the reviewed draft.
    ///
    /// On success the draft advances to the Send step and the poller
    /// starts. An incomplete create response voids the attempt and sends
    /// the draft back to editing; any other failure leaves it at review
    /// for a retry.
    pub async fn create_contract(&self) -> ClosingResult<Contract> {
        let draft = {
            let view = self.view.read().await;
            match &view.phase {
                SalePhase::Drafting { draft } if draft.step == WorkflowStep::Review => {
                    draft.clone()
                }
                SalePhase::Drafting { draft } => {
                    return Err(ClosingError::InvalidPhase {
                        action: "create_contract".to_string(),
                        phase: format!("{} step", draft.step),
                    })
                }
                other => {
                    return Err(ClosingError::InvalidPhase {
                        action: "create_contract".to_string(),
                        phase: other.name().to_string(),
                    })
                }
            }
        };

        match self.lifecycle.create(&draft).await {
            Ok(contract) => {
                let mut draft = draft;
                draft.attach_contract(contract.id.clone());
                self.persist(&draft).await;
                {
                    let mut view = self.view.write().await;
                    view.phase = SalePhase::Created {
                        draft,
                        contract: contract.clone(),
                    };
                }
                self.start_poller().await;
                self.emit(SaleEvent::ContractCreated {
                    contract: contract.clone(),
                });
                Ok(contract)
            }
            Err(e @ ClosingError::IncompleteResponse(_)) => {
                // The half-made record cannot be signed; void the attempt
                // and reopen editing.
                let mut draft = draft;
                draft.step = WorkflowStep::Edit;
                draft.touch();
                self.persist(&draft).await;
                let mut view = self.view.write().await;
                view.phase = SalePhase::Drafting { draft };
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Send the signing link to the customer.
    pub async fn send_contract(&self, to: &str) -> ClosingResult<()> {
        let contract = {
            let view = self.view.read().await;
            match &view.phase {
                SalePhase::Created { contract, .. } => contract.clone(),
                other => {
                    return Err(ClosingError::InvalidPhase {
                        action: "send_contract".to_string(),
                        phase: other.name().to_string(),
                    })
                }
            }
        };

        self.lifecycle.send(&contract, to).await?;

        let sent_to = to.trim().to_string();
        {
            let mut view = self.view.write().await;
            view.signing_link_sent_to = Some(sent_to.clone());
            view.signing_link_sent_at = Some(Utc::now());
        }
        self.ensure_poller().await;
        self.emit(SaleEvent::ContractSent {
            contract,
            to: sent_to,
        });
        Ok(())
    }

    /// Capture the customer's signature on the in-studio pad.
    ///
    /// The image satisfies the signature side of the completion gate and
    /// travels with the completion call as local attestation.
    pub async fn capture_signature(&self) -> ClosingResult<()> {
        {
            let view = self.view.read().await;
            if !matches!(view.phase, SalePhase::Created { .. }) {
                return Err(ClosingError::InvalidPhase {
                    action: "capture_signature".to_string(),
                    phase: view.phase.name().to_string(),
                });
            }
        }

        let image = self.pad.capture().await?;
        if image.is_empty() {
            return Err(ClosingError::Validation(
                "signature pad returned an empty image".to_string(),
            ));
        }

        let mut view = self.view.write().await;
        view.local_signature = Some(image);
        tracing::info!("Local signature captured");
        Ok(())
    }

    /// Attach the signing auth code the customer will be asked for.
    pub async fn set_auth_code(&self, code: &str) -> ClosingResult<()> {
        if code.trim().is_empty() {
            return Err(ClosingError::Validation(
                "auth code must not be empty".to_string(),
            ));
        }

        let contract_id = self.created_contract_id("set_auth_code").await?;
        self.service.set_auth_code(&contract_id, code.trim()).await?;
        tracing::debug!(contract_id = %contract_id, "Auth code set");
        Ok(())
    }

    /// Fetch the remote snapshot right now, outside the polling cadence.
    pub async fn refresh(&self) -> ClosingResult<Contract> {
        let contract_id = self.created_contract_id("refresh").await?;
        let remote = self.service.get(&contract_id).await?;
        let events = {
            let mut view = self.view.write().await;
            view.apply_remote(remote.clone())
        };
        for event in events {
            self.emit(event);
        }
        Ok(remote)
    }

    /// Dispatch the final delivery email by hand.
    pub async fn resend_delivery(&self, to: &str) -> ClosingResult<DeliveryReceipt> {
        self.dispatcher.resend(to).await
    }

    /// Finalize the sale.
    ///
    /// The completion gate must clear: payment recorded as paid, and a
    /// signature either observed remotely or captured on the pad. On
    /// success the poller stops, the stored draft is deleted, and the
    /// workflow reaches its terminal phase. A refusal changes nothing.
    pub async fn complete(&self) -> ClosingResult<Contract> {
        let (contract, attestation) = {
            let view = self.view.read().await;
            match &view.phase {
                SalePhase::Created { contract, .. } => {
                    let attestation = match view.local_signature.clone() {
                        Some(signature) => CompletionAttestation::local(signature),
                        None => CompletionAttestation::remote(),
                    };
                    (contract.clone(), attestation)
                }
                SalePhase::Completed { .. } => return Err(ClosingError::AlreadyCompleted),
                other => {
                    return Err(ClosingError::InvalidPhase {
                        action: "complete".to_string(),
                        phase: other.name().to_string(),
                    })
                }
            }
        };

        let finished = self.lifecycle.complete(&contract, &attestation).await?;

        self.stop_poller().await;
        if let Err(e) = self.drafts.discard(&finished.lead_id).await {
            tracing::warn!(lead_id = %finished.lead_id, error = %e, "Draft cleanup failed");
        }
        {
            let mut view = self.view.write().await;
            view.phase = SalePhase::Completed {
                contract: finished.clone(),
            };
            view.local_signature = None;
        }
        self.emit(SaleEvent::Completed {
            contract: finished.clone(),
        });
        Ok(finished)
    }

    // ── Helpers ──────────────────────────────────────────────────────

    /// Build a prefilled draft. Nothing is stored until the first edit
    /// or step change writes it through.
    async fn fresh_draft(&self, lead_id: &LeadId) -> ClosingResult<ContractDraft> {
        let fields = self.sources.prefill(lead_id).await?;
        let draft = ContractDraft::new(lead_id.clone()).with_fields(fields);
        tracing::info!(lead_id = %lead_id, "Fresh draft prefilled");
        Ok(draft)
    }

    /// Persist the draft. A failed save is logged, never fatal; the
    /// in-memory draft stays authoritative for the session.
    async fn persist(&self, draft: &ContractDraft) {
        if let Err(e) = self.drafts.save(draft).await {
            tracing::warn!(lead_id = %draft.lead_id, error = %e, "Draft save failed");
        }
    }

    async fn edit_draft<F>(&self, action: &str, mutate: F) -> ClosingResult<()>
    where
        F: FnOnce(&mut ContractDraft),
    {
        let snapshot = {
            let mut view = self.view.write().await;
            let SalePhase::Drafting { draft } = &mut view.phase else {
                return Err(ClosingError::InvalidPhase {
                    action: action.to_string(),
                    phase: view.phase.name().to_string(),
                });
            };
            mutate(draft);
            draft.touch();
            draft.clone()
        };
        self.persist(&snapshot).await;
        Ok(())
    }

    async fn created_contract_id(&self, action: &str) -> ClosingResult<ContractId> {
        let view = self.view.read().await;
        match &view.phase {
            SalePhase::Created { contract, .. } => Ok(contract.id.clone()),
            other => Err(ClosingError::InvalidPhase {
                action: action.to_string(),
                phase: other.name().to_string(),
            }),
        }
    }

    fn emit(&self, event: SaleEvent) {
        let _ = self.event_tx.send(event);
    }

    fn make_poller(&self) -> StatusPoller {
        StatusPoller::new(
            self.service.clone(),
            self.view.clone(),
            self.event_tx.clone(),
            self.config.poller.clone(),
        )
    }

    /// Replace any existing poller with a fresh one.
    async fn start_poller(&self) {
        let mut slot = self.poller.lock().await;
        if let Some(old) = slot.take() {
            old.shutdown().await;
        }
        *slot = Some(self.make_poller().spawn());
    }

    /// Start a poller only if none is running.
    async fn ensure_poller(&self) {
        let mut slot = self.poller.lock().await;
        if let Some(handle) = slot.as_ref() {
            if handle.is_running().await {
                return;
            }
        }
        *slot = Some(self.make_poller().spawn());
    }

    async fn stop_poller(&self) {
        let mut slot = self.poller.lock().await;
        if let Some(handle) = slot.take() {
            handle.shutdown().await;
        }
    }

    async fn teardown(&self) {
        self.stop_poller().await;
        let mut view = self.view.write().await;
        view.phase = SalePhase::Idle;
        view.local_signature = None;
        view.signing_link_sent_to = None;
        view.signing_link_sent_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollerConfig;
    use crate::gate::CompletionGate;
    use crate::providers::{FixedSignaturePad, StaticDirectory};
    use closing_client::MemoryContractService;
    use closing_store::MemoryDraftStore;
    use closing_types::PaymentStatus;
    use proptest::prelude::*;
    use std::time::Duration;

    fn test_config(interval_ms: u64) -> CompletionConfig {
        CompletionConfig {
            poller: PollerConfig { interval_ms },
            event_capacity: 64,
        }
    }

    fn make_orchestrator_on(
        service: Arc<MemoryContractService>,
        drafts: Arc<MemoryDraftStore>,
        config: CompletionConfig,
    ) -> SaleOrchestrator {
        let mut profile = CustomerFields::default();
        profile.name = "Dana Reyes".to_string();
        profile.email = Some("dana@example.com".to_string());
        let directory =
            Arc::new(StaticDirectory::new().with_profile(LeadId::new("lead-1"), profile));

        let mut studio = StudioFields::default();
        studio.name = "Northlight Studio".to_string();
        let sources = DraftSources::new(directory.clone(), directory.clone(), directory, studio);

        SaleOrchestrator::new(
            config,
            drafts,
            service,
            sources,
            Arc::new(FixedSignaturePad::default()),
        )
    }

    fn make_orchestrator() -> (
        Arc<MemoryContractService>,
        Arc<MemoryDraftStore>,
        SaleOrchestrator,
    ) {
        let service = Arc::new(MemoryContractService::new());
        let drafts = Arc::new(MemoryDraftStore::new());
        let orchestrator = make_orchestrator_on(service.clone(), drafts.clone(), test_config(10));
        (service, drafts, orchestrator)
    }

    fn lead() -> LeadId {
        LeadId::new("lead-1")
    }

    #[tokio::test]
    async fn fresh_open_starts_at_the_edit_step() {
        let (_, _, orchestrator) = make_orchestrator();

        let outcome = orchestrator.open(lead()).await.unwrap();
        assert_eq!(outcome, OpenOutcome::FreshDraft);

        let view = orchestrator.snapshot().await;
        assert_eq!(view.step(), Some(WorkflowStep::Edit));
        assert_eq!(
            view.phase.draft().unwrap().fields.customer.name,
            "Dana Reyes"
        );
    }

    #[tokio::test]
    async fn edit_free_visit_leaves_no_stored_draft() {
        let (_, drafts, orchestrator) = make_orchestrator();

        orchestrator.open(lead()).await.unwrap();
        orchestrator.close().await;
        assert!(drafts.load(&lead()).await.unwrap().is_none());

        // The next visit starts over instead of prompting to resume
        let outcome = orchestrator.open(lead()).await.unwrap();
        assert_eq!(outcome, OpenOutcome::FreshDraft);
    }

    #[tokio::test]
    async fn full_sale_reaches_completed() {
        let (service, drafts, orchestrator) = make_orchestrator();

        orchestrator.open(lead()).await.unwrap();
        orchestrator.to_review().await.unwrap();
        let contract = orchestrator.create_contract().await.unwrap();
        orchestrator.send_contract("dana@example.com").await.unwrap();

        service.mark_signed(&contract.id).await;
        service.mark_payment(&contract.id, PaymentStatus::Paid).await;
        service.resolve_delivery(&contract.id, true, None).await;
        orchestrator.refresh().await.unwrap();

        let finished = orchestrator.complete().await.unwrap();
        assert!(finished.is_signed());
        assert!(orchestrator.snapshot().await.phase.is_terminal());
        assert_eq!(orchestrator.delivery_status().await, DeliveryState::Sent);
        // The stored draft is gone once the sale completed
        assert!(drafts.load(&lead()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resume_restores_the_saved_step() {
        let (service, drafts, orchestrator) = make_orchestrator();

        orchestrator.open(lead()).await.unwrap();
        orchestrator.to_review().await.unwrap();
        orchestrator.close().await;

        // A brand-new orchestrator over the same store sees the draft
        let fresh = make_orchestrator_on(service, drafts, test_config(10));
        let outcome = fresh.open(lead()).await.unwrap();
        assert_eq!(outcome, OpenOutcome::ResumePrompt);

        let step = fresh.resume().await.unwrap();
        assert_eq!(step, WorkflowStep::Review);
        assert_eq!(
            fresh
                .snapshot()
                .await
                .phase
                .draft()
                .unwrap()
                .fields
                .customer
                .name,
            "Dana Reyes"
        );
    }

    #[tokio::test]
    async fn discard_rebuilds_the_draft_from_prefill() {
        let (_, drafts, orchestrator) = make_orchestrator();
        let mut rx = orchestrator.subscribe();

        orchestrator.open(lead()).await.unwrap();
        let mut customer = CustomerFields::default();
        customer.name = "Temporary Name".to_string();
        orchestrator.update_customer(customer).await.unwrap();
        orchestrator.close().await;

        orchestrator.open(lead()).await.unwrap();
        orchestrator.discard().await.unwrap();

        let view = orchestrator.snapshot().await;
        assert_eq!(
            view.phase.draft().unwrap().fields.customer.name,
            "Dana Reyes"
        );
        // The rebuilt prefill is not written back until it is edited
        assert!(drafts.load(&lead()).await.unwrap().is_none());
        let saw_discard = std::iter::from_fn(|| rx.try_recv().ok())
            .any(|event| matches!(event, SaleEvent::DraftDiscarded { .. }));
        assert!(saw_discard);
    }

    #[tokio::test]
    async fn create_requires_the_review_step() {
        let (_, _, orchestrator) = make_orchestrator();
        orchestrator.open(lead()).await.unwrap();

        let err = orchestrator.create_contract().await.unwrap_err();
        assert!(matches!(err, ClosingError::InvalidPhase { .. }));
    }

    #[tokio::test]
    async fn gate_refusal_changes_nothing() {
        let (_, drafts, orchestrator) = make_orchestrator();

        orchestrator.open(lead()).await.unwrap();
        orchestrator.to_review().await.unwrap();
        orchestrator.create_contract().await.unwrap();
        orchestrator.send_contract("dana@example.com").await.unwrap();

        let err = orchestrator.complete().await.unwrap_err();
        assert!(matches!(err, ClosingError::GateNotSatisfied(_)));

        let view = orchestrator.snapshot().await;
        assert!(matches!(view.phase, SalePhase::Created { .. }));
        assert!(drafts.load(&lead()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn incomplete_create_returns_to_editing() {
        let (service, _, orchestrator) = make_orchestrator();
        service.omit_signing_url_once();

        orchestrator.open(lead()).await.unwrap();
        orchestrator.to_review().await.unwrap();

        let err = orchestrator.create_contract().await.unwrap_err();
        assert!(matches!(err, ClosingError::IncompleteResponse(_)));
        assert_eq!(
            orchestrator.snapshot().await.step(),
            Some(WorkflowStep::Edit)
        );
    }

    #[tokio::test]
    async fn local_signature_completes_a_paid_sale() {
        let (service, _, orchestrator) = make_orchestrator();

        orchestrator.open(lead()).await.unwrap();
        orchestrator.to_review().await.unwrap();
        let contract = orchestrator.create_contract().await.unwrap();
        orchestrator.send_contract("dana@example.com").await.unwrap();
        orchestrator.capture_signature().await.unwrap();

        service.mark_payment(&contract.id, PaymentStatus::Paid).await;
        orchestrator.refresh().await.unwrap();

        let finished = orchestrator.complete().await.unwrap();
        assert!(finished.is_signed());
        assert!(finished.signed_at.is_some());
    }

    #[tokio::test]
    async fn close_stops_the_poller() {
        let (service, _, orchestrator) = make_orchestrator();

        orchestrator.open(lead()).await.unwrap();
        orchestrator.to_review().await.unwrap();
        orchestrator.create_contract().await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        orchestrator.close().await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        let settled = service.get_count();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(service.get_count(), settled);
        assert!(matches!(
            orchestrator.snapshot().await.phase,
            SalePhase::Idle
        ));
    }

    #[tokio::test]
    async fn resume_at_send_reattaches_the_contract() {
        let (service, _, orchestrator) = make_orchestrator();

        orchestrator.open(lead()).await.unwrap();
        orchestrator.to_review().await.unwrap();
        let contract = orchestrator.create_contract().await.unwrap();
        orchestrator.send_contract("dana@example.com").await.unwrap();
        orchestrator.close().await;

        let outcome = orchestrator.open(lead()).await.unwrap();
        assert_eq!(outcome, OpenOutcome::ResumePrompt);

        let step = orchestrator.resume().await.unwrap();
        assert_eq!(step, WorkflowStep::Send);
        assert_eq!(
            orchestrator.snapshot().await.contract().unwrap().id,
            contract.id
        );

        // The poller is polling again
        let before = service.get_count();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(service.get_count() > before);
    }

    #[tokio::test]
    async fn events_narrate_the_sale() {
        let (_, _, orchestrator) = make_orchestrator();
        let mut rx = orchestrator.subscribe();

        orchestrator.open(lead()).await.unwrap();
        orchestrator.to_review().await.unwrap();
        orchestrator.create_contract().await.unwrap();
        orchestrator.send_contract("dana@example.com").await.unwrap();

        assert!(matches!(
            rx.recv().await.unwrap(),
            SaleEvent::ContractCreated { .. }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            SaleEvent::ContractSent { .. }
        ));
    }

    #[tokio::test]
    async fn updates_refused_once_the_contract_exists() {
        let (_, _, orchestrator) = make_orchestrator();

        orchestrator.open(lead()).await.unwrap();
        orchestrator.to_review().await.unwrap();
        orchestrator.create_contract().await.unwrap();

        let err = orchestrator
            .update_customer(CustomerFields::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClosingError::InvalidPhase { .. }));
    }

    #[tokio::test]
    async fn auth_code_lands_on_the_service() {
        let (service, _, orchestrator) = make_orchestrator();

        orchestrator.open(lead()).await.unwrap();
        orchestrator.to_review().await.unwrap();
        let contract = orchestrator.create_contract().await.unwrap();

        orchestrator.set_auth_code("4821").await.unwrap();
        assert_eq!(
            service.auth_code(&contract.id).await.as_deref(),
            Some("4821")
        );

        let err = orchestrator.set_auth_code("  ").await.unwrap_err();
        assert!(matches!(err, ClosingError::Validation(_)));
    }

    #[tokio::test]
    async fn complete_twice_reports_already_completed() {
        let (service, _, orchestrator) = make_orchestrator();

        orchestrator.open(lead()).await.unwrap();
        orchestrator.to_review().await.unwrap();
        let contract = orchestrator.create_contract().await.unwrap();
        orchestrator.send_contract("dana@example.com").await.unwrap();

        service.mark_signed(&contract.id).await;
        service.mark_payment(&contract.id, PaymentStatus::Paid).await;
        orchestrator.refresh().await.unwrap();
        orchestrator.complete().await.unwrap();

        let err = orchestrator.complete().await.unwrap_err();
        assert!(matches!(err, ClosingError::AlreadyCompleted));
    }

    // ── Operation Sequences ──────────────────────────────────────────

    #[derive(Clone, Debug)]
    enum SaleOp {
        UpdateName(String),
        ToReview,
        BackToEdit,
        Create,
        Send,
        Capture,
        MarkPaid,
        MarkSigned,
        Refresh,
        Complete,
    }

    fn sale_op_strategy() -> impl Strategy<Value = SaleOp> {
        prop_oneof![
            "[A-Za-z ]{1,12}".prop_map(SaleOp::UpdateName),
            Just(SaleOp::ToReview),
            Just(SaleOp::BackToEdit),
            Just(SaleOp::Create),
            Just(SaleOp::Send),
            Just(SaleOp::Capture),
            Just(SaleOp::MarkPaid),
            Just(SaleOp::MarkSigned),
            Just(SaleOp::Refresh),
            Just(SaleOp::Complete),
        ]
    }

    fn phase_rank(view: &SaleView) -> u8 {
        match view.phase {
            SalePhase::Idle => 0,
            SalePhase::ResumePrompt { .. } => 1,
            SalePhase::Drafting { .. } => 2,
            SalePhase::Created { .. } => 3,
            SalePhase::Completed { .. } => 4,
        }
    }

    proptest! {
        /// No operation sequence moves the sale backwards, and every
        /// accepted completion had the gate cleared at call time.
        #[test]
        fn op_sequences_keep_the_sale_moving_forward(
            ops in proptest::collection::vec(sale_op_strategy(), 1..24)
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let service = Arc::new(MemoryContractService::new());
                let drafts = Arc::new(MemoryDraftStore::new());
                // A poller interval beyond the test keeps polling out of
                // the sequencing; Refresh covers status observation.
                let orchestrator = make_orchestrator_on(
                    service.clone(),
                    drafts,
                    test_config(3_600_000),
                );
                orchestrator.open(LeadId::new("lead-1")).await.unwrap();

                for op in &ops {
                    let before = orchestrator.snapshot().await;
                    match op {
                        SaleOp::UpdateName(name) => {
                            let mut customer = before
                                .phase
                                .draft()
                                .map(|d| d.fields.customer.clone())
                                .unwrap_or_default();
                            customer.name = name.clone();
                            let _ = orchestrator.update_customer(customer).await;
                        }
                        SaleOp::ToReview => {
                            let _ = orchestrator.to_review().await;
                        }
                        SaleOp::BackToEdit => {
                            let _ = orchestrator.back_to_edit().await;
                        }
                        SaleOp::Create => {
                            let _ = orchestrator.create_contract().await;
                        }
                        SaleOp::Send => {
                            let _ = orchestrator.send_contract("dana@example.com").await;
                        }
                        SaleOp::Capture => {
                            let _ = orchestrator.capture_signature().await;
                        }
                        SaleOp::MarkPaid => {
                            if let Some(contract) = before.contract() {
                                service
                                    .mark_payment(&contract.id, PaymentStatus::Paid)
                                    .await;
                            }
                        }
                        SaleOp::MarkSigned => {
                            if let Some(contract) = before.contract() {
                                service.mark_signed(&contract.id).await;
                            }
                        }
                        SaleOp::Refresh => {
                            let _ = orchestrator.refresh().await;
                        }
                        SaleOp::Complete => {
                            if orchestrator.complete().await.is_ok() {
                                let contract = before.contract().cloned();
                                prop_assert!(contract.is_some());
                                prop_assert!(CompletionGate::cleared(
                                    &contract.unwrap(),
                                    before.local_signature_captured(),
                                ));
                            }
                        }
                    }

                    let after = orchestrator.snapshot().await;
                    prop_assert!(phase_rank(&after) >= phase_rank(&before));
                }
                Ok(())
            })?;
        }
    }
}
