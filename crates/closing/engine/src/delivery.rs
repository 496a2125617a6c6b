//! Final delivery dispatch
//!
//! The service sends the delivery email automatically once a contract is
//! signed and paid; this dispatcher covers the manual path. An operator
//! can re-dispatch while the delivery is pending or failed. Once a
//! delivery has gone out successfully there is nothing left to resend.

use crate::view::SaleView;
use chrono::Utc;
use closing_client::{ContractService, DeliveryReceipt};
use closing_types::{ClosingError, ClosingResult, DeliveryState, SaleEvent};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

pub struct DeliveryDispatcher {
    service: Arc<dyn ContractService>,
    view: Arc<RwLock<SaleView>>,
    events: broadcast::Sender<SaleEvent>,
}

impl DeliveryDispatcher {
    pub fn new(
        service: Arc<dyn ContractService>,
        view: Arc<RwLock<SaleView>>,
        events: broadcast::Sender<SaleEvent>,
    ) -> Self {
        Self {
            service,
            view,
            events,
        }
    }

    /// Delivery standing of the current contract
    pub async fn state(&self) -> DeliveryState {
        self.view.read().await.delivery_state()
    }

    /// Dispatch the delivery email by hand.
    ///
    /// On success the view's delivery record is overwritten with the fresh
    /// outcome. On failure the previous outcome stays and only the error
    /// annotation changes, so a delivered email is never marked undone by
    /// a failed retry.
    pub async fn resend(&self, to: &str) -> ClosingResult<DeliveryReceipt> {
        if to.trim().is_empty() {
            return Err(ClosingError::Validation(
                "delivery needs a destination address".to_string(),
            ));
        }

        let (contract_id, current) = {
            let view = self.view.read().await;
            let Some(contract) = view.contract() else {
                return Err(ClosingError::InvalidPhase {
                    action: "resend_delivery".to_string(),
                    phase: view.phase.name().to_string(),
                });
            };
            (contract.id.clone(), contract.delivery_email.state())
        };

        if current == DeliveryState::Sent {
            return Err(ClosingError::InvalidPhase {
                action: "resend_delivery".to_string(),
                phase: "delivered".to_string(),
            });
        }

        match self.service.resend_delivery(&contract_id, to).await {
            Ok(receipt) => {
                {
                    let mut view = self.view.write().await;
                    if let Some(contract) = view.phase.contract_mut() {
                        contract.delivery_email.sent = Some(true);
                        contract.delivery_email.sent_at = Some(Utc::now());
                        contract.delivery_email.to = Some(receipt.sent_to.clone());
                        contract.delivery_email.error = None;
                        contract.delivery_email.attachment_count = receipt.attachments;
                    }
                }

                tracing::info!(
                    contract_id = %contract_id,
                    to = %receipt.sent_to,
                    attachments = receipt.attachments,
                    "Delivery dispatched"
                );
                let _ = self.events.send(SaleEvent::DeliveryResolved {
                    contract_id,
                    delivered: true,
                });
                Ok(receipt)
            }
            Err(e) => {
                {
                    let mut view = self.view.write().await;
                    if let Some(contract) = view.phase.contract_mut() {
                        contract.delivery_email.error = Some(e.to_string());
                    }
                }

                tracing::warn!(contract_id = %contract_id, error = %e, "Delivery dispatch failed");
                Err(e.into())
            }
        }
    }
}
