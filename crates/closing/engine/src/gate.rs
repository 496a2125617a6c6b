//! Completion gate: the pure predicate deciding when a sale may complete
//!
//! A contract clears the gate when payment has cleared and a signature
//! exists, either observed remotely or captured on the in-studio pad.
//! The gate never talks to the network; the service re-validates on its
//! side regardless.

use closing_types::{Contract, PaymentStatus, SignatureStatus};

/// Why a contract cannot complete yet
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompletionBlocker {
    /// Payment has not cleared
    PaymentOutstanding(PaymentStatus),
    /// No signature, remote or local
    SignatureMissing(SignatureStatus),
}

impl std::fmt::Display for CompletionBlocker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PaymentOutstanding(status) => {
                write!(f, "payment is {}", payment_label(*status))
            }
            Self::SignatureMissing(status) => {
                write!(f, "signature is {}", signature_label(*status))
            }
        }
    }
}

fn payment_label(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pending => "pending",
        PaymentStatus::Paid => "paid",
        PaymentStatus::Partial => "partial",
        PaymentStatus::Refunded => "refunded",
    }
}

fn signature_label(status: SignatureStatus) -> &'static str {
    match status {
        SignatureStatus::Pending => "pending",
        SignatureStatus::Sent => "awaiting the customer",
        SignatureStatus::Signed => "signed",
        SignatureStatus::Declined => "declined",
    }
}

/// Evaluates the completion precondition
pub struct CompletionGate;

impl CompletionGate {
    /// The gate itself: paid, and signed remotely or locally
    pub fn cleared(contract: &Contract, local_signature: bool) -> bool {
        contract.payment_status == PaymentStatus::Paid
            && (contract.signature_status == SignatureStatus::Signed || local_signature)
    }

    /// Everything still blocking completion, in display order
    pub fn blockers(contract: &Contract, local_signature: bool) -> Vec<CompletionBlocker> {
        let mut blockers = Vec::new();
        if contract.payment_status != PaymentStatus::Paid {
            blockers.push(CompletionBlocker::PaymentOutstanding(contract.payment_status));
        }
        if contract.signature_status != SignatureStatus::Signed && !local_signature {
            blockers.push(CompletionBlocker::SignatureMissing(contract.signature_status));
        }
        blockers
    }

    /// A user-facing refusal reason, `None` when the gate is clear
    pub fn refusal_reason(contract: &Contract, local_signature: bool) -> Option<String> {
        let blockers = Self::blockers(contract, local_signature);
        if blockers.is_empty() {
            None
        } else {
            let parts: Vec<String> = blockers.iter().map(|b| b.to_string()).collect();
            Some(parts.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use closing_types::{ContractId, LeadId};

    fn make_contract() -> Contract {
        Contract::new(
            ContractId::new("c-1"),
            LeadId::new("lead-1"),
            "https://sign.example.com/c-1",
        )
    }

    #[test]
    fn gate_requires_payment_and_signature() {
        let mut contract = make_contract();
        assert!(!CompletionGate::cleared(&contract, false));

        contract.payment_status = PaymentStatus::Paid;
        assert!(!CompletionGate::cleared(&contract, false));

        contract.signature_status = SignatureStatus::Signed;
        assert!(CompletionGate::cleared(&contract, false));
    }

    #[test]
    fn local_signature_substitutes_for_remote() {
        let mut contract = make_contract();
        contract.payment_status = PaymentStatus::Paid;

        assert!(!CompletionGate::cleared(&contract, false));
        assert!(CompletionGate::cleared(&contract, true));
    }

    #[test]
    fn adding_information_never_closes_an_open_gate() {
        let mut contract = make_contract();
        contract.payment_status = PaymentStatus::Paid;
        contract.signature_status = SignatureStatus::Signed;
        assert!(CompletionGate::cleared(&contract, false));

        // A local capture on top of a remote signature changes nothing
        assert!(CompletionGate::cleared(&contract, true));

        contract.signed_at = Some(chrono::Utc::now());
        assert!(CompletionGate::cleared(&contract, true));
    }

    #[test]
    fn payment_regression_closes_the_gate() {
        let mut contract = make_contract();
        contract.payment_status = PaymentStatus::Paid;
        contract.signature_status = SignatureStatus::Signed;
        assert!(CompletionGate::cleared(&contract, false));

        contract.payment_status = PaymentStatus::Refunded;
        assert!(!CompletionGate::cleared(&contract, false));
    }

    #[test]
    fn blockers_name_every_missing_piece() {
        let contract = make_contract();
        let blockers = CompletionGate::blockers(&contract, false);
        assert_eq!(blockers.len(), 2);
        assert!(blockers.contains(&CompletionBlocker::PaymentOutstanding(
            PaymentStatus::Pending
        )));
        assert!(blockers.contains(&CompletionBlocker::SignatureMissing(
            SignatureStatus::Pending
        )));

        let reason = CompletionGate::refusal_reason(&contract, false).unwrap();
        assert!(reason.contains("payment is pending"));
        assert!(reason.contains("signature is pending"));
    }

    #[test]
    fn partial_payment_still_blocks() {
        let mut contract = make_contract();
        contract.payment_status = PaymentStatus::Partial;
        contract.signature_status = SignatureStatus::Signed;
        assert!(!CompletionGate::cleared(&contract, false));
        assert_eq!(
            CompletionGate::blockers(&contract, false),
            vec![CompletionBlocker::PaymentOutstanding(PaymentStatus::Partial)]
        );
    }
}
