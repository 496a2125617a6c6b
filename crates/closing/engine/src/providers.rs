//! Host-side data sources
//!
//! The studio app already knows the customer, the chosen package, and the
//! open invoice before the closing workflow opens. These seams let the
//! host hand that data over for draft prefill without the engine knowing
//! where it lives. `StaticDirectory` and `FixedSignaturePad` are the
//! fixture implementations tests and the demo run on.

use async_trait::async_trait;
use closing_types::{
    ClosingResult, CustomerFields, DraftFields, LeadId, OrderFields, PaymentFields,
    SignatureImage, StudioFields,
};
use std::collections::HashMap;
use std::sync::Arc;

// ── Source Seams ─────────────────────────────────────────────────────

/// Where customer profiles come from.
#[async_trait]
pub trait LeadDirectory: Send + Sync {
    async fn profile(&self, lead_id: &LeadId) -> ClosingResult<CustomerFields>;
}

/// Where the lead's chosen package comes from.
#[async_trait]
pub trait PackageCatalog: Send + Sync {
    async fn selected_package(&self, lead_id: &LeadId) -> ClosingResult<OrderFields>;
}

/// Where the lead's open invoice comes from.
#[async_trait]
pub trait InvoiceBook: Send + Sync {
    async fn open_invoice(&self, lead_id: &LeadId) -> ClosingResult<PaymentFields>;
}

/// The in-studio signature pad.
#[async_trait]
pub trait SignaturePad: Send + Sync {
    async fn capture(&self) -> ClosingResult<SignatureImage>;
}

// ── Draft Prefill ────────────────────────────────────────────────────

/// Bundles the sources a fresh draft is filled from.
#[derive(Clone)]
pub struct DraftSources {
    pub leads: Arc<dyn LeadDirectory>,
    pub packages: Arc<dyn PackageCatalog>,
    pub invoices: Arc<dyn InvoiceBook>,
    /// The studio's own details, fixed per installation
    pub studio: StudioFields,
}

impl DraftSources {
    pub fn new(
        leads: Arc<dyn LeadDirectory>,
        packages: Arc<dyn PackageCatalog>,
        invoices: Arc<dyn InvoiceBook>,
        studio: StudioFields,
    ) -> Self {
        Self {
            leads,
            packages,
            invoices,
            studio,
        }
    }

    /// Assemble the starting fields for a fresh draft.
    pub async fn prefill(&self, lead_id: &LeadId) -> ClosingResult<DraftFields> {
        Ok(DraftFields {
            customer: self.leads.profile(lead_id).await?,
            studio: self.studio.clone(),
            order: self.packages.selected_package(lead_id).await?,
            payment: self.invoices.open_invoice(lead_id).await?,
        })
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────

/// Fixed lookup tables implementing all three source seams.
///
/// A lead missing from a table prefills empty fields rather than failing;
/// the operator fills the gaps by hand.
#[derive(Default)]
pub struct StaticDirectory {
    profiles: HashMap<LeadId, CustomerFields>,
    packages: HashMap<LeadId, OrderFields>,
    invoices: HashMap<LeadId, PaymentFields>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, lead_id: LeadId, profile: CustomerFields) -> Self {
        self.profiles.insert(lead_id, profile);
        self
    }

    pub fn with_package(mut self, lead_id: LeadId, order: OrderFields) -> Self {
        self.packages.insert(lead_id, order);
        self
    }

    pub fn with_invoice(mut self, lead_id: LeadId, payment: PaymentFields) -> Self {
        self.invoices.insert(lead_id, payment);
        self
    }
}

#[async_trait]
impl LeadDirectory for StaticDirectory {
    async fn profile(&self, lead_id: &LeadId) -> ClosingResult<CustomerFields> {
        Ok(self.profiles.get(lead_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl PackageCatalog for StaticDirectory {
    async fn selected_package(&self, lead_id: &LeadId) -> ClosingResult<OrderFields> {
        Ok(self.packages.get(lead_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl InvoiceBook for StaticDirectory {
    async fn open_invoice(&self, lead_id: &LeadId) -> ClosingResult<PaymentFields> {
        Ok(self.invoices.get(lead_id).cloned().unwrap_or_default())
    }
}

/// Signature pad answering every capture with the same image.
pub struct FixedSignaturePad {
    image: SignatureImage,
}

impl FixedSignaturePad {
    pub fn new(image: SignatureImage) -> Self {
        Self { image }
    }
}

impl Default for FixedSignaturePad {
    fn default() -> Self {
        // PNG magic bytes stand in for a real capture
        Self::new(SignatureImage::new(vec![
            0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a,
        ]))
    }
}

#[async_trait]
impl SignaturePad for FixedSignaturePad {
    async fn capture(&self) -> ClosingResult<SignatureImage> {
        Ok(self.image.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_sources() -> DraftSources {
        let mut profile = CustomerFields::default();
        profile.name = "Dana Reyes".to_string();
        profile.email = Some("dana@example.com".to_string());

        let mut order = OrderFields::default();
        order.package_name = "Gold Wedding".to_string();

        let mut payment = PaymentFields::default();
        payment.total_cents = 250_000;

        let directory = Arc::new(
            StaticDirectory::new()
                .with_profile(LeadId::new("lead-1"), profile)
                .with_package(LeadId::new("lead-1"), order)
                .with_invoice(LeadId::new("lead-1"), payment),
        );

        let mut studio = StudioFields::default();
        studio.name = "Northlight Studio".to_string();

        DraftSources::new(directory.clone(), directory.clone(), directory, studio)
    }

    #[tokio::test]
    async fn prefill_merges_every_source() {
        let sources = make_sources();
        let fields = sources.prefill(&LeadId::new("lead-1")).await.unwrap();

        assert_eq!(fields.customer.name, "Dana Reyes");
        assert_eq!(fields.order.package_name, "Gold Wedding");
        assert_eq!(fields.payment.total_cents, 250_000);
        assert_eq!(fields.studio.name, "Northlight Studio");
    }

    #[tokio::test]
    async fn unknown_lead_prefills_empty_fields() {
        let sources = make_sources();
        let fields = sources.prefill(&LeadId::new("lead-unknown")).await.unwrap();

        assert!(fields.customer.name.is_empty());
        assert!(fields.order.package_name.is_empty());
        assert_eq!(fields.payment.total_cents, 0);
        // Studio details are installation-wide, not per lead
        assert_eq!(fields.studio.name, "Northlight Studio");
    }

    #[tokio::test]
    async fn fixed_pad_answers_with_its_image() {
        let pad = FixedSignaturePad::default();
        let image = pad.capture().await.unwrap();
        assert!(!image.is_empty());
    }
}
