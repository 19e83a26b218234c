use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use payline_core::{Aggregate, AggregateId, AggregateRoot, DomainError, MinorUnits};
use payline_events::Event;
use payline_recipients::RecipientId;

/// Invoice identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub AggregateId);

impl InvoiceId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Invoice status lifecycle: pending is initial, completed/failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Completed,
    Failed,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Completed => "completed",
            InvoiceStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Completed | InvoiceStatus::Failed)
    }
}

/// Aggregate root: Invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    id: InvoiceId,
    recipient_id: Option<RecipientId>,
    amount: MinorUnits,
    status: InvoiceStatus,
    created_at: Option<DateTime<Utc>>,
    due_date: Option<DateTime<Utc>>,
    method_hint: Option<String>,
    description: Option<String>,
    version: u64,
    created: bool,
}

impl Invoice {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: InvoiceId) -> Self {
        Self {
            id,
            recipient_id: None,
            amount: MinorUnits::ZERO,
            status: InvoiceStatus::Pending,
            created_at: None,
            due_date: None,
            method_hint: None,
            description: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn recipient_id(&self) -> Option<RecipientId> {
        self.recipient_id
    }

    pub fn amount(&self) -> MinorUnits {
        self.amount
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }

    pub fn method_hint(&self) -> Option<&str> {
        self.method_hint.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn exists(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInvoice {
    pub invoice_id: InvoiceId,
    pub recipient_id: RecipientId,
    pub amount: MinorUnits,
    pub due_date: Option<DateTime<Utc>>,
    pub method_hint: Option<String>,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CompleteInvoice (pending -> completed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteInvoice {
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: FailInvoice (pending -> failed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailInvoice {
    pub invoice_id: InvoiceId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceCommand {
    CreateInvoice(CreateInvoice),
    CompleteInvoice(CompleteInvoice),
    FailInvoice(FailInvoice),
}

/// Event: InvoiceCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCreated {
    pub invoice_id: InvoiceId,
    pub recipient_id: RecipientId,
    pub amount: MinorUnits,
    pub due_date: Option<DateTime<Utc>>,
    pub method_hint: Option<String>,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceCompleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCompleted {
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceFailed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceFailed {
    pub invoice_id: InvoiceId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceEvent {
    InvoiceCreated(InvoiceCreated),
    InvoiceCompleted(InvoiceCompleted),
    InvoiceFailed(InvoiceFailed),
}

impl Event for InvoiceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InvoiceEvent::InvoiceCreated(_) => "invoicing.invoice.created",
            InvoiceEvent::InvoiceCompleted(_) => "invoicing.invoice.completed",
            InvoiceEvent::InvoiceFailed(_) => "invoicing.invoice.failed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InvoiceEvent::InvoiceCreated(e) => e.occurred_at,
            InvoiceEvent::InvoiceCompleted(e) => e.occurred_at,
            InvoiceEvent::InvoiceFailed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Invoice {
    type Command = InvoiceCommand;
    type Event = InvoiceEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InvoiceEvent::InvoiceCreated(e) => {
                self.id = e.invoice_id;
                self.recipient_id = Some(e.recipient_id);
                self.amount = e.amount;
                self.status = InvoiceStatus::Pending;
                self.created_at = Some(e.occurred_at);
                self.due_date = e.due_date;
                self.method_hint = e.method_hint.clone();
                self.description = e.description.clone();
                self.created = true;
            }
            InvoiceEvent::InvoiceCompleted(_) => {
                self.status = InvoiceStatus::Completed;
            }
            InvoiceEvent::InvoiceFailed(_) => {
                self.status = InvoiceStatus::Failed;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InvoiceCommand::CreateInvoice(cmd) => self.handle_create(cmd),
            InvoiceCommand::CompleteInvoice(cmd) => self.handle_complete(cmd),
            InvoiceCommand::FailInvoice(cmd) => self.handle_fail(cmd),
        }
    }
}

impl Invoice {
    fn ensure_invoice_id(&self, invoice_id: InvoiceId) -> Result<(), DomainError> {
        if self.id != invoice_id {
            return Err(DomainError::validation("invoice_id mismatch"));
        }
        Ok(())
    }

    fn ensure_transition(&self, to: InvoiceStatus) -> Result<(), DomainError> {
        if self.status != InvoiceStatus::Pending {
            return Err(DomainError::invalid_transition(
                self.status.as_str(),
                to.as_str(),
            ));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        if self.created {
            return Err(DomainError::DuplicateId);
        }
        if !cmd.amount.is_positive() {
            return Err(DomainError::InvalidAmount);
        }

        Ok(vec![InvoiceEvent::InvoiceCreated(InvoiceCreated {
            invoice_id: cmd.invoice_id,
            recipient_id: cmd.recipient_id,
            amount: cmd.amount,
            due_date: cmd.due_date,
            method_hint: cmd.method_hint.clone(),
            description: cmd.description.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_complete(&self, cmd: &CompleteInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::NotFound);
        }
        self.ensure_invoice_id(cmd.invoice_id)?;
        self.ensure_transition(InvoiceStatus::Completed)?;

        Ok(vec![InvoiceEvent::InvoiceCompleted(InvoiceCompleted {
            invoice_id: cmd.invoice_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_fail(&self, cmd: &FailInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::NotFound);
        }
        self.ensure_invoice_id(cmd.invoice_id)?;
        self.ensure_transition(InvoiceStatus::Failed)?;

        Ok(vec![InvoiceEvent::InvoiceFailed(InvoiceFailed {
            invoice_id: cmd.invoice_id,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payline_core::AggregateId;

    fn test_invoice_id() -> InvoiceId {
        InvoiceId::new(AggregateId::new())
    }

    fn test_recipient_id() -> RecipientId {
        RecipientId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn pending_invoice(id: InvoiceId, amount: i64) -> Invoice {
        let mut invoice = Invoice::empty(id);
        let cmd = CreateInvoice {
            invoice_id: id,
            recipient_id: test_recipient_id(),
            amount: MinorUnits::new(amount),
            due_date: None,
            method_hint: None,
            description: Some("June services".to_string()),
            occurred_at: test_time(),
        };
        let events = invoice.handle(&InvoiceCommand::CreateInvoice(cmd)).unwrap();
        invoice.apply(&events[0]);
        invoice
    }

    #[test]
    fn create_invoice_starts_pending_and_never_touches_wallets() {
        let id = test_invoice_id();
        let invoice = pending_invoice(id, 8_000);

        assert_eq!(invoice.status(), InvoiceStatus::Pending);
        assert_eq!(invoice.amount(), MinorUnits::new(8_000));
        assert!(invoice.exists());
    }

    #[test]
    fn create_rejects_non_positive_amount() {
        let id = test_invoice_id();
        let invoice = Invoice::empty(id);
        let cmd = CreateInvoice {
            invoice_id: id,
            recipient_id: test_recipient_id(),
            amount: MinorUnits::ZERO,
            due_date: None,
            method_hint: None,
            description: None,
            occurred_at: test_time(),
        };
        let err = invoice.handle(&InvoiceCommand::CreateInvoice(cmd)).unwrap_err();
        assert_eq!(err, DomainError::InvalidAmount);
    }

    #[test]
    fn pending_completes_and_terminal_states_are_final() {
        let id = test_invoice_id();
        let mut invoice = pending_invoice(id, 1_000);

        let events = invoice
            .handle(&InvoiceCommand::CompleteInvoice(CompleteInvoice {
                invoice_id: id,
                occurred_at: test_time(),
            }))
            .unwrap();
        invoice.apply(&events[0]);
        assert_eq!(invoice.status(), InvoiceStatus::Completed);

        // A second completion is illegal: completed is terminal.
        let err = invoice
            .handle(&InvoiceCommand::CompleteInvoice(CompleteInvoice {
                invoice_id: id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: "completed",
                to: "completed"
            }
        );

        let err = invoice
            .handle(&InvoiceCommand::FailInvoice(FailInvoice {
                invoice_id: id,
                reason: None,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: "completed",
                to: "failed"
            }
        );
    }

    #[test]
    fn pending_fails_with_reason() {
        let id = test_invoice_id();
        let mut invoice = pending_invoice(id, 1_000);

        let events = invoice
            .handle(&InvoiceCommand::FailInvoice(FailInvoice {
                invoice_id: id,
                reason: Some("chargeback".to_string()),
                occurred_at: test_time(),
            }))
            .unwrap();
        match &events[0] {
            InvoiceEvent::InvoiceFailed(e) => {
                assert_eq!(e.reason.as_deref(), Some("chargeback"));
            }
            other => panic!("expected InvoiceFailed, got {other:?}"),
        }
        invoice.apply(&events[0]);
        assert_eq!(invoice.status(), InvoiceStatus::Failed);
        assert!(invoice.status().is_terminal());
    }

    #[test]
    fn transition_on_missing_invoice_is_not_found() {
        let id = test_invoice_id();
        let invoice = Invoice::empty(id);
        let err = invoice
            .handle(&InvoiceCommand::CompleteInvoice(CompleteInvoice {
                invoice_id: id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let id = test_invoice_id();
        let invoice = pending_invoice(id, 1_000);
        let version_before = invoice.version();

        let cmd = InvoiceCommand::CompleteInvoice(CompleteInvoice {
            invoice_id: id,
            occurred_at: test_time(),
        });
        let events1 = invoice.handle(&cmd).unwrap();
        let events2 = invoice.handle(&cmd).unwrap();

        assert_eq!(invoice.version(), version_before);
        assert_eq!(invoice.status(), InvoiceStatus::Pending);
        assert_eq!(events1, events2);
    }
}
