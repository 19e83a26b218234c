use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use payline_core::{Aggregate, AggregateId, AggregateRoot, DomainError, MinorUnits};
use payline_events::Event;
use payline_recipients::RecipientId;

/// Payout identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayoutId(pub AggregateId);

impl PayoutId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PayoutId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Payout status lifecycle: processing is initial, completed/failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    Processing,
    Completed,
    Failed,
}

impl PayoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutStatus::Processing => "processing",
            PayoutStatus::Completed => "completed",
            PayoutStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PayoutStatus::Completed | PayoutStatus::Failed)
    }
}

/// Requested processing priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutPriority {
    Standard,
    Expedited,
}

/// Aggregate root: Payout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    id: PayoutId,
    recipient_id: Option<RecipientId>,
    amount: MinorUnits,
    method: String,
    priority: PayoutPriority,
    status: PayoutStatus,
    created_at: Option<DateTime<Utc>>,
    scheduled_date: Option<DateTime<Utc>>,
    description: Option<String>,
    version: u64,
    created: bool,
}

impl Payout {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PayoutId) -> Self {
        Self {
            id,
            recipient_id: None,
            amount: MinorUnits::ZERO,
            method: String::new(),
            priority: PayoutPriority::Standard,
            status: PayoutStatus::Processing,
            created_at: None,
            scheduled_date: None,
            description: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PayoutId {
        self.id
    }

    pub fn recipient_id(&self) -> Option<RecipientId> {
        self.recipient_id
    }

    pub fn amount(&self) -> MinorUnits {
        self.amount
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn priority(&self) -> PayoutPriority {
        self.priority
    }

    pub fn status(&self) -> PayoutStatus {
        self.status
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn scheduled_date(&self) -> Option<DateTime<Utc>> {
        self.scheduled_date
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn exists(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Payout {
    type Id = PayoutId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RequestPayout.
///
/// Issued by the payout manager only after registry and wallet validation
/// passed and the wallet debit was earmarked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPayout {
    pub payout_id: PayoutId,
    pub recipient_id: RecipientId,
    pub amount: MinorUnits,
    pub method: String,
    pub priority: PayoutPriority,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CompletePayout (processing -> completed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletePayout {
    pub payout_id: PayoutId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: FailPayout (processing -> failed; the manager refunds the wallet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailPayout {
    pub payout_id: PayoutId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelPayout.
///
/// Only a future-dated scheduled payout can be cancelled, and only before its
/// scheduled date; cancellation behaves exactly like a failure (refund applies).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelPayout {
    pub payout_id: PayoutId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutCommand {
    RequestPayout(RequestPayout),
    CompletePayout(CompletePayout),
    FailPayout(FailPayout),
    CancelPayout(CancelPayout),
}

/// Event: PayoutRequested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRequested {
    pub payout_id: PayoutId,
    pub recipient_id: RecipientId,
    pub amount: MinorUnits,
    pub method: String,
    pub priority: PayoutPriority,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PayoutCompleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutCompleted {
    pub payout_id: PayoutId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PayoutFailed (also emitted for cancellations).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutFailed {
    pub payout_id: PayoutId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutEvent {
    PayoutRequested(PayoutRequested),
    PayoutCompleted(PayoutCompleted),
    PayoutFailed(PayoutFailed),
}

impl Event for PayoutEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PayoutEvent::PayoutRequested(_) => "payouts.payout.requested",
            PayoutEvent::PayoutCompleted(_) => "payouts.payout.completed",
            PayoutEvent::PayoutFailed(_) => "payouts.payout.failed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PayoutEvent::PayoutRequested(e) => e.occurred_at,
            PayoutEvent::PayoutCompleted(e) => e.occurred_at,
            PayoutEvent::PayoutFailed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Payout {
    type Command = PayoutCommand;
    type Event = PayoutEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PayoutEvent::PayoutRequested(e) => {
                self.id = e.payout_id;
                self.recipient_id = Some(e.recipient_id);
                self.amount = e.amount;
                self.method = e.method.clone();
                self.priority = e.priority;
                self.status = PayoutStatus::Processing;
                self.created_at = Some(e.occurred_at);
                self.scheduled_date = e.scheduled_date;
                self.description = e.description.clone();
                self.created = true;
            }
            PayoutEvent::PayoutCompleted(_) => {
                self.status = PayoutStatus::Completed;
            }
            PayoutEvent::PayoutFailed(_) => {
                self.status = PayoutStatus::Failed;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PayoutCommand::RequestPayout(cmd) => self.handle_request(cmd),
            PayoutCommand::CompletePayout(cmd) => self.handle_complete(cmd),
            PayoutCommand::FailPayout(cmd) => self.handle_fail(cmd),
            PayoutCommand::CancelPayout(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl Payout {
    fn ensure_payout_id(&self, payout_id: PayoutId) -> Result<(), DomainError> {
        if self.id != payout_id {
            return Err(DomainError::validation("payout_id mismatch"));
        }
        Ok(())
    }

    fn ensure_transition(&self, to: PayoutStatus) -> Result<(), DomainError> {
        if self.status != PayoutStatus::Processing {
            return Err(DomainError::invalid_transition(
                self.status.as_str(),
                to.as_str(),
            ));
        }
        Ok(())
    }

    fn handle_request(&self, cmd: &RequestPayout) -> Result<Vec<PayoutEvent>, DomainError> {
        if self.created {
            return Err(DomainError::DuplicateId);
        }
        if !cmd.amount.is_positive() {
            return Err(DomainError::InvalidAmount);
        }
        if cmd.method.trim().is_empty() {
            return Err(DomainError::UnknownMethod);
        }

        Ok(vec![PayoutEvent::PayoutRequested(PayoutRequested {
            payout_id: cmd.payout_id,
            recipient_id: cmd.recipient_id,
            amount: cmd.amount,
            method: cmd.method.clone(),
            priority: cmd.priority,
            scheduled_date: cmd.scheduled_date,
            description: cmd.description.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_complete(&self, cmd: &CompletePayout) -> Result<Vec<PayoutEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::NotFound);
        }
        self.ensure_payout_id(cmd.payout_id)?;
        self.ensure_transition(PayoutStatus::Completed)?;

        Ok(vec![PayoutEvent::PayoutCompleted(PayoutCompleted {
            payout_id: cmd.payout_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_fail(&self, cmd: &FailPayout) -> Result<Vec<PayoutEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::NotFound);
        }
        self.ensure_payout_id(cmd.payout_id)?;
        self.ensure_transition(PayoutStatus::Failed)?;

        Ok(vec![PayoutEvent::PayoutFailed(PayoutFailed {
            payout_id: cmd.payout_id,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelPayout) -> Result<Vec<PayoutEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::NotFound);
        }
        self.ensure_payout_id(cmd.payout_id)?;
        self.ensure_transition(PayoutStatus::Failed)?;

        let scheduled = self
            .scheduled_date
            .ok_or_else(|| DomainError::validation("only scheduled payouts can be cancelled"))?;
        if cmd.occurred_at >= scheduled {
            return Err(DomainError::validation(
                "payout can no longer be cancelled: scheduled date has passed",
            ));
        }

        Ok(vec![PayoutEvent::PayoutFailed(PayoutFailed {
            payout_id: cmd.payout_id,
            reason: Some("cancelled before scheduled date".to_string()),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use payline_core::AggregateId;

    fn test_payout_id() -> PayoutId {
        PayoutId::new(AggregateId::new())
    }

    fn test_recipient_id() -> RecipientId {
        RecipientId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn processing_payout(id: PayoutId, scheduled_date: Option<DateTime<Utc>>) -> Payout {
        let mut payout = Payout::empty(id);
        let cmd = RequestPayout {
            payout_id: id,
            recipient_id: test_recipient_id(),
            amount: MinorUnits::new(5_000),
            method: "ach".to_string(),
            priority: PayoutPriority::Standard,
            scheduled_date,
            description: None,
            occurred_at: test_time(),
        };
        let events = payout.handle(&PayoutCommand::RequestPayout(cmd)).unwrap();
        payout.apply(&events[0]);
        payout
    }

    #[test]
    fn request_starts_processing() {
        let id = test_payout_id();
        let payout = processing_payout(id, None);

        assert_eq!(payout.status(), PayoutStatus::Processing);
        assert_eq!(payout.amount(), MinorUnits::new(5_000));
        assert_eq!(payout.method(), "ach");
        assert!(payout.exists());
    }

    #[test]
    fn request_rejects_non_positive_amount() {
        let id = test_payout_id();
        let payout = Payout::empty(id);
        let cmd = RequestPayout {
            payout_id: id,
            recipient_id: test_recipient_id(),
            amount: MinorUnits::new(-1),
            method: "ach".to_string(),
            priority: PayoutPriority::Standard,
            scheduled_date: None,
            description: None,
            occurred_at: test_time(),
        };
        let err = payout.handle(&PayoutCommand::RequestPayout(cmd)).unwrap_err();
        assert_eq!(err, DomainError::InvalidAmount);
    }

    #[test]
    fn processing_completes_and_terminal_is_final() {
        let id = test_payout_id();
        let mut payout = processing_payout(id, None);

        let events = payout
            .handle(&PayoutCommand::CompletePayout(CompletePayout {
                payout_id: id,
                occurred_at: test_time(),
            }))
            .unwrap();
        payout.apply(&events[0]);
        assert_eq!(payout.status(), PayoutStatus::Completed);

        // Idempotence check: an immediate identical transition must fail.
        let err = payout
            .handle(&PayoutCommand::CompletePayout(CompletePayout {
                payout_id: id,
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
    }

    #[test]
    fn failed_payout_cannot_fail_again() {
        let id = test_payout_id();
        let mut payout = processing_payout(id, None);

        let fail = PayoutCommand::FailPayout(FailPayout {
            payout_id: id,
            reason: Some("provider rejected".to_string()),
            occurred_at: test_time(),
        });
        let events = payout.handle(&fail).unwrap();
        payout.apply(&events[0]);
        assert_eq!(payout.status(), PayoutStatus::Failed);

        let err = payout.handle(&fail).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: "failed",
                to: "failed"
            }
        );
    }

    #[test]
    fn cancel_before_scheduled_date_fails_the_payout() {
        let id = test_payout_id();
        let scheduled = test_time() + Duration::days(3);
        let mut payout = processing_payout(id, Some(scheduled));

        let events = payout
            .handle(&PayoutCommand::CancelPayout(CancelPayout {
                payout_id: id,
                occurred_at: test_time(),
            }))
            .unwrap();
        match &events[0] {
            PayoutEvent::PayoutFailed(e) => {
                assert_eq!(e.reason.as_deref(), Some("cancelled before scheduled date"));
            }
            other => panic!("expected PayoutFailed, got {other:?}"),
        }
        payout.apply(&events[0]);
        assert_eq!(payout.status(), PayoutStatus::Failed);
    }

    #[test]
    fn cancel_rejects_unscheduled_payout() {
        let id = test_payout_id();
        let payout = processing_payout(id, None);

        let err = payout
            .handle(&PayoutCommand::CancelPayout(CancelPayout {
                payout_id: id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn cancel_rejects_past_scheduled_date() {
        let id = test_payout_id();
        let scheduled = test_time() - Duration::days(1);
        let payout = processing_payout(id, Some(scheduled));

        let err = payout
            .handle(&PayoutCommand::CancelPayout(CancelPayout {
                payout_id: id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn cancel_rejects_completed_payout() {
        let id = test_payout_id();
        let scheduled = test_time() + Duration::days(3);
        let mut payout = processing_payout(id, Some(scheduled));

        let events = payout
            .handle(&PayoutCommand::CompletePayout(CompletePayout {
                payout_id: id,
                occurred_at: test_time(),
            }))
            .unwrap();
        payout.apply(&events[0]);

        let err = payout
            .handle(&PayoutCommand::CancelPayout(CancelPayout {
                payout_id: id,
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
}
