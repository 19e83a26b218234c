//! The payout engine facade.
//!
//! Composes the dispatcher, the method registry, and the read-model
//! projections into the service surface the transport layer consumes:
//! recipients, invoices, payouts, balances, and transaction history.
//!
//! Concurrency model: every operation that touches a wallet (payout creation,
//! payout failure/cancellation refunds, funding credits) runs under that
//! recipient's lock, so balance arithmetic is serialized per recipient. The
//! event store's optimistic concurrency check backs this up at the stream
//! level. Cross-recipient reads take no wallet locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use payline_core::{AggregateId, DomainError, MinorUnits};
use payline_events::{EventBus, EventEnvelope, InMemoryEventBus, Subscription};
use payline_history::{HistoryFilter, HistoryView, TransactionKind, TransactionRecord};
use payline_invoicing::{
    CompleteInvoice, CreateInvoice, FailInvoice, Invoice, InvoiceCommand, InvoiceId,
    InvoiceStatus,
};
use payline_methods::{MethodRegistry, PayoutMethodSpec};
use payline_payouts::{
    CancelPayout, CompletePayout, FailPayout, Payout, PayoutCommand, PayoutId, PayoutPriority,
    PayoutStatus, RequestPayout,
};
use payline_recipients::{
    ComplianceProfile, ContactInfo, CreditWallet, DebitWallet, Recipient, RecipientCommand,
    RecipientId, RecipientStatus, RefundWallet, RegisterRecipient, SetRecipientStatus,
    UpdateCompliance,
};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::{InMemoryEventStore, StoredEvent};
use crate::projections::invoices::{
    INVOICE_AGGREGATE_TYPE, InvoiceFilter, InvoiceReadModel, InvoicesProjection,
};
use crate::projections::payouts::{PAYOUT_AGGREGATE_TYPE, PayoutReadModel, PayoutsProjection};
use crate::projections::recipients::{
    RECIPIENT_AGGREGATE_TYPE, RecipientDirectoryProjection, RecipientQuery, RecipientReadModel,
};
use crate::read_model::InMemoryReadStore;

type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
type Dispatcher = CommandDispatcher<Arc<InMemoryEventStore>, Bus>;

/// Request to register a recipient.
#[derive(Debug, Clone)]
pub struct CreateRecipientRequest {
    /// Caller-supplied identifier; generated when absent. Reusing an
    /// existing id fails with `DuplicateId`.
    pub recipient_id: Option<RecipientId>,
    pub first_name: String,
    pub last_name: String,
    pub contact: ContactInfo,
    pub default_method: String,
}

/// Request to create an invoice.
#[derive(Debug, Clone)]
pub struct CreateInvoiceRequest {
    pub recipient_id: RecipientId,
    pub amount: MinorUnits,
    pub due_date: Option<DateTime<Utc>>,
    pub method_hint: Option<String>,
    pub description: Option<String>,
}

/// Request to create a payout.
#[derive(Debug, Clone)]
pub struct CreatePayoutRequest {
    pub recipient_id: RecipientId,
    pub amount: MinorUnits,
    pub method: String,
    pub priority: PayoutPriority,
    pub description: Option<String>,
    pub scheduled_date: Option<DateTime<Utc>>,
}

/// Aggregate balances across all wallets.
///
/// With debit-at-creation, in-flight payouts are already excluded from
/// withdrawable balances, so: available = Σ withdrawable_amount, pending =
/// Σ processing payout amounts, total = available + pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct BalanceSummary {
    pub available: MinorUnits,
    pub pending: MinorUnits,
    pub total: MinorUnits,
}

/// The payout/invoice lifecycle engine.
pub struct PayoutEngine {
    dispatcher: Dispatcher,
    bus: Bus,
    registry: Arc<MethodRegistry>,
    recipients: RecipientDirectoryProjection<Arc<InMemoryReadStore<RecipientId, RecipientReadModel>>>,
    invoices: InvoicesProjection<Arc<InMemoryReadStore<InvoiceId, InvoiceReadModel>>>,
    payouts: PayoutsProjection<Arc<InMemoryReadStore<PayoutId, PayoutReadModel>>>,
    wallet_locks: Mutex<HashMap<RecipientId, Arc<Mutex<()>>>>,
}

impl PayoutEngine {
    /// Wire up the engine around a method registry.
    ///
    /// The registry is the engine's only configuration: it is validated and
    /// immutable, so readiness is established here rather than through
    /// mutable globals.
    pub fn new(registry: MethodRegistry) -> Self {
        let store = Arc::new(InMemoryEventStore::new());
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let dispatcher = CommandDispatcher::new(store, bus.clone());

        Self {
            dispatcher,
            bus,
            registry: Arc::new(registry),
            recipients: RecipientDirectoryProjection::new(Arc::new(InMemoryReadStore::new())),
            invoices: InvoicesProjection::new(Arc::new(InMemoryReadStore::new())),
            payouts: PayoutsProjection::new(Arc::new(InMemoryReadStore::new())),
            wallet_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to the engine's event feed (fire-and-forget consumers such
    /// as notification senders). Subscribers never hold wallet locks.
    pub fn subscribe_events(&self) -> Subscription<EventEnvelope<JsonValue>> {
        self.bus.subscribe()
    }

    // ---------------------------------------------------------------
    // Recipient directory
    // ---------------------------------------------------------------

    /// Register a new recipient with a zeroed wallet.
    pub fn create_recipient(
        &self,
        req: CreateRecipientRequest,
    ) -> Result<RecipientReadModel, DispatchError> {
        self.registry.lookup(&req.default_method)?;

        let recipient_id = req
            .recipient_id
            .unwrap_or_else(|| RecipientId::new(AggregateId::new()));
        let cmd = RecipientCommand::RegisterRecipient(RegisterRecipient {
            recipient_id,
            first_name: req.first_name,
            last_name: req.last_name,
            contact: req.contact,
            default_method: req.default_method,
            occurred_at: Utc::now(),
        });

        let committed = self.dispatch_recipient(recipient_id, cmd)?;
        self.project(&committed);
        tracing::debug!(recipient_id = %recipient_id, "recipient registered");

        self.require_recipient(recipient_id)
    }

    pub fn get_recipient(&self, recipient_id: RecipientId) -> Option<RecipientReadModel> {
        self.recipients.get(&recipient_id)
    }

    pub fn search_recipients(&self, query: &RecipientQuery) -> Vec<RecipientReadModel> {
        self.recipients.search(query)
    }

    /// Compliance/verification process hook: set a recipient's status.
    pub fn set_recipient_status(
        &self,
        recipient_id: RecipientId,
        status: RecipientStatus,
    ) -> Result<RecipientReadModel, DispatchError> {
        self.require_recipient(recipient_id)?;

        let cmd = RecipientCommand::SetRecipientStatus(SetRecipientStatus {
            recipient_id,
            status,
            occurred_at: Utc::now(),
        });
        let committed = self.dispatch_recipient(recipient_id, cmd)?;
        self.project(&committed);

        self.require_recipient(recipient_id)
    }

    /// Compliance/verification process hook: replace a recipient's profile.
    pub fn update_compliance(
        &self,
        recipient_id: RecipientId,
        compliance: ComplianceProfile,
    ) -> Result<RecipientReadModel, DispatchError> {
        self.require_recipient(recipient_id)?;

        let cmd = RecipientCommand::UpdateCompliance(UpdateCompliance {
            recipient_id,
            compliance,
            occurred_at: Utc::now(),
        });
        let committed = self.dispatch_recipient(recipient_id, cmd)?;
        self.project(&committed);

        self.require_recipient(recipient_id)
    }

    /// External funding process hook: credit a recipient's wallet.
    pub fn fund_wallet(
        &self,
        recipient_id: RecipientId,
        amount: MinorUnits,
    ) -> Result<RecipientReadModel, DispatchError> {
        let lock = self.wallet_lock(recipient_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        self.require_recipient(recipient_id)?;

        let cmd = RecipientCommand::CreditWallet(CreditWallet {
            recipient_id,
            amount,
            occurred_at: Utc::now(),
        });
        let committed = self.dispatch_recipient(recipient_id, cmd)?;
        self.project(&committed);
        tracing::debug!(recipient_id = %recipient_id, amount = %amount, "wallet funded");

        self.require_recipient(recipient_id)
    }

    // ---------------------------------------------------------------
    // Payout methods
    // ---------------------------------------------------------------

    pub fn list_payout_methods(&self) -> Vec<PayoutMethodSpec> {
        self.registry.list().to_vec()
    }

    // ---------------------------------------------------------------
    // Invoices
    // ---------------------------------------------------------------

    /// Create an invoice in `pending`. Never touches the wallet.
    pub fn create_invoice(
        &self,
        req: CreateInvoiceRequest,
    ) -> Result<InvoiceReadModel, DispatchError> {
        if !req.amount.is_positive() {
            return Err(DomainError::InvalidAmount.into());
        }
        if self.recipients.get(&req.recipient_id).is_none() {
            return Err(DomainError::UnknownRecipient.into());
        }
        if let Some(hint) = &req.method_hint {
            self.registry.lookup(hint)?;
        }

        let invoice_id = InvoiceId::new(AggregateId::new());
        let cmd = InvoiceCommand::CreateInvoice(CreateInvoice {
            invoice_id,
            recipient_id: req.recipient_id,
            amount: req.amount,
            due_date: req.due_date,
            method_hint: req.method_hint,
            description: req.description,
            occurred_at: Utc::now(),
        });

        let committed = self.dispatch_invoice(invoice_id, cmd)?;
        self.project(&committed);
        tracing::debug!(invoice_id = %invoice_id, "invoice created");

        self.invoices
            .get(&invoice_id)
            .ok_or(DispatchError::Domain(DomainError::NotFound))
    }

    /// Filtered invoice listing, most recent first.
    pub fn list_invoices(&self, filter: &InvoiceFilter) -> Vec<InvoiceReadModel> {
        self.invoices.list(filter)
    }

    /// Drive an invoice to a terminal status.
    pub fn transition_invoice(
        &self,
        invoice_id: InvoiceId,
        new_status: InvoiceStatus,
    ) -> Result<InvoiceReadModel, DispatchError> {
        let current = self
            .invoices
            .get(&invoice_id)
            .ok_or(DispatchError::Domain(DomainError::NotFound))?;

        let now = Utc::now();
        let cmd = match new_status {
            InvoiceStatus::Completed => InvoiceCommand::CompleteInvoice(CompleteInvoice {
                invoice_id,
                occurred_at: now,
            }),
            InvoiceStatus::Failed => InvoiceCommand::FailInvoice(FailInvoice {
                invoice_id,
                reason: None,
                occurred_at: now,
            }),
            InvoiceStatus::Pending => {
                return Err(DomainError::invalid_transition(
                    current.status.as_str(),
                    InvoiceStatus::Pending.as_str(),
                )
                .into());
            }
        };

        let committed = self.dispatch_invoice(invoice_id, cmd)?;
        self.project(&committed);
        tracing::info!(invoice_id = %invoice_id, status = new_status.as_str(), "invoice transitioned");

        self.invoices
            .get(&invoice_id)
            .ok_or(DispatchError::Domain(DomainError::NotFound))
    }

    // ---------------------------------------------------------------
    // Payouts
    // ---------------------------------------------------------------

    /// Create a payout. Validation order (first failure wins):
    /// unknown recipient, invalid amount, unknown method, method bounds,
    /// insufficient funds. On success the wallet debit and the payout
    /// creation commit under the recipient's wallet lock.
    pub fn create_payout(
        &self,
        req: CreatePayoutRequest,
    ) -> Result<PayoutReadModel, DispatchError> {
        let lock = self.wallet_lock(req.recipient_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        self.require_recipient(req.recipient_id)?;
        if !req.amount.is_positive() {
            return Err(DomainError::InvalidAmount.into());
        }
        self.registry.validate(&req.method, req.amount)?;

        let payout_id = PayoutId::new(AggregateId::new());
        let now = Utc::now();

        // The wallet debit is the funds gate; it must commit before any
        // payout state exists.
        let debit = RecipientCommand::DebitWallet(DebitWallet {
            recipient_id: req.recipient_id,
            payout_id: payout_id.0,
            amount: req.amount,
            occurred_at: now,
        });
        let debit_committed = self.dispatch_recipient(req.recipient_id, debit)?;
        self.project(&debit_committed);

        let request = PayoutCommand::RequestPayout(RequestPayout {
            payout_id,
            recipient_id: req.recipient_id,
            amount: req.amount,
            method: req.method.clone(),
            priority: req.priority,
            scheduled_date: req.scheduled_date,
            description: req.description,
            occurred_at: now,
        });
        match self.dispatch_payout(payout_id, request) {
            Ok(committed) => {
                self.project(&committed);
            }
            Err(err) => {
                // The debit already committed; credit it back before
                // surfacing the failure so no funds stay earmarked.
                tracing::error!(payout_id = %payout_id, error = ?err, "payout request failed after debit; refunding");
                self.refund(req.recipient_id, payout_id, req.amount, now)?;
                return Err(err);
            }
        }

        tracing::info!(
            payout_id = %payout_id,
            recipient_id = %req.recipient_id,
            amount = %req.amount,
            method = %req.method,
            "payout created"
        );

        self.payouts
            .get(&payout_id)
            .ok_or(DispatchError::Domain(DomainError::NotFound))
    }

    /// Aggregate balances: see [`BalanceSummary`] for the derivation rule.
    pub fn get_balance(&self) -> BalanceSummary {
        let available: i64 = self
            .recipients
            .list()
            .into_iter()
            .map(|rm| rm.wallet.withdrawable_amount.value())
            .sum();
        let pending = self.payouts.processing_total();

        BalanceSummary {
            available: MinorUnits::new(available),
            pending,
            total: MinorUnits::new(available.saturating_add(pending.value())),
        }
    }

    /// Drive a payout to a terminal status. `processing -> completed` is a
    /// wallet no-op (funds were debited at creation); `processing -> failed`
    /// credits the amount back.
    pub fn transition_payout(
        &self,
        payout_id: PayoutId,
        new_status: PayoutStatus,
    ) -> Result<PayoutReadModel, DispatchError> {
        let current = self
            .payouts
            .get(&payout_id)
            .ok_or(DispatchError::Domain(DomainError::NotFound))?;

        let lock = self.wallet_lock(current.recipient_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let now = Utc::now();
        match new_status {
            PayoutStatus::Completed => {
                let cmd = PayoutCommand::CompletePayout(CompletePayout {
                    payout_id,
                    occurred_at: now,
                });
                let committed = self.dispatch_payout(payout_id, cmd)?;
                self.project(&committed);
            }
            PayoutStatus::Failed => {
                let cmd = PayoutCommand::FailPayout(FailPayout {
                    payout_id,
                    reason: None,
                    occurred_at: now,
                });
                // The failed transition gates the refund: a lost race means
                // no refund, hence no double-credit.
                let committed = self.dispatch_payout(payout_id, cmd)?;
                self.project(&committed);
                self.refund(current.recipient_id, payout_id, current.amount, now)?;
            }
            PayoutStatus::Processing => {
                return Err(DomainError::invalid_transition(
                    current.status.as_str(),
                    PayoutStatus::Processing.as_str(),
                )
                .into());
            }
        }

        tracing::info!(payout_id = %payout_id, status = new_status.as_str(), "payout transitioned");

        self.payouts
            .get(&payout_id)
            .ok_or(DispatchError::Domain(DomainError::NotFound))
    }

    /// Cancel a future-dated scheduled payout (refund applies).
    pub fn cancel_payout(&self, payout_id: PayoutId) -> Result<PayoutReadModel, DispatchError> {
        let current = self
            .payouts
            .get(&payout_id)
            .ok_or(DispatchError::Domain(DomainError::NotFound))?;

        let lock = self.wallet_lock(current.recipient_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let now = Utc::now();
        let cmd = PayoutCommand::CancelPayout(CancelPayout {
            payout_id,
            occurred_at: now,
        });
        let committed = self.dispatch_payout(payout_id, cmd)?;
        self.project(&committed);
        self.refund(current.recipient_id, payout_id, current.amount, now)?;

        tracing::info!(payout_id = %payout_id, "payout cancelled");

        self.payouts
            .get(&payout_id)
            .ok_or(DispatchError::Domain(DomainError::NotFound))
    }

    // ---------------------------------------------------------------
    // Transaction history
    // ---------------------------------------------------------------

    /// Unified invoice + payout timeline with flow summary.
    pub fn transaction_history(&self, filter: &HistoryFilter) -> HistoryView {
        let invoices = self
            .invoices
            .list(&InvoiceFilter::default())
            .into_iter()
            .map(|rm| TransactionRecord {
                id: rm.invoice_id.0,
                kind: TransactionKind::Invoice,
                recipient_id: rm.recipient_id,
                amount: rm.amount,
                status: rm.status.into(),
                method: rm.method_hint,
                occurred_at: rm.created_at,
            });
        let payouts = self.payouts.list().into_iter().map(|rm| TransactionRecord {
            id: rm.payout_id.0,
            kind: TransactionKind::Payout,
            recipient_id: rm.recipient_id,
            amount: rm.amount,
            status: rm.status.into(),
            method: Some(rm.method),
            occurred_at: rm.created_at,
        });

        payline_history::aggregate(invoices.chain(payouts), filter)
    }

    // ---------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------

    fn wallet_lock(&self, recipient_id: RecipientId) -> Arc<Mutex<()>> {
        let mut locks = self
            .wallet_locks
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        locks.entry(recipient_id).or_default().clone()
    }

    fn require_recipient(
        &self,
        recipient_id: RecipientId,
    ) -> Result<RecipientReadModel, DispatchError> {
        self.recipients
            .get(&recipient_id)
            .ok_or(DispatchError::Domain(DomainError::UnknownRecipient))
    }

    fn refund(
        &self,
        recipient_id: RecipientId,
        payout_id: PayoutId,
        amount: MinorUnits,
        occurred_at: DateTime<Utc>,
    ) -> Result<(), DispatchError> {
        let cmd = RecipientCommand::RefundWallet(RefundWallet {
            recipient_id,
            payout_id: payout_id.0,
            amount,
            occurred_at,
        });
        let committed = self.dispatch_recipient(recipient_id, cmd)?;
        self.project(&committed);
        Ok(())
    }

    fn dispatch_recipient(
        &self,
        recipient_id: RecipientId,
        cmd: RecipientCommand,
    ) -> Result<Vec<StoredEvent>, DispatchError> {
        self.dispatcher.dispatch::<Recipient>(
            recipient_id.0,
            RECIPIENT_AGGREGATE_TYPE,
            cmd,
            |id| Recipient::empty(RecipientId::new(id)),
        )
    }

    fn dispatch_invoice(
        &self,
        invoice_id: InvoiceId,
        cmd: InvoiceCommand,
    ) -> Result<Vec<StoredEvent>, DispatchError> {
        self.dispatcher.dispatch::<Invoice>(
            invoice_id.0,
            INVOICE_AGGREGATE_TYPE,
            cmd,
            |id| Invoice::empty(InvoiceId::new(id)),
        )
    }

    fn dispatch_payout(
        &self,
        payout_id: PayoutId,
        cmd: PayoutCommand,
    ) -> Result<Vec<StoredEvent>, DispatchError> {
        self.dispatcher.dispatch::<Payout>(
            payout_id.0,
            PAYOUT_AGGREGATE_TYPE,
            cmd,
            |id| Payout::empty(PayoutId::new(id)),
        )
    }

    /// Apply committed events to the read models synchronously.
    ///
    /// The projections are idempotent, so bus subscribers replaying the same
    /// envelopes is harmless. A projection failure is logged rather than
    /// failing the command: the events are already the source of truth and
    /// the read model can be rebuilt.
    fn project(&self, committed: &[StoredEvent]) {
        for stored in committed {
            let envelope = stored.to_envelope();
            let result = match stored.aggregate_type.as_str() {
                RECIPIENT_AGGREGATE_TYPE => self.recipients.apply_envelope(&envelope),
                INVOICE_AGGREGATE_TYPE => self.invoices.apply_envelope(&envelope),
                PAYOUT_AGGREGATE_TYPE => self.payouts.apply_envelope(&envelope),
                _ => Ok(()),
            };
            if let Err(err) = result {
                tracing::error!(
                    aggregate_type = %stored.aggregate_type,
                    sequence_number = stored.sequence_number,
                    error = %err,
                    "projection apply failed"
                );
            }
        }
    }
}
