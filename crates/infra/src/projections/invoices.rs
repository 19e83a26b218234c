use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use payline_core::{AggregateId, MinorUnits};
use payline_events::EventEnvelope;
use payline_invoicing::{InvoiceEvent, InvoiceId, InvoiceStatus};
use payline_recipients::RecipientId;

use super::ProjectionError;
use crate::read_model::ReadStore;

/// Aggregate type tag used on invoice streams.
pub const INVOICE_AGGREGATE_TYPE: &str = "invoicing.invoice";

/// Queryable invoice read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceReadModel {
    pub invoice_id: InvoiceId,
    pub recipient_id: RecipientId,
    pub amount: MinorUnits,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub method_hint: Option<String>,
    pub description: Option<String>,
}

/// Invoice listing filter: present fields compose with logical AND; the
/// created-at window bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub recipient_id: Option<RecipientId>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl InvoiceFilter {
    fn matches(&self, rm: &InvoiceReadModel) -> bool {
        if let Some(status) = self.status {
            if rm.status != status {
                return false;
            }
        }
        if let Some(recipient_id) = self.recipient_id {
            if rm.recipient_id != recipient_id {
                return false;
            }
        }
        if let Some(from) = self.from {
            if rm.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if rm.created_at > to {
                return false;
            }
        }
        true
    }
}

/// Invoice read-model projection.
#[derive(Debug)]
pub struct InvoicesProjection<S>
where
    S: ReadStore<InvoiceId, InvoiceReadModel>,
{
    store: S,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<S> InvoicesProjection<S>
where
    S: ReadStore<InvoiceId, InvoiceReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    fn cursor(&self, aggregate_id: AggregateId) -> u64 {
        match self.cursors.read() {
            Ok(cursors) => *cursors.get(&aggregate_id).unwrap_or(&0),
            Err(_) => 0,
        }
    }

    fn advance_cursor(&self, aggregate_id: AggregateId, sequence_number: u64) {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.insert(aggregate_id, sequence_number);
        }
    }

    pub fn get(&self, invoice_id: &InvoiceId) -> Option<InvoiceReadModel> {
        self.store.get(invoice_id)
    }

    /// Filtered listing, most recent first, stable tie-break by id.
    ///
    /// Returns a fresh snapshot on each call, so iteration is restartable.
    pub fn list(&self, filter: &InvoiceFilter) -> Vec<InvoiceReadModel> {
        let mut rows: Vec<InvoiceReadModel> = self
            .store
            .list()
            .into_iter()
            .filter(|rm| filter.matches(rm))
            .collect();

        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.invoice_id.0.as_uuid().cmp(b.invoice_id.0.as_uuid()))
        });

        rows
    }

    /// Apply a published envelope into the projection (idempotent).
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != INVOICE_AGGREGATE_TYPE {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        let last = self.cursor(aggregate_id);

        if seq == 0 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            return Ok(());
        }
        if seq != last + 1 && last != 0 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let event: InvoiceEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        let invoice_id = match &event {
            InvoiceEvent::InvoiceCreated(e) => e.invoice_id,
            InvoiceEvent::InvoiceCompleted(e) => e.invoice_id,
            InvoiceEvent::InvoiceFailed(e) => e.invoice_id,
        };
        if invoice_id.0 != aggregate_id {
            return Err(ProjectionError::StreamMismatch(
                "event invoice_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match event {
            InvoiceEvent::InvoiceCreated(e) => {
                self.store.upsert(
                    e.invoice_id,
                    InvoiceReadModel {
                        invoice_id: e.invoice_id,
                        recipient_id: e.recipient_id,
                        amount: e.amount,
                        status: InvoiceStatus::Pending,
                        created_at: e.occurred_at,
                        due_date: e.due_date,
                        method_hint: e.method_hint,
                        description: e.description,
                    },
                );
            }
            InvoiceEvent::InvoiceCompleted(e) => {
                let mut rm = self.existing(&e.invoice_id)?;
                rm.status = InvoiceStatus::Completed;
                self.store.upsert(e.invoice_id, rm);
            }
            InvoiceEvent::InvoiceFailed(e) => {
                let mut rm = self.existing(&e.invoice_id)?;
                rm.status = InvoiceStatus::Failed;
                self.store.upsert(e.invoice_id, rm);
            }
        }

        self.advance_cursor(aggregate_id, seq);
        Ok(())
    }

    fn existing(&self, invoice_id: &InvoiceId) -> Result<InvoiceReadModel, ProjectionError> {
        self.store.get(invoice_id).ok_or_else(|| {
            ProjectionError::StreamMismatch(format!("no read model for invoice {invoice_id}"))
        })
    }
}
