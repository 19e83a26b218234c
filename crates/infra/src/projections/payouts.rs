use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use payline_core::{AggregateId, MinorUnits};
use payline_events::EventEnvelope;
use payline_payouts::{PayoutEvent, PayoutId, PayoutPriority, PayoutStatus};
use payline_recipients::RecipientId;

use super::ProjectionError;
use crate::read_model::ReadStore;

/// Aggregate type tag used on payout streams.
pub const PAYOUT_AGGREGATE_TYPE: &str = "payouts.payout";

/// Queryable payout read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayoutReadModel {
    pub payout_id: PayoutId,
    pub recipient_id: RecipientId,
    pub amount: MinorUnits,
    pub method: String,
    pub priority: PayoutPriority,
    pub status: PayoutStatus,
    pub created_at: DateTime<Utc>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

/// Payout read-model projection.
#[derive(Debug)]
pub struct PayoutsProjection<S>
where
    S: ReadStore<PayoutId, PayoutReadModel>,
{
    store: S,
    cursors: RwLock<HashMap<AggregateId, u64>>,
}

impl<S> PayoutsProjection<S>
where
    S: ReadStore<PayoutId, PayoutReadModel>,
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

    pub fn get(&self, payout_id: &PayoutId) -> Option<PayoutReadModel> {
        self.store.get(payout_id)
    }

    /// All payouts, most recent first, stable tie-break by id.
    pub fn list(&self) -> Vec<PayoutReadModel> {
        let mut rows = self.store.list();
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.payout_id.0.as_uuid().cmp(b.payout_id.0.as_uuid()))
        });
        rows
    }

    /// Sum of amounts for payouts still in `processing`.
    pub fn processing_total(&self) -> MinorUnits {
        let total: i64 = self
            .store
            .list()
            .into_iter()
            .filter(|rm| rm.status == PayoutStatus::Processing)
            .map(|rm| rm.amount.value())
            .sum();
        MinorUnits::new(total)
    }

    /// Apply a published envelope into the projection (idempotent).
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != PAYOUT_AGGREGATE_TYPE {
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

        let event: PayoutEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        let payout_id = match &event {
            PayoutEvent::PayoutRequested(e) => e.payout_id,
            PayoutEvent::PayoutCompleted(e) => e.payout_id,
            PayoutEvent::PayoutFailed(e) => e.payout_id,
        };
        if payout_id.0 != aggregate_id {
            return Err(ProjectionError::StreamMismatch(
                "event payout_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match event {
            PayoutEvent::PayoutRequested(e) => {
                self.store.upsert(
                    e.payout_id,
                    PayoutReadModel {
                        payout_id: e.payout_id,
                        recipient_id: e.recipient_id,
                        amount: e.amount,
                        method: e.method,
                        priority: e.priority,
                        status: PayoutStatus::Processing,
                        created_at: e.occurred_at,
                        scheduled_date: e.scheduled_date,
                        description: e.description,
                    },
                );
            }
            PayoutEvent::PayoutCompleted(e) => {
                let mut rm = self.existing(&e.payout_id)?;
                rm.status = PayoutStatus::Completed;
                self.store.upsert(e.payout_id, rm);
            }
            PayoutEvent::PayoutFailed(e) => {
                let mut rm = self.existing(&e.payout_id)?;
                rm.status = PayoutStatus::Failed;
                self.store.upsert(e.payout_id, rm);
            }
        }

        self.advance_cursor(aggregate_id, seq);
        Ok(())
    }

    fn existing(&self, payout_id: &PayoutId) -> Result<PayoutReadModel, ProjectionError> {
        self.store.get(payout_id).ok_or_else(|| {
            ProjectionError::StreamMismatch(format!("no read model for payout {payout_id}"))
        })
    }
}
