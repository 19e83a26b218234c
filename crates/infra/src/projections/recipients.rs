use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use payline_core::AggregateId;
use payline_events::EventEnvelope;
use payline_recipients::{
    ComplianceProfile, PhoneNumber, RecipientEvent, RecipientId, RecipientStatus, Wallet,
};

use super::ProjectionError;
use crate::read_model::ReadStore;

/// Aggregate type tag used on recipient streams.
pub const RECIPIENT_AGGREGATE_TYPE: &str = "recipients.recipient";

/// Queryable recipient read model: the directory row plus current wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipientReadModel {
    pub recipient_id: RecipientId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<PhoneNumber>,
    pub default_method: String,
    pub status: RecipientStatus,
    pub compliance: ComplianceProfile,
    pub wallet: Wallet,
    pub created_at: DateTime<Utc>,
    /// Registration order within the directory (stable listing order).
    pub directory_seq: u64,
}

/// Caller-selectable sort key for directory searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecipientSort {
    /// Registration order (the default).
    #[default]
    Insertion,
    /// Last name, then first name (case-insensitive).
    Name,
    /// Newest registrations first.
    CreatedAt,
}

/// Directory search: present fields compose with logical AND.
#[derive(Debug, Clone, Default)]
pub struct RecipientQuery {
    pub status: Option<RecipientStatus>,
    pub method: Option<String>,
    /// Case-insensitive substring match on first name, last name, or email.
    pub text: Option<String>,
    pub sort: RecipientSort,
}

/// Recipient directory projection.
///
/// Consumes published envelopes (JSON payloads) and maintains the read model
/// used for lookup, search, and balance aggregation.
#[derive(Debug)]
pub struct RecipientDirectoryProjection<S>
where
    S: ReadStore<RecipientId, RecipientReadModel>,
{
    store: S,
    cursors: RwLock<HashMap<AggregateId, u64>>,
    next_directory_seq: AtomicU64,
}

impl<S> RecipientDirectoryProjection<S>
where
    S: ReadStore<RecipientId, RecipientReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
            next_directory_seq: AtomicU64::new(0),
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

    /// Query the read model for one recipient.
    pub fn get(&self, recipient_id: &RecipientId) -> Option<RecipientReadModel> {
        self.store.get(recipient_id)
    }

    /// List all recipients in registration order.
    pub fn list(&self) -> Vec<RecipientReadModel> {
        let mut rows = self.store.list();
        rows.sort_by_key(|rm| rm.directory_seq);
        rows
    }

    /// Search the directory. Filters AND together; an empty text query
    /// matches everything.
    pub fn search(&self, query: &RecipientQuery) -> Vec<RecipientReadModel> {
        let text = query
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);

        let mut rows: Vec<RecipientReadModel> = self
            .store
            .list()
            .into_iter()
            .filter(|rm| {
                if let Some(status) = query.status {
                    if rm.status != status {
                        return false;
                    }
                }
                if let Some(method) = &query.method {
                    if !rm.default_method.eq_ignore_ascii_case(method) {
                        return false;
                    }
                }
                if let Some(needle) = &text {
                    let hit = rm.first_name.to_lowercase().contains(needle)
                        || rm.last_name.to_lowercase().contains(needle)
                        || rm.email.to_lowercase().contains(needle);
                    if !hit {
                        return false;
                    }
                }
                true
            })
            .collect();

        match query.sort {
            RecipientSort::Insertion => rows.sort_by_key(|rm| rm.directory_seq),
            RecipientSort::Name => rows.sort_by(|a, b| {
                (a.last_name.to_lowercase(), a.first_name.to_lowercase())
                    .cmp(&(b.last_name.to_lowercase(), b.first_name.to_lowercase()))
            }),
            RecipientSort::CreatedAt => {
                rows.sort_by(|a, b| {
                    b.created_at
                        .cmp(&a.created_at)
                        .then_with(|| a.directory_seq.cmp(&b.directory_seq))
                });
            }
        }

        rows
    }

    /// Apply a published envelope into the projection.
    ///
    /// - Ignores non-recipient aggregates (allows sharing a bus across modules).
    /// - Enforces monotonic sequence per aggregate stream.
    /// - Idempotent for at-least-once delivery (replays <= cursor are ignored).
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != RECIPIENT_AGGREGATE_TYPE {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        let last = self.cursor(aggregate_id);

        if seq == 0 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            // Duplicate or replay; safe to ignore.
            return Ok(());
        }
        if seq != last + 1 && last != 0 {
            // First event may carry any positive sequence; after that we
            // require strict increments.
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let event: RecipientEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        let recipient_id = match &event {
            RecipientEvent::RecipientRegistered(e) => e.recipient_id,
            RecipientEvent::RecipientStatusChanged(e) => e.recipient_id,
            RecipientEvent::ComplianceUpdated(e) => e.recipient_id,
            RecipientEvent::WalletCredited(e) => e.recipient_id,
            RecipientEvent::WalletDebited(e) => e.recipient_id,
            RecipientEvent::WalletRefunded(e) => e.recipient_id,
        };
        if recipient_id.0 != aggregate_id {
            return Err(ProjectionError::StreamMismatch(
                "event recipient_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match event {
            RecipientEvent::RecipientRegistered(e) => {
                let directory_seq = self.next_directory_seq.fetch_add(1, Ordering::SeqCst);
                self.store.upsert(
                    e.recipient_id,
                    RecipientReadModel {
                        recipient_id: e.recipient_id,
                        first_name: e.first_name,
                        last_name: e.last_name,
                        email: e.contact.email,
                        phone: e.contact.phone,
                        default_method: e.default_method,
                        status: RecipientStatus::Unverified,
                        compliance: ComplianceProfile::default(),
                        wallet: Wallet::zeroed(),
                        created_at: e.occurred_at,
                        directory_seq,
                    },
                );
            }
            RecipientEvent::RecipientStatusChanged(e) => {
                let mut rm = self.existing(&e.recipient_id)?;
                rm.status = e.status;
                self.store.upsert(e.recipient_id, rm);
            }
            RecipientEvent::ComplianceUpdated(e) => {
                let mut rm = self.existing(&e.recipient_id)?;
                rm.compliance = e.compliance;
                self.store.upsert(e.recipient_id, rm);
            }
            RecipientEvent::WalletCredited(e) => {
                let mut rm = self.existing(&e.recipient_id)?;
                rm.wallet = e.new_balance;
                self.store.upsert(e.recipient_id, rm);
            }
            RecipientEvent::WalletDebited(e) => {
                let mut rm = self.existing(&e.recipient_id)?;
                rm.wallet = e.new_balance;
                self.store.upsert(e.recipient_id, rm);
            }
            RecipientEvent::WalletRefunded(e) => {
                let mut rm = self.existing(&e.recipient_id)?;
                rm.wallet = e.new_balance;
                self.store.upsert(e.recipient_id, rm);
            }
        }

        self.advance_cursor(aggregate_id, seq);
        Ok(())
    }

    fn existing(&self, recipient_id: &RecipientId) -> Result<RecipientReadModel, ProjectionError> {
        // Cursor enforcement guarantees the registration event came first.
        self.store.get(recipient_id).ok_or_else(|| {
            ProjectionError::StreamMismatch(format!(
                "no read model for recipient {recipient_id}"
            ))
        })
    }

    /// Rebuild the read model from scratch by replaying envelopes.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), ProjectionError> {
        self.store.clear();
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.clear();
        }
        self.next_directory_seq.store(0, Ordering::SeqCst);

        // Deterministic replay order: aggregate, then sequence. Aggregate ids
        // are UUIDv7, so this preserves registration order.
        let mut envs: Vec<_> = envelopes.into_iter().collect();
        envs.sort_by_key(|e| (*e.aggregate_id().as_uuid().as_bytes(), e.sequence_number()));

        for env in &envs {
            self.apply_envelope(env)?;
        }

        Ok(())
    }
}
