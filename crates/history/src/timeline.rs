use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use payline_core::{AggregateId, MinorUnits};
use payline_invoicing::InvoiceStatus;
use payline_payouts::PayoutStatus;
use payline_recipients::RecipientId;

/// Source kind of a timeline row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Inbound: money owed/paid to the platform side of the ledger.
    Invoice,
    /// Outbound: money leaving a recipient wallet.
    Payout,
}

/// Status vocabulary unified across invoices and payouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl From<InvoiceStatus> for TransactionStatus {
    fn from(value: InvoiceStatus) -> Self {
        match value {
            InvoiceStatus::Pending => TransactionStatus::Pending,
            InvoiceStatus::Completed => TransactionStatus::Completed,
            InvoiceStatus::Failed => TransactionStatus::Failed,
        }
    }
}

impl From<PayoutStatus> for TransactionStatus {
    fn from(value: PayoutStatus) -> Self {
        match value {
            PayoutStatus::Processing => TransactionStatus::Processing,
            PayoutStatus::Completed => TransactionStatus::Completed,
            PayoutStatus::Failed => TransactionStatus::Failed,
        }
    }
}

/// One row of the unified timeline.
///
/// Derived data: always recomputed from invoice/payout records, never
/// persisted independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: AggregateId,
    pub kind: TransactionKind,
    pub recipient_id: RecipientId,
    pub amount: MinorUnits,
    pub status: TransactionStatus,
    pub method: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Filter for the timeline. All present fields compose with logical AND;
/// the time window bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub kind: Option<TransactionKind>,
    pub status: Option<TransactionStatus>,
    pub method: Option<String>,
}

impl HistoryFilter {
    fn matches(&self, record: &TransactionRecord) -> bool {
        if let Some(from) = self.from {
            if record.occurred_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if record.occurred_at > to {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if record.kind != kind {
                return false;
            }
        }
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some(method) = &self.method {
            match &record.method {
                Some(m) if m.eq_ignore_ascii_case(method) => {}
                _ => return false,
            }
        }
        true
    }
}

/// Flow totals over the filtered window.
///
/// `total_in` sums completed invoices, `total_out` sums completed payouts,
/// `net_flow = total_in - total_out` (signed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub total_in: MinorUnits,
    pub total_out: MinorUnits,
    pub net_flow: MinorUnits,
}

/// The filtered, ordered timeline plus its summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryView {
    pub records: Vec<TransactionRecord>,
    pub summary: HistorySummary,
}

/// Merge records into a filtered timeline, newest first (ties broken by id),
/// and compute the flow summary over the filtered set.
pub fn aggregate(
    records: impl IntoIterator<Item = TransactionRecord>,
    filter: &HistoryFilter,
) -> HistoryView {
    let mut records: Vec<TransactionRecord> = records
        .into_iter()
        .filter(|r| filter.matches(r))
        .collect();

    records.sort_by(|a, b| {
        b.occurred_at
            .cmp(&a.occurred_at)
            .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()))
    });

    let mut total_in: i64 = 0;
    let mut total_out: i64 = 0;
    for record in &records {
        if record.status != TransactionStatus::Completed {
            continue;
        }
        match record.kind {
            TransactionKind::Invoice => total_in = total_in.saturating_add(record.amount.value()),
            TransactionKind::Payout => total_out = total_out.saturating_add(record.amount.value()),
        }
    }

    HistoryView {
        records,
        summary: HistorySummary {
            total_in: MinorUnits::new(total_in),
            total_out: MinorUnits::new(total_out),
            net_flow: MinorUnits::new(total_in.saturating_sub(total_out)),
        },
    }
}
