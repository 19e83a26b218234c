use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use payline_core::AggregateId;
use payline_history::{TransactionKind, TransactionStatus};
use payline_invoicing::InvoiceStatus;
use payline_payouts::{PayoutPriority, PayoutStatus};
use payline_recipients::{ComplianceProfile, ContactInfo, PhoneNumber, RecipientStatus};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateRecipientRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<PhoneNumberDto>,
    pub default_payout_method: String,
}

#[derive(Debug, Deserialize)]
pub struct PhoneNumberDto {
    pub country_code: String,
    pub number: String,
}

impl CreateRecipientRequest {
    pub fn contact(&self) -> ContactInfo {
        ContactInfo {
            email: self.email.clone(),
            phone: self.phone.as_ref().map(|p| PhoneNumber {
                country_code: p.country_code.clone(),
                number: p.number.clone(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FundWalletRequest {
    /// Amount in minor currency units.
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: RecipientStatus,
}

#[derive(Debug, Deserialize)]
pub struct UpdateComplianceRequest {
    pub compliance: ComplianceProfile,
}

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    pub recipient_id: String,
    /// Amount in minor currency units.
    pub amount: i64,
    pub due_date: Option<DateTime<Utc>>,
    pub method_hint: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionInvoiceRequest {
    pub status: InvoiceStatus,
}

#[derive(Debug, Deserialize)]
pub struct CreatePayoutRequest {
    pub recipient_id: String,
    /// Amount in minor currency units.
    pub amount: i64,
    pub method: String,
    pub priority: Option<PayoutPriority>,
    pub description: Option<String>,
    pub scheduled_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionPayoutRequest {
    pub status: PayoutStatus,
}

// -------------------------
// Query parameters
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RecipientSearchParams {
    pub status: Option<RecipientStatus>,
    pub method: Option<String>,
    pub q: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceListParams {
    pub status: Option<InvoiceStatus>,
    pub recipient_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub kind: Option<TransactionKind>,
    pub status: Option<TransactionStatus>,
    pub method: Option<String>,
}

// -------------------------
// Parsing helpers
// -------------------------

pub fn parse_id(s: &str) -> Result<AggregateId, axum::response::Response> {
    s.parse().map_err(|_| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_id",
            "malformed identifier",
        )
    })
}
