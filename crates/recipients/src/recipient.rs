use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use payline_core::{Aggregate, AggregateId, AggregateRoot, DomainError, MinorUnits};
use payline_events::Event;

use crate::wallet::Wallet;

/// Recipient identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientId(pub AggregateId);

impl RecipientId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for RecipientId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Recipient verification status, driven by an external compliance process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientStatus {
    Verified,
    Unverified,
    InReview,
    Disabled,
}

impl RecipientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipientStatus::Verified => "verified",
            RecipientStatus::Unverified => "unverified",
            RecipientStatus::InReview => "in_review",
            RecipientStatus::Disabled => "disabled",
        }
    }
}

/// Verification state of a single compliance item (e.g. tax id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationState {
    Verified,
    Pending,
    Unsubmitted,
}

/// OFAC screening outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfacStatus {
    Unflagged,
    Flagged,
    Pending,
}

/// Compliance flags collected/updated by the verification process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceProfile {
    pub tax_id_collected: bool,
    pub tax_id_verification: VerificationState,
    pub address_collected: bool,
    pub date_of_birth_collected: bool,
    pub id_verified: bool,
    pub flagged: bool,
    pub ofac_status: OfacStatus,
}

impl Default for ComplianceProfile {
    fn default() -> Self {
        Self {
            tax_id_collected: false,
            tax_id_verification: VerificationState::Unsubmitted,
            address_collected: false,
            date_of_birth_collected: false,
            id_verified: false,
            flagged: false,
            ofac_status: OfacStatus::Unflagged,
        }
    }
}

/// Phone number with country code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub country_code: String,
    pub number: String,
}

/// Contact information for a recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: String,
    pub phone: Option<PhoneNumber>,
}

/// Aggregate root: Recipient (a payee with a wallet).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    id: RecipientId,
    first_name: String,
    last_name: String,
    contact: Option<ContactInfo>,
    default_method: String,
    status: RecipientStatus,
    compliance: ComplianceProfile,
    wallet: Wallet,
    created_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Recipient {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: RecipientId) -> Self {
        Self {
            id,
            first_name: String::new(),
            last_name: String::new(),
            contact: None,
            default_method: String::new(),
            status: RecipientStatus::Unverified,
            compliance: ComplianceProfile::default(),
            wallet: Wallet::zeroed(),
            created_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> RecipientId {
        self.id
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn contact(&self) -> Option<&ContactInfo> {
        self.contact.as_ref()
    }

    pub fn default_method(&self) -> &str {
        &self.default_method
    }

    pub fn status(&self) -> RecipientStatus {
        self.status
    }

    pub fn compliance(&self) -> &ComplianceProfile {
        &self.compliance
    }

    pub fn wallet(&self) -> Wallet {
        self.wallet
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn exists(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Recipient {
    type Id = RecipientId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterRecipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRecipient {
    pub recipient_id: RecipientId,
    pub first_name: String,
    pub last_name: String,
    pub contact: ContactInfo,
    pub default_method: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetRecipientStatus (compliance/verification process only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetRecipientStatus {
    pub recipient_id: RecipientId,
    pub status: RecipientStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateCompliance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCompliance {
    pub recipient_id: RecipientId,
    pub compliance: ComplianceProfile,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CreditWallet (external funding process).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditWallet {
    pub recipient_id: RecipientId,
    pub amount: MinorUnits,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DebitWallet (earmark funds for a payout at creation time).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebitWallet {
    pub recipient_id: RecipientId,
    /// The payout this debit is earmarked for.
    pub payout_id: AggregateId,
    pub amount: MinorUnits,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RefundWallet (credit back a failed payout).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundWallet {
    pub recipient_id: RecipientId,
    pub payout_id: AggregateId,
    pub amount: MinorUnits,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipientCommand {
    RegisterRecipient(RegisterRecipient),
    SetRecipientStatus(SetRecipientStatus),
    UpdateCompliance(UpdateCompliance),
    CreditWallet(CreditWallet),
    DebitWallet(DebitWallet),
    RefundWallet(RefundWallet),
}

/// Event: RecipientRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientRegistered {
    pub recipient_id: RecipientId,
    pub first_name: String,
    pub last_name: String,
    pub contact: ContactInfo,
    pub default_method: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RecipientStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientStatusChanged {
    pub recipient_id: RecipientId,
    pub status: RecipientStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ComplianceUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceUpdated {
    pub recipient_id: RecipientId,
    pub compliance: ComplianceProfile,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WalletCredited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletCredited {
    pub recipient_id: RecipientId,
    pub amount: MinorUnits,
    pub new_balance: Wallet,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WalletDebited (funds earmarked for a payout).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletDebited {
    pub recipient_id: RecipientId,
    pub payout_id: AggregateId,
    pub amount: MinorUnits,
    pub new_balance: Wallet,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WalletRefunded (failed payout credited back).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRefunded {
    pub recipient_id: RecipientId,
    pub payout_id: AggregateId,
    pub amount: MinorUnits,
    pub new_balance: Wallet,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipientEvent {
    RecipientRegistered(RecipientRegistered),
    RecipientStatusChanged(RecipientStatusChanged),
    ComplianceUpdated(ComplianceUpdated),
    WalletCredited(WalletCredited),
    WalletDebited(WalletDebited),
    WalletRefunded(WalletRefunded),
}

impl Event for RecipientEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RecipientEvent::RecipientRegistered(_) => "recipients.recipient.registered",
            RecipientEvent::RecipientStatusChanged(_) => "recipients.recipient.status_changed",
            RecipientEvent::ComplianceUpdated(_) => "recipients.recipient.compliance_updated",
            RecipientEvent::WalletCredited(_) => "recipients.wallet.credited",
            RecipientEvent::WalletDebited(_) => "recipients.wallet.debited",
            RecipientEvent::WalletRefunded(_) => "recipients.wallet.refunded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RecipientEvent::RecipientRegistered(e) => e.occurred_at,
            RecipientEvent::RecipientStatusChanged(e) => e.occurred_at,
            RecipientEvent::ComplianceUpdated(e) => e.occurred_at,
            RecipientEvent::WalletCredited(e) => e.occurred_at,
            RecipientEvent::WalletDebited(e) => e.occurred_at,
            RecipientEvent::WalletRefunded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Recipient {
    type Command = RecipientCommand;
    type Event = RecipientEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            RecipientEvent::RecipientRegistered(e) => {
                self.id = e.recipient_id;
                self.first_name = e.first_name.clone();
                self.last_name = e.last_name.clone();
                self.contact = Some(e.contact.clone());
                self.default_method = e.default_method.clone();
                self.status = RecipientStatus::Unverified;
                self.compliance = ComplianceProfile::default();
                self.wallet = Wallet::zeroed();
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            RecipientEvent::RecipientStatusChanged(e) => {
                self.status = e.status;
            }
            RecipientEvent::ComplianceUpdated(e) => {
                self.compliance = e.compliance;
            }
            RecipientEvent::WalletCredited(e) => {
                self.wallet = e.new_balance;
            }
            RecipientEvent::WalletDebited(e) => {
                self.wallet = e.new_balance;
            }
            RecipientEvent::WalletRefunded(e) => {
                self.wallet = e.new_balance;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            RecipientCommand::RegisterRecipient(cmd) => self.handle_register(cmd),
            RecipientCommand::SetRecipientStatus(cmd) => self.handle_set_status(cmd),
            RecipientCommand::UpdateCompliance(cmd) => self.handle_update_compliance(cmd),
            RecipientCommand::CreditWallet(cmd) => self.handle_credit(cmd),
            RecipientCommand::DebitWallet(cmd) => self.handle_debit(cmd),
            RecipientCommand::RefundWallet(cmd) => self.handle_refund(cmd),
        }
    }
}

impl Recipient {
    fn ensure_exists(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::UnknownRecipient);
        }
        Ok(())
    }

    fn ensure_recipient_id(&self, recipient_id: RecipientId) -> Result<(), DomainError> {
        if self.id != recipient_id {
            return Err(DomainError::validation("recipient_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterRecipient) -> Result<Vec<RecipientEvent>, DomainError> {
        if self.created {
            return Err(DomainError::DuplicateId);
        }

        if cmd.first_name.trim().is_empty() || cmd.last_name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if cmd.contact.email.trim().is_empty() || !cmd.contact.email.contains('@') {
            return Err(DomainError::validation("email is malformed"));
        }
        if cmd.default_method.trim().is_empty() {
            return Err(DomainError::validation("default payout method cannot be empty"));
        }

        Ok(vec![RecipientEvent::RecipientRegistered(RecipientRegistered {
            recipient_id: cmd.recipient_id,
            first_name: cmd.first_name.clone(),
            last_name: cmd.last_name.clone(),
            contact: cmd.contact.clone(),
            default_method: cmd.default_method.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_status(
        &self,
        cmd: &SetRecipientStatus,
    ) -> Result<Vec<RecipientEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_recipient_id(cmd.recipient_id)?;

        Ok(vec![RecipientEvent::RecipientStatusChanged(
            RecipientStatusChanged {
                recipient_id: cmd.recipient_id,
                status: cmd.status,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_update_compliance(
        &self,
        cmd: &UpdateCompliance,
    ) -> Result<Vec<RecipientEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_recipient_id(cmd.recipient_id)?;

        Ok(vec![RecipientEvent::ComplianceUpdated(ComplianceUpdated {
            recipient_id: cmd.recipient_id,
            compliance: cmd.compliance,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_credit(&self, cmd: &CreditWallet) -> Result<Vec<RecipientEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_recipient_id(cmd.recipient_id)?;

        let new_balance = self.wallet.credit(cmd.amount)?;

        Ok(vec![RecipientEvent::WalletCredited(WalletCredited {
            recipient_id: cmd.recipient_id,
            amount: cmd.amount,
            new_balance,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_debit(&self, cmd: &DebitWallet) -> Result<Vec<RecipientEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_recipient_id(cmd.recipient_id)?;

        let new_balance = self.wallet.debit(cmd.amount)?;

        Ok(vec![RecipientEvent::WalletDebited(WalletDebited {
            recipient_id: cmd.recipient_id,
            payout_id: cmd.payout_id,
            amount: cmd.amount,
            new_balance,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_refund(&self, cmd: &RefundWallet) -> Result<Vec<RecipientEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_recipient_id(cmd.recipient_id)?;

        let new_balance = self.wallet.refund(cmd.amount)?;

        Ok(vec![RecipientEvent::WalletRefunded(WalletRefunded {
            recipient_id: cmd.recipient_id,
            payout_id: cmd.payout_id,
            amount: cmd.amount,
            new_balance,
            occurred_at: cmd.occurred_at,
        })])
    }
}
