//! `payline-recipients` — recipient aggregate and wallet ledger.
//!
//! A recipient is an entity eligible to receive payouts. Each recipient
//! exclusively owns one wallet; all wallet mutations flow through this
//! aggregate's command handling, which is what serializes balance arithmetic
//! per recipient.

pub mod recipient;
pub mod wallet;

pub use recipient::{
    ComplianceProfile, ContactInfo, CreditWallet, DebitWallet, OfacStatus, PhoneNumber,
    Recipient, RecipientCommand, RecipientEvent, RecipientId, RecipientStatus, RefundWallet,
    RegisterRecipient, SetRecipientStatus, UpdateCompliance, VerificationState,
};
pub use wallet::Wallet;
