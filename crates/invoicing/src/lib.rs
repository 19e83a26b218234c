//! `payline-invoicing` — invoice lifecycle.
//!
//! Invoices record money owed to a recipient. They never touch the wallet;
//! funding is a separate external process.

pub mod invoice;

pub use invoice::{
    CompleteInvoice, CreateInvoice, FailInvoice, Invoice, InvoiceCommand, InvoiceEvent,
    InvoiceId, InvoiceStatus,
};
