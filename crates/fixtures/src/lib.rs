//! `payline-fixtures` — demo/test data generation.
//!
//! Produces valid domain entities for tests and demo seeding. The engine
//! itself never depends on this crate; randomness stays out of the core.

pub mod generator;

pub use generator::{DemoRecipient, demo_recipient, demo_recipients};
