//! Outbound adapters implementing the domain's driven ports.
//!
//! - **persistence**: PostgreSQL adapters over Diesel for the change log,
//!   transactions, id generation, row payloads, file associations and the
//!   migration ledger.
//!
//! Adapters translate between domain types and storage representations and
//! contain no reconciliation logic.

pub mod persistence;
