//! Transaction reconciliation and file-association backfill.
//!
//! The crate is laid out hexagonally: [`domain`] holds the reconciliation
//! services and the ports they drive, [`outbound`] implements those ports
//! over PostgreSQL, and [`inbound`] parses operator input. [`commands`]
//! wires adapters to services for each command.

pub mod commands;
pub mod domain;
pub mod inbound;
pub mod outbound;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
