//! Inbound adapters translating operator input into domain service calls.
//!
//! The command line under [`cli`] is the only driving adapter.

pub mod cli;
