//! Application layer - Services composed from ports.

pub mod dispatcher;
pub mod handler;
pub mod ledger;
