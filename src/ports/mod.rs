//! Ports - trait seams between the pipeline and the outside world.

pub mod ledger;
pub mod queue;
pub mod transcoder;
