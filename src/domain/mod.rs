//! Domain layer - Pure business logic.

pub mod dash;
pub mod fragments;
pub mod jobs;
