//! Adapters - Concrete implementations of ports.

pub mod ffmpeg;
pub mod memory;
pub mod postgres;
pub mod redis;
