//! Resilience
//!
//! Backoff schedule used by the device-token polling loop.

pub mod backoff;

pub use backoff::Backoff;
