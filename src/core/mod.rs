//! Core Components
//!
//! HTTP infrastructure shared by the authorization flows and the reporting client.

pub mod transport;

pub use transport::*;
