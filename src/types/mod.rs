//! Data types shared across authorization, querying and reporting.

pub mod analytics;
pub mod config;
pub mod device;
pub mod report;
pub mod token;

pub use analytics::*;
pub use config::*;
pub use device::*;
pub use report::*;
pub use token::*;
