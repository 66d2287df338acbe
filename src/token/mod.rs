//! Token Management
//!
//! Persistence of the access/refresh token pair.

pub mod storage;

pub use storage::{
    FileTokenStore, InMemoryTokenStore, MockTokenStore, TokenStore, DEFAULT_TOKEN_FILE,
};
