//! amzn-core - Core library for the Amazon orders MCP server
//!
//! This crate holds everything below the MCP layer:
//!
//! - **types**: Orders, items, date-range queries and credentials
//! - **client**: The `Connector` / `OrderClient` backend traits
//! - **prompt**: OTP prompt capture for non-interactive sign-in
//! - **totp**: One-time passcodes from a stored 2FA secret
//! - **amazon**: Live amazon.com backend (feature `amazon`)
//! - **fixture**: JSON fixture backend for offline use and tests

#[cfg(feature = "amazon")]
pub mod amazon;
pub mod client;
pub mod error;
pub mod fixture;
pub mod prompt;
pub mod totp;
pub mod types;

// Re-export commonly used types
pub use client::{Connector, OrderClient};
pub use error::{Error, ErrorKind, Result};
pub use fixture::FixtureConnector;
pub use prompt::{AuthPrompt, OtpPrompt};
pub use totp::TotpSecret;
pub use types::{Credentials, HistoryQuery, Item, Order, OrderDetails, Recipient, TimeFilter};
