//! MCP (Model Context Protocol) server implementation.
//!
//! Provides MCP protocol support over stdio for AI assistant integration.

pub mod records;
pub mod server;

pub use server::McpServer;
