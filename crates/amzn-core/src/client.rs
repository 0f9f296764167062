//! Backend traits.
//!
//! A [`Connector`] signs in and hands back an [`OrderClient`] bound to the
//! authenticated session. The MCP server only ever talks to these traits.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::prompt::AuthPrompt;
use crate::types::{Credentials, HistoryQuery, Order};

/// Authenticated handle for reading orders.
#[async_trait]
pub trait OrderClient: Send + Sync {
    /// Fetch the order history for a date range, newest first.
    ///
    /// When `query.full_details` is false, implementations may return only
    /// what the history listing shows (no detail totals or recipient).
    async fn get_order_history(&self, query: &HistoryQuery) -> Result<Vec<Order>>;

    /// Fetch one order with full details.
    ///
    /// Fails with [`Error::NotFound`](crate::Error::NotFound) if no such order exists.
    async fn get_order(&self, order_id: &str) -> Result<Order>;
}

/// Performs sign-in and yields an [`OrderClient`].
#[async_trait]
pub trait Connector: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Sign in with `credentials`, asking `prompt` for any interactive input.
    ///
    /// `debug` turns on step-by-step logging of the sign-in flow.
    async fn login(
        &self,
        credentials: &Credentials,
        prompt: &dyn AuthPrompt,
        debug: bool,
    ) -> Result<Arc<dyn OrderClient>>;
}
