//! MCP Server implementation.
//!
//! Four tools, defined via #[tool_router]: login, order history, a single
//! order, and item-title search. Every tool except login needs a session.

use amzn_core::{Error, ErrorKind, HistoryQuery, Order};
use chrono::Datelike;
use rmcp::{
    handler::server::{router::tool::ToolRouter, tool::ToolCallContext, wrapper::Parameters},
    model::{
        CallToolRequestParam, CallToolResult, Content, ListToolsResult, PaginatedRequestParam,
        ServerCapabilities, ServerInfo,
    },
    schemars::{self, JsonSchema},
    tool, tool_router, ErrorData, RoleServer, ServerHandler,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use super::records::{self, OrderRecord};
use crate::session::LoginOutcome;
use crate::state::AppState;

const LOGIN_OK: &str = "Successfully logged in to Amazon.";

const OTP_REQUIRED: &str = "OTP_REQUIRED: Amazon 2FA is enabled and requires a one-time password. \
     ASK THE USER for their current 6-digit OTP code from their authenticator app, \
     then call amazon_login again with the otp_code parameter.";

const NOT_LOGGED_IN: &str = "NOT_LOGGED_IN: You must call amazon_login first.";

const NOT_LOGGED_IN_OTP: &str = "NOT_LOGGED_IN: You must call amazon_login first. \
     ASK THE USER for their current 6-digit OTP code from their authenticator app, \
     then call amazon_login with the otp_code parameter.";

/// Amazon Orders MCP Server
///
/// Provides MCP tools for reading Amazon order history.
#[derive(Clone)]
pub struct McpServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

impl McpServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            tool_router: Self::tool_router(),
        }
    }
}

/// Parameters for amazon_login tool
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct LoginParams {
    /// Current 6-digit OTP code from the user's authenticator app (required if 2FA is enabled)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp_code: Option<String>,
    /// Log each sign-in step and include full error details on failure
    #[serde(default)]
    pub debug: bool,
}

/// Parameters for amazon_get_order_history tool
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct OrderHistoryParams {
    /// Year to get orders from (e.g. 2024). Defaults to the current year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Alternative to year: "last30" for the past 30 days or "months-3" for the past 3 months. Takes precedence over year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_filter: Option<String>,
    /// Fetch additional details for each order (slower but more complete)
    #[serde(default)]
    pub full_details: bool,
}

/// Parameters for amazon_get_order tool
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct GetOrderParams {
    /// The Amazon order number
    #[schemars(description = "The Amazon order number (e.g. \"111-1234567-1234567\")")]
    pub order_id: String,
}

/// Parameters for amazon_search_orders tool
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct SearchOrdersParams {
    /// Text to search for in item titles (case-insensitive)
    pub search_term: String,
    /// Year to search in. Defaults to the current year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Alternative to year: "last30" or "months-3". Takes precedence over year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_filter: Option<String>,
}

#[tool_router]
impl McpServer {
    /// Sign in to Amazon
    #[tool(description = "Login to Amazon. CALL THIS FIRST before using other amazon tools. If 2FA is enabled, provide the current OTP code from the user's authenticator app as otp_code.")]
    pub async fn amazon_login(
        &self,
        Parameters(params): Parameters<LoginParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let otp_provided = params
            .otp_code
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty());
        if self.state.session.is_authenticated().await {
            info!("Replacing existing session for {}", self.state.config.base_url);
        }

        match self.state.session.login(params.otp_code, params.debug).await {
            Ok(LoginOutcome::LoggedIn) => Ok(CallToolResult::success(vec![Content::text(LOGIN_OK)])),
            Ok(LoginOutcome::OtpRequired) => {
                Ok(CallToolResult::success(vec![Content::text(OTP_REQUIRED)]))
            }
            Err(e) => Ok(CallToolResult::error(vec![Content::text(login_failure(
                &e,
                otp_provided,
                params.debug,
            ))])),
        }
    }

    /// Get order history for a date range
    #[tool(description = "Get Amazon order history as JSON. Requires amazon_login to be called first. Use year (defaults to the current year) or time_filter (\"last30\", \"months-3\").")]
    pub async fn amazon_get_order_history(
        &self,
        Parameters(params): Parameters<OrderHistoryParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let result: amzn_core::Result<Vec<Order>> = async {
            let session = self.state.session.acquire().await?;
            let query = HistoryQuery::resolve(
                params.year,
                params.time_filter.as_deref(),
                params.full_details,
                current_year(),
            )?;
            let result = session.client().get_order_history(&query).await;
            session.finish(result)
        }
        .await;

        match result {
            Ok(orders) => {
                debug!("amazon_get_order_history: returning {} orders", orders.len());
                json_result(&records::to_records(&orders))
            }
            Err(e) => Ok(self.failure(&e).await),
        }
    }

    /// Get one order by number
    #[tool(description = "Get details for a specific Amazon order as JSON. Requires amazon_login to be called first.")]
    pub async fn amazon_get_order(
        &self,
        Parameters(params): Parameters<GetOrderParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let result: amzn_core::Result<Order> = async {
            let session = self.state.session.acquire().await?;
            let order_id = required("order_id", &params.order_id)?;
            let result = session.client().get_order(order_id).await;
            session.finish(result)
        }
        .await;

        match result {
            Ok(order) => json_result(&OrderRecord::from(&order)),
            Err(e) => Ok(self.failure(&e).await),
        }
    }

    /// Search orders by item title
    #[tool(description = "Search Amazon orders by item title (case-insensitive). Requires amazon_login to be called first. Use year (defaults to the current year) or time_filter (\"last30\", \"months-3\").")]
    pub async fn amazon_search_orders(
        &self,
        Parameters(params): Parameters<SearchOrdersParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let result: amzn_core::Result<(usize, Vec<OrderRecord>)> = async {
            let session = self.state.session.acquire().await?;
            let term = required("search_term", &params.search_term)?;
            // Item titles are only complete with full details
            let query = HistoryQuery::resolve(
                params.year,
                params.time_filter.as_deref(),
                true,
                current_year(),
            )?;
            let result = session.client().get_order_history(&query).await;
            let orders = session.finish(result)?;
            Ok::<_, Error>((orders.len(), records::search(&orders, term)))
        }
        .await;

        match result {
            Ok((scanned, matches)) => {
                info!(
                    "amazon_search_orders: {} of {} orders match",
                    matches.len(),
                    scanned
                );
                json_result(&matches)
            }
            Err(e) => Ok(self.failure(&e).await),
        }
    }
}

impl McpServer {
    /// Turn a query tool error into a failed tool result.
    ///
    /// Must be called after the session guard is released.
    async fn failure(&self, err: &Error) -> CallToolResult {
        let message = match err.kind() {
            ErrorKind::NotAuthenticated => {
                if self.state.session.otp_pending().await {
                    NOT_LOGGED_IN_OTP.to_string()
                } else {
                    NOT_LOGGED_IN.to_string()
                }
            }
            ErrorKind::NotFound => format!("NOT_FOUND: {}", err),
            ErrorKind::Invalid => match err {
                Error::Config(msg) => format!("CONFIG_ERROR: {}", msg),
                _ => format!("INVALID_PARAMS: {}", err),
            },
            ErrorKind::Upstream => match err {
                Error::AuthFailed(_) => format!(
                    "AUTH_FAILED: {}. Call amazon_login again; if 2FA is enabled, \
                     ASK THE USER for their current 6-digit OTP code.",
                    err
                ),
                _ => format!("Error: {}", err),
            },
        };
        debug!("tool failure: {}", message);
        CallToolResult::error(vec![Content::text(message)])
    }
}

/// Trimmed value of a required text argument
fn required<'a>(name: &str, value: &'a str) -> amzn_core::Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::invalid_params(format!("{} must not be empty", name)));
    }
    Ok(value)
}

fn current_year() -> i32 {
    chrono::Local::now().year()
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, ErrorData> {
    let body = serde_json::to_string_pretty(value)
        .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(body)]))
}

fn login_failure(err: &Error, otp_provided: bool, debug: bool) -> String {
    let detail = if debug {
        format!("{:?}", err)
    } else {
        err.to_string()
    };
    match err {
        Error::AuthFailed(_) => format!(
            "AUTH_FAILED: Could not authenticate with Amazon.\n\
             OTP code provided: {}\n\
             Possible causes:\n\
             1. Invalid username/password in environment variables\n\
             2. Amazon is blocking automated login (CAPTCHA)\n\
             3. 2FA is required - ASK THE USER for their current 6-digit OTP code\n\
             \nDebug info:\n{}",
            if otp_provided { "yes" } else { "no" },
            detail
        ),
        Error::Config(msg) => format!("CONFIG_ERROR: {}", msg),
        _ => format!("Login failed: {}", detail),
    }
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Amazon Orders MCP Server - Call amazon_login first, then read order history, \
                 single orders, or search orders by item title."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, ErrorData>> + Send + '_ {
        async move {
            let tools = self.tool_router.list_all();
            debug!("list_tools: returning {} tools", tools.len());
            Ok(ListToolsResult {
                tools,
                next_cursor: None,
            })
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: rmcp::service::RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, ErrorData>> + Send + '_ {
        debug!("Calling tool: {}", request.name);
        async move {
            let tool_context = ToolCallContext::new(self, request, context);
            self.tool_router.call(tool_context).await
        }
    }
}
