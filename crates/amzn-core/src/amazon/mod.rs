//! Live amazon.com backend.
//!
//! Signs in with a cookie-carrying HTTP client and reads the order history
//! and order details pages.
//!
//! # Usage
//!
//! ```rust,no_run
//! use amzn_core::amazon::AmazonConnector;
//! use amzn_core::{Connector, Credentials, HistoryQuery, OrderClient, OtpPrompt, TimeFilter};
//!
//! #[tokio::main]
//! async fn main() -> amzn_core::Result<()> {
//!     let connector = AmazonConnector::new(amzn_core::amazon::DEFAULT_BASE_URL)?;
//!     let creds = Credentials::new("jane@example.com", "password");
//!     let client = connector.login(&creds, &OtpPrompt::new(Some("123456".into())), false).await?;
//!     let query = HistoryQuery { filter: TimeFilter::Year(2024), full_details: false };
//!     let orders = client.get_order_history(&query).await?;
//!     println!("{} orders", orders.len());
//!     Ok(())
//! }
//! ```

pub mod html;
pub mod parse;
pub mod signin;

use async_trait::async_trait;
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::client::{Connector, OrderClient};
use crate::error::{Error, Result};
use crate::prompt::AuthPrompt;
use crate::types::{Credentials, HistoryQuery, Order};

/// Default storefront
pub const DEFAULT_BASE_URL: &str = "https://www.amazon.com";

const SIGN_IN_PATH: &str = "/gp/sign-in.html";
const ORDER_HISTORY_PATH: &str = "/your-orders/orders";
const ORDER_DETAILS_PATH: &str = "/gp/your-account/order-details";

/// Sign-in responses answered before giving up
pub(crate) const MAX_AUTH_ATTEMPTS: usize = 10;
/// Upper bound on history pages followed for one query
const MAX_HISTORY_PAGES: usize = 50;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// A fetched page and the URL it ended up at after redirects
#[derive(Debug, Clone)]
pub(crate) struct Page {
    pub url: Url,
    pub html: String,
}

impl Page {
    pub(crate) async fn fetch(request: reqwest::RequestBuilder) -> Result<Self> {
        let response = request.send().await?.error_for_status()?;
        let url = response.url().clone();
        let html = response.text().await?;
        Ok(Self { url, html })
    }
}

/// Connector for the live site
#[derive(Debug, Clone)]
pub struct AmazonConnector {
    base_url: Url,
}

impl AmazonConnector {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", base_url, e)))?;
        Ok(Self { base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid URL path {}: {}", path, e)))
    }

    fn http_client() -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))
    }
}

#[async_trait]
impl Connector for AmazonConnector {
    fn name(&self) -> &'static str {
        "amazon"
    }

    async fn login(
        &self,
        credentials: &Credentials,
        prompt: &dyn AuthPrompt,
        debug: bool,
    ) -> Result<Arc<dyn OrderClient>> {
        let http = Self::http_client()?;
        signin::sign_in(
            &http,
            self.endpoint(SIGN_IN_PATH)?,
            credentials,
            prompt,
            debug,
        )
        .await?;
        info!("Signed in to {}", self.base_url);

        Ok(Arc::new(AmazonClient {
            http,
            history_url: self.endpoint(ORDER_HISTORY_PATH)?,
            details_url: self.endpoint(ORDER_DETAILS_PATH)?,
        }))
    }
}

/// Order client bound to a signed-in cookie jar
pub struct AmazonClient {
    http: reqwest::Client,
    history_url: Url,
    details_url: Url,
}

#[async_trait]
impl OrderClient for AmazonClient {
    async fn get_order_history(&self, query: &HistoryQuery) -> Result<Vec<Order>> {
        let request = self
            .http
            .get(self.history_url.clone())
            .query(&[("timeFilter", query.filter.as_query_value())]);
        let mut page = Page::fetch(request).await?;

        let mut orders = Vec::new();
        for page_number in 1..=MAX_HISTORY_PAGES {
            let parsed = parse::parse_history_page(&page.html)?;
            debug!(
                "history page {} ({}): {} orders",
                page_number,
                query.filter,
                parsed.orders.len()
            );
            orders.extend(parsed.orders);

            let Some(next) = parsed.next_page else {
                break;
            };
            if page_number == MAX_HISTORY_PAGES {
                warn!("Stopped after {} history pages", MAX_HISTORY_PAGES);
                break;
            }
            let next_url = page
                .url
                .join(&next)
                .map_err(|e| Error::parse("order history", e.to_string()))?;
            page = Page::fetch(self.http.get(next_url)).await?;
        }

        if !query.full_details {
            return Ok(orders);
        }

        let mut detailed = Vec::with_capacity(orders.len());
        for summary in orders {
            let details = self.get_order(&summary.order_number).await;
            detailed.push(merge_details(summary, details)?);
        }
        Ok(detailed)
    }

    async fn get_order(&self, order_id: &str) -> Result<Order> {
        let request = self
            .http
            .get(self.details_url.clone())
            .query(&[("orderID", order_id)]);
        let page = Page::fetch(request).await?;
        parse::parse_order_details(&page.html, order_id)
    }
}

/// Combine a history summary with its details page.
///
/// A details page that fails to load or parse falls back to the summary;
/// only an expired sign-in aborts the listing.
fn merge_details(summary: Order, details: Result<Order>) -> Result<Order> {
    let mut order = match details {
        Ok(order) => order,
        Err(e) if e.is_not_authenticated() => return Err(e),
        Err(e) => {
            warn!(
                "Using summary for order {}; details unavailable: {}",
                summary.order_number, e
            );
            return Ok(summary);
        }
    };
    if order.grand_total.is_none() {
        order.grand_total = summary.grand_total;
    }
    if order.order_placed_date.is_none() {
        order.order_placed_date = summary.order_placed_date;
    }
    if order.items.is_empty() {
        order.items = summary.items;
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Item, OrderDetails};

    #[test]
    fn test_connector_endpoints() {
        let connector = AmazonConnector::new("https://www.amazon.co.uk").unwrap();
        assert_eq!(
            connector.endpoint(ORDER_HISTORY_PATH).unwrap().as_str(),
            "https://www.amazon.co.uk/your-orders/orders"
        );
        assert_eq!(
            connector.endpoint(SIGN_IN_PATH).unwrap().as_str(),
            "https://www.amazon.co.uk/gp/sign-in.html"
        );
        assert_eq!(connector.name(), "amazon");
    }

    fn summary() -> Order {
        Order {
            order_number: "D01-1234567-1234567".to_string(),
            order_placed_date: chrono::NaiveDate::from_ymd_opt(2024, 2, 1),
            grand_total: Some(4.99),
            items: vec![Item {
                title: "Ebook".to_string(),
                quantity: 1,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_fills_gaps_from_summary() {
        let details = Order {
            order_number: "D01-1234567-1234567".to_string(),
            details: OrderDetails {
                subtotal: Some(4.99),
                ..Default::default()
            },
            ..Default::default()
        };
        let order = merge_details(summary(), Ok(details)).unwrap();
        assert_eq!(order.grand_total, Some(4.99));
        assert_eq!(order.details.subtotal, Some(4.99));
        assert_eq!(order.items[0].title, "Ebook");
    }

    #[test]
    fn test_merge_falls_back_on_details_failure() {
        let err = Error::parse("order details", "unrecognised layout");
        assert_eq!(merge_details(summary(), Err(err)).unwrap(), summary());

        let err = Error::NotFound("D01-1234567-1234567".to_string());
        assert_eq!(merge_details(summary(), Err(err)).unwrap(), summary());
    }

    #[test]
    fn test_merge_propagates_expired_sign_in() {
        let err = merge_details(summary(), Err(Error::NotAuthenticated)).unwrap_err();
        assert!(err.is_not_authenticated());
    }

    #[test]
    fn test_connector_rejects_bad_url() {
        let err = AmazonConnector::new("not a url").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
