//! Fixture backend.
//!
//! Serves orders from a JSON file instead of amazon.com. Used for offline
//! demos and for exercising the MCP tools in tests. The file looks like:
//!
//! ```json
//! {
//!   "otp_code": "123456",
//!   "orders": [
//!     { "order_number": "111-1234567-1234567", "order_placed_date": "2024-03-02",
//!       "grand_total": 19.99, "items": [{ "title": "Widget", "quantity": 1 }] }
//!   ]
//! }
//! ```
//!
//! When `otp_code` is set, sign-in raises an OTP prompt and only succeeds
//! with that exact code.

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::client::{Connector, OrderClient};
use crate::error::{Error, Result};
use crate::prompt::AuthPrompt;
use crate::types::{Credentials, HistoryQuery, Order};

#[derive(Debug, Clone, Default, Deserialize)]
struct FixtureFile {
    #[serde(default)]
    otp_code: Option<String>,
    #[serde(default)]
    orders: Vec<Order>,
}

/// Connector that signs in against fixture data
#[derive(Debug, Clone, Default)]
pub struct FixtureConnector {
    orders: Vec<Order>,
    otp_code: Option<String>,
    today: Option<NaiveDate>,
}

impl FixtureConnector {
    pub fn new(orders: Vec<Order>) -> Self {
        Self {
            orders,
            ..Default::default()
        }
    }

    /// Load a fixture file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let file: FixtureFile = serde_json::from_str(&raw)?;
        info!(
            "Loaded {} fixture orders from {}",
            file.orders.len(),
            path.display()
        );
        Ok(Self {
            orders: file.orders,
            otp_code: file.otp_code,
            today: None,
        })
    }

    /// Require this OTP code during sign-in
    pub fn with_otp(mut self, code: impl Into<String>) -> Self {
        self.otp_code = Some(code.into());
        self
    }

    /// Pin "today" for relative time filters
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }
}

#[async_trait]
impl Connector for FixtureConnector {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn login(
        &self,
        credentials: &Credentials,
        prompt: &dyn AuthPrompt,
        debug: bool,
    ) -> Result<Arc<dyn OrderClient>> {
        if debug {
            debug!("fixture sign-in for {}", credentials.username);
        }

        if let Some(expected) = &self.otp_code {
            let code = prompt.prompt("Enter OTP code")?;
            if code.trim() != expected {
                return Err(Error::AuthFailed(
                    "Authentication attempts exhausted: OTP code rejected".to_string(),
                ));
            }
        }

        Ok(Arc::new(FixtureClient {
            orders: self.orders.clone(),
            today: self.today,
        }))
    }
}

/// Order client over in-memory fixture orders
#[derive(Debug, Clone)]
pub struct FixtureClient {
    orders: Vec<Order>,
    today: Option<NaiveDate>,
}

impl FixtureClient {
    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }
}

#[async_trait]
impl OrderClient for FixtureClient {
    async fn get_order_history(&self, query: &HistoryQuery) -> Result<Vec<Order>> {
        let today = self.today();
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| {
                o.order_placed_date
                    .is_some_and(|d| query.filter.contains(d, today))
            })
            .cloned()
            .map(|o| if query.full_details { o } else { o.summary() })
            .collect();
        orders.sort_by(|a, b| b.order_placed_date.cmp(&a.order_placed_date));

        debug!(
            "fixture history {}: {} orders",
            query.filter,
            orders.len()
        );
        Ok(orders)
    }

    async fn get_order(&self, order_id: &str) -> Result<Order> {
        self.orders
            .iter()
            .find(|o| o.order_number == order_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(order_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::OtpPrompt;
    use crate::types::{Item, OrderDetails, TimeFilter};
    use std::io::Write;

    fn order(number: &str, date: (i32, u32, u32), titles: &[&str]) -> Order {
        Order {
            order_number: number.to_string(),
            order_placed_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
            grand_total: Some(10.0),
            details: OrderDetails {
                subtotal: Some(9.0),
                ..Default::default()
            },
            items: titles
                .iter()
                .map(|t| Item {
                    title: t.to_string(),
                    quantity: 1,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn creds() -> Credentials {
        Credentials::new("jane@example.com", "secret")
    }

    fn connector() -> FixtureConnector {
        FixtureConnector::new(vec![
            order("111-0000001-0000001", (2023, 11, 2), &["Old Widget"]),
            order("111-0000002-0000002", (2024, 1, 5), &["Cable"]),
            order("111-0000003-0000003", (2024, 6, 1), &["Widget Pro"]),
        ])
        .with_today(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
    }

    #[tokio::test]
    async fn test_history_filters_by_year_newest_first() {
        let client = connector()
            .login(&creds(), &OtpPrompt::new(None), false)
            .await
            .unwrap();

        let query = HistoryQuery {
            filter: TimeFilter::Year(2024),
            full_details: true,
        };
        let orders = client.get_order_history(&query).await.unwrap();
        let numbers: Vec<_> = orders.iter().map(|o| o.order_number.as_str()).collect();
        assert_eq!(numbers, vec!["111-0000003-0000003", "111-0000002-0000002"]);
        assert_eq!(orders[0].details.subtotal, Some(9.0));
    }

    #[tokio::test]
    async fn test_history_without_full_details_is_summary() {
        let client = connector()
            .login(&creds(), &OtpPrompt::new(None), false)
            .await
            .unwrap();

        let query = HistoryQuery {
            filter: TimeFilter::Last30Days,
            full_details: false,
        };
        let orders = client.get_order_history(&query).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].details, OrderDetails::default());
        assert_eq!(orders[0].items.len(), 1);
    }

    #[tokio::test]
    async fn test_get_order_not_found() {
        let client = connector()
            .login(&creds(), &OtpPrompt::new(None), false)
            .await
            .unwrap();

        let found = client.get_order("111-0000002-0000002").await.unwrap();
        assert_eq!(found.order_number, "111-0000002-0000002");

        let err = client.get_order("999-0000000-0000000").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_otp_challenge() {
        let connector = connector().with_otp("654321");

        let result = connector.login(&creds(), &OtpPrompt::new(None), false).await;
        assert!(matches!(result, Err(Error::OtpRequired)));

        let result = connector
            .login(&creds(), &OtpPrompt::new(Some("000000".into())), false)
            .await;
        assert!(matches!(result, Err(Error::AuthFailed(_))));

        let result = connector
            .login(&creds(), &OtpPrompt::new(Some("654321".into())), false)
            .await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "otp_code": "123456",
                "orders": [
                    {{
                        "order_number": "111-1234567-1234567",
                        "order_placed_date": "2024-03-02",
                        "grand_total": 19.99,
                        "items": [{{ "title": "Widget" }}]
                    }}
                ]
            }}"#
        )
        .unwrap();

        let connector = FixtureConnector::from_file(file.path()).unwrap();
        assert_eq!(connector.otp_code.as_deref(), Some("123456"));
        assert_eq!(connector.orders.len(), 1);
        assert_eq!(connector.orders[0].items[0].quantity, 1);

        let client = tokio_test::block_on(connector.login(
            &creds(),
            &OtpPrompt::new(Some("123456".into())),
            false,
        ))
        .unwrap();
        let order = tokio_test::block_on(client.get_order("111-1234567-1234567")).unwrap();
        assert_eq!(order.grand_total, Some(19.99));
    }

    #[test]
    fn test_from_file_missing() {
        let err = FixtureConnector::from_file(Path::new("/nonexistent/fixture.json")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
