//! Shared types for amzn-core.
//!
//! These types are produced by every order backend and consumed by the
//! MCP server when shaping responses.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::totp::TotpSecret;

// ─────────────────────────────────────────────────────────────────────────────
// Order Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_number: String,
    pub order_placed_date: Option<NaiveDate>,
    pub grand_total: Option<f64>,
    #[serde(default)]
    pub details: OrderDetails,
    #[serde(default)]
    pub recipient: Option<Recipient>,
    #[serde(default)]
    pub items: Vec<Item>,
}

/// Fields only available from the order details page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderDetails {
    pub subtotal: Option<f64>,
    pub shipping_total: Option<f64>,
    pub estimated_tax: Option<f64>,
    pub total_before_tax: Option<f64>,
    pub refund_total: Option<f64>,
    pub promotion_applied: Option<f64>,
    pub coupon_savings: Option<f64>,
    pub subscription_discount: Option<f64>,
    pub multibuy_discount: Option<f64>,
    pub amazon_discount: Option<f64>,
    pub reward_points: Option<f64>,
    pub gift_card: Option<f64>,
    pub payment_method: Option<String>,
    pub payment_method_last_4: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub title: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub seller: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
}

fn default_quantity() -> u32 {
    1
}

impl Order {
    /// Drop everything the history listing does not carry
    pub fn summary(mut self) -> Self {
        self.details = OrderDetails::default();
        self.recipient = None;
        self
    }

    /// True when any item title contains `needle`, ignoring case
    pub fn has_item_matching(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.items
            .iter()
            .any(|item| item.title.to_lowercase().contains(&needle))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Query Types
// ─────────────────────────────────────────────────────────────────────────────

/// Date range understood by the order history page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFilter {
    /// Orders placed in the past 30 days
    Last30Days,
    /// Orders placed in the past 3 months
    Last3Months,
    /// Orders placed in a calendar year
    Year(i32),
}

impl TimeFilter {
    /// Value of the `timeFilter` query parameter
    pub fn as_query_value(&self) -> String {
        match self {
            Self::Last30Days => "last30".to_string(),
            Self::Last3Months => "months-3".to_string(),
            Self::Year(year) => format!("year-{}", year),
        }
    }

    /// Whether an order placed on `date` falls in this range, relative to `today`
    pub fn contains(&self, date: NaiveDate, today: NaiveDate) -> bool {
        match self {
            Self::Last30Days => date <= today && (today - date).num_days() <= 30,
            Self::Last3Months => {
                let start = today
                    .checked_sub_months(chrono::Months::new(3))
                    .unwrap_or(NaiveDate::MIN);
                date >= start && date <= today
            }
            Self::Year(year) => date.year() == *year,
        }
    }
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_query_value())
    }
}

impl FromStr for TimeFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "last30" => Ok(Self::Last30Days),
            "months-3" => Ok(Self::Last3Months),
            other => other
                .strip_prefix("year-")
                .and_then(|y| y.parse::<i32>().ok())
                .map(Self::Year)
                .ok_or_else(|| {
                    Error::invalid_params(format!(
                        "unknown time_filter '{}': expected last30, months-3 or year-YYYY",
                        other
                    ))
                }),
        }
    }
}

/// Parameters of an order history fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    pub filter: TimeFilter,
    pub full_details: bool,
}

impl HistoryQuery {
    /// Build a query from the optional tool arguments.
    ///
    /// `year` and `time_filter` are alternatives. If a caller passes both,
    /// `time_filter` wins; the choice is explicit rather than inferred from
    /// which range is narrower. With neither, `current_year` is used.
    pub fn resolve(
        year: Option<i32>,
        time_filter: Option<&str>,
        full_details: bool,
        current_year: i32,
    ) -> Result<Self> {
        let filter = match (time_filter.filter(|f| !f.trim().is_empty()), year) {
            (Some(tf), _) => tf.parse()?,
            (None, Some(year)) => TimeFilter::Year(year),
            (None, None) => TimeFilter::Year(current_year),
        };
        Ok(Self {
            filter,
            full_details,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Credentials
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Authenticator secret for answering 2FA prompts without the user
    pub otp_secret: Option<TotpSecret>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            otp_secret: None,
        }
    }

    pub fn with_otp_secret(mut self, secret: TotpSecret) -> Self {
        self.otp_secret = Some(secret);
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("otp_secret", &self.otp_secret)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_time_filter_parse() {
        assert_eq!("last30".parse::<TimeFilter>().unwrap(), TimeFilter::Last30Days);
        assert_eq!("months-3".parse::<TimeFilter>().unwrap(), TimeFilter::Last3Months);
        assert_eq!("year-2023".parse::<TimeFilter>().unwrap(), TimeFilter::Year(2023));
        assert!("last-week".parse::<TimeFilter>().is_err());
        assert!("year-abc".parse::<TimeFilter>().is_err());
    }

    #[test]
    fn test_time_filter_query_value() {
        assert_eq!(TimeFilter::Year(2024).as_query_value(), "year-2024");
        assert_eq!(TimeFilter::Last30Days.to_string(), "last30");
        assert_eq!(TimeFilter::Last3Months.to_string(), "months-3");
    }

    #[test]
    fn test_time_filter_contains() {
        let today = date(2024, 6, 15);
        assert!(TimeFilter::Last30Days.contains(date(2024, 5, 20), today));
        assert!(!TimeFilter::Last30Days.contains(date(2024, 4, 1), today));
        assert!(TimeFilter::Last3Months.contains(date(2024, 3, 15), today));
        assert!(!TimeFilter::Last3Months.contains(date(2024, 3, 14), today));
        assert!(TimeFilter::Year(2023).contains(date(2023, 12, 31), today));
        assert!(!TimeFilter::Year(2023).contains(date(2024, 1, 1), today));
    }

    #[test]
    fn test_history_query_precedence() {
        let q = HistoryQuery::resolve(Some(2022), Some("last30"), false, 2024).unwrap();
        assert_eq!(q.filter, TimeFilter::Last30Days);

        let q = HistoryQuery::resolve(Some(2022), None, true, 2024).unwrap();
        assert_eq!(q.filter, TimeFilter::Year(2022));
        assert!(q.full_details);

        let q = HistoryQuery::resolve(None, None, false, 2024).unwrap();
        assert_eq!(q.filter, TimeFilter::Year(2024));

        // Blank filter falls through to the year
        let q = HistoryQuery::resolve(Some(2021), Some("  "), false, 2024).unwrap();
        assert_eq!(q.filter, TimeFilter::Year(2021));

        assert!(HistoryQuery::resolve(None, Some("yesterday"), false, 2024).is_err());
    }

    #[test]
    fn test_order_item_matching_is_case_insensitive() {
        let order = Order {
            order_number: "111-1234567-1234567".into(),
            items: vec![Item {
                title: "Blue WIDGET Deluxe".into(),
                quantity: 1,
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(order.has_item_matching("widget"));
        assert!(order.has_item_matching("Deluxe"));
        assert!(!order.has_item_matching("gadget"));
    }

    #[test]
    fn test_order_summary_drops_details() {
        let order = Order {
            order_number: "111-1234567-1234567".into(),
            details: OrderDetails {
                subtotal: Some(10.0),
                ..Default::default()
            },
            recipient: Some(Recipient {
                name: Some("Jane".into()),
                address: None,
            }),
            items: vec![Item {
                title: "Widget".into(),
                quantity: 2,
                ..Default::default()
            }],
            ..Default::default()
        };
        let summary = order.summary();
        assert_eq!(summary.details, OrderDetails::default());
        assert!(summary.recipient.is_none());
        assert_eq!(summary.items.len(), 1);
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("jane@example.com", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("jane@example.com"));
        assert!(!debug.contains("hunter2"));

        let secret = TotpSecret::parse("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ").unwrap();
        let debug = format!("{:?}", creds.with_otp_secret(secret));
        assert!(!debug.contains("GEZD"));
    }

    #[test]
    fn test_item_defaults_on_deserialize() {
        let item: Item = serde_json::from_str(r#"{"title": "Widget"}"#).unwrap();
        assert_eq!(item.quantity, 1);
        assert!(item.price.is_none());
    }
}
