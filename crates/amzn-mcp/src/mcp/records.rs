//! Flat, serializable projections of backend orders.

use amzn_core::{Item, Order, Recipient};
use serde::Serialize;

/// Order as returned to the assistant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRecord {
    pub order_number: String,
    pub order_placed_date: Option<String>,
    pub grand_total: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_total: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_tax: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_before_tax: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_total: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion_applied: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_savings: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_discount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multibuy_discount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amazon_discount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_points: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gift_card: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_last_4: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<RecipientRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ItemRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipientRecord {
    pub name: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemRecord {
    pub title: String,
    pub price: Option<String>,
    pub quantity: u32,
    pub link: Option<String>,
    pub seller: Option<String>,
    pub condition: Option<String>,
}

fn money(value: Option<f64>) -> Option<String> {
    value.map(|v| format!("{:.2}", v))
}

/// Reward points are a count, not currency
fn points(value: Option<f64>) -> Option<String> {
    value.map(|v| v.to_string())
}

impl From<&Order> for OrderRecord {
    fn from(order: &Order) -> Self {
        let d = &order.details;
        Self {
            order_number: order.order_number.clone(),
            order_placed_date: order.order_placed_date.map(|d| d.to_string()),
            grand_total: money(order.grand_total),
            subtotal: money(d.subtotal),
            shipping_total: money(d.shipping_total),
            estimated_tax: money(d.estimated_tax),
            total_before_tax: money(d.total_before_tax),
            refund_total: money(d.refund_total),
            promotion_applied: money(d.promotion_applied),
            coupon_savings: money(d.coupon_savings),
            subscription_discount: money(d.subscription_discount),
            multibuy_discount: money(d.multibuy_discount),
            amazon_discount: money(d.amazon_discount),
            reward_points: points(d.reward_points),
            gift_card: money(d.gift_card),
            payment_method: d.payment_method.clone(),
            payment_method_last_4: d.payment_method_last_4.clone(),
            recipient: order.recipient.as_ref().map(RecipientRecord::from),
            items: order.items.iter().map(ItemRecord::from).collect(),
        }
    }
}

impl From<&Recipient> for RecipientRecord {
    fn from(recipient: &Recipient) -> Self {
        Self {
            name: recipient.name.clone(),
            address: recipient.address.clone(),
        }
    }
}

impl From<&Item> for ItemRecord {
    fn from(item: &Item) -> Self {
        Self {
            title: item.title.clone(),
            price: money(item.price),
            quantity: item.quantity,
            link: item.link.clone(),
            seller: item.seller.clone(),
            condition: item.condition.clone(),
        }
    }
}

/// Project a list of orders
pub fn to_records(orders: &[Order]) -> Vec<OrderRecord> {
    orders.iter().map(OrderRecord::from).collect()
}

/// Orders with at least one item title containing `term`, ignoring case
pub fn search(orders: &[Order], term: &str) -> Vec<OrderRecord> {
    orders
        .iter()
        .filter(|o| o.has_item_matching(term))
        .map(OrderRecord::from)
        .collect()
}
