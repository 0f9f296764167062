//! Order page parsing.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

use super::html::{decode_entities, parse_money, text_of};
use crate::error::{Error, Result};
use crate::types::{Item, Order, OrderDetails, Recipient};

static CARD_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<div[^>]*class="[^"]*\border-card\b[^"]*""#).expect("card regex")
});
static ORDER_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{3}-\d{7}-\d{7}|D01-\d{7}-\d{7})\b").expect("order id regex")
});
static PLACED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:order placed|ordered on)\s*:?\s*([A-Z][a-z]+ \d{1,2}, \d{4})")
        .expect("placed regex")
});
static CARD_TOTAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\btotal\s*:?\s*(-?\$[\d,]+\.\d{2})").expect("total regex"));
static PRODUCT_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*href="([^"]*/(?:gp/product|dp)/[^"]*)"[^>]*>(.*?)</a>"#)
        .expect("product link regex")
});
static NEXT_PAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<li class="a-last">\s*<a\b[^>]*href="([^"]+)""#).expect("next page regex")
});
static QTY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)class="[^"]*(?:item-view-qty|product-image__qty)[^"]*"[^>]*>\s*(\d+)"#)
        .expect("qty regex")
});
static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$[\d,]+\.\d{2}").expect("price regex"));
static SELLER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Sold by:\s*(.+?)(?:\s+(?:Return|Condition|Supplied by|\$)|$)").expect("seller regex")
});
static CONDITION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Condition:\s*([A-Za-z][A-Za-z -]*?)(?:\s{2,}|\s+\$|$)").expect("condition regex"));
static PAYMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\S+(?: Express| Club| Card)?)\s+ending in\s+(\d{4})").expect("payment regex")
});
static FULL_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)class="[^"]*\bdisplayAddressFullName\b[^"]*"[^>]*>(.*?)</li>"#).expect("name regex")
});
static ADDRESS_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)class="[^"]*\bdisplayAddress(?:AddressLine\d|CityStateOrRegionPostalCode|CountryName)\b[^"]*"[^>]*>(.*?)</li>"#,
    )
    .expect("address regex")
});
static SIGN_IN_FORM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<form[^>]*name="signIn""#).expect("sign-in regex"));

/// One page of the order history listing
#[derive(Debug, Default)]
pub struct HistoryPage {
    pub orders: Vec<Order>,
    pub next_page: Option<String>,
}

/// True when Amazon bounced the request to the sign-in page
pub fn is_sign_in_page(page: &str) -> bool {
    SIGN_IN_FORM_RE.is_match(page)
}

/// Parse an order history page into summary orders
pub fn parse_history_page(page: &str) -> Result<HistoryPage> {
    if is_sign_in_page(page) {
        return Err(Error::NotAuthenticated);
    }

    let starts: Vec<usize> = CARD_SPLIT_RE.find_iter(page).map(|m| m.start()).collect();
    let mut orders = Vec::with_capacity(starts.len());
    for (i, start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(page.len());
        orders.push(parse_order_card(&page[*start..end])?);
    }

    let next_page = NEXT_PAGE_RE
        .captures(page)
        .map(|c| decode_entities(&c[1]));

    Ok(HistoryPage { orders, next_page })
}

fn parse_order_card(card: &str) -> Result<Order> {
    let text = text_of(card);
    let order_number = ORDER_ID_RE
        .captures(&text)
        .map(|c| c[1].to_string())
        .ok_or_else(|| Error::parse("order history", "order card without an order number"))?;

    Ok(Order {
        order_number,
        order_placed_date: placed_date(&text),
        grand_total: CARD_TOTAL_RE
            .captures(&text)
            .and_then(|c| parse_money(&c[1])),
        items: parse_items(card),
        ..Default::default()
    })
}

/// Parse an order details page.
///
/// Fails with [`Error::NotFound`] when the page does not mention `order_id`,
/// which is what Amazon serves for unknown ids.
pub fn parse_order_details(page: &str, order_id: &str) -> Result<Order> {
    if is_sign_in_page(page) {
        return Err(Error::NotAuthenticated);
    }
    let text = text_of(page);
    if !text.contains(order_id) {
        return Err(Error::NotFound(order_id.to_string()));
    }

    let mut details = detail_amounts(&text);
    if let Some(caps) = PAYMENT_RE.captures(&text) {
        details.payment_method = Some(caps[1].trim().to_string());
        details.payment_method_last_4 = Some(caps[2].to_string());
    }

    Ok(Order {
        order_number: order_id.to_string(),
        order_placed_date: placed_date(&text),
        grand_total: labelled_amount(&text, "Grand Total"),
        details,
        recipient: parse_recipient(page),
        items: parse_items(page),
    })
}

const DETAIL_LABELS: [&str; 12] = [
    "Item(s) Subtotal",
    "Shipping & Handling",
    "Estimated tax to be collected",
    "Total before tax",
    "Refund Total",
    "Promotion Applied",
    "Your Coupon Savings",
    "Subscribe & Save",
    "Multibuy Discount",
    "Amazon Discount",
    "Reward Points",
    "Gift Card Amount",
];

static DETAIL_LABEL_RES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    DETAIL_LABELS
        .iter()
        .map(|label| {
            let re = Regex::new(&format!(
                r"(?i){}\s*:?\s*(-?\$[\d,]+\.\d{{2}})",
                regex::escape(label)
            ))
            .expect("detail label regex");
            (*label, re)
        })
        .collect()
});

fn detail_amounts(text: &str) -> OrderDetails {
    OrderDetails {
        subtotal: labelled_amount(text, "Item(s) Subtotal"),
        shipping_total: labelled_amount(text, "Shipping & Handling"),
        estimated_tax: labelled_amount(text, "Estimated tax to be collected"),
        total_before_tax: labelled_amount(text, "Total before tax"),
        refund_total: labelled_amount(text, "Refund Total"),
        promotion_applied: labelled_amount(text, "Promotion Applied"),
        coupon_savings: labelled_amount(text, "Your Coupon Savings"),
        subscription_discount: labelled_amount(text, "Subscribe & Save"),
        multibuy_discount: labelled_amount(text, "Multibuy Discount"),
        amazon_discount: labelled_amount(text, "Amazon Discount"),
        reward_points: labelled_amount(text, "Reward Points"),
        gift_card: labelled_amount(text, "Gift Card Amount"),
        payment_method: None,
        payment_method_last_4: None,
    }
}

fn placed_date(text: &str) -> Option<NaiveDate> {
    let caps = PLACED_RE.captures(text)?;
    NaiveDate::parse_from_str(&caps[1], "%B %d, %Y").ok()
}

fn labelled_amount(text: &str, label: &str) -> Option<f64> {
    let (_, re) = DETAIL_LABEL_RES.iter().find(|(l, _)| *l == label)?;
    re.captures(text).and_then(|c| parse_money(&c[1]))
}

fn parse_recipient(page: &str) -> Option<Recipient> {
    let name = FULL_NAME_RE
        .captures(page)
        .map(|c| text_of(&c[1]))
        .filter(|n| !n.is_empty());
    let lines: Vec<String> = ADDRESS_LINE_RE
        .captures_iter(page)
        .map(|c| text_of(&c[1]))
        .filter(|l| !l.is_empty())
        .collect();
    let address = (!lines.is_empty()).then(|| lines.join(", "));

    if name.is_none() && address.is_none() {
        return None;
    }
    Some(Recipient { name, address })
}

/// Items are product links with text; each item's extra fields are read
/// from the markup between its link and the next one.
fn parse_items(fragment: &str) -> Vec<Item> {
    let links: Vec<_> = PRODUCT_LINK_RE
        .captures_iter(fragment)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let title = text_of(&caps[2]);
            if title.is_empty() {
                return None;
            }
            Some((whole.start(), whole.end(), decode_entities(&caps[1]), title))
        })
        .collect();

    let mut items: Vec<Item> = Vec::with_capacity(links.len());
    for (i, (_, end, link, title)) in links.iter().enumerate() {
        if items.iter().any(|it| it.link.as_deref() == Some(link.as_str())) {
            continue;
        }
        let segment_end = links.get(i + 1).map(|l| l.0).unwrap_or(fragment.len());
        let segment = &fragment[*end..segment_end];
        let segment_text = text_of(segment);

        items.push(Item {
            title: title.clone(),
            price: PRICE_RE
                .find(&segment_text)
                .and_then(|m| parse_money(m.as_str())),
            quantity: QTY_RE
                .captures(segment)
                .and_then(|c| c[1].parse().ok())
                .unwrap_or(1),
            link: Some(link.clone()),
            seller: SELLER_RE
                .captures(&segment_text)
                .map(|c| c[1].trim().to_string()),
            condition: CONDITION_RE
                .captures(&segment_text)
                .map(|c| c[1].trim().to_string()),
        });
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    const HISTORY: &str = r#"
    <div class="your-orders-content-container">
      <div class="order-card js-order-card">
        <div class="order-header">
          <span>Order placed</span> <span>January 5, 2024</span>
          <span>Total</span> <span>$25.98</span>
          <span>Order # </span><span dir="ltr">111-1234567-1234567</span>
        </div>
        <a class="a-link-normal" href="/gp/product/B000000001/ref=ppx_yo_dt_b_asin_image"><img src="x.jpg"></a>
        <a class="a-link-normal" href="/gp/product/B000000001/ref=ppx_yo_dt_b_asin_title">Blue Widget &amp; Stand</a>
        <span class="product-image__qty">2</span>
      </div>
      <div class="order-card js-order-card">
        <div class="order-header">
          <span>Order placed</span> <span>March 12, 2024</span>
          <span>Total</span> <span>$1,024.00</span>
          <span>Order # </span><span dir="ltr">112-7654321-7654321</span>
        </div>
        <a class="a-link-normal" href="/dp/B000000002">Laptop</a>
      </div>
      <ul class="a-pagination"><li class="a-last"><a href="/your-orders/orders?timeFilter=year-2024&amp;startIndex=10">Next</a></li></ul>
    </div>"#;

    const DETAILS: &str = r#"
    <div class="order-date-invoice-item">Ordered on January 5, 2024</div>
    <span>Order# 111-1234567-1234567</span>
    <div class="displayAddressDiv"><ul>
      <li class="displayAddressLI displayAddressFullName">Jane Doe</li>
      <li class="displayAddressLI displayAddressAddressLine1">1 Main St</li>
      <li class="displayAddressLI displayAddressCityStateOrRegionPostalCode">Seattle, WA 98101</li>
      <li class="displayAddressLI displayAddressCountryName">United States</li>
    </ul></div>
    <div class="pmts-payments-instrument-detail-box">Visa ending in 4242</div>
    <div>Item(s) Subtotal: $23.98</div>
    <div>Shipping &amp; Handling: $0.00</div>
    <div>Total before tax: $23.98</div>
    <div>Estimated tax to be collected: $2.00</div>
    <div>Grand Total: $25.98</div>
    <div class="yohtmlc-item">
      <a class="a-link-normal" href="/gp/product/B000000001/ref=ppx_od_dt_b_asin_title">Blue Widget &amp; Stand</a>
      <span class="item-view-qty">2</span>
      <span class="a-size-small">Sold by: Widget Co</span>
      <span class="a-size-small">Condition: New</span>
      <span class="a-color-price">$11.99</span>
    </div>"#;

    #[test]
    fn test_parse_history_page() {
        let page = parse_history_page(HISTORY).unwrap();
        assert_eq!(page.orders.len(), 2);

        let first = &page.orders[0];
        assert_eq!(first.order_number, "111-1234567-1234567");
        assert_eq!(first.order_placed_date, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(first.grand_total, Some(25.98));
        assert_eq!(first.items.len(), 1);
        assert_eq!(first.items[0].title, "Blue Widget & Stand");
        assert_eq!(first.items[0].quantity, 2);

        let second = &page.orders[1];
        assert_eq!(second.order_number, "112-7654321-7654321");
        assert_eq!(second.grand_total, Some(1024.0));
        assert_eq!(second.items[0].link.as_deref(), Some("/dp/B000000002"));

        assert_eq!(
            page.next_page.as_deref(),
            Some("/your-orders/orders?timeFilter=year-2024&startIndex=10")
        );
    }

    #[test]
    fn test_parse_empty_history() {
        let page = parse_history_page("<div>You have not placed any orders</div>").unwrap();
        assert!(page.orders.is_empty());
        assert!(page.next_page.is_none());
    }

    #[test]
    fn test_history_redirected_to_sign_in() {
        let err = parse_history_page(r#"<form name="signIn" action="/ap/signin"></form>"#)
            .unwrap_err();
        assert!(err.is_not_authenticated());
    }

    #[test]
    fn test_parse_order_details() {
        let order = parse_order_details(DETAILS, "111-1234567-1234567").unwrap();
        assert_eq!(order.order_placed_date, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(order.grand_total, Some(25.98));
        assert_eq!(order.details.subtotal, Some(23.98));
        assert_eq!(order.details.shipping_total, Some(0.0));
        assert_eq!(order.details.estimated_tax, Some(2.0));
        assert_eq!(order.details.refund_total, None);
        assert_eq!(order.details.payment_method.as_deref(), Some("Visa"));
        assert_eq!(order.details.payment_method_last_4.as_deref(), Some("4242"));

        let recipient = order.recipient.unwrap();
        assert_eq!(recipient.name.as_deref(), Some("Jane Doe"));
        assert_eq!(
            recipient.address.as_deref(),
            Some("1 Main St, Seattle, WA 98101, United States")
        );

        assert_eq!(order.items.len(), 1);
        let item = &order.items[0];
        assert_eq!(item.quantity, 2);
        assert_eq!(item.price, Some(11.99));
        assert_eq!(item.seller.as_deref(), Some("Widget Co"));
        assert_eq!(item.condition.as_deref(), Some("New"));
    }

    #[test]
    fn test_every_detail_label_is_read() {
        let text = DETAIL_LABELS
            .iter()
            .enumerate()
            .map(|(i, label)| format!("{}: ${}.00", label, i + 1))
            .collect::<Vec<_>>()
            .join(" ");
        let details = detail_amounts(&text);
        assert_eq!(details.subtotal, Some(1.0));
        assert_eq!(details.total_before_tax, Some(4.0));
        assert_eq!(details.subscription_discount, Some(8.0));
        assert_eq!(details.reward_points, Some(11.0));
        assert_eq!(details.gift_card, Some(12.0));
        assert_eq!(detail_amounts("no amounts here"), OrderDetails::default());
    }

    #[test]
    fn test_order_details_not_found() {
        let err = parse_order_details(DETAILS, "999-0000000-0000000").unwrap_err();
        assert!(err.is_not_found());
    }
}
