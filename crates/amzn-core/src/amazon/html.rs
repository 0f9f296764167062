//! Minimal HTML helpers for Amazon pages.
//!
//! Only what the sign-in flow and order pages need: locating forms, reading
//! their hidden fields, and flattening fragments to text.

use regex::Regex;
use std::sync::LazyLock;

static FORM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<form\b([^>]*)>(.*?)</form>").expect("form regex"));
static INPUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<input\b([^>]*)>").expect("input regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex"));
static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)>").expect("script regex")
});
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("space regex"));
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)(?:^|\s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("attribute regex")
});
static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#x?[0-9a-fA-F]+|[a-zA-Z]+);").expect("entity regex"));

/// An HTML form ready to be submitted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Form {
    pub attrs: String,
    pub action: Option<String>,
    pub method: String,
    pub fields: Vec<(String, String)>,
}

impl Form {
    /// Set a field, replacing an existing value with the same name
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some(field) => field.1 = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("get")
    }
}

/// Read an attribute value from the inside of a tag
pub fn attr(tag_attrs: &str, name: &str) -> Option<String> {
    ATTR_RE
        .captures_iter(tag_attrs)
        .find(|caps| caps[1].eq_ignore_ascii_case(name))
        .and_then(|caps| caps.get(2).or_else(|| caps.get(3)))
        .map(|m| decode_entities(m.as_str()))
}

/// Find the first form whose opening tag contains `marker`.
///
/// Only hidden inputs are collected; visible fields are set by the caller.
pub fn find_form(html: &str, marker: &str) -> Option<Form> {
    FORM_RE.captures_iter(html).find_map(|caps| {
        let attrs = caps.get(1)?.as_str();
        if !attrs.contains(marker) {
            return None;
        }
        let body = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        Some(Form {
            attrs: attrs.to_string(),
            action: attr(attrs, "action"),
            method: attr(attrs, "method").unwrap_or_else(|| "post".to_string()),
            fields: hidden_inputs(body),
        })
    })
}

fn hidden_inputs(body: &str) -> Vec<(String, String)> {
    INPUT_RE
        .captures_iter(body)
        .filter_map(|caps| {
            let attrs = caps.get(1)?.as_str();
            let kind = attr(attrs, "type").unwrap_or_default();
            if !kind.eq_ignore_ascii_case("hidden") {
                return None;
            }
            let name = attr(attrs, "name")?;
            Some((name, attr(attrs, "value").unwrap_or_default()))
        })
        .collect()
}

/// Flatten an HTML fragment to whitespace-collapsed text
pub fn text_of(fragment: &str) -> String {
    let without_scripts = SCRIPT_RE.replace_all(fragment, " ");
    let without_tags = TAG_RE.replace_all(&without_scripts, " ");
    let decoded = decode_entities(&without_tags);
    SPACE_RE.replace_all(&decoded, " ").trim().to_string()
}

/// Decode the handful of entities Amazon pages actually use
pub fn decode_entities(s: &str) -> String {
    ENTITY_RE
        .replace_all(s, |caps: &regex::Captures| {
            let entity = &caps[1];
            let decoded = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => entity.strip_prefix('#').and_then(|num| {
                    let code = match num.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse().ok(),
                    };
                    code.and_then(char::from_u32)
                }),
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Parse a money amount like `$1,234.56` or `-$5.00`
pub fn parse_money(s: &str) -> Option<f64> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse().ok()
}
