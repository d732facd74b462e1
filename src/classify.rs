use std::{fmt, str::FromStr};

use anyhow::{anyhow, Error};
use serde::{Deserialize, Serialize};

/// Content category assigned to a scanned payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentTag {
    Url,
    Email,
    Phone,
    Wifi,
    Text,
    Unknown,
}

impl ContentTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentTag::Url => "url",
            ContentTag::Email => "email",
            ContentTag::Phone => "phone",
            ContentTag::Wifi => "wifi",
            ContentTag::Text => "text",
            ContentTag::Unknown => "unknown",
        }
    }

    /// Human readable name for history rows.
    pub fn label(&self) -> &'static str {
        match self {
            ContentTag::Url => "URL",
            ContentTag::Email => "Email",
            ContentTag::Phone => "Phone",
            ContentTag::Wifi => "Wi-Fi",
            ContentTag::Text => "Text",
            ContentTag::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ContentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentTag {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "url" => Ok(ContentTag::Url),
            "email" => Ok(ContentTag::Email),
            "phone" => Ok(ContentTag::Phone),
            "wifi" => Ok(ContentTag::Wifi),
            "text" => Ok(ContentTag::Text),
            "unknown" => Ok(ContentTag::Unknown),
            other => Err(anyhow!("unknown content tag '{other}'")),
        }
    }
}

/// Classify raw scanned text. Rules are checked in order and the first match wins;
/// the order is part of the contract.
pub fn classify(raw: &str) -> ContentTag {
    let text = raw.trim();

    if has_prefix(text, "http://") || has_prefix(text, "https://") || has_prefix(text, "www.") {
        ContentTag::Url
    } else if has_prefix(text, "mailto:") || looks_like_email(text) {
        ContentTag::Email
    } else if has_prefix(text, "tel:") || looks_like_phone(text) {
        ContentTag::Phone
    } else if has_prefix(text, "WIFI:") {
        ContentTag::Wifi
    } else if !text.is_empty() {
        ContentTag::Text
    } else {
        ContentTag::Unknown
    }
}

// Byte comparison so multi-byte text never lands on a char boundary panic.
fn has_prefix(text: &str, prefix: &str) -> bool {
    text.as_bytes()
        .get(..prefix.len())
        .map_or(false, |head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}

/// `local@domain.tld`: one `@`, no whitespace, and a dot in the domain with
/// something on both sides of it.
fn looks_like_email(text: &str) -> bool {
    if text.chars().any(char::is_whitespace) {
        return false;
    }

    let mut parts = text.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    if local.is_empty() {
        return false;
    }

    domain
        .char_indices()
        .any(|(idx, c)| c == '.' && idx > 0 && idx + 1 < domain.len())
}

/// Optional `+`, a digit, then at least six more digits, spaces, hyphens or parentheses.
fn looks_like_phone(text: &str) -> bool {
    let rest = text.strip_prefix('+').unwrap_or(text);
    let mut chars = rest.chars();

    match chars.next() {
        Some(first) if first.is_ascii_digit() => {}
        _ => return false,
    }

    let mut tail_len = 0usize;
    for c in chars {
        if !(c.is_ascii_digit() || c.is_whitespace() || matches!(c, '-' | '(' | ')')) {
            return false;
        }
        tail_len += 1;
    }

    tail_len >= 6
}
