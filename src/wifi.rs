//! Reader for `WIFI:` network payloads (`WIFI:T:WPA;S:name;P:secret;H:true;;`).

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WifiNetwork {
    pub ssid: String,
    /// Authentication type as written, e.g. `WPA`, `WEP` or `nopass`.
    pub security: Option<String>,
    pub password: Option<String>,
    pub hidden: bool,
}

/// Parse a Wi-Fi payload. Returns `None` when the prefix or the SSID is missing.
pub fn parse_wifi(raw: &str) -> Option<WifiNetwork> {
    let text = raw.trim();
    let head = text.get(..5)?;
    if !head.eq_ignore_ascii_case("WIFI:") {
        return None;
    }

    let mut network = WifiNetwork {
        ssid: String::new(),
        security: None,
        password: None,
        hidden: false,
    };
    let mut has_ssid = false;

    for field in split_fields(&text[5..]) {
        let Some((key, value)) = field.split_once(':') else {
            continue;
        };
        match key.to_ascii_uppercase().as_str() {
            "S" => {
                network.ssid = value.to_string();
                has_ssid = true;
            }
            "T" if !value.is_empty() => network.security = Some(value.to_string()),
            "P" if !value.is_empty() => network.password = Some(value.to_string()),
            "H" => network.hidden = value.eq_ignore_ascii_case("true"),
            _ => {}
        }
    }

    has_ssid.then_some(network)
}

/// Split on unescaped `;` and drop the backslash escapes.
fn split_fields(body: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut escaped = false;

    for c in body.chars() {
        if escaped {
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == ';' {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        fields.push(current);
    }

    fields
}
